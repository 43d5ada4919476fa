// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Wallet integration.
//!
//! The wallet is an external capability: it holds the keys, shows approval
//! prompts and signs transfers. The client only talks to it through
//! [`WalletProvider`]; [`WalletConnector`] adds address normalization and
//! session self-healing on top.
//!
//! ## Modules
//!
//! - [`addresses`] - provider response shapes and normalization
//! - [`connector`] - connect / address lookup / transfer / disconnect
//! - [`rpc`] - JSON-RPC 2.0 provider over a local wallet bridge

pub mod addresses;
pub mod connector;
pub mod rpc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::chain::Network;

pub use addresses::{ProviderAddresses, RawAddress, WalletAddresses};
pub use connector::WalletConnector;
pub use rpc::RpcWalletProvider;

/// JSON-RPC error code for a request the user declined.
pub const USER_REJECTED_CODE: i64 = 4001;

#[derive(Debug, thiserror::Error)]
pub enum WalletError {
    #[error("No wallet provider available")]
    ProviderNotFound,

    #[error("Wallet connection was refused")]
    ConnectionRefused,

    #[error("Wallet returned no usable address")]
    NoAddresses,

    #[error("Request rejected by the user")]
    Rejected,

    #[error("Wallet RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("Wallet transport error: {0}")]
    Transport(String),

    #[error("Wallet response was invalid: {0}")]
    InvalidResponse(String),
}

/// STX transfer handed to the wallet for signing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransferRequest {
    pub recipient: String,
    /// Amount in micro-STX
    pub amount_minor: u64,
    pub memo: String,
    pub network: Network,
}

/// How a transfer request ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferOutcome {
    /// Signed and broadcast
    Completed { transaction_id: String },
    /// Dismissed by the user
    Cancelled,
}

/// Wallet capability.
///
/// Prompting methods (`connect`, `transfer`) may wait on the user for an
/// unbounded time.
#[async_trait]
pub trait WalletProvider: Send + Sync {
    /// Whether a provider is reachable at all.
    async fn is_available(&self) -> bool;

    /// Whether the provider holds an approved session for this app.
    async fn is_signed_in(&self) -> Result<bool, WalletError>;

    /// Show the connection prompt. Dismissal is `ConnectionRefused`.
    async fn connect(&self) -> Result<(), WalletError>;

    /// Raw address RPC (`getAddresses`, `stx_getAddresses`, `btc_getAddresses`).
    async fn request(&self, method: &str) -> Result<Value, WalletError>;

    /// Profile blob of the stored sign-in session, if any.
    async fn user_data(&self) -> Result<Option<Value>, WalletError>;

    /// Ask the user to sign and broadcast an STX transfer.
    async fn transfer(&self, request: &TransferRequest) -> Result<TransferOutcome, WalletError>;

    /// Drop the provider-side session.
    async fn sign_out(&self) -> Result<(), WalletError>;
}
