// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication errors.

use crate::backend::BackendError;
use crate::storage::StoreError;
use crate::wallet::WalletError;

/// Authentication error type.
///
/// A login or registration that fails with any of these leaves the stored
/// session exactly as it was before the attempt.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Wallet could not be connected
    #[error(transparent)]
    Wallet(#[from] WalletError),

    /// Backend request failed
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// Session could not be persisted
    #[error("Session storage failed: {0}")]
    Store(#[from] StoreError),

    /// Connected wallet has no STX address
    #[error("Connected wallet has no STX address")]
    NoWalletAddress,

    /// Backend knows the wallet but sent no credential or profile
    #[error("Backend identified the wallet without issuing a credential")]
    IncompleteIdentity,

    /// Registration form rejected locally
    #[error("Invalid registration: {0}")]
    InvalidRegistration(String),

    /// Backend accepted the registration but does not recognize the wallet
    #[error("Registered wallet is not recognized by the backend")]
    RegistrationNotRecognized,
}

impl AuthError {
    /// Stable machine-readable code.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::Wallet(WalletError::ProviderNotFound) => "wallet_not_found",
            AuthError::Wallet(WalletError::ConnectionRefused) => "wallet_connection_refused",
            AuthError::Wallet(WalletError::NoAddresses) | AuthError::NoWalletAddress => {
                "wallet_no_address"
            }
            AuthError::Wallet(_) => "wallet_error",
            AuthError::Backend(_) => "backend_error",
            AuthError::Store(_) => "storage_error",
            AuthError::IncompleteIdentity => "incomplete_identity",
            AuthError::InvalidRegistration(_) => "invalid_registration",
            AuthError::RegistrationNotRecognized => "registration_not_recognized",
        }
    }
}
