// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Purchase Flow
//!
//! Buying a listing is a fixed sequence with an early exit at every step:
//!
//! ```text
//! Idle -> Validating -> BalanceChecking -> SellerResolving
//!      -> AwaitingConfirmation -> AwaitingSignature -> Settling
//!      -> { Completed | PartialSuccess | Cancelled | Failed }
//! ```
//!
//! - Validation (self-purchase, sold listing, price) runs before any I/O.
//! - The balance check is advisory; the chain is the authority.
//! - The wallet popup may never answer. A short timer warns that it may be
//!   blocked but never cancels the pending transfer.
//! - A transfer that succeeds followed by a settlement that fails is a
//!   `PartialSuccess`. It carries the transaction id, is written to the
//!   [`SettlementLedger`], and is never retried automatically.
//!
//! Nothing is retried. A new attempt is a new call to
//! [`PurchaseOrchestrator::purchase`].

pub mod ledger;
pub mod orchestrator;

use std::fmt;

use async_trait::async_trait;

use crate::backend::BackendError;
use crate::chain::Network;
use crate::wallet::WalletError;

pub use ledger::{PendingSettlement, SettlementLedger};
pub use orchestrator::{FollowUpError, PurchaseOrchestrator};

/// Memo prefix on every marketplace transfer.
pub const MEMO_PREFIX: &str = "ChainGo - ";

/// Stacks transfer memos are limited to 34 bytes.
pub const MEMO_MAX_BYTES: usize = 34;

/// Default delay before the "popup may be blocked" hint.
pub const DEFAULT_POPUP_WARNING: std::time::Duration = std::time::Duration::from_secs(3);

// =============================================================================
// Types
// =============================================================================

/// Everything known about a purchase once the seller is resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurchaseIntent {
    pub listing_id: i64,
    pub listing_title: String,
    pub buyer_username: String,
    pub buyer_wallet_address: String,
    pub seller_username: String,
    pub seller_wallet_address: String,
    /// STX decimal string as listed
    pub price: String,
    pub amount_minor: u64,
    pub memo: String,
    /// Network the transfer is signed on
    pub network: Network,
}

/// Every attempt starts at `Idle` and ends in a terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PurchaseState {
    Idle,
    Validating,
    BalanceChecking,
    SellerResolving,
    AwaitingConfirmation,
    AwaitingSignature,
    Settling,
    Completed,
    PartialSuccess,
    Cancelled,
    Failed,
}

impl PurchaseState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            PurchaseState::Completed
                | PurchaseState::PartialSuccess
                | PurchaseState::Cancelled
                | PurchaseState::Failed
        )
    }
}

impl fmt::Display for PurchaseState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PurchaseState::Idle => "idle",
            PurchaseState::Validating => "validating",
            PurchaseState::BalanceChecking => "balance_checking",
            PurchaseState::SellerResolving => "seller_resolving",
            PurchaseState::AwaitingConfirmation => "awaiting_confirmation",
            PurchaseState::AwaitingSignature => "awaiting_signature",
            PurchaseState::Settling => "settling",
            PurchaseState::Completed => "completed",
            PurchaseState::PartialSuccess => "partial_success",
            PurchaseState::Cancelled => "cancelled",
            PurchaseState::Failed => "failed",
        };
        f.write_str(label)
    }
}

/// Where the user backed out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelStage {
    /// Declined the confirmation step
    Confirmation,
    /// Dismissed the wallet popup
    Signature,
}

#[derive(Debug, thiserror::Error)]
pub enum PurchaseFailure {
    #[error("You cannot buy your own listing")]
    SelfPurchase,

    #[error("Listing is already sold")]
    AlreadySold,

    #[error("Invalid listing price: {0}")]
    InvalidPrice(String),

    #[error("No wallet session; reconnect the wallet")]
    WalletSessionMissing,

    #[error("Balance unavailable: {0}")]
    BalanceUnavailable(BackendError),

    #[error("Insufficient balance: {available_stx} STX available, {price} STX required")]
    InsufficientBalance { available_stx: f64, price: String },

    #[error("Seller wallet for {username} could not be resolved")]
    SellerWalletUnresolved {
        username: String,
        #[source]
        source: Option<BackendError>,
    },

    #[error("Transfer failed: {0}")]
    Transfer(#[from] WalletError),
}

impl PurchaseFailure {
    /// Rejected before any network call.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            PurchaseFailure::SelfPurchase
                | PurchaseFailure::AlreadySold
                | PurchaseFailure::InvalidPrice(_)
        )
    }
}

/// Terminal result of a purchase attempt.
#[derive(Debug)]
pub enum PurchaseOutcome {
    Completed {
        transaction_id: String,
    },
    /// Paid on chain, not settled by the backend
    PartialSuccess {
        transaction_id: String,
        settlement_error: BackendError,
        /// Ledger record, if it could be written
        record_id: Option<uuid::Uuid>,
    },
    Cancelled {
        stage: CancelStage,
    },
    Failed(PurchaseFailure),
}

impl PurchaseOutcome {
    pub fn state(&self) -> PurchaseState {
        match self {
            PurchaseOutcome::Completed { .. } => PurchaseState::Completed,
            PurchaseOutcome::PartialSuccess { .. } => PurchaseState::PartialSuccess,
            PurchaseOutcome::Cancelled { .. } => PurchaseState::Cancelled,
            PurchaseOutcome::Failed(_) => PurchaseState::Failed,
        }
    }

    pub fn transaction_id(&self) -> Option<&str> {
        match self {
            PurchaseOutcome::Completed { transaction_id }
            | PurchaseOutcome::PartialSuccess { transaction_id, .. } => Some(transaction_id),
            _ => None,
        }
    }
}

// =============================================================================
// Collaborators
// =============================================================================

/// Receives progress notifications. Both methods default to no-ops.
pub trait PurchaseObserver: Send + Sync {
    fn on_state(&self, _state: PurchaseState) {}

    /// The wallet popup has not answered for a while.
    fn popup_may_be_blocked(&self) {}
}

/// Observer that ignores everything.
pub struct NoopObserver;

impl PurchaseObserver for NoopObserver {}

/// Human confirmation step before the wallet is asked to sign.
#[async_trait]
pub trait PurchaseConfirmer: Send + Sync {
    /// `true` to proceed.
    async fn confirm(&self, intent: &PurchaseIntent) -> bool;
}

// =============================================================================
// Helpers
// =============================================================================

/// Transfer memo for a listing title, cut to the memo limit on a char boundary.
pub fn transfer_memo(title: &str) -> String {
    let mut memo = format!("{MEMO_PREFIX}{}", title.trim());
    if memo.len() > MEMO_MAX_BYTES {
        let mut cut = MEMO_MAX_BYTES;
        while !memo.is_char_boundary(cut) {
            cut -= 1;
        }
        memo.truncate(cut);
    }
    memo
}

/// Parse a listing price. Must be a finite number above zero.
pub fn parse_price(price: &str) -> Result<f64, PurchaseFailure> {
    let value: f64 = price
        .trim()
        .parse()
        .map_err(|_| PurchaseFailure::InvalidPrice(price.to_string()))?;
    if !value.is_finite() || value <= 0.0 {
        return Err(PurchaseFailure::InvalidPrice(price.to_string()));
    }
    Ok(value)
}
