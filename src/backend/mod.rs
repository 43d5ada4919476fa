// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Marketplace backend client.
//!
//! [`MarketplaceBackend`] is the narrow surface the auth gate and the purchase
//! orchestrator depend on. [`HttpBackendClient`] implements it over the REST
//! API and adds the listing operations used by the CLI.
//!
//! There are no retries anywhere in this module. Every request carries an
//! explicit timeout and can be cancelled through [`RequestOptions`].

pub mod cache;
pub mod client;
pub mod listings;

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::chain::{BalanceInfo, IndexerError};
use crate::session::{Credential, UserProfile};

pub use cache::ListingCache;
pub use client::HttpBackendClient;
pub use listings::{
    CreatedListing, Listing, ListingImage, ListingPage, NewListing, PurchaseRecord,
    DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE,
};

/// Default request timeout when none is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

// =============================================================================
// Errors
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendErrorKind {
    /// Connection could not be made or broke mid-request
    Network,
    Timeout,
    Cancelled,
    /// Non-success HTTP status
    Status,
    /// Body did not match the expected shape
    InvalidResponse,
    /// Indexer balance document had no `stx.balance`
    BalanceFieldMissing,
}

impl fmt::Display for BackendErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            BackendErrorKind::Network => "network",
            BackendErrorKind::Timeout => "timeout",
            BackendErrorKind::Cancelled => "cancelled",
            BackendErrorKind::Status => "status",
            BackendErrorKind::InvalidResponse => "invalid response",
            BackendErrorKind::BalanceFieldMissing => "balance field missing",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Backend {kind} error: {message}")]
pub struct BackendError {
    pub kind: BackendErrorKind,
    pub http_status: Option<u16>,
    pub message: String,
}

impl BackendError {
    pub fn new(kind: BackendErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            http_status: None,
            message: message.into(),
        }
    }

    pub fn status(status: u16, message: impl Into<String>) -> Self {
        Self {
            kind: BackendErrorKind::Status,
            http_status: Some(status),
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(BackendErrorKind::Network, message)
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::new(BackendErrorKind::InvalidResponse, message)
    }

    pub fn cancelled(label: &str) -> Self {
        Self::new(BackendErrorKind::Cancelled, format!("{label} cancelled"))
    }

    /// Classify a reqwest error.
    pub(crate) fn from_reqwest(label: &str, error: reqwest::Error) -> Self {
        let kind = if error.is_timeout() {
            BackendErrorKind::Timeout
        } else if error.is_decode() {
            BackendErrorKind::InvalidResponse
        } else {
            BackendErrorKind::Network
        };
        Self {
            kind,
            http_status: error.status().map(|status| status.as_u16()),
            message: format!("{label}: {error}"),
        }
    }
}

impl From<IndexerError> for BackendError {
    fn from(error: IndexerError) -> Self {
        let message = error.to_string();
        match error {
            IndexerError::Request(_) => BackendError::network(message),
            IndexerError::Timeout(_) => BackendError::new(BackendErrorKind::Timeout, message),
            IndexerError::Status { status, .. } => BackendError::status(status, message),
            IndexerError::InvalidResponse(_) => BackendError::invalid_response(message),
            IndexerError::BalanceFieldMissing => {
                BackendError::new(BackendErrorKind::BalanceFieldMissing, message)
            }
        }
    }
}

// =============================================================================
// Request options
// =============================================================================

/// Per-scope request settings.
#[derive(Debug, Clone)]
pub struct RequestOptions {
    pub timeout: Duration,
    /// Cancelling the token aborts in-flight requests with `Cancelled`
    pub cancel: Option<CancellationToken>,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            cancel: None,
        }
    }
}

impl RequestOptions {
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout,
            cancel: None,
        }
    }

    pub fn cancellable(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }
}

// =============================================================================
// Wire types
// =============================================================================

/// Result of looking a wallet up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub exists: bool,
    pub credential: Option<Credential>,
    pub profile: Option<UserProfile>,
}

/// Result of verifying a credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verification {
    pub valid: bool,
    pub profile: Option<UserProfile>,
}

impl Verification {
    pub fn invalid() -> Self {
        Self {
            valid: false,
            profile: None,
        }
    }
}

/// Registration request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewUser {
    #[serde(rename = "nameSurname")]
    pub display_name: String,
    pub username: String,
    pub wallet_address: String,
}

/// Registration response.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RegisteredUser {
    #[serde(default)]
    pub user_id: Option<i64>,
}

// =============================================================================
// Backend trait
// =============================================================================

/// Backend operations the auth gate and purchase flow depend on.
#[async_trait]
pub trait MarketplaceBackend: Send + Sync {
    /// `POST /is_exists_user`
    async fn identify_by_wallet(&self, address: &str) -> Result<Identity, BackendError>;

    /// `POST /verify_token`. Rejections are `valid: false`, not errors.
    async fn verify_credential(&self, credential: &Credential)
        -> Result<Verification, BackendError>;

    /// `POST /create_new_user`
    async fn register_user(&self, user: &NewUser) -> Result<RegisteredUser, BackendError>;

    /// STX balance from the chain indexer.
    async fn fetch_balance(&self, address: &str) -> Result<BalanceInfo, BackendError>;

    /// `GET /get_user_wallet`. Unknown users and blank addresses are `None`.
    async fn resolve_seller_wallet(&self, username: &str) -> Result<Option<String>, BackendError>;

    /// `POST /complete_purchase`
    async fn settle_purchase(
        &self,
        listing_id: i64,
        buyer_username: &str,
        transaction_id: &str,
    ) -> Result<(), BackendError>;
}
