// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use crate::auth::AuthError;
use crate::backend::BackendError;
use crate::config::ConfigError;
use crate::purchase::FollowUpError;
use crate::storage::StoreError;
use crate::wallet::WalletError;

/// Top-level error for the command-line client.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Wallet(#[from] WalletError),

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    FollowUp(#[from] FollowUpError),

    #[error("{0}")]
    Usage(String),

    #[error("Not signed in; run `chaingo login` first")]
    NotSignedIn,

    #[error("Listing {0} not found")]
    ListingNotFound(i64),
}

impl ClientError {
    pub fn usage(message: impl Into<String>) -> Self {
        Self::Usage(message.into())
    }

    /// Process exit code.
    pub fn exit_code(&self) -> i32 {
        match self {
            ClientError::Usage(_) => 2,
            ClientError::Config(_) => 78,
            _ => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn module_errors_convert_and_display() {
        let err: ClientError = WalletError::ProviderNotFound.into();
        assert_eq!(err.to_string(), "No wallet provider available");
        assert_eq!(err.exit_code(), 1);

        let err: ClientError = AuthError::NoWalletAddress.into();
        assert_eq!(err.to_string(), "Connected wallet has no STX address");
    }

    #[test]
    fn usage_errors_exit_with_two() {
        let err = ClientError::usage("missing listing id");
        assert_eq!(err.to_string(), "missing listing id");
        assert_eq!(err.exit_code(), 2);
    }
}
