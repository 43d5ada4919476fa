// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Auth gate: status check, login, registration, logout.

use std::sync::Arc;

use chrono::Utc;

use super::AuthError;
use crate::backend::{Identity, MarketplaceBackend, NewUser};
use crate::session::{Credential, SessionStore, SessionUpdate, UserProfile, WalletSession};
use crate::wallet::WalletConnector;

/// Sign-in state, recomputed on every check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    Anonymous,
    Authenticated(UserProfile),
}

impl AuthState {
    pub fn profile(&self) -> Option<&UserProfile> {
        match self {
            AuthState::Authenticated(profile) => Some(profile),
            AuthState::Anonymous => None,
        }
    }
}

/// Result of a successful login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    /// Known wallet; session stored
    ExistingAccount { profile: UserProfile },
    /// Unknown wallet; registration needed
    NewAccount { address: String },
}

impl LoginOutcome {
    pub fn is_new_account(&self) -> bool {
        matches!(self, LoginOutcome::NewAccount { .. })
    }

    /// Where the web frontend would navigate next.
    pub fn redirect_hint(&self) -> String {
        match self {
            LoginOutcome::ExistingAccount { .. } => "/products".to_string(),
            LoginOutcome::NewAccount { address } => {
                let encoded: String = url::form_urlencoded::byte_serialize(address.as_bytes()).collect();
                format!("/register?wallet_address={encoded}")
            }
        }
    }
}

#[derive(Clone)]
pub struct AuthGate {
    connector: WalletConnector,
    backend: Arc<dyn MarketplaceBackend>,
    sessions: SessionStore,
}

impl AuthGate {
    pub fn new(
        connector: WalletConnector,
        backend: Arc<dyn MarketplaceBackend>,
        sessions: SessionStore,
    ) -> Self {
        Self {
            connector,
            backend,
            sessions,
        }
    }

    /// Recompute the sign-in state.
    ///
    /// Transport failures while verifying leave the session in place and
    /// report `Anonymous`; only an explicit rejection clears it.
    pub async fn check_status(&self) -> AuthState {
        if !self.connector.is_connected().await {
            tracing::debug!("Wallet not connected");
            self.clear_logged();
            return AuthState::Anonymous;
        }

        let session = self.sessions.read_session();
        let (Some(credential), Some(cached_profile)) = (session.credential, session.profile) else {
            tracing::debug!("No stored credential");
            self.clear_logged();
            return AuthState::Anonymous;
        };

        if credential.is_expired_at(Utc::now()) {
            tracing::info!("Stored credential expired");
            self.clear_logged();
            return AuthState::Anonymous;
        }

        let verification = match self.backend.verify_credential(&credential).await {
            Ok(verification) => verification,
            Err(e) => {
                tracing::warn!(error = %e, "Credential verification unavailable");
                return AuthState::Anonymous;
            }
        };

        if !verification.valid {
            tracing::info!("Backend rejected stored credential");
            self.clear_logged();
            return AuthState::Anonymous;
        }

        let mut profile = verification.profile.unwrap_or(cached_profile.clone());
        if profile.wallet_address.is_none() {
            profile.wallet_address = session.wallet.map(|wallet| wallet.address);
        }

        if profile != cached_profile {
            if let Err(e) = self
                .sessions
                .write_session(SessionUpdate::new().with_profile(profile.clone()))
            {
                tracing::warn!(error = %e, "Failed to refresh cached profile");
            }
        }

        AuthState::Authenticated(profile)
    }

    /// Connect the wallet and resolve it against the backend.
    ///
    /// Nothing is written unless every step succeeds.
    pub async fn login(&self) -> Result<LoginOutcome, AuthError> {
        let addresses = self.connector.connect().await?;
        let wallet = WalletSession::from_addresses(addresses).ok_or(AuthError::NoWalletAddress)?;
        let address = wallet.address.clone();

        let identity = self.backend.identify_by_wallet(&address).await?;
        if !identity.exists {
            self.sessions
                .write_session(SessionUpdate::new().with_wallet(wallet).without_identity())?;
            tracing::info!(address = %address, "Unregistered wallet; registration required");
            return Ok(LoginOutcome::NewAccount { address });
        }

        let profile = self.persist_identity(wallet, identity)?;
        tracing::info!(username = %profile.username, "Logged in");
        Ok(LoginOutcome::ExistingAccount { profile })
    }

    /// Register the connected wallet, then sign in with it.
    pub async fn register(
        &self,
        display_name: &str,
        username: &str,
    ) -> Result<UserProfile, AuthError> {
        let display_name = display_name.trim();
        let username = username.trim();
        if display_name.is_empty() {
            return Err(AuthError::InvalidRegistration(
                "display name is required".to_string(),
            ));
        }
        if username.is_empty() {
            return Err(AuthError::InvalidRegistration(
                "username is required".to_string(),
            ));
        }

        let wallet = match self.sessions.read_session().wallet {
            Some(wallet) => wallet,
            None => {
                let addresses = self.connector.connect().await?;
                WalletSession::from_addresses(addresses).ok_or(AuthError::NoWalletAddress)?
            }
        };

        self.backend
            .register_user(&NewUser {
                display_name: display_name.to_string(),
                username: username.to_string(),
                wallet_address: wallet.address.clone(),
            })
            .await?;

        let identity = self.backend.identify_by_wallet(&wallet.address).await?;
        if !identity.exists {
            return Err(AuthError::RegistrationNotRecognized);
        }

        let profile = self.persist_identity(wallet, identity)?;
        tracing::info!(username = %profile.username, "Registered and logged in");
        Ok(profile)
    }

    /// Disconnect the wallet and clear the session, whatever fails.
    pub async fn logout(&self) {
        self.connector.disconnect().await;
        self.clear_logged();
        tracing::info!("Logged out");
    }

    fn persist_identity(
        &self,
        wallet: WalletSession,
        identity: Identity,
    ) -> Result<UserProfile, AuthError> {
        let (credential, mut profile): (Credential, UserProfile) =
            match (identity.credential, identity.profile) {
                (Some(credential), Some(profile)) => (credential, profile),
                _ => return Err(AuthError::IncompleteIdentity),
            };
        profile.wallet_address = Some(wallet.address.clone());

        self.sessions.write_session(
            SessionUpdate::new()
                .with_wallet(wallet)
                .with_identity(credential, profile.clone()),
        )?;
        Ok(profile)
    }

    fn clear_logged(&self) {
        if let Err(e) = self.sessions.clear_session() {
            tracing::warn!(error = %e, "Failed to clear session");
        }
    }
}
