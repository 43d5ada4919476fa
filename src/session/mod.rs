// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Local session cache.
//!
//! A session is three independent sub-records stored under their own keys:
//! the connected wallet, the bearer credential, and the user profile that came
//! with the credential. Reads never fail: missing entries are absent, and an
//! unreadable entry makes the whole session read as empty.

pub mod claims;

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::storage::keys::{CREDENTIAL, SESSION_KEYS, USER_PROFILE, WALLET_SESSION};
use crate::storage::{KeyValueStore, StoreResult, WriteBatch};
use crate::wallet::addresses::WalletAddresses;

pub use claims::{Credential, CredentialClaims};

/// Connected wallet as recorded at connect time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletSession {
    /// Canonical STX address
    pub address: String,
    /// Normalized provider payload
    #[serde(default)]
    pub addresses: WalletAddresses,
}

impl WalletSession {
    /// Build from normalized addresses. `None` when no STX address resolved.
    pub fn from_addresses(addresses: WalletAddresses) -> Option<Self> {
        let address = addresses.primary_stx()?.to_string();
        Some(Self { address, addresses })
    }
}

/// Marketplace user profile as returned by the backend.
///
/// Both the identify and the verify endpoints return this record, with
/// slightly different field names; the aliases absorb the difference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub user_id: Option<i64>,
    pub username: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, alias = "wallet")]
    pub wallet_address: Option<String>,
    #[serde(default, alias = "creation_time")]
    pub created_at: Option<String>,
}

impl UserProfile {
    /// Display name, falling back to the username.
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(&self.username)
    }
}

/// Everything cached for the current user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub wallet: Option<WalletSession>,
    pub credential: Option<Credential>,
    pub profile: Option<UserProfile>,
}

impl Session {
    /// Credential and profile are both present.
    pub fn has_identity(&self) -> bool {
        self.credential.is_some() && self.profile.is_some()
    }

    pub fn wallet_address(&self) -> Option<&str> {
        self.wallet.as_ref().map(|wallet| wallet.address.as_str())
    }
}

/// Change to a single sub-record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum FieldUpdate<T> {
    /// Leave the stored value untouched
    #[default]
    Keep,
    Set(T),
    Remove,
}

/// Partial session write, applied as one batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionUpdate {
    pub wallet: FieldUpdate<WalletSession>,
    pub credential: FieldUpdate<Credential>,
    pub profile: FieldUpdate<UserProfile>,
}

impl SessionUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_wallet(mut self, wallet: WalletSession) -> Self {
        self.wallet = FieldUpdate::Set(wallet);
        self
    }

    /// Set credential and profile together.
    pub fn with_identity(mut self, credential: Credential, profile: UserProfile) -> Self {
        self.credential = FieldUpdate::Set(credential);
        self.profile = FieldUpdate::Set(profile);
        self
    }

    /// Remove credential and profile together.
    pub fn without_identity(mut self) -> Self {
        self.credential = FieldUpdate::Remove;
        self.profile = FieldUpdate::Remove;
        self
    }

    /// Replace the cached profile, keeping the credential.
    pub fn with_profile(mut self, profile: UserProfile) -> Self {
        self.profile = FieldUpdate::Set(profile);
        self
    }

    fn into_batch(self) -> StoreResult<WriteBatch> {
        let mut batch = WriteBatch::new();
        batch = match self.wallet {
            FieldUpdate::Keep => batch,
            FieldUpdate::Set(wallet) => batch.put(WALLET_SESSION, serde_json::to_string(&wallet)?),
            FieldUpdate::Remove => batch.delete(WALLET_SESSION),
        };
        batch = match self.credential {
            FieldUpdate::Keep => batch,
            FieldUpdate::Set(credential) => batch.put(CREDENTIAL, credential.expose()),
            FieldUpdate::Remove => batch.delete(CREDENTIAL),
        };
        batch = match self.profile {
            FieldUpdate::Keep => batch,
            FieldUpdate::Set(profile) => batch.put(USER_PROFILE, serde_json::to_string(&profile)?),
            FieldUpdate::Remove => batch.delete(USER_PROFILE),
        };
        Ok(batch)
    }
}

/// Session reads and writes over an injected key-value store.
#[derive(Clone)]
pub struct SessionStore {
    store: Arc<dyn KeyValueStore>,
}

impl SessionStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Read the cached session. Never fails.
    pub fn read_session(&self) -> Session {
        match self.try_read() {
            Ok(session) => session,
            Err(e) => {
                tracing::warn!(error = %e, "Session store unreadable; treating as signed out");
                Session::default()
            }
        }
    }

    fn try_read(&self) -> StoreResult<Session> {
        let wallet = self.store.get(WALLET_SESSION)?;
        let credential = self.store.get(CREDENTIAL)?;
        let profile = self.store.get(USER_PROFILE)?;

        // One unreadable sub-record invalidates the whole session
        let wallet = match wallet.map(|raw| parse_logged::<WalletSession>(WALLET_SESSION, &raw)) {
            Some(None) => return Ok(Session::default()),
            Some(Some(wallet)) => Some(wallet).filter(|w| !w.address.trim().is_empty()),
            None => None,
        };
        let profile = match profile.map(|raw| parse_logged::<UserProfile>(USER_PROFILE, &raw)) {
            Some(None) => return Ok(Session::default()),
            Some(profile) => profile,
            None => None,
        };
        let credential = credential.and_then(Credential::new);

        // Half an identity is no identity
        let (credential, profile) = match (credential, profile) {
            (Some(credential), Some(profile)) => (Some(credential), Some(profile)),
            (None, None) => (None, None),
            _ => {
                tracing::debug!("Dropping incomplete cached identity");
                (None, None)
            }
        };

        Ok(Session {
            wallet,
            credential,
            profile,
        })
    }

    /// Merge the given sub-records in one atomic batch.
    pub fn write_session(&self, update: SessionUpdate) -> StoreResult<()> {
        let batch = update.into_batch()?;
        self.store.write_batch(batch)
    }

    /// Remove every session key. Favorites and pending settlements are kept.
    pub fn clear_session(&self) -> StoreResult<()> {
        self.store.clear_keys(&SESSION_KEYS)
    }
}

fn parse_logged<T: for<'de> Deserialize<'de>>(key: &str, raw: &str) -> Option<T> {
    match serde_json::from_str(raw) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!(key = %key, error = %e, "Ignoring unreadable cached entry");
            None
        }
    }
}
