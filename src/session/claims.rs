// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Bearer credential and the claims it carries.
//!
//! The credential is opaque to the client: only the backend can verify its
//! signature. The claims are still readable, which lets the client skip a
//! verification round-trip for a token that has plainly expired.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Clock skew tolerated when judging expiry locally (seconds).
pub const CLOCK_SKEW_LEEWAY: i64 = 60;

/// Claims embedded in a marketplace credential.
///
/// Every field is optional: the backend owns the format and the client only
/// reads what it finds.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct CredentialClaims {
    /// Backend user id
    #[serde(default)]
    pub user_id: Option<i64>,
    /// Wallet address the credential was issued for
    #[serde(default)]
    pub wallet: Option<String>,
    /// Username at issuance time
    #[serde(default)]
    pub username: Option<String>,
    /// Expiration (Unix timestamp)
    #[serde(default)]
    pub exp: Option<i64>,
}

/// Opaque bearer token issued by the backend.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Credential(String);

impl Credential {
    /// Wrap a raw token. Blank tokens are rejected.
    pub fn new(token: impl Into<String>) -> Option<Self> {
        let token = token.into().trim().to_string();
        if token.is_empty() {
            None
        } else {
            Some(Self(token))
        }
    }

    /// Raw token for the `Authorization` header.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Decode the claims without verifying the signature.
    ///
    /// Returns `None` for tokens that are not JWTs.
    pub fn claims(&self) -> Option<CredentialClaims> {
        jsonwebtoken::dangerous::insecure_decode::<CredentialClaims>(&self.0)
            .ok()
            .map(|data| data.claims)
    }

    /// Whether the embedded `exp` claim has passed at `now`.
    ///
    /// Undecodable tokens and tokens without `exp` are never considered
    /// expired here; the backend decides.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        match self.claims().and_then(|c| c.exp) {
            Some(exp) => exp < now.timestamp() - CLOCK_SKEW_LEEWAY,
            None => false,
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}
