// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Key names for the local key-value store.
//!
//! The names match the browser storage keys of the web frontend so that an
//! exported storage snapshot can be loaded unchanged.

/// Connected wallet address and normalized provider payload.
pub const WALLET_SESSION: &str = "wallet_session";

/// Bearer credential issued after identity resolution.
pub const CREDENTIAL: &str = "jwt_token";

/// User profile cached alongside the credential.
pub const USER_PROFILE: &str = "user_info";

/// Favorites set.
pub const FAVORITES: &str = "chaingo_favorites";

/// Paid-but-unsettled purchases awaiting manual follow-up.
pub const PENDING_SETTLEMENTS: &str = "pending_settlements";

/// Every key owned by the session. Clearing the session removes exactly these.
pub const SESSION_KEYS: [&str; 3] = [WALLET_SESSION, CREDENTIAL, USER_PROFILE];
