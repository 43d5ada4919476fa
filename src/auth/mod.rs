// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Wallet-based sign-in for the marketplace.
//!
//! ## Auth Flow
//!
//! 1. The wallet connects and yields a canonical STX address
//! 2. The backend is asked whether that address belongs to a user
//!    (`POST /is_exists_user`):
//!    - known: it returns a bearer credential and the profile, and the
//!      client stores wallet, credential and profile in one batch
//!    - unknown: the client stores only the wallet and points the caller at
//!      registration (`POST /create_new_user`)
//! 3. On every status check the credential is re-verified
//!    (`POST /verify_token`) and the fresh profile replaces the cached one
//!
//! ## Invariants
//!
//! - Credential and profile are always written and cleared together
//! - A failed login or registration writes nothing
//! - An explicitly rejected credential clears the whole session
//! - Locally expired credentials (60 s leeway) are rejected without a
//!   network round-trip

pub mod error;
pub mod gate;

pub use error::AuthError;
pub use gate::{AuthGate, AuthState, LoginOutcome};
