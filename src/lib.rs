// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! ChainGo Client - Wallet-Authenticated Marketplace Core
//!
//! Client-side core of the ChainGo peer-to-peer marketplace: local session
//! caches, wallet connection, backend access, authentication, and the STX
//! purchase and settlement flow.
//!
//! ## Modules
//!
//! - `storage` - key-value store (redb on disk, in-memory for tests)
//! - `session` - cached wallet session, credential and profile
//! - `favorites` - locally saved listings
//! - `chain` - Stacks networks, units and the balance indexer
//! - `wallet` - wallet provider abstraction and connector
//! - `backend` - marketplace REST client
//! - `auth` - login, registration and session verification
//! - `purchase` - purchase orchestration and the settlement ledger

pub mod auth;
pub mod backend;
pub mod chain;
pub mod config;
pub mod error;
pub mod favorites;
pub mod purchase;
pub mod session;
pub mod storage;
pub mod wallet;

#[cfg(test)]
pub(crate) mod test_support;
