// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Local Key-Value Storage
//!
//! Everything the client persists between runs (wallet session, bearer
//! credential, profile, favorites, pending settlements) lives in a flat
//! string-to-string key-value store. Values are JSON documents owned by the
//! layer above; this module never interprets them.
//!
//! ## Backends
//!
//! - [`MemoryStore`] - process-local map, used by tests and ephemeral runs
//! - [`RedbStore`] - embedded redb database on disk (pure Rust, ACID)
//!
//! ## Key Layout
//!
//! ```text
//! wallet_session        # connected address + normalized provider payload
//! jwt_token             # bearer credential issued by the backend
//! user_info             # profile returned with the credential
//! chaingo_favorites     # favorites set (JSON array)
//! pending_settlements   # paid-but-unsettled purchases (JSON array)
//! ```

pub mod keys;
pub mod kv_database;
pub mod memory;

pub use kv_database::RedbStore;
pub use memory::MemoryStore;

/// Error type for key-value store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store lock poisoned")]
    Poisoned,
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// A set of puts and deletes applied as one unit.
///
/// Backends must apply every operation of a batch or none of them, so that
/// related keys (credential and profile) never diverge.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteBatch {
    ops: Vec<(String, Option<String>)>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a value write.
    pub fn put(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.ops.push((key.into(), Some(value.into())));
        self
    }

    /// Queue a key removal.
    pub fn delete(mut self, key: impl Into<String>) -> Self {
        self.ops.push((key.into(), None));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Operations in insertion order; `None` means delete.
    pub fn ops(&self) -> &[(String, Option<String>)] {
        &self.ops
    }
}

/// Synchronous key-value store shared by the session, favorites and ledger
/// layers.
pub trait KeyValueStore: Send + Sync {
    /// Read a raw value. Absence is `Ok(None)`.
    fn get(&self, key: &str) -> StoreResult<Option<String>>;

    /// Apply a batch atomically.
    fn write_batch(&self, batch: WriteBatch) -> StoreResult<()>;

    /// Write a single value.
    fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        self.write_batch(WriteBatch::new().put(key, value))
    }

    /// Remove a single key. Removing an absent key is not an error.
    fn remove(&self, key: &str) -> StoreResult<()> {
        self.write_batch(WriteBatch::new().delete(key))
    }

    /// Remove several keys in one batch.
    fn clear_keys(&self, keys: &[&str]) -> StoreResult<()> {
        let batch = keys
            .iter()
            .fold(WriteBatch::new(), |batch, key| batch.delete(*key));
        self.write_batch(batch)
    }
}
