// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Embedded key-value database backed by redb (pure Rust, ACID).
//!
//! ## Table Layout
//!
//! - `client_state`: key → JSON document (UTF-8)

use std::path::Path;

use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};

use super::{KeyValueStore, StoreResult, WriteBatch};

/// Single table holding every persisted client document.
const CLIENT_STATE: TableDefinition<&str, &str> = TableDefinition::new("client_state");

/// File name used inside the data directory.
pub const DEFAULT_DB_FILE: &str = "client.redb";

/// Durable store on a redb database file.
pub struct RedbStore {
    db: Database,
}

impl RedbStore {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = Database::create(path)?;

        // Pre-create the table so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(CLIENT_STATE)?;
        }
        write_txn.commit()?;

        tracing::debug!(path = %path.display(), "Opened client state database");
        Ok(Self { db })
    }

    /// Open `client.redb` inside a data directory.
    pub fn open_in_dir(dir: &Path) -> StoreResult<Self> {
        Self::open(&dir.join(DEFAULT_DB_FILE))
    }
}

impl KeyValueStore for RedbStore {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(CLIENT_STATE)?;
        Ok(table.get(key)?.map(|value| value.value().to_string()))
    }

    fn write_batch(&self, batch: WriteBatch) -> StoreResult<()> {
        if batch.is_empty() {
            return Ok(());
        }

        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(CLIENT_STATE)?;
            for (key, value) in batch.ops() {
                match value {
                    Some(value) => {
                        table.insert(key.as_str(), value.as_str())?;
                    }
                    None => {
                        table.remove(key.as_str())?;
                    }
                }
            }
        }
        write_txn.commit()?;
        Ok(())
    }
}
