// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Pending-settlement ledger.
//!
//! When the chain transfer succeeds but the backend never learns about it,
//! the purchase is recorded here so it can be settled by hand later. Records
//! are only removed by a successful manual settlement.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::storage::keys::PENDING_SETTLEMENTS;
use crate::storage::{KeyValueStore, StoreResult};

/// A paid purchase the backend has not settled.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PendingSettlement {
    /// Unique record ID
    pub record_id: Uuid,
    pub listing_id: i64,
    pub buyer_username: String,
    pub seller_username: String,
    /// Chain transaction ID of the completed transfer
    pub transaction_id: String,
    /// Amount paid, micro-STX
    pub amount_minor: u64,
    pub recorded_at: DateTime<Utc>,
    /// Most recent settlement error
    pub last_error: Option<String>,
}

impl PendingSettlement {
    pub fn new(
        listing_id: i64,
        buyer_username: impl Into<String>,
        seller_username: impl Into<String>,
        transaction_id: impl Into<String>,
        amount_minor: u64,
    ) -> Self {
        Self {
            record_id: Uuid::new_v4(),
            listing_id,
            buyer_username: buyer_username.into(),
            seller_username: seller_username.into(),
            transaction_id: transaction_id.into(),
            amount_minor,
            recorded_at: Utc::now(),
            last_error: None,
        }
    }

    /// Attach the settlement error.
    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.last_error = Some(error.into());
        self
    }
}

/// Durable list of pending settlements.
///
/// Unlike favorites, an unreadable ledger is an error: treating it as empty
/// would overwrite the records on the next append.
#[derive(Clone)]
pub struct SettlementLedger {
    store: Arc<dyn KeyValueStore>,
}

impl SettlementLedger {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// All records, oldest first.
    pub fn list(&self) -> StoreResult<Vec<PendingSettlement>> {
        match self.store.get(PENDING_SETTLEMENTS)? {
            Some(raw) => Ok(serde_json::from_str(&raw)?),
            None => Ok(Vec::new()),
        }
    }

    pub fn get(&self, record_id: Uuid) -> StoreResult<Option<PendingSettlement>> {
        Ok(self
            .list()?
            .into_iter()
            .find(|record| record.record_id == record_id))
    }

    /// Append a record.
    pub fn record(&self, settlement: &PendingSettlement) -> StoreResult<()> {
        let mut records = self.list()?;
        records.push(settlement.clone());
        self.save(&records)?;

        tracing::warn!(
            record_id = %settlement.record_id,
            listing_id = settlement.listing_id,
            transaction_id = %settlement.transaction_id,
            "Recorded pending settlement"
        );
        Ok(())
    }

    /// Replace the last error of a record. Returns `false` if absent.
    pub fn update_error(&self, record_id: Uuid, error: impl Into<String>) -> StoreResult<bool> {
        let mut records = self.list()?;
        let Some(record) = records.iter_mut().find(|r| r.record_id == record_id) else {
            return Ok(false);
        };
        record.last_error = Some(error.into());
        self.save(&records)?;
        Ok(true)
    }

    /// Remove a record. Returns `false` if absent.
    pub fn remove(&self, record_id: Uuid) -> StoreResult<bool> {
        let records = self.list()?;
        let before = records.len();
        let remaining: Vec<_> = records
            .into_iter()
            .filter(|record| record.record_id != record_id)
            .collect();
        if remaining.len() == before {
            return Ok(false);
        }
        self.save(&remaining)?;
        Ok(true)
    }

    fn save(&self, records: &[PendingSettlement]) -> StoreResult<()> {
        let raw = serde_json::to_string(records)?;
        self.store.set(PENDING_SETTLEMENTS, &raw)
    }
}
