// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Chain indexer client (Hiro API).
//!
//! Only the STX balance endpoint is used:
//! `GET {indexer}/extended/v1/address/{address}/balances`.

use std::time::Duration;

use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use url::Url;

use super::units::{format_stx, MICRO_STX_PER_STX};

#[derive(Debug, thiserror::Error)]
pub enum IndexerError {
    #[error("Indexer request failed: {0}")]
    Request(String),

    #[error("Indexer request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Indexer returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Indexer response was invalid: {0}")]
    InvalidResponse(String),

    #[error("Indexer response has no stx.balance field")]
    BalanceFieldMissing,
}

/// STX balance of one address, in micro-STX.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BalanceInfo {
    pub address: String,
    pub balance_minor: u128,
    pub locked_minor: u128,
}

impl BalanceInfo {
    /// Balance in STX.
    pub fn balance_stx(&self) -> f64 {
        self.balance_minor as f64 / MICRO_STX_PER_STX as f64
    }

    /// Human-readable balance, e.g. `12.5 STX`.
    pub fn formatted(&self) -> String {
        format!("{} STX", format_stx(self.balance_minor))
    }
}

#[derive(Clone)]
pub struct IndexerClient {
    base_url: String,
    http: Client,
}

impl IndexerClient {
    pub fn new(base_url: impl Into<String>, http: Client) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Balances endpoint for `address`, which is sent as one encoded path segment.
    pub(crate) fn balances_url(&self, address: &str) -> Result<Url, IndexerError> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| IndexerError::Request(format!("invalid indexer URL: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| IndexerError::Request(format!("indexer URL cannot take a path: {}", self.base_url)))?
            .pop_if_empty()
            .extend(["extended", "v1", "address"])
            .push(address)
            .push("balances");
        Ok(url)
    }

    /// Fetch the STX balance of `address`.
    pub async fn fetch_balance(
        &self,
        address: &str,
        timeout: Duration,
    ) -> Result<BalanceInfo, IndexerError> {
        let url = self.balances_url(address)?;
        tracing::debug!(address = %address, "Fetching STX balance");

        let response = self
            .http
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    IndexerError::Timeout(timeout)
                } else {
                    IndexerError::Request(format!("GET balances failed: {e}"))
                }
            })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(IndexerError::Status { status, body });
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| IndexerError::InvalidResponse(format!("invalid JSON: {e}")))?;

        parse_balances(address, &body)
    }
}

/// Extract the STX balance from a balances document.
pub(crate) fn parse_balances(address: &str, body: &Value) -> Result<BalanceInfo, IndexerError> {
    let balance = body
        .pointer("/stx/balance")
        .filter(|value| !value.is_null())
        .ok_or(IndexerError::BalanceFieldMissing)?;
    let balance_minor = parse_minor(balance)
        .ok_or_else(|| IndexerError::InvalidResponse(format!("stx.balance is not an amount: {balance}")))?;

    let locked_minor = body
        .pointer("/stx/locked")
        .and_then(parse_minor)
        .unwrap_or_default();

    Ok(BalanceInfo {
        address: address.to_string(),
        balance_minor,
        locked_minor,
    })
}

fn parse_minor(value: &Value) -> Option<u128> {
    match value {
        Value::String(s) => s.trim().parse().ok(),
        Value::Number(n) => n.as_u64().map(u128::from),
        _ => None,
    }
}
