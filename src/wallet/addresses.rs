// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Address response normalization.
//!
//! Wallet providers have shipped several response shapes over time:
//!
//! | Source | Shape |
//! |--------|-------|
//! | `getAddresses` | `{ result: { stx: [...], btc: [...] } }`, `{ addresses: ... }`, bare, or a symbol-tagged list |
//! | `stx_getAddresses` / `btc_getAddresses` | flat array, or wrapped in `result` / `addresses` |
//! | session user data | `profile.stxAddress`, `profile.stx_address` or `identityAddress` |
//!
//! Individual entries are equally loose: a plain string, `{ address: ... }`,
//! or a per-network map `{ testnet: "ST...", mainnet: "SP..." }`. All of them
//! reduce to one string per entry through [`RawAddress::pick`].

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::chain::Network;

/// Key preferred in a per-network map when the configured key is missing.
const FALLBACK_NETWORK_KEY: &str = "testnet";

/// One address entry as the provider sent it.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RawAddress {
    /// `"ST..."`
    Plain(String),
    /// `{ "address": <entry>, ...extra fields }`
    Nested { address: Box<RawAddress> },
    /// `{ "testnet": "ST...", "mainnet": "SP..." }`
    PerNetwork(Map<String, Value>),
}

impl RawAddress {
    /// Parse a loose JSON value. Unusable values (numbers, null, ...) yield `None`.
    pub fn from_value(value: &Value) -> Option<Self> {
        serde_json::from_value(value.clone()).ok()
    }

    /// Reduce to a single address string.
    ///
    /// Per-network maps prefer the configured network, then `testnet`, then the
    /// first string value in the order the provider sent. Blank results are `None`.
    pub fn pick(&self, network: Network) -> Option<String> {
        let picked = match self {
            RawAddress::Plain(address) => Some(address.as_str()),
            RawAddress::Nested { address } => return address.pick(network),
            RawAddress::PerNetwork(map) => map
                .get(network.key())
                .and_then(Value::as_str)
                .or_else(|| map.get(FALLBACK_NETWORK_KEY).and_then(Value::as_str))
                .or_else(|| map.values().find_map(Value::as_str)),
        };

        picked
            .map(str::trim)
            .filter(|address| !address.is_empty())
            .map(str::to_string)
    }
}

/// The three response shapes a provider can answer with.
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderAddresses {
    /// Structured multi-address response (`getAddresses`).
    MultiCall {
        stx: Vec<RawAddress>,
        btc: Vec<RawAddress>,
    },
    /// Legacy per-chain calls (`stx_getAddresses`, `btc_getAddresses`).
    Legacy {
        stx: Vec<RawAddress>,
        btc: Vec<RawAddress>,
    },
    /// Single STX address derived from the stored sign-in session.
    SessionDerived(RawAddress),
}

impl ProviderAddresses {
    /// Interpret a `getAddresses` response.
    pub fn from_multi_call(response: &Value) -> Self {
        let payload = unwrap_envelope(response);

        if payload.get("stx").is_some() || payload.get("btc").is_some() {
            return ProviderAddresses::MultiCall {
                stx: entries(payload.get("stx")),
                btc: entries(payload.get("btc")),
            };
        }

        // Symbol-tagged list: [{ symbol: "STX", address: ... }, ...]
        let tagged = payload
            .as_array()
            .or_else(|| payload.get("addresses").and_then(Value::as_array));
        let mut stx = Vec::new();
        let mut btc = Vec::new();
        for entry in tagged.into_iter().flatten() {
            let symbol = entry
                .get("symbol")
                .and_then(Value::as_str)
                .map(str::to_ascii_uppercase);
            let Some(raw) = RawAddress::from_value(entry) else {
                continue;
            };
            match symbol.as_deref() {
                Some("STX") => stx.push(raw),
                Some("BTC") => btc.push(raw),
                _ => {}
            }
        }
        ProviderAddresses::MultiCall { stx, btc }
    }

    /// Interpret the pair of legacy responses. Either may be missing.
    pub fn from_legacy(stx_response: Option<&Value>, btc_response: Option<&Value>) -> Self {
        ProviderAddresses::Legacy {
            stx: stx_response.map(legacy_entries).unwrap_or_default(),
            btc: btc_response.map(legacy_entries).unwrap_or_default(),
        }
    }

    /// Derive the STX address from session user data.
    pub fn from_user_data(user_data: &Value) -> Option<Self> {
        ["/profile/stxAddress", "/profile/stx_address", "/identityAddress"]
            .iter()
            .filter_map(|pointer| user_data.pointer(pointer))
            .find(|value| !value.is_null())
            .and_then(RawAddress::from_value)
            .map(ProviderAddresses::SessionDerived)
    }

    /// Reduce to the canonical shape.
    pub fn normalize(&self, network: Network) -> WalletAddresses {
        let pick_all = |raw: &[RawAddress]| -> Vec<String> {
            raw.iter().filter_map(|entry| entry.pick(network)).collect()
        };

        match self {
            ProviderAddresses::MultiCall { stx, btc } | ProviderAddresses::Legacy { stx, btc } => {
                WalletAddresses {
                    stx: pick_all(stx),
                    btc: pick_all(btc),
                }
            }
            ProviderAddresses::SessionDerived(raw) => WalletAddresses {
                stx: raw.pick(network).into_iter().collect(),
                btc: Vec::new(),
            },
        }
    }
}

/// Canonical address set: one string per entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletAddresses {
    #[serde(default)]
    pub stx: Vec<String>,
    #[serde(default)]
    pub btc: Vec<String>,
}

impl WalletAddresses {
    pub fn is_empty(&self) -> bool {
        self.stx.is_empty() && self.btc.is_empty()
    }

    /// Address used for identity and payments.
    pub fn primary_stx(&self) -> Option<&str> {
        self.stx.first().map(String::as_str)
    }
}

/// Strip `result` / `addresses` envelopes when they hold an object.
fn unwrap_envelope(response: &Value) -> &Value {
    if let Some(result) = response.get("result") {
        return result;
    }
    match response.get("addresses") {
        Some(inner) if inner.is_object() => inner,
        _ => response,
    }
}

fn entries(value: Option<&Value>) -> Vec<RawAddress> {
    value
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(RawAddress::from_value).collect())
        .unwrap_or_default()
}

fn legacy_entries(response: &Value) -> Vec<RawAddress> {
    if response.is_array() {
        return entries(Some(response));
    }
    entries(
        response
            .get("result")
            .or_else(|| response.get("addresses")),
    )
}
