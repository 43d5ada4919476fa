// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Stacks chain integration.
//!
//! This module provides:
//! - Network configuration (mainnet / testnet endpoints)
//! - Conversion between micro-STX (minor unit) and STX (major unit)
//! - The chain-indexer balance client

pub mod indexer;
pub mod units;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub use indexer::{BalanceInfo, IndexerClient, IndexerError};
pub use units::{format_stx, stx_to_micro, MICRO_STX_PER_STX};

/// Stacks network configuration.
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// Network name for display
    pub name: &'static str,
    /// Hiro indexer API base URL
    pub indexer_url: &'static str,
    /// Block explorer URL
    pub explorer_url: &'static str,
    /// Explorer `chain` query value
    pub explorer_chain: &'static str,
}

/// Stacks Mainnet configuration.
pub const STACKS_MAINNET: NetworkConfig = NetworkConfig {
    name: "Stacks Mainnet",
    indexer_url: "https://api.hiro.so",
    explorer_url: "https://explorer.hiro.so",
    explorer_chain: "mainnet",
};

/// Stacks Testnet configuration.
pub const STACKS_TESTNET: NetworkConfig = NetworkConfig {
    name: "Stacks Testnet",
    indexer_url: "https://api.testnet.hiro.so",
    explorer_url: "https://explorer.hiro.so",
    explorer_chain: "testnet",
};

/// Network the client transacts on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Mainnet,
    #[default]
    Testnet,
}

impl Network {
    /// Key used by providers in per-network address maps and transfer params.
    pub fn key(self) -> &'static str {
        match self {
            Network::Mainnet => "mainnet",
            Network::Testnet => "testnet",
        }
    }

    pub fn config(self) -> &'static NetworkConfig {
        match self {
            Network::Mainnet => &STACKS_MAINNET,
            Network::Testnet => &STACKS_TESTNET,
        }
    }

    /// Explorer link for a transaction id.
    pub fn explorer_tx_url(self, transaction_id: &str) -> String {
        let config = self.config();
        format!(
            "{}/txid/{}?chain={}",
            config.explorer_url, transaction_id, config.explorer_chain
        )
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Network {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "mainnet" => Ok(Network::Mainnet),
            "testnet" => Ok(Network::Testnet),
            other => Err(format!(
                "Unsupported network `{other}` (expected `mainnet` or `testnet`)"
            )),
        }
    }
}
