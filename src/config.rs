// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Configuration is read from the environment once at startup. Values are
//! trimmed and an empty variable counts as unset.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `CHAINGO_API_BASE_URL` | Marketplace backend base URL | `https://hackback.hackstack.com.tr` |
//! | `STACKS_NETWORK` | `mainnet` or `testnet` | `testnet` |
//! | `CHAINGO_INDEXER_URL` | Chain indexer base URL | Hiro API for the network |
//! | `CHAINGO_WALLET_RPC_URL` | Wallet bridge JSON-RPC endpoint | `http://127.0.0.1:5757` |
//! | `CHAINGO_DATA_DIR` | Directory holding the local store | `./.chaingo` |
//! | `CHAINGO_HTTP_TIMEOUT_SECS` | Backend request timeout | `15` |
//! | `CHAINGO_POPUP_WARNING_SECS` | Delay before the blocked-popup hint | `3` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,chaingo_client=debug` |

use std::path::PathBuf;
use std::time::Duration;

use url::Url;

use crate::chain::Network;

pub const API_BASE_URL_ENV: &str = "CHAINGO_API_BASE_URL";
pub const NETWORK_ENV: &str = "STACKS_NETWORK";
pub const INDEXER_URL_ENV: &str = "CHAINGO_INDEXER_URL";
pub const WALLET_RPC_URL_ENV: &str = "CHAINGO_WALLET_RPC_URL";
pub const DATA_DIR_ENV: &str = "CHAINGO_DATA_DIR";
pub const HTTP_TIMEOUT_ENV: &str = "CHAINGO_HTTP_TIMEOUT_SECS";
pub const POPUP_WARNING_ENV: &str = "CHAINGO_POPUP_WARNING_SECS";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

pub const DEFAULT_API_BASE_URL: &str = "https://hackback.hackstack.com.tr";
pub const DEFAULT_WALLET_RPC_URL: &str = "http://127.0.0.1:5757";
pub const DEFAULT_DATA_DIR: &str = "./.chaingo";
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 15;
pub const DEFAULT_POPUP_WARNING_SECS: u64 = 3;

/// Default tracing filter when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "info,chaingo_client=debug";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{name} is not a valid URL: {value}")]
    InvalidUrl { name: &'static str, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    Json,
    #[default]
    Pretty,
}

impl LogFormat {
    /// Read `LOG_FORMAT` on its own, so tracing can be installed before the
    /// rest of the configuration is loaded and can report on it.
    pub fn from_env() -> Self {
        Self::from_value(std::env::var(LOG_FORMAT_ENV).ok().as_deref()).unwrap_or_default()
    }

    /// `None` for unknown values. Unset or blank is the default.
    pub fn from_value(raw: Option<&str>) -> Option<Self> {
        match raw.map(str::trim).filter(|v| !v.is_empty()) {
            None => Some(LogFormat::default()),
            Some(v) if v.eq_ignore_ascii_case("json") => Some(LogFormat::Json),
            Some(v) if v.eq_ignore_ascii_case("pretty") => Some(LogFormat::Pretty),
            Some(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub api_base_url: String,
    pub network: Network,
    pub indexer_url: String,
    pub wallet_rpc_url: String,
    pub data_dir: PathBuf,
    pub http_timeout: Duration,
    pub popup_warning: Duration,
    pub log_format: LogFormat,
}

impl ClientConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let network = match get(NETWORK_ENV) {
            Some(raw) => raw.parse().unwrap_or_else(|e: String| {
                tracing::warn!(value = %raw, error = %e, "Invalid STACKS_NETWORK; using testnet");
                Network::default()
            }),
            None => Network::default(),
        };

        let api_base_url = checked_url(
            API_BASE_URL_ENV,
            get(API_BASE_URL_ENV).unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string()),
        )?;
        let indexer_url = checked_url(
            INDEXER_URL_ENV,
            get(INDEXER_URL_ENV).unwrap_or_else(|| network.config().indexer_url.to_string()),
        )?;
        let wallet_rpc_url = checked_url(
            WALLET_RPC_URL_ENV,
            get(WALLET_RPC_URL_ENV).unwrap_or_else(|| DEFAULT_WALLET_RPC_URL.to_string()),
        )?;

        let raw_format = get(LOG_FORMAT_ENV);
        let log_format = LogFormat::from_value(raw_format.as_deref()).unwrap_or_else(|| {
            tracing::warn!(value = ?raw_format, "Unknown LOG_FORMAT; using pretty");
            LogFormat::Pretty
        });

        Ok(Self {
            api_base_url,
            network,
            indexer_url,
            wallet_rpc_url,
            data_dir: PathBuf::from(
                get(DATA_DIR_ENV).unwrap_or_else(|| DEFAULT_DATA_DIR.to_string()),
            ),
            http_timeout: seconds(HTTP_TIMEOUT_ENV, get(HTTP_TIMEOUT_ENV), DEFAULT_HTTP_TIMEOUT_SECS),
            popup_warning: seconds(
                POPUP_WARNING_ENV,
                get(POPUP_WARNING_ENV),
                DEFAULT_POPUP_WARNING_SECS,
            ),
            log_format,
        })
    }
}

/// Validate a URL and strip trailing slashes.
fn checked_url(name: &'static str, value: String) -> Result<String, ConfigError> {
    match Url::parse(&value) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => {
            Ok(value.trim_end_matches('/').to_string())
        }
        _ => Err(ConfigError::InvalidUrl { name, value }),
    }
}

/// Positive whole seconds, else the default.
fn seconds(name: &str, raw: Option<String>, default: u64) -> Duration {
    let Some(raw) = raw else {
        return Duration::from_secs(default);
    };
    match raw.parse::<u64>() {
        Ok(secs) if secs > 0 => Duration::from_secs(secs),
        _ => {
            tracing::warn!(variable = %name, value = %raw, default, "Invalid duration; using default");
            Duration::from_secs(default)
        }
    }
}
