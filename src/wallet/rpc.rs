// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! JSON-RPC 2.0 wallet provider.
//!
//! Talks to a local wallet bridge that relays requests to the browser
//! extension and answers once the user has acted. Prompting calls
//! (`wallet_connect`, `stx_transferStx`) are sent without a timeout.
//!
//! ## Methods
//!
//! | Method | Result |
//! |--------|--------|
//! | `wallet_status` | `{ "signedIn": bool }` |
//! | `wallet_connect` | any; error `4001` when dismissed |
//! | `wallet_userData` | session profile blob or `null` |
//! | `wallet_disconnect` | any |
//! | `getAddresses`, `stx_getAddresses`, `btc_getAddresses` | provider-specific |
//! | `stx_transferStx` | `{ "txid": "0x..." }`; error `4001` when dismissed |

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use uuid::Uuid;

use super::{TransferOutcome, TransferRequest, WalletError, WalletProvider, USER_REJECTED_CODE};

#[derive(Clone)]
pub struct RpcWalletProvider {
    url: String,
    http: Client,
    /// Timeout for calls that don't wait on the user
    request_timeout: Duration,
}

impl RpcWalletProvider {
    pub fn new(url: impl Into<String>, request_timeout: Duration) -> Result<Self, WalletError> {
        let http = Client::builder()
            .build()
            .map_err(|e| WalletError::Transport(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            url: url.into(),
            http,
            request_timeout,
        })
    }

    async fn call(
        &self,
        method: &str,
        params: Value,
        timeout: Option<Duration>,
    ) -> Result<Value, WalletError> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": Uuid::new_v4().to_string(),
            "method": method,
            "params": params,
        });

        let mut request = self.http.post(&self.url).json(&body);
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_connect() {
                WalletError::ProviderNotFound
            } else {
                WalletError::Transport(format!("{method} failed: {e}"))
            }
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(WalletError::Transport(format!(
                "{method} returned {status}: {body}"
            )));
        }

        let envelope: Value = response
            .json()
            .await
            .map_err(|e| WalletError::InvalidResponse(format!("{method} invalid JSON: {e}")))?;

        read_envelope(envelope)
    }
}

/// Split a JSON-RPC response into its result or error.
fn read_envelope(mut envelope: Value) -> Result<Value, WalletError> {
    if let Some(error) = envelope.get("error").filter(|e| !e.is_null()) {
        let code = error.get("code").and_then(Value::as_i64).unwrap_or_default();
        if code == USER_REJECTED_CODE {
            return Err(WalletError::Rejected);
        }
        let message = error
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("unknown error")
            .to_string();
        return Err(WalletError::Rpc { code, message });
    }

    Ok(envelope
        .get_mut("result")
        .map(Value::take)
        .unwrap_or(Value::Null))
}

fn extract_txid(result: &Value) -> Option<String> {
    result
        .as_str()
        .or_else(|| result.get("txid").and_then(Value::as_str))
        .or_else(|| result.get("txId").and_then(Value::as_str))
        .map(str::trim)
        .filter(|txid| !txid.is_empty())
        .map(str::to_string)
}

#[async_trait]
impl WalletProvider for RpcWalletProvider {
    async fn is_available(&self) -> bool {
        !matches!(
            self.call("wallet_status", json!({}), Some(self.request_timeout))
                .await,
            Err(WalletError::ProviderNotFound)
        )
    }

    async fn is_signed_in(&self) -> Result<bool, WalletError> {
        let status = self
            .call("wallet_status", json!({}), Some(self.request_timeout))
            .await?;
        Ok(status
            .get("signedIn")
            .or_else(|| status.get("signed_in"))
            .and_then(Value::as_bool)
            .unwrap_or(false))
    }

    async fn connect(&self) -> Result<(), WalletError> {
        match self
            .call("wallet_connect", json!({ "appName": "ChainGo" }), None)
            .await
        {
            Ok(_) => Ok(()),
            Err(WalletError::Rejected) => Err(WalletError::ConnectionRefused),
            Err(e) => Err(e),
        }
    }

    async fn request(&self, method: &str) -> Result<Value, WalletError> {
        self.call(method, json!({}), Some(self.request_timeout))
            .await
    }

    async fn user_data(&self) -> Result<Option<Value>, WalletError> {
        let data = self
            .call("wallet_userData", json!({}), Some(self.request_timeout))
            .await?;
        Ok((!data.is_null()).then_some(data))
    }

    async fn transfer(&self, request: &TransferRequest) -> Result<TransferOutcome, WalletError> {
        let params = json!({
            "recipient": request.recipient,
            "amount": request.amount_minor.to_string(),
            "memo": request.memo,
            "network": request.network.key(),
        });

        match self.call("stx_transferStx", params, None).await {
            Ok(result) => {
                let transaction_id = extract_txid(&result).ok_or_else(|| {
                    WalletError::InvalidResponse(format!(
                        "stx_transferStx result has no txid: {result}"
                    ))
                })?;
                Ok(TransferOutcome::Completed { transaction_id })
            }
            Err(WalletError::Rejected) => Ok(TransferOutcome::Cancelled),
            Err(e) => Err(e),
        }
    }

    async fn sign_out(&self) -> Result<(), WalletError> {
        self.call("wallet_disconnect", json!({}), Some(self.request_timeout))
            .await
            .map(|_| ())
    }
}
