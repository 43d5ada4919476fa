// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! reqwest implementation of the backend client.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

use super::cache::ListingCache;
use super::{
    BackendError, Identity, MarketplaceBackend, NewUser, RegisteredUser, RequestOptions,
    Verification,
};
use crate::chain::{BalanceInfo, IndexerClient};
use crate::session::{Credential, UserProfile};

/// Statuses from `/verify_token` that mean "this credential is no good".
const REJECTED_CREDENTIAL_STATUSES: [u16; 4] = [400, 401, 403, 404];

#[derive(Debug, Deserialize)]
struct IdentifyResponse {
    #[serde(default)]
    status: bool,
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    user: Option<UserProfile>,
}

#[derive(Debug, Deserialize)]
struct VerifyResponse {
    #[serde(default)]
    valid: bool,
    #[serde(default)]
    user: Option<UserProfile>,
}

#[derive(Debug, Deserialize)]
struct WalletResponse {
    #[serde(default)]
    wallet_address: Option<String>,
}

/// HTTP client for the marketplace REST API and the chain indexer.
///
/// Cloning is cheap; clones share the connection pool and the listing cache.
#[derive(Clone)]
pub struct HttpBackendClient {
    base_url: String,
    http: Client,
    indexer: IndexerClient,
    options: RequestOptions,
    listing_cache: Arc<ListingCache>,
}

impl HttpBackendClient {
    pub fn new(
        base_url: impl Into<String>,
        indexer_url: impl Into<String>,
        options: RequestOptions,
    ) -> Result<Self, BackendError> {
        let http = Client::builder()
            .timeout(options.timeout)
            .build()
            .map_err(|e| BackendError::network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            indexer: IndexerClient::new(indexer_url, http.clone()),
            http,
            options,
            listing_cache: Arc::new(ListingCache::default()),
        })
    }

    /// Same client with different timeout / cancellation settings.
    pub fn scoped(&self, options: RequestOptions) -> Self {
        Self {
            options,
            ..self.clone()
        }
    }

    pub fn options(&self) -> &RequestOptions {
        &self.options
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn listing_cache(&self) -> &ListingCache {
        &self.listing_cache
    }

    pub(crate) fn http(&self) -> &Client {
        &self.http
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Run `operation` unless the scope's cancellation token fires first.
    pub(crate) async fn guarded<T, F>(&self, label: &str, operation: F) -> Result<T, BackendError>
    where
        F: Future<Output = Result<T, BackendError>>,
    {
        match &self.options.cancel {
            Some(token) => tokio::select! {
                biased;
                _ = token.cancelled() => Err(BackendError::cancelled(label)),
                result = operation => result,
            },
            None => operation.await,
        }
    }

    /// Send with the scope's timeout. No status check.
    pub(crate) async fn send(
        &self,
        label: &str,
        request: RequestBuilder,
    ) -> Result<Response, BackendError> {
        tracing::debug!(request = %label, "Backend request");
        request
            .timeout(self.options.timeout)
            .send()
            .await
            .map_err(|e| BackendError::from_reqwest(label, e))
    }

    /// Turn a non-success status into a `Status` error.
    pub(crate) async fn check(label: &str, response: Response) -> Result<Response, BackendError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Err(BackendError::status(
            status.as_u16(),
            format!("{label} returned {status}: {}", error_detail(&body)),
        ))
    }

    pub(crate) async fn read_json<T: DeserializeOwned>(
        label: &str,
        response: Response,
    ) -> Result<T, BackendError> {
        response
            .json()
            .await
            .map_err(|e| BackendError::invalid_response(format!("{label} invalid JSON: {e}")))
    }

    /// Send, require success, decode JSON.
    pub(crate) async fn fetch_json<T: DeserializeOwned>(
        &self,
        label: &str,
        request: RequestBuilder,
    ) -> Result<T, BackendError> {
        let response = self.send(label, request).await?;
        let response = Self::check(label, response).await?;
        Self::read_json(label, response).await
    }
}

/// FastAPI puts the human-readable reason in `detail`.
fn error_detail(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| value.get("detail").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| body.to_string())
}

#[async_trait]
impl MarketplaceBackend for HttpBackendClient {
    async fn identify_by_wallet(&self, address: &str) -> Result<Identity, BackendError> {
        let label = "POST /is_exists_user";
        self.guarded(label, async {
            let request = self
                .http
                .post(self.url("/is_exists_user"))
                .json(&json!({ "wallet_address": address }));
            let body: IdentifyResponse = self.fetch_json(label, request).await?;

            Ok(Identity {
                exists: body.status,
                credential: body.token.and_then(Credential::new),
                profile: body.user,
            })
        })
        .await
    }

    async fn verify_credential(
        &self,
        credential: &Credential,
    ) -> Result<Verification, BackendError> {
        let label = "POST /verify_token";
        self.guarded(label, async {
            let request = self
                .http
                .post(self.url("/verify_token"))
                .bearer_auth(credential.expose())
                .json(&json!({ "token": credential.expose() }));
            let response = self.send(label, request).await?;

            let status = response.status().as_u16();
            if REJECTED_CREDENTIAL_STATUSES.contains(&status) {
                tracing::debug!(status, "Backend rejected credential");
                return Ok(Verification::invalid());
            }

            let response = Self::check(label, response).await?;
            let body: VerifyResponse = Self::read_json(label, response).await?;
            if !body.valid {
                return Ok(Verification::invalid());
            }
            Ok(Verification {
                valid: true,
                profile: body.user,
            })
        })
        .await
    }

    async fn register_user(&self, user: &NewUser) -> Result<RegisteredUser, BackendError> {
        let label = "POST /create_new_user";
        self.guarded(label, async {
            let request = self.http.post(self.url("/create_new_user")).json(user);
            let registered: RegisteredUser = self.fetch_json(label, request).await?;
            tracing::info!(username = %user.username, user_id = ?registered.user_id, "Registered user");
            Ok(registered)
        })
        .await
    }

    async fn fetch_balance(&self, address: &str) -> Result<BalanceInfo, BackendError> {
        self.guarded("GET balances", async {
            self.indexer
                .fetch_balance(address, self.options.timeout)
                .await
                .map_err(BackendError::from)
        })
        .await
    }

    async fn resolve_seller_wallet(&self, username: &str) -> Result<Option<String>, BackendError> {
        let label = "GET /get_user_wallet";
        self.guarded(label, async {
            let request = self
                .http
                .get(self.url("/get_user_wallet"))
                .query(&[("username", username)]);
            let response = self.send(label, request).await?;
            if response.status() == reqwest::StatusCode::NOT_FOUND {
                return Ok(None);
            }

            let response = Self::check(label, response).await?;
            let body: WalletResponse = Self::read_json(label, response).await?;
            Ok(body
                .wallet_address
                .map(|address| address.trim().to_string())
                .filter(|address| !address.is_empty()))
        })
        .await
    }

    async fn settle_purchase(
        &self,
        listing_id: i64,
        buyer_username: &str,
        transaction_id: &str,
    ) -> Result<(), BackendError> {
        let label = "POST /complete_purchase";
        self.guarded(label, async {
            let request = self.http.post(self.url("/complete_purchase")).json(&json!({
                "listing_id": listing_id,
                "buyer_username": buyer_username,
                "txid": transaction_id,
            }));
            let response = self.send(label, request).await?;
            Self::check(label, response).await?;

            self.listing_cache.invalidate_all();
            tracing::info!(listing_id, transaction_id = %transaction_id, "Purchase settled");
            Ok(())
        })
        .await
    }
}
