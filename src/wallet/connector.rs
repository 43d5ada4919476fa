// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Wallet connector.

use std::sync::Arc;

use serde_json::Value;

use super::addresses::{ProviderAddresses, WalletAddresses};
use super::{TransferOutcome, TransferRequest, WalletError, WalletProvider};
use crate::chain::Network;
use crate::session::SessionStore;

/// Connector over a wallet provider.
///
/// A provider that misbehaves while answering `is_signed_in` is treated as
/// signed out, and both the provider session and the local session are
/// cleared so the next connect starts clean.
#[derive(Clone)]
pub struct WalletConnector {
    provider: Arc<dyn WalletProvider>,
    sessions: SessionStore,
    network: Network,
}

impl WalletConnector {
    pub fn new(provider: Arc<dyn WalletProvider>, sessions: SessionStore, network: Network) -> Self {
        Self {
            provider,
            sessions,
            network,
        }
    }

    pub fn network(&self) -> Network {
        self.network
    }

    /// Whether the provider reports an approved session.
    pub async fn is_connected(&self) -> bool {
        match self.provider.is_signed_in().await {
            Ok(signed_in) => signed_in,
            Err(e) => {
                tracing::warn!(error = %e, "Wallet session check failed; clearing sessions");
                if let Err(e) = self.provider.sign_out().await {
                    tracing::debug!(error = %e, "Provider sign-out after failed check also failed");
                }
                if let Err(e) = self.sessions.clear_session() {
                    tracing::warn!(error = %e, "Failed to clear local session");
                }
                false
            }
        }
    }

    /// Connect and resolve the wallet's addresses.
    ///
    /// Prompts only when the provider is not already signed in.
    pub async fn connect(&self) -> Result<WalletAddresses, WalletError> {
        if !self.provider.is_available().await {
            return Err(WalletError::ProviderNotFound);
        }

        if !self.is_connected().await {
            tracing::info!("Requesting wallet connection");
            self.provider.connect().await.map_err(|e| match e {
                WalletError::Rejected => WalletError::ConnectionRefused,
                other => other,
            })?;
        }

        let addresses = self.get_addresses().await.ok_or(WalletError::NoAddresses)?;
        tracing::info!(
            stx = addresses.stx.len(),
            btc = addresses.btc.len(),
            "Wallet connected"
        );
        Ok(addresses)
    }

    /// Resolve addresses, trying each provider response shape in turn.
    ///
    /// Order: structured `getAddresses`, legacy per-chain calls, then the
    /// address derived from session user data. A strategy that errors or
    /// yields nothing falls through to the next.
    pub async fn get_addresses(&self) -> Option<WalletAddresses> {
        match self.provider.request("getAddresses").await {
            Ok(response) => {
                let addresses = ProviderAddresses::from_multi_call(&response).normalize(self.network);
                if !addresses.is_empty() {
                    return Some(addresses);
                }
                tracing::debug!("getAddresses returned no addresses; trying legacy calls");
            }
            Err(e) => tracing::debug!(error = %e, "getAddresses failed; trying legacy calls"),
        }

        let stx = self.request_logged("stx_getAddresses").await;
        let btc = self.request_logged("btc_getAddresses").await;
        if stx.is_some() || btc.is_some() {
            let addresses =
                ProviderAddresses::from_legacy(stx.as_ref(), btc.as_ref()).normalize(self.network);
            if !addresses.is_empty() {
                return Some(addresses);
            }
        }

        match self.provider.user_data().await {
            Ok(Some(user_data)) => ProviderAddresses::from_user_data(&user_data)
                .map(|derived| derived.normalize(self.network))
                .filter(|addresses| !addresses.is_empty()),
            Ok(None) => None,
            Err(e) => {
                tracing::debug!(error = %e, "Session user data unavailable");
                None
            }
        }
    }

    /// Ask the wallet to sign an STX transfer. May wait indefinitely.
    pub async fn request_value_transfer(
        &self,
        recipient: &str,
        amount_minor: u64,
        memo: &str,
    ) -> Result<TransferOutcome, WalletError> {
        let request = TransferRequest {
            recipient: recipient.to_string(),
            amount_minor,
            memo: memo.to_string(),
            network: self.network,
        };
        tracing::info!(
            recipient = %recipient,
            amount_minor,
            network = %self.network,
            "Requesting STX transfer signature"
        );
        self.provider.transfer(&request).await
    }

    /// Provider sign-out. Failures are logged and ignored.
    pub async fn disconnect(&self) {
        if let Err(e) = self.provider.sign_out().await {
            tracing::warn!(error = %e, "Wallet sign-out failed");
        }
    }

    async fn request_logged(&self, method: &str) -> Option<Value> {
        match self.provider.request(method).await {
            Ok(response) => Some(response),
            Err(e) => {
                tracing::debug!(method = %method, error = %e, "Address request failed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{Credential, SessionUpdate, UserProfile, WalletSession};
    use crate::storage::MemoryStore;
    use crate::test_support::{MockWallet, ST};
    use serde_json::json;

    fn connector(wallet: Arc<MockWallet>) -> (SessionStore, WalletConnector) {
        let sessions = SessionStore::new(Arc::new(MemoryStore::new()));
        let connector = WalletConnector::new(wallet, sessions.clone(), Network::Testnet);
        (sessions, connector)
    }

    #[tokio::test]
    async fn connect_without_provider_fails() {
        let wallet = Arc::new(MockWallet::unavailable());
        let (_, connector) = connector(wallet);
        assert!(matches!(
            connector.connect().await,
            Err(WalletError::ProviderNotFound)
        ));
    }

    #[tokio::test]
    async fn connect_prompts_only_when_signed_out() {
        let approved = Arc::new(MockWallet::signed_in());
        let (_, approved_connector) = connector(approved.clone());
        let addresses = approved_connector.connect().await.unwrap();
        assert_eq!(addresses.primary_stx(), Some(ST));
        assert_eq!(approved.calls("connect"), 0);

        let fresh = Arc::new(MockWallet::signed_out());
        let (_, fresh_connector) = connector(fresh.clone());
        fresh_connector.connect().await.unwrap();
        assert_eq!(fresh.calls("connect"), 1);
    }

    #[tokio::test]
    async fn dismissed_prompt_is_connection_refused() {
        let wallet = Arc::new(MockWallet::signed_out().rejecting_connect());
        let (_, connector) = connector(wallet);
        assert!(matches!(
            connector.connect().await,
            Err(WalletError::ConnectionRefused)
        ));
    }

    #[tokio::test]
    async fn no_resolvable_address_is_no_addresses() {
        let wallet = Arc::new(MockWallet::signed_in().with_responses(json!({}), json!([]), None));
        let (_, connector) = connector(wallet);
        assert!(matches!(
            connector.connect().await,
            Err(WalletError::NoAddresses)
        ));
    }

    #[tokio::test]
    async fn falls_back_to_legacy_then_session() {
        let legacy = Arc::new(MockWallet::signed_in().with_responses(json!({}), json!([ST]), None));
        let (_, connector_a) = connector(legacy);
        assert_eq!(
            connector_a.get_addresses().await.unwrap().primary_stx(),
            Some(ST)
        );

        let derived = Arc::new(MockWallet::signed_in().with_responses(
            json!({}),
            json!([]),
            Some(json!({ "identityAddress": ST })),
        ));
        let (_, connector_b) = connector(derived);
        assert_eq!(
            connector_b.get_addresses().await.unwrap().primary_stx(),
            Some(ST)
        );
    }

    #[tokio::test]
    async fn provider_error_heals_sessions() {
        let wallet = Arc::new(MockWallet::broken());
        let (sessions, connector) = connector(wallet.clone());
        sessions
            .write_session(
                SessionUpdate::new()
                    .with_wallet(WalletSession {
                        address: ST.to_string(),
                        addresses: WalletAddresses::default(),
                    })
                    .with_identity(
                        Credential::new("tok").unwrap(),
                        UserProfile {
                            user_id: None,
                            username: "alice".to_string(),
                            name: None,
                            wallet_address: None,
                            created_at: None,
                        },
                    ),
            )
            .unwrap();

        assert!(!connector.is_connected().await);
        assert_eq!(wallet.calls("sign_out"), 1);
        assert!(sessions.read_session().wallet.is_none());
        assert!(!sessions.read_session().has_identity());
    }

    #[tokio::test]
    async fn transfer_carries_network() {
        let wallet = Arc::new(MockWallet::signed_in());
        let (_, connector) = connector(wallet.clone());
        let outcome = connector
            .request_value_transfer("ST2SELLER", 1_500_000, "ChainGo - Bike")
            .await
            .unwrap();
        assert!(matches!(outcome, TransferOutcome::Completed { .. }));

        let sent = wallet.last_transfer().unwrap();
        assert_eq!(sent.amount_minor, 1_500_000);
        assert_eq!(sent.network, Network::Testnet);
    }

    #[tokio::test]
    async fn disconnect_swallows_errors() {
        let wallet = Arc::new(MockWallet::broken());
        let (_, connector) = connector(wallet.clone());
        connector.disconnect().await;
        assert_eq!(wallet.calls("sign_out"), 1);
    }
}
