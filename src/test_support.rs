// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! In-memory wallet and backend doubles shared by unit tests.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::backend::{
    BackendError, Identity, MarketplaceBackend, NewUser, RegisteredUser, Verification,
};
use crate::chain::BalanceInfo;
use crate::session::{Credential, UserProfile};
use crate::wallet::{TransferOutcome, TransferRequest, WalletError, WalletProvider};

pub const ST: &str = "ST1PQHQKV0RJXZFY1DGX8MNSNYVE3VGZJSRTPGZGM";
pub const BC: &str = "tb1qw508d6qejxtdg4y5r3zarvary0c5xw7kxpjzsx";
pub const SELLER_ST: &str = "ST2CY5V39NHDPWSXMW9QDT3HC3GD6Q6XX4CFRK9AG";

#[derive(Default)]
struct CallLog {
    calls: Mutex<Vec<&'static str>>,
}

impl CallLog {
    fn record(&self, name: &'static str) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(name);
        }
    }

    fn count(&self, name: &str) -> usize {
        self.calls
            .lock()
            .map(|calls| calls.iter().filter(|call| **call == name).count())
            .unwrap_or(0)
    }

    fn all(&self) -> Vec<&'static str> {
        self.calls.lock().map(|calls| calls.clone()).unwrap_or_default()
    }
}

// =============================================================================
// Wallet
// =============================================================================

#[derive(Clone)]
pub enum TransferBehavior {
    Complete(String),
    /// Complete after a delay
    CompleteAfter(Duration, String),
    Cancel,
    Fail,
    /// Never resolves
    Hang,
}

pub struct MockWallet {
    available: bool,
    signed_in: Mutex<Option<bool>>,
    reject_connect: bool,
    multi_call: Value,
    legacy_stx: Value,
    user_data: Option<Value>,
    transfer: TransferBehavior,
    log: CallLog,
    transfers: Mutex<Vec<TransferRequest>>,
}

impl MockWallet {
    fn base(available: bool, signed_in: Option<bool>) -> Self {
        Self {
            available,
            signed_in: Mutex::new(signed_in),
            reject_connect: false,
            multi_call: json!({
                "result": {
                    "stx": [{ "address": ST }],
                    "btc": [{ "address": BC }],
                }
            }),
            legacy_stx: json!([]),
            user_data: None,
            transfer: TransferBehavior::Complete("0xABC".to_string()),
            log: CallLog::default(),
            transfers: Mutex::new(Vec::new()),
        }
    }

    pub fn signed_in() -> Self {
        Self::base(true, Some(true))
    }

    pub fn signed_out() -> Self {
        Self::base(true, Some(false))
    }

    pub fn unavailable() -> Self {
        Self::base(false, Some(false))
    }

    /// `is_signed_in` errors; every other call errors too.
    pub fn broken() -> Self {
        Self::base(true, None)
    }

    pub fn rejecting_connect(mut self) -> Self {
        self.reject_connect = true;
        self
    }

    pub fn with_responses(
        mut self,
        multi_call: Value,
        legacy_stx: Value,
        user_data: Option<Value>,
    ) -> Self {
        self.multi_call = multi_call;
        self.legacy_stx = legacy_stx;
        self.user_data = user_data;
        self
    }

    pub fn with_transfer(mut self, behavior: TransferBehavior) -> Self {
        self.transfer = behavior;
        self
    }

    pub fn calls(&self, name: &str) -> usize {
        self.log.count(name)
    }

    pub fn last_transfer(&self) -> Option<TransferRequest> {
        self.transfers.lock().ok()?.last().cloned()
    }

    fn is_broken(&self) -> bool {
        self.signed_in.lock().map(|s| s.is_none()).unwrap_or(true)
    }
}

#[async_trait]
impl WalletProvider for MockWallet {
    async fn is_available(&self) -> bool {
        self.log.record("is_available");
        self.available
    }

    async fn is_signed_in(&self) -> Result<bool, WalletError> {
        self.log.record("is_signed_in");
        if !self.available {
            return Err(WalletError::ProviderNotFound);
        }
        self.signed_in
            .lock()
            .ok()
            .and_then(|s| *s)
            .ok_or_else(|| WalletError::Transport("corrupt session".to_string()))
    }

    async fn connect(&self) -> Result<(), WalletError> {
        self.log.record("connect");
        if self.reject_connect {
            return Err(WalletError::ConnectionRefused);
        }
        if let Ok(mut signed_in) = self.signed_in.lock() {
            *signed_in = Some(true);
        }
        Ok(())
    }

    async fn request(&self, method: &str) -> Result<Value, WalletError> {
        self.log.record("request");
        if self.is_broken() {
            return Err(WalletError::Transport("broken".to_string()));
        }
        match method {
            "getAddresses" => Ok(self.multi_call.clone()),
            "stx_getAddresses" => Ok(self.legacy_stx.clone()),
            "btc_getAddresses" => Ok(json!([])),
            other => Err(WalletError::Rpc {
                code: -32601,
                message: format!("unknown method {other}"),
            }),
        }
    }

    async fn user_data(&self) -> Result<Option<Value>, WalletError> {
        self.log.record("user_data");
        Ok(self.user_data.clone())
    }

    async fn transfer(&self, request: &TransferRequest) -> Result<TransferOutcome, WalletError> {
        self.log.record("transfer");
        if let Ok(mut transfers) = self.transfers.lock() {
            transfers.push(request.clone());
        }
        match &self.transfer {
            TransferBehavior::Complete(txid) => Ok(TransferOutcome::Completed {
                transaction_id: txid.clone(),
            }),
            TransferBehavior::CompleteAfter(delay, txid) => {
                tokio::time::sleep(*delay).await;
                Ok(TransferOutcome::Completed {
                    transaction_id: txid.clone(),
                })
            }
            TransferBehavior::Cancel => Ok(TransferOutcome::Cancelled),
            TransferBehavior::Fail => Err(WalletError::Transport("bridge crashed".to_string())),
            TransferBehavior::Hang => std::future::pending().await,
        }
    }

    async fn sign_out(&self) -> Result<(), WalletError> {
        self.log.record("sign_out");
        if self.is_broken() {
            return Err(WalletError::Transport("broken".to_string()));
        }
        if let Ok(mut signed_in) = self.signed_in.lock() {
            *signed_in = Some(false);
        }
        Ok(())
    }
}

// =============================================================================
// Backend
// =============================================================================

pub fn profile(username: &str) -> UserProfile {
    UserProfile {
        user_id: Some(1),
        username: username.to_string(),
        name: Some(format!("{username} display")),
        wallet_address: Some(ST.to_string()),
        created_at: None,
    }
}

pub struct MockBackend {
    identity: Mutex<Result<Identity, BackendError>>,
    verification: Result<Verification, BackendError>,
    registration: Result<RegisteredUser, BackendError>,
    balance: Result<BalanceInfo, BackendError>,
    seller_wallet: Result<Option<String>, BackendError>,
    settlement: Result<(), BackendError>,
    /// Identity returned after a successful registration
    registered_identity: Option<Identity>,
    log: CallLog,
    settlements: Mutex<Vec<(i64, String, String)>>,
    registrations: Mutex<Vec<NewUser>>,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self {
            identity: Mutex::new(Ok(Identity {
                exists: true,
                credential: Credential::new("issued-token"),
                profile: Some(profile("alice")),
            })),
            verification: Ok(Verification {
                valid: true,
                profile: Some(profile("alice")),
            }),
            registration: Ok(RegisteredUser { user_id: Some(1) }),
            balance: Ok(BalanceInfo {
                address: ST.to_string(),
                balance_minor: 100_000_000,
                locked_minor: 0,
            }),
            seller_wallet: Ok(Some(SELLER_ST.to_string())),
            settlement: Ok(()),
            registered_identity: None,
            log: CallLog::default(),
            settlements: Mutex::new(Vec::new()),
            registrations: Mutex::new(Vec::new()),
        }
    }
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_identity(self, identity: Result<Identity, BackendError>) -> Self {
        if let Ok(mut current) = self.identity.lock() {
            *current = identity;
        }
        self
    }

    pub fn unknown_wallet(self) -> Self {
        self.with_identity(Ok(Identity {
            exists: false,
            credential: None,
            profile: None,
        }))
    }

    pub fn with_verification(mut self, verification: Result<Verification, BackendError>) -> Self {
        self.verification = verification;
        self
    }

    pub fn with_registration(mut self, registration: Result<RegisteredUser, BackendError>) -> Self {
        self.registration = registration;
        self
    }

    pub fn with_registered_identity(mut self, identity: Identity) -> Self {
        self.registered_identity = Some(identity);
        self
    }

    pub fn with_balance_minor(mut self, balance_minor: u128) -> Self {
        self.balance = Ok(BalanceInfo {
            address: ST.to_string(),
            balance_minor,
            locked_minor: 0,
        });
        self
    }

    pub fn with_balance(mut self, balance: Result<BalanceInfo, BackendError>) -> Self {
        self.balance = balance;
        self
    }

    pub fn with_seller_wallet(mut self, seller_wallet: Result<Option<String>, BackendError>) -> Self {
        self.seller_wallet = seller_wallet;
        self
    }

    pub fn with_settlement(mut self, settlement: Result<(), BackendError>) -> Self {
        self.settlement = settlement;
        self
    }

    pub fn calls(&self, name: &str) -> usize {
        self.log.count(name)
    }

    pub fn total_calls(&self) -> usize {
        self.log.all().len()
    }

    pub fn call_order(&self) -> Vec<&'static str> {
        self.log.all()
    }

    pub fn settlements(&self) -> Vec<(i64, String, String)> {
        self.settlements.lock().map(|s| s.clone()).unwrap_or_default()
    }

    pub fn registrations(&self) -> Vec<NewUser> {
        self.registrations.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl MarketplaceBackend for MockBackend {
    async fn identify_by_wallet(&self, _address: &str) -> Result<Identity, BackendError> {
        self.log.record("identify_by_wallet");
        self.identity
            .lock()
            .map_err(|_| BackendError::network("poisoned"))?
            .clone()
    }

    async fn verify_credential(
        &self,
        _credential: &Credential,
    ) -> Result<Verification, BackendError> {
        self.log.record("verify_credential");
        self.verification.clone()
    }

    async fn register_user(&self, user: &NewUser) -> Result<RegisteredUser, BackendError> {
        self.log.record("register_user");
        if let Ok(mut registrations) = self.registrations.lock() {
            registrations.push(user.clone());
        }
        let registered = self.registration.clone()?;
        if let Some(identity) = &self.registered_identity {
            if let Ok(mut current) = self.identity.lock() {
                *current = Ok(identity.clone());
            }
        }
        Ok(registered)
    }

    async fn fetch_balance(&self, _address: &str) -> Result<BalanceInfo, BackendError> {
        self.log.record("fetch_balance");
        self.balance.clone()
    }

    async fn resolve_seller_wallet(&self, _username: &str) -> Result<Option<String>, BackendError> {
        self.log.record("resolve_seller_wallet");
        self.seller_wallet.clone()
    }

    async fn settle_purchase(
        &self,
        listing_id: i64,
        buyer_username: &str,
        transaction_id: &str,
    ) -> Result<(), BackendError> {
        self.log.record("settle_purchase");
        if let Ok(mut settlements) = self.settlements.lock() {
            settlements.push((
                listing_id,
                buyer_username.to_string(),
                transaction_id.to_string(),
            ));
        }
        self.settlement.clone()
    }
}
