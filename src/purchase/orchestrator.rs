// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Purchase orchestrator.

use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use super::ledger::{PendingSettlement, SettlementLedger};
use super::{
    parse_price, transfer_memo, CancelStage, NoopObserver, PurchaseConfirmer, PurchaseFailure,
    PurchaseIntent, PurchaseObserver, PurchaseOutcome, PurchaseState, DEFAULT_POPUP_WARNING,
};
use crate::backend::{BackendError, Listing, MarketplaceBackend};
use crate::chain::stx_to_micro;
use crate::session::{SessionStore, UserProfile};
use crate::storage::StoreError;
use crate::wallet::{TransferOutcome, WalletConnector, WalletError};

/// Errors from settling a ledger record by hand.
#[derive(Debug, thiserror::Error)]
pub enum FollowUpError {
    #[error("No pending settlement with id {0}")]
    NotFound(Uuid),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// Drives one purchase from validation to settlement.
pub struct PurchaseOrchestrator {
    connector: WalletConnector,
    backend: Arc<dyn MarketplaceBackend>,
    sessions: SessionStore,
    ledger: SettlementLedger,
    confirmer: Arc<dyn PurchaseConfirmer>,
    observer: Arc<dyn PurchaseObserver>,
    popup_warning: Duration,
}

impl PurchaseOrchestrator {
    pub fn new(
        connector: WalletConnector,
        backend: Arc<dyn MarketplaceBackend>,
        sessions: SessionStore,
        ledger: SettlementLedger,
        confirmer: Arc<dyn PurchaseConfirmer>,
    ) -> Self {
        Self {
            connector,
            backend,
            sessions,
            ledger,
            confirmer,
            observer: Arc::new(NoopObserver),
            popup_warning: DEFAULT_POPUP_WARNING,
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn PurchaseObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Delay before `popup_may_be_blocked` fires.
    pub fn with_popup_warning(mut self, delay: Duration) -> Self {
        self.popup_warning = delay;
        self
    }

    pub fn ledger(&self) -> &SettlementLedger {
        &self.ledger
    }

    /// Buy `listing` as `buyer`.
    ///
    /// Never returns an error: every failure is folded into the outcome.
    pub async fn purchase(&self, listing: &Listing, buyer: &UserProfile) -> PurchaseOutcome {
        let outcome = self.run(listing, buyer).await;
        let state = outcome.state();
        match &outcome {
            PurchaseOutcome::Completed { transaction_id } => {
                tracing::info!(listing_id = listing.id, transaction_id = %transaction_id, "Purchase completed");
            }
            PurchaseOutcome::PartialSuccess {
                transaction_id,
                settlement_error,
                ..
            } => {
                tracing::error!(
                    listing_id = listing.id,
                    transaction_id = %transaction_id,
                    error = %settlement_error,
                    "Transfer succeeded but settlement failed"
                );
            }
            PurchaseOutcome::Cancelled { stage } => {
                tracing::info!(listing_id = listing.id, stage = ?stage, "Purchase cancelled");
            }
            PurchaseOutcome::Failed(failure) => {
                tracing::warn!(listing_id = listing.id, error = %failure, "Purchase failed");
            }
        }
        self.observer.on_state(state);
        outcome
    }

    async fn run(&self, listing: &Listing, buyer: &UserProfile) -> PurchaseOutcome {
        self.enter(PurchaseState::Idle);
        self.enter(PurchaseState::Validating);
        if listing.seller_username == buyer.username {
            return PurchaseOutcome::Failed(PurchaseFailure::SelfPurchase);
        }
        if listing.is_sold {
            return PurchaseOutcome::Failed(PurchaseFailure::AlreadySold);
        }
        let price = match parse_price(&listing.price) {
            Ok(price) => price,
            Err(failure) => return PurchaseOutcome::Failed(failure),
        };
        let amount_minor = match stx_to_micro(price) {
            Some(amount) if amount > 0 => amount,
            _ => {
                return PurchaseOutcome::Failed(PurchaseFailure::InvalidPrice(
                    listing.price.clone(),
                ))
            }
        };

        let session = self.sessions.read_session();
        let Some(buyer_address) = session.wallet_address().map(str::to_string) else {
            return PurchaseOutcome::Failed(PurchaseFailure::WalletSessionMissing);
        };

        self.enter(PurchaseState::BalanceChecking);
        let balance = match self.backend.fetch_balance(&buyer_address).await {
            Ok(balance) => balance,
            Err(e) => return PurchaseOutcome::Failed(PurchaseFailure::BalanceUnavailable(e)),
        };
        let available_stx = balance.balance_stx();
        if available_stx < price {
            return PurchaseOutcome::Failed(PurchaseFailure::InsufficientBalance {
                available_stx,
                price: listing.price.clone(),
            });
        }

        self.enter(PurchaseState::SellerResolving);
        if listing.seller_username.trim().is_empty() {
            return PurchaseOutcome::Failed(PurchaseFailure::SellerWalletUnresolved {
                username: listing.seller_username.clone(),
                source: None,
            });
        }
        let seller_wallet_address = match self
            .backend
            .resolve_seller_wallet(&listing.seller_username)
            .await
        {
            Ok(Some(address)) => address,
            Ok(None) => {
                return PurchaseOutcome::Failed(PurchaseFailure::SellerWalletUnresolved {
                    username: listing.seller_username.clone(),
                    source: None,
                })
            }
            Err(e) => {
                return PurchaseOutcome::Failed(PurchaseFailure::SellerWalletUnresolved {
                    username: listing.seller_username.clone(),
                    source: Some(e),
                })
            }
        };

        let intent = PurchaseIntent {
            listing_id: listing.id,
            listing_title: listing.title.clone(),
            buyer_username: buyer.username.clone(),
            buyer_wallet_address: buyer_address,
            seller_username: listing.seller_username.clone(),
            seller_wallet_address,
            price: listing.price.clone(),
            amount_minor,
            memo: transfer_memo(&listing.title),
            network: self.connector.network(),
        };

        self.enter(PurchaseState::AwaitingConfirmation);
        if !self.confirmer.confirm(&intent).await {
            return PurchaseOutcome::Cancelled {
                stage: CancelStage::Confirmation,
            };
        }

        self.enter(PurchaseState::AwaitingSignature);
        let transaction_id = match self.await_transfer(&intent).await {
            Ok(TransferOutcome::Completed { transaction_id }) => transaction_id,
            Ok(TransferOutcome::Cancelled) => {
                return PurchaseOutcome::Cancelled {
                    stage: CancelStage::Signature,
                }
            }
            Err(e) => return PurchaseOutcome::Failed(PurchaseFailure::Transfer(e)),
        };
        tracing::info!(listing_id = intent.listing_id, transaction_id = %transaction_id, "Transfer signed");

        self.enter(PurchaseState::Settling);
        match self
            .backend
            .settle_purchase(intent.listing_id, &intent.buyer_username, &transaction_id)
            .await
        {
            Ok(()) => PurchaseOutcome::Completed { transaction_id },
            Err(settlement_error) => {
                let record_id = self.record_pending(&intent, &transaction_id, &settlement_error);
                PurchaseOutcome::PartialSuccess {
                    transaction_id,
                    settlement_error,
                    record_id,
                }
            }
        }
    }

    /// Await the wallet, warning once if it stays silent.
    async fn await_transfer(&self, intent: &PurchaseIntent) -> Result<TransferOutcome, WalletError> {
        let transfer = self.connector.request_value_transfer(
            &intent.seller_wallet_address,
            intent.amount_minor,
            &intent.memo,
        );
        tokio::pin!(transfer);

        let warning = tokio::time::sleep(self.popup_warning);
        tokio::pin!(warning);
        let mut warned = false;

        loop {
            tokio::select! {
                result = &mut transfer => break result,
                _ = &mut warning, if !warned => {
                    warned = true;
                    tracing::warn!(listing_id = intent.listing_id, "Wallet popup has not answered; it may be blocked");
                    self.observer.popup_may_be_blocked();
                }
            }
        }
    }

    fn record_pending(
        &self,
        intent: &PurchaseIntent,
        transaction_id: &str,
        error: &BackendError,
    ) -> Option<Uuid> {
        let record = PendingSettlement::new(
            intent.listing_id,
            &intent.buyer_username,
            &intent.seller_username,
            transaction_id,
            intent.amount_minor,
        )
        .with_error(error.to_string());

        match self.ledger.record(&record) {
            Ok(()) => Some(record.record_id),
            Err(e) => {
                tracing::error!(
                    transaction_id = %transaction_id,
                    error = %e,
                    "Failed to record pending settlement"
                );
                None
            }
        }
    }

    /// Retry settlement for one ledger record.
    ///
    /// Success removes the record; failure stores the new error on it.
    pub async fn settle_pending(&self, record_id: Uuid) -> Result<(), FollowUpError> {
        let record = self
            .ledger
            .get(record_id)?
            .ok_or(FollowUpError::NotFound(record_id))?;

        match self
            .backend
            .settle_purchase(record.listing_id, &record.buyer_username, &record.transaction_id)
            .await
        {
            Ok(()) => {
                self.ledger.remove(record_id)?;
                tracing::info!(record_id = %record_id, transaction_id = %record.transaction_id, "Pending settlement completed");
                Ok(())
            }
            Err(e) => {
                self.ledger.update_error(record_id, e.to_string())?;
                Err(e.into())
            }
        }
    }

    fn enter(&self, state: PurchaseState) {
        tracing::debug!(state = %state, "Purchase state");
        self.observer.on_state(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;

    use crate::backend::BackendErrorKind;
    use crate::chain::Network;
    use crate::session::{SessionUpdate, WalletSession};
    use crate::storage::keys::PENDING_SETTLEMENTS;
    use crate::storage::{KeyValueStore, MemoryStore};
    use crate::test_support::{profile, MockBackend, MockWallet, TransferBehavior, SELLER_ST, ST};
    use crate::wallet::WalletAddresses;

    struct Confirm(bool);

    #[async_trait]
    impl PurchaseConfirmer for Confirm {
        async fn confirm(&self, _intent: &PurchaseIntent) -> bool {
            self.0
        }
    }

    #[derive(Default)]
    struct Recorder {
        states: Mutex<Vec<PurchaseState>>,
        popup_warnings: AtomicUsize,
    }

    impl PurchaseObserver for Recorder {
        fn on_state(&self, state: PurchaseState) {
            self.states.lock().unwrap().push(state);
        }

        fn popup_may_be_blocked(&self) {
            self.popup_warnings.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct Harness {
        store: Arc<MemoryStore>,
        wallet: Arc<MockWallet>,
        backend: Arc<MockBackend>,
        recorder: Arc<Recorder>,
        orchestrator: PurchaseOrchestrator,
    }

    fn harness(wallet: MockWallet, backend: MockBackend, confirm: bool) -> Harness {
        let store = Arc::new(MemoryStore::new());
        let sessions = SessionStore::new(store.clone());
        sessions
            .write_session(SessionUpdate::new().with_wallet(WalletSession {
                address: ST.to_string(),
                addresses: WalletAddresses::default(),
            }))
            .unwrap();

        let wallet = Arc::new(wallet);
        let backend = Arc::new(backend);
        let recorder = Arc::new(Recorder::default());
        let connector = WalletConnector::new(wallet.clone(), sessions.clone(), Network::Testnet);
        let orchestrator = PurchaseOrchestrator::new(
            connector,
            backend.clone(),
            sessions,
            SettlementLedger::new(store.clone()),
            Arc::new(Confirm(confirm)),
        )
        .with_observer(recorder.clone());

        Harness {
            store,
            wallet,
            backend,
            recorder,
            orchestrator,
        }
    }

    fn listing(price: &str) -> Listing {
        Listing {
            id: 7,
            title: "Road bike".to_string(),
            description: String::new(),
            price: price.to_string(),
            category: None,
            location: None,
            condition: None,
            seller_username: "bob".to_string(),
            images: Vec::new(),
            created_at: None,
            is_sold: false,
            buyer_username: None,
            sold_at: None,
        }
    }

    fn unavailable() -> BackendError {
        BackendError::status(503, "HTTP 503 Service Unavailable")
    }

    #[tokio::test]
    async fn guards_make_no_backend_calls() {
        let h = harness(MockWallet::signed_in(), MockBackend::new(), true);

        let own = h.orchestrator.purchase(&listing("2.5"), &profile("bob")).await;
        assert!(matches!(own, PurchaseOutcome::Failed(PurchaseFailure::SelfPurchase)));

        let mut sold = listing("2.5");
        sold.is_sold = true;
        let outcome = h.orchestrator.purchase(&sold, &profile("alice")).await;
        assert!(matches!(outcome, PurchaseOutcome::Failed(PurchaseFailure::AlreadySold)));

        for price in ["abc", "0", "-3", "0.0000001"] {
            let outcome = h.orchestrator.purchase(&listing(price), &profile("alice")).await;
            assert!(
                matches!(outcome, PurchaseOutcome::Failed(PurchaseFailure::InvalidPrice(_))),
                "price {price}"
            );
        }

        assert_eq!(h.backend.total_calls(), 0);
        assert_eq!(h.wallet.calls("transfer"), 0);
    }

    #[tokio::test]
    async fn missing_wallet_session_fails_before_balance() {
        let h = harness(MockWallet::signed_in(), MockBackend::new(), true);
        h.store.clear_keys(&crate::storage::keys::SESSION_KEYS).unwrap();

        let outcome = h.orchestrator.purchase(&listing("2.5"), &profile("alice")).await;
        assert!(matches!(
            outcome,
            PurchaseOutcome::Failed(PurchaseFailure::WalletSessionMissing)
        ));
        assert_eq!(h.backend.total_calls(), 0);
    }

    #[tokio::test]
    async fn insufficient_balance_stops_before_seller_lookup() {
        let h = harness(
            MockWallet::signed_in(),
            MockBackend::new().with_balance_minor(1_000_000),
            true,
        );

        let outcome = h.orchestrator.purchase(&listing("2.5"), &profile("alice")).await;
        match outcome {
            PurchaseOutcome::Failed(PurchaseFailure::InsufficientBalance {
                available_stx,
                price,
            }) => {
                assert_eq!(available_stx, 1.0);
                assert_eq!(price, "2.5");
            }
            other => panic!("unexpected outcome {other:?}"),
        }
        assert_eq!(h.backend.calls("resolve_seller_wallet"), 0);
        assert_eq!(h.wallet.calls("transfer"), 0);
    }

    #[tokio::test]
    async fn balance_failure_is_reported() {
        let h = harness(
            MockWallet::signed_in(),
            MockBackend::new().with_balance(Err(BackendError::new(
                BackendErrorKind::BalanceFieldMissing,
                "missing",
            ))),
            true,
        );

        let outcome = h.orchestrator.purchase(&listing("2.5"), &profile("alice")).await;
        assert!(matches!(
            outcome,
            PurchaseOutcome::Failed(PurchaseFailure::BalanceUnavailable(_))
        ));
        assert_eq!(h.backend.calls("resolve_seller_wallet"), 0);
    }

    #[tokio::test]
    async fn unresolved_seller_fails() {
        let h = harness(
            MockWallet::signed_in(),
            MockBackend::new().with_seller_wallet(Ok(None)),
            true,
        );
        let outcome = h.orchestrator.purchase(&listing("2.5"), &profile("alice")).await;
        assert!(matches!(
            outcome,
            PurchaseOutcome::Failed(PurchaseFailure::SellerWalletUnresolved { source: None, .. })
        ));

        let h = harness(
            MockWallet::signed_in(),
            MockBackend::new().with_seller_wallet(Err(unavailable())),
            true,
        );
        let outcome = h.orchestrator.purchase(&listing("2.5"), &profile("alice")).await;
        assert!(matches!(
            outcome,
            PurchaseOutcome::Failed(PurchaseFailure::SellerWalletUnresolved {
                source: Some(_),
                ..
            })
        ));
        assert_eq!(h.wallet.calls("transfer"), 0);
    }

    #[tokio::test]
    async fn listing_without_seller_is_not_looked_up() {
        let h = harness(MockWallet::signed_in(), MockBackend::new(), true);
        let mut orphan = listing("2.5");
        orphan.seller_username = String::new();

        let outcome = h.orchestrator.purchase(&orphan, &profile("alice")).await;
        assert!(matches!(
            outcome,
            PurchaseOutcome::Failed(PurchaseFailure::SellerWalletUnresolved { source: None, .. })
        ));
        assert_eq!(h.backend.calls("resolve_seller_wallet"), 0);
        assert_eq!(h.wallet.calls("transfer"), 0);
    }

    #[tokio::test]
    async fn happy_path_settles_and_reports_states() {
        let h = harness(MockWallet::signed_in(), MockBackend::new(), true);

        let outcome = h.orchestrator.purchase(&listing("2.5"), &profile("alice")).await;
        assert!(matches!(
            &outcome,
            PurchaseOutcome::Completed { transaction_id } if transaction_id == "0xABC"
        ));

        let sent = h.wallet.last_transfer().unwrap();
        assert_eq!(sent.recipient, SELLER_ST);
        assert_eq!(sent.amount_minor, 2_500_000);
        assert_eq!(sent.memo, "ChainGo - Road bike");

        assert_eq!(
            h.backend.settlements(),
            vec![(7, "alice".to_string(), "0xABC".to_string())]
        );
        assert_eq!(
            *h.recorder.states.lock().unwrap(),
            vec![
                PurchaseState::Idle,
                PurchaseState::Validating,
                PurchaseState::BalanceChecking,
                PurchaseState::SellerResolving,
                PurchaseState::AwaitingConfirmation,
                PurchaseState::AwaitingSignature,
                PurchaseState::Settling,
                PurchaseState::Completed,
            ]
        );
        assert_eq!(
            h.backend.call_order(),
            vec!["fetch_balance", "resolve_seller_wallet", "settle_purchase"]
        );
        assert!(h.orchestrator.ledger().list().unwrap().is_empty());
    }

    #[derive(Default)]
    struct Capture(Mutex<Option<PurchaseIntent>>);

    #[async_trait]
    impl PurchaseConfirmer for Capture {
        async fn confirm(&self, intent: &PurchaseIntent) -> bool {
            *self.0.lock().unwrap() = Some(intent.clone());
            false
        }
    }

    #[tokio::test]
    async fn confirmer_sees_the_full_intent() {
        let store = Arc::new(MemoryStore::new());
        let sessions = SessionStore::new(store.clone());
        sessions
            .write_session(SessionUpdate::new().with_wallet(WalletSession {
                address: ST.to_string(),
                addresses: WalletAddresses::default(),
            }))
            .unwrap();
        let wallet = Arc::new(MockWallet::signed_in());
        let capture = Arc::new(Capture::default());
        let orchestrator = PurchaseOrchestrator::new(
            WalletConnector::new(wallet.clone(), sessions.clone(), Network::Mainnet),
            Arc::new(MockBackend::new()),
            sessions,
            SettlementLedger::new(store),
            capture.clone(),
        );

        let outcome = orchestrator.purchase(&listing("2.5"), &profile("alice")).await;
        assert!(matches!(
            outcome,
            PurchaseOutcome::Cancelled {
                stage: CancelStage::Confirmation
            }
        ));

        let intent = capture.0.lock().unwrap().clone().unwrap();
        assert_eq!(intent.network, Network::Mainnet);
        assert_eq!(intent.buyer_wallet_address, ST);
        assert_eq!(intent.seller_wallet_address, SELLER_ST);
        assert_eq!(intent.amount_minor, 2_500_000);
        assert_eq!(intent.memo, "ChainGo - Road bike");
        assert_eq!(wallet.calls("transfer"), 0);
    }

    #[tokio::test]
    async fn settlement_failure_is_partial_success() {
        let h = harness(
            MockWallet::signed_in(),
            MockBackend::new().with_settlement(Err(unavailable())),
            true,
        );

        let outcome = h.orchestrator.purchase(&listing("2.5"), &profile("alice")).await;
        let record_id = match outcome {
            PurchaseOutcome::PartialSuccess {
                transaction_id,
                settlement_error,
                record_id,
            } => {
                assert_eq!(transaction_id, "0xABC");
                assert_eq!(settlement_error.http_status, Some(503));
                record_id.unwrap()
            }
            other => panic!("unexpected outcome {other:?}"),
        };

        let record = h.orchestrator.ledger().get(record_id).unwrap().unwrap();
        assert_eq!(record.transaction_id, "0xABC");
        assert_eq!(record.listing_id, 7);
        assert_eq!(record.amount_minor, 2_500_000);
        assert!(record.last_error.is_some());
        assert_eq!(h.backend.calls("settle_purchase"), 1);
    }

    #[tokio::test]
    async fn unwritable_ledger_still_reports_partial_success() {
        let h = harness(
            MockWallet::signed_in(),
            MockBackend::new().with_settlement(Err(unavailable())),
            true,
        );
        h.store.set(PENDING_SETTLEMENTS, "{corrupt").unwrap();

        let outcome = h.orchestrator.purchase(&listing("2.5"), &profile("alice")).await;
        assert!(matches!(
            outcome,
            PurchaseOutcome::PartialSuccess { record_id: None, .. }
        ));
    }

    #[tokio::test]
    async fn wallet_cancel_skips_settlement() {
        let h = harness(
            MockWallet::signed_in().with_transfer(TransferBehavior::Cancel),
            MockBackend::new(),
            true,
        );

        let outcome = h.orchestrator.purchase(&listing("2.5"), &profile("alice")).await;
        assert!(matches!(
            outcome,
            PurchaseOutcome::Cancelled {
                stage: CancelStage::Signature
            }
        ));
        assert_eq!(h.backend.calls("settle_purchase"), 0);
    }

    #[tokio::test]
    async fn declined_confirmation_never_reaches_wallet() {
        let h = harness(MockWallet::signed_in(), MockBackend::new(), false);

        let outcome = h.orchestrator.purchase(&listing("2.5"), &profile("alice")).await;
        assert!(matches!(
            outcome,
            PurchaseOutcome::Cancelled {
                stage: CancelStage::Confirmation
            }
        ));
        assert_eq!(h.wallet.calls("transfer"), 0);
        assert_eq!(h.backend.calls("settle_purchase"), 0);
    }

    #[tokio::test]
    async fn transfer_error_fails() {
        let h = harness(
            MockWallet::signed_in().with_transfer(TransferBehavior::Fail),
            MockBackend::new(),
            true,
        );

        let outcome = h.orchestrator.purchase(&listing("2.5"), &profile("alice")).await;
        assert!(matches!(
            outcome,
            PurchaseOutcome::Failed(PurchaseFailure::Transfer(WalletError::Transport(_)))
        ));
        assert_eq!(h.backend.calls("settle_purchase"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_popup_warns_once_and_keeps_waiting() {
        let h = harness(
            MockWallet::signed_in().with_transfer(TransferBehavior::CompleteAfter(
                Duration::from_secs(10),
                "0xSLOW".to_string(),
            )),
            MockBackend::new(),
            true,
        );

        let outcome = h.orchestrator.purchase(&listing("2.5"), &profile("alice")).await;
        assert_eq!(outcome.transaction_id(), Some("0xSLOW"));
        assert_eq!(h.recorder.popup_warnings.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn fast_popup_does_not_warn() {
        let h = harness(MockWallet::signed_in(), MockBackend::new(), true);
        h.orchestrator.purchase(&listing("2.5"), &profile("alice")).await;
        assert_eq!(h.recorder.popup_warnings.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn hanging_popup_is_never_cancelled() {
        let h = harness(
            MockWallet::signed_in().with_transfer(TransferBehavior::Hang),
            MockBackend::new(),
            true,
        );

        let finished = AtomicBool::new(false);
        let purchase = async {
            h.orchestrator.purchase(&listing("2.5"), &profile("alice")).await;
            finished.store(true, Ordering::SeqCst);
        };
        let timed_out = tokio::time::timeout(Duration::from_secs(600), purchase).await;

        assert!(timed_out.is_err());
        assert!(!finished.load(Ordering::SeqCst));
        assert_eq!(h.recorder.popup_warnings.load(Ordering::SeqCst), 1);
        assert_eq!(h.backend.calls("settle_purchase"), 0);
    }

    #[tokio::test]
    async fn settle_pending_removes_record_on_success() {
        let h = harness(MockWallet::signed_in(), MockBackend::new(), true);
        let record = PendingSettlement::new(7, "alice", "bob", "0xABC", 2_500_000);
        h.orchestrator.ledger().record(&record).unwrap();

        h.orchestrator.settle_pending(record.record_id).await.unwrap();
        assert!(h.orchestrator.ledger().list().unwrap().is_empty());
        assert_eq!(
            h.backend.settlements(),
            vec![(7, "alice".to_string(), "0xABC".to_string())]
        );
    }

    #[tokio::test]
    async fn settle_pending_keeps_record_on_failure() {
        let h = harness(
            MockWallet::signed_in(),
            MockBackend::new().with_settlement(Err(unavailable())),
            true,
        );
        let record = PendingSettlement::new(7, "alice", "bob", "0xABC", 2_500_000);
        h.orchestrator.ledger().record(&record).unwrap();

        let result = h.orchestrator.settle_pending(record.record_id).await;
        assert!(matches!(result, Err(FollowUpError::Backend(_))));

        let kept = h.orchestrator.ledger().get(record.record_id).unwrap().unwrap();
        assert!(kept.last_error.unwrap().contains("503"));

        assert!(matches!(
            h.orchestrator.settle_pending(Uuid::new_v4()).await,
            Err(FollowUpError::NotFound(_))
        ));
    }
}
