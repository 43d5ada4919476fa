// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use chaingo_client::auth::{AuthGate, AuthState, LoginOutcome};
use chaingo_client::backend::{
    HttpBackendClient, MarketplaceBackend, RequestOptions, DEFAULT_PAGE_SIZE,
};
use chaingo_client::chain::Network;
use chaingo_client::config::{ClientConfig, LogFormat, DEFAULT_LOG_FILTER};
use chaingo_client::error::ClientError;
use chaingo_client::favorites::{FavoriteChange, FavoritesStore, NewFavorite};
use chaingo_client::purchase::{
    PurchaseConfirmer, PurchaseIntent, PurchaseObserver, PurchaseOrchestrator, PurchaseOutcome,
    PurchaseState, SettlementLedger,
};
use chaingo_client::session::{SessionStore, UserProfile};
use chaingo_client::storage::{KeyValueStore, RedbStore};
use chaingo_client::wallet::{RpcWalletProvider, WalletConnector};

const USAGE: &str = "\
Usage: chaingo <command> [args]

Commands:
  status                         Show sign-in state
  login                          Connect the wallet and sign in
  register <name> <username>     Register the connected wallet
  logout                         Sign out and clear the local session
  balance                        Show the wallet's STX balance
  listings [page] [page_size]    Browse active listings
  listing <id>                   Show one listing
  favorites                      Show saved listings
  favorite <id>                  Save a listing
  unfavorite <id>                Remove a saved listing
  buy <id>                       Buy a listing with STX
  pending                        Show unsettled purchases
  settle <record-id>             Retry settlement of an unsettled purchase";

fn init_tracing(format: LogFormat) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.init(),
    }
}

/// Wired-up client services.
struct App {
    network: Network,
    sessions: SessionStore,
    favorites: FavoritesStore,
    backend: HttpBackendClient,
    gate: AuthGate,
    orchestrator: PurchaseOrchestrator,
}

impl App {
    fn build(config: &ClientConfig, cancel: CancellationToken) -> Result<Self, ClientError> {
        let store: Arc<dyn KeyValueStore> = Arc::new(RedbStore::open_in_dir(&config.data_dir)?);
        let sessions = SessionStore::new(store.clone());
        let favorites = FavoritesStore::new(store.clone());
        let ledger = SettlementLedger::new(store);

        let backend = HttpBackendClient::new(
            &config.api_base_url,
            &config.indexer_url,
            RequestOptions::with_timeout(config.http_timeout).cancellable(cancel),
        )?;
        let shared: Arc<dyn MarketplaceBackend> = Arc::new(backend.clone());

        let provider = Arc::new(RpcWalletProvider::new(
            &config.wallet_rpc_url,
            config.http_timeout,
        )?);
        let connector = WalletConnector::new(provider, sessions.clone(), config.network);

        let gate = AuthGate::new(connector.clone(), shared.clone(), sessions.clone());
        let orchestrator = PurchaseOrchestrator::new(
            connector,
            shared,
            sessions.clone(),
            ledger,
            Arc::new(StdinConfirmer),
        )
        .with_observer(Arc::new(LogObserver))
        .with_popup_warning(config.popup_warning);

        Ok(Self {
            network: config.network,
            sessions,
            favorites,
            backend,
            gate,
            orchestrator,
        })
    }

    async fn run(&self, command: &str, args: &[String]) -> Result<(), ClientError> {
        match command {
            "status" => self.status().await,
            "login" => self.login().await,
            "register" => {
                let (Some(name), Some(username)) = (args.first(), args.get(1)) else {
                    return Err(ClientError::usage("register needs <name> <username>"));
                };
                let profile = self.gate.register(name, username).await?;
                println!("Registered and signed in as {}", profile.username);
                Ok(())
            }
            "logout" => {
                self.gate.logout().await;
                println!("Signed out");
                Ok(())
            }
            "balance" => self.balance().await,
            "listings" => {
                let page = optional_number(args.first(), 1)?;
                let page_size = optional_number(args.get(1), DEFAULT_PAGE_SIZE)?;
                self.listings(page, page_size).await
            }
            "listing" => self.listing(listing_id(args)?).await,
            "favorites" => {
                let favorites = self.favorites.list_by_recent();
                if favorites.is_empty() {
                    println!("No saved listings");
                }
                for entry in favorites {
                    println!(
                        "#{:<6} {:<32} {:>10} STX  saved {}",
                        entry.listing_id,
                        entry.title,
                        entry.price,
                        entry.added_at.format("%Y-%m-%d %H:%M")
                    );
                }
                Ok(())
            }
            "favorite" => self.favorite(listing_id(args)?).await,
            "unfavorite" => {
                let id = listing_id(args)?;
                match self.favorites.remove(id)? {
                    FavoriteChange::Removed => println!("Removed listing {id} from favorites"),
                    _ => println!("Listing {id} was not a favorite"),
                }
                Ok(())
            }
            "buy" => self.buy(listing_id(args)?).await,
            "pending" => {
                let records = self.orchestrator.ledger().list()?;
                if records.is_empty() {
                    println!("No unsettled purchases");
                }
                for record in records {
                    println!(
                        "{}  listing #{}  tx {}  recorded {}  last error: {}",
                        record.record_id,
                        record.listing_id,
                        record.transaction_id,
                        record.recorded_at.format("%Y-%m-%d %H:%M"),
                        record.last_error.as_deref().unwrap_or("-")
                    );
                }
                Ok(())
            }
            "settle" => {
                let raw = args
                    .first()
                    .ok_or_else(|| ClientError::usage("settle needs <record-id>"))?;
                let record_id = Uuid::parse_str(raw)
                    .map_err(|_| ClientError::usage(format!("not a record id: {raw}")))?;
                self.orchestrator.settle_pending(record_id).await?;
                println!("Settled {record_id}");
                Ok(())
            }
            other => Err(ClientError::usage(format!("unknown command `{other}`\n\n{USAGE}"))),
        }
    }

    async fn status(&self) -> Result<(), ClientError> {
        match self.gate.check_status().await {
            AuthState::Authenticated(profile) => {
                println!("Signed in as {} ({})", profile.display_name(), profile.username);
                if let Some(address) = self.sessions.read_session().wallet_address() {
                    println!("Wallet {address} on {}", self.network);
                }
            }
            AuthState::Anonymous => match self.sessions.read_session().wallet_address() {
                Some(address) => println!("Wallet {address} connected, not signed in"),
                None => println!("Not signed in"),
            },
        }
        Ok(())
    }

    async fn login(&self) -> Result<(), ClientError> {
        match self.gate.login().await? {
            LoginOutcome::ExistingAccount { profile } => {
                println!("Signed in as {}", profile.display_name());
            }
            outcome @ LoginOutcome::NewAccount { .. } => {
                println!("Wallet is not registered yet");
                println!("Run `chaingo register <name> <username>` ({})", outcome.redirect_hint());
            }
        }
        Ok(())
    }

    async fn balance(&self) -> Result<(), ClientError> {
        let session = self.sessions.read_session();
        let address = session.wallet_address().ok_or(ClientError::NotSignedIn)?;
        let balance = self.backend.fetch_balance(address).await?;
        println!("{address}: {}", balance.formatted());
        Ok(())
    }

    async fn listings(&self, page: u32, page_size: u32) -> Result<(), ClientError> {
        let page = self.backend.list_active_listings(page, page_size).await?;
        for listing in &page.listings {
            let saved = if self.favorites.contains(listing.id) { "*" } else { " " };
            println!(
                "{saved} #{:<6} {:<32} {:>10} STX  by {}",
                listing.id, listing.title, listing.price, listing.seller_username
            );
        }
        println!(
            "Page {} of {} ({} listings)",
            page.page, page.total_pages, page.total_items
        );
        Ok(())
    }

    async fn listing(&self, id: i64) -> Result<(), ClientError> {
        let listing = self
            .backend
            .get_listing(id)
            .await?
            .ok_or(ClientError::ListingNotFound(id))?;
        println!("#{} {}", listing.id, listing.title);
        println!("Price: {} STX", listing.price);
        println!("Seller: {}", listing.seller_username);
        if let Some(category) = &listing.category {
            println!("Category: {category}");
        }
        if let Some(condition) = &listing.condition {
            println!("Condition: {condition}");
        }
        if let Some(location) = &listing.location {
            println!("Location: {location}");
        }
        if listing.is_sold {
            println!("Sold to {}", listing.buyer_username.as_deref().unwrap_or("unknown"));
        }
        if !listing.description.is_empty() {
            println!("\n{}", listing.description);
        }
        for image in &listing.images {
            println!("Image: {}", self.backend.image_url(image));
        }
        Ok(())
    }

    async fn favorite(&self, id: i64) -> Result<(), ClientError> {
        let listing = self
            .backend
            .get_listing(id)
            .await?
            .ok_or(ClientError::ListingNotFound(id))?;
        let change = self.favorites.add(NewFavorite {
            listing_id: listing.id,
            title: listing.title.clone(),
            price: listing.price.clone(),
            image_ref: listing.first_image().map(str::to_string),
        })?;
        match change {
            FavoriteChange::Added => println!("Saved \"{}\"", listing.title),
            _ => println!("\"{}\" is already saved", listing.title),
        }
        Ok(())
    }

    async fn buy(&self, id: i64) -> Result<(), ClientError> {
        let buyer = self.signed_in_profile().await?;
        let listing = self
            .backend
            .get_listing(id)
            .await?
            .ok_or(ClientError::ListingNotFound(id))?;

        match self.orchestrator.purchase(&listing, &buyer).await {
            PurchaseOutcome::Completed { transaction_id } => {
                println!("Purchase complete: {}", self.network.explorer_tx_url(&transaction_id));
            }
            PurchaseOutcome::PartialSuccess {
                transaction_id,
                settlement_error,
                record_id,
            } => {
                println!("Payment sent: {}", self.network.explorer_tx_url(&transaction_id));
                println!("The marketplace did not record the sale: {settlement_error}");
                match record_id {
                    Some(record_id) => println!("Retry with `chaingo settle {record_id}`"),
                    None => println!("Keep the transaction id {transaction_id} and contact support"),
                }
            }
            PurchaseOutcome::Cancelled { .. } => println!("Purchase cancelled"),
            PurchaseOutcome::Failed(failure) if failure.is_validation() => {
                println!("Cannot buy this listing: {failure}")
            }
            PurchaseOutcome::Failed(failure) => println!("Purchase failed: {failure}"),
        }
        Ok(())
    }

    async fn signed_in_profile(&self) -> Result<UserProfile, ClientError> {
        match self.gate.check_status().await {
            AuthState::Authenticated(profile) => Ok(profile),
            AuthState::Anonymous => Err(ClientError::NotSignedIn),
        }
    }
}

// =============================================================================
// Purchase collaborators
// =============================================================================

/// Asks on the terminal before the wallet is prompted.
struct StdinConfirmer;

#[async_trait]
impl PurchaseConfirmer for StdinConfirmer {
    async fn confirm(&self, intent: &PurchaseIntent) -> bool {
        let prompt = format!(
            "Buy \"{}\" from {} for {} STX on {}?\n  to {}\n  memo \"{}\"\nConfirm [y/N]: ",
            intent.listing_title,
            intent.seller_username,
            intent.price,
            intent.network,
            intent.seller_wallet_address,
            intent.memo
        );
        let mut stdout = tokio::io::stdout();
        if stdout.write_all(prompt.as_bytes()).await.is_err() || stdout.flush().await.is_err() {
            return false;
        }

        let mut line = String::new();
        match BufReader::new(tokio::io::stdin()).read_line(&mut line).await {
            Ok(_) => matches!(line.trim().to_ascii_lowercase().as_str(), "y" | "yes"),
            Err(e) => {
                tracing::warn!(error = %e, "Could not read confirmation");
                false
            }
        }
    }
}

struct LogObserver;

impl PurchaseObserver for LogObserver {
    fn on_state(&self, state: PurchaseState) {
        if state == PurchaseState::AwaitingSignature {
            println!("Approve the transfer in your wallet...");
        }
    }

    fn popup_may_be_blocked(&self) {
        println!("Still waiting for the wallet. If no prompt appeared, check that it is not blocked.");
    }
}

// =============================================================================
// Argument helpers
// =============================================================================

fn listing_id(args: &[String]) -> Result<i64, ClientError> {
    let raw = args
        .first()
        .ok_or_else(|| ClientError::usage("missing listing id"))?;
    raw.parse()
        .map_err(|_| ClientError::usage(format!("not a listing id: {raw}")))
}

fn optional_number(raw: Option<&String>, default: u32) -> Result<u32, ClientError> {
    match raw {
        Some(raw) => raw
            .parse()
            .map_err(|_| ClientError::usage(format!("not a number: {raw}"))),
        None => Ok(default),
    }
}

#[tokio::main]
async fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(command) = args.first().cloned() else {
        eprintln!("{USAGE}");
        std::process::exit(2);
    };
    if matches!(command.as_str(), "-h" | "--help" | "help") {
        println!("{USAGE}");
        return;
    }

    // Logging first, so configuration warnings are not dropped
    init_tracing(LogFormat::from_env());

    let config = match ClientConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            std::process::exit(ClientError::from(e).exit_code());
        }
    };

    let cancel = CancellationToken::new();
    let app = match App::build(&config, cancel.clone()) {
        Ok(app) => app,
        Err(e) => {
            eprintln!("Startup failed: {e}");
            std::process::exit(e.exit_code());
        }
    };

    tracing::debug!(
        command = %command,
        network = %config.network,
        log_format = ?config.log_format,
        api = %config.api_base_url,
        "Running command"
    );

    let result = tokio::select! {
        result = app.run(&command, &args[1..]) => result,
        _ = tokio::signal::ctrl_c() => {
            cancel.cancel();
            eprintln!("Interrupted");
            std::process::exit(130);
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(e.exit_code());
    }
}
