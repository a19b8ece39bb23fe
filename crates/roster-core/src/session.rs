//! connection and data-sync state machine
//!
//! owns all dapp-side state: wallet availability, connection status,
//! network validity, the fetched roster, and the busy latch that serializes
//! user-triggered actions. shells render `SessionView` and call the action
//! methods; the wallet and ledger capabilities are injected so the machine
//! itself stays free of I/O wiring.
//!
//! user actions (`connect`, `fetch_roster`, `submit_record`) are guarded by
//! the busy latch and run to completion. wallet notifications
//! (`on_accounts_changed`, `on_chain_changed`) are not subject to that
//! guard: they are unconditional state writes and may land while an action
//! is in flight.

use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, Notify, RwLock};

use crate::config::{ChainId, SessionConfig};
use crate::error::{LedgerError, Result, SessionError, WalletError};
use crate::ledger::{PersonRecord, RosterLedger, RosterSnapshot, SubmitReceipt};
use crate::validate::{validate_names, NameCheck};
use crate::wallet::{EventStream, WalletProvider};

/// wallet connection status
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WalletStatus {
    /// startup probe has not run yet
    Uninitialized,
    /// no extension detected
    Missing,
    Disconnected,
    Connected { account: String },
}

impl Default for WalletStatus {
    fn default() -> Self {
        Self::Uninitialized
    }
}

/// validity of the wallet's selected network against the configured chain
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NetworkStatus {
    Unknown,
    Valid,
    Invalid { actual: ChainId },
}

impl Default for NetworkStatus {
    fn default() -> Self {
        Self::Unknown
    }
}

/// state owned by the session
#[derive(Default)]
struct Model {
    wallet: WalletStatus,
    network: NetworkStatus,
    roster: Option<RosterSnapshot>,
    validation: Option<NameCheck>,
    error: Option<String>,
    notice: Option<String>,
}

/// view sent to the shell for rendering
///
/// control enablement is precomputed here: everything is disabled while
/// busy or off-network, fetch/submit only make sense once connected, and
/// the install prompt replaces the whole action row when no extension is
/// present.
#[derive(Debug, Default, Serialize, Deserialize, Clone, PartialEq)]
pub struct SessionView {
    pub extension_installed: bool,
    pub install_prompt: bool,
    pub connected: bool,
    pub account: Option<String>,
    pub network_name: String,
    /// None until the first chain probe or notification lands
    pub network_valid: Option<bool>,
    pub busy: bool,
    pub can_connect: bool,
    pub can_fetch: bool,
    pub can_submit: bool,
    pub total_records: Option<u64>,
    pub records: Vec<PersonRecord>,
    /// per-field marks from the last rejected or pending submission
    pub validation: Option<NameCheck>,
    pub error: Option<String>,
    pub notice: Option<String>,
}

struct EventStreams {
    accounts: EventStream<Vec<String>>,
    chain: EventStream<ChainId>,
}

/// busy latch held for the duration of one user action; released on drop so
/// early error returns always restore the idle state
struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// the connection/sync session
pub struct Session<W, L> {
    wallet: W,
    ledger: L,
    config: SessionConfig,
    model: RwLock<Model>,
    busy: AtomicBool,
    streams: Mutex<Option<EventStreams>>,
    stop: Notify,
}

impl<W: WalletProvider, L: RosterLedger> Session<W, L> {
    pub fn new(wallet: W, ledger: L, config: SessionConfig) -> Self {
        Self {
            wallet,
            ledger,
            config,
            model: RwLock::new(Model::default()),
            busy: AtomicBool::new(false),
            streams: Mutex::new(None),
            stop: Notify::new(),
        }
    }

    /// startup probe, runs once
    ///
    /// tolerates a missing extension: the session degrades to the install
    /// prompt and registers nothing. with an extension present the current
    /// chain is classified (a failed probe leaves validity unknown) and both
    /// change subscriptions are registered for the session's lifetime.
    pub async fn initialize(&self) {
        if !self.wallet.is_available() {
            tracing::warn!("wallet extension not detected");
            let mut model = self.model.write().await;
            model.wallet = WalletStatus::Missing;
            return;
        }

        let network = match self.wallet.chain_id().await {
            Ok(actual) => self.classify(actual),
            Err(e) => {
                tracing::warn!("chain id probe failed: {}", e);
                NetworkStatus::Unknown
            }
        };

        let accounts = self.wallet.subscribe_accounts();
        let chain = self.wallet.subscribe_chain();
        *self.streams.lock().await = Some(EventStreams { accounts, chain });

        let mut model = self.model.write().await;
        model.wallet = WalletStatus::Disconnected;
        model.network = network;
        tracing::debug!(
            "session initialized, expecting chain {}",
            self.config.network.chain_id
        );
    }

    /// request account access from the wallet
    ///
    /// the only path that establishes the initial connection. on success the
    /// first non-blank account becomes the connected identity; on rejection
    /// or provider failure the session reverts to disconnected with the
    /// error recorded for the shell.
    pub async fn connect(&self) -> Result<String> {
        let _busy = self.begin()?;
        {
            let mut model = self.model.write().await;
            if matches!(
                model.wallet,
                WalletStatus::Uninitialized | WalletStatus::Missing
            ) {
                return Err(SessionError::WalletUnavailable);
            }
            model.error = None;
            model.notice = None;
        }

        tracing::info!("requesting wallet accounts");
        match self.wallet.request_accounts().await {
            Ok(accounts) => {
                let account = accounts.into_iter().find(|a| !a.is_empty());
                let mut model = self.model.write().await;
                match account {
                    Some(account) => {
                        tracing::info!("wallet connected as {}", account);
                        model.wallet = WalletStatus::Connected {
                            account: account.clone(),
                        };
                        Ok(account)
                    }
                    None => {
                        model.wallet = WalletStatus::Disconnected;
                        let error = SessionError::Wallet(WalletError::Rejected);
                        model.error = Some(error.to_string());
                        Err(error)
                    }
                }
            }
            Err(e) => {
                tracing::warn!("wallet connect failed: {}", e);
                let mut model = self.model.write().await;
                model.wallet = WalletStatus::Disconnected;
                model.error = Some(e.to_string());
                Err(e.into())
            }
        }
    }

    /// read the full roster from the ledger
    ///
    /// reads stay sequential and ascending so the snapshot matches ledger
    /// order. the snapshot replaces the previous one only after every read
    /// succeeded; any failure aborts and keeps the old snapshot.
    pub async fn fetch_roster(&self) -> Result<RosterSnapshot> {
        let _busy = self.begin()?;
        self.require_ready().await?;
        {
            let mut model = self.model.write().await;
            model.error = None;
            model.notice = None;
        }

        tracing::debug!("fetching roster");
        let total = match self.ledger.record_count().await {
            Ok(total) => total,
            Err(e) => return Err(self.ledger_failed(e).await),
        };

        let mut records = Vec::with_capacity(total as usize);
        for index in 1..=total {
            match self.ledger.record_at(index).await {
                Ok(record) => records.push(record),
                Err(e) => return Err(self.ledger_failed(e).await),
            }
        }

        let snapshot = RosterSnapshot { records, total };
        let mut model = self.model.write().await;
        model.roster = Some(snapshot.clone());
        tracing::info!("fetched {} roster records", total);
        Ok(snapshot)
    }

    /// validate and submit a new record
    ///
    /// validation runs before any network call: an invalid pair records the
    /// per-field marks and returns without touching the ledger. names are
    /// submitted trimmed. the roster is not refetched on success; callers
    /// refresh explicitly.
    pub async fn submit_record(&self, first_name: &str, last_name: &str) -> Result<SubmitReceipt> {
        let _busy = self.begin()?;
        self.require_ready().await?;

        let check = validate_names(first_name, last_name);
        {
            let mut model = self.model.write().await;
            model.error = None;
            model.notice = None;
            model.validation = Some(check);
        }
        if !check.all_valid() {
            return Err(SessionError::InvalidInput(check));
        }

        let first_name = first_name.trim();
        let last_name = last_name.trim();
        tracing::info!("submitting record for {} {}", first_name, last_name);
        match self.ledger.submit_record(first_name, last_name).await {
            Ok(receipt) => {
                let mut model = self.model.write().await;
                model.validation = None;
                model.notice = Some("record submitted".into());
                tracing::info!("record accepted: {}", receipt.tx_hash);
                Ok(receipt)
            }
            Err(e) => Err(self.ledger_failed(e).await),
        }
    }

    /// accounts-changed notification
    ///
    /// not subject to the busy guard. an empty (or all-blank) account set
    /// forces a disconnect; a non-empty set makes its first entry the
    /// connected identity. ignored until the session is initialized with an
    /// extension present, since no subscription can exist before that.
    pub async fn on_accounts_changed(&self, accounts: Vec<String>) {
        let mut model = self.model.write().await;
        if matches!(
            model.wallet,
            WalletStatus::Uninitialized | WalletStatus::Missing
        ) {
            tracing::debug!("ignoring accounts notification before initialization");
            return;
        }
        match accounts.into_iter().find(|a| !a.is_empty()) {
            Some(account) => {
                tracing::info!("wallet account now {}", account);
                model.wallet = WalletStatus::Connected { account };
            }
            None => {
                tracing::info!("wallet reported no accounts, disconnecting");
                model.wallet = WalletStatus::Disconnected;
            }
        }
    }

    /// chain-changed notification; reclassifies network validity immediately,
    /// independent of any in-flight action
    pub async fn on_chain_changed(&self, actual: ChainId) {
        let network = self.classify(actual);
        if let NetworkStatus::Invalid { .. } = network {
            tracing::warn!("wallet switched to unexpected chain {}", actual);
        }
        let mut model = self.model.write().await;
        model.network = network;
    }

    /// drive the wallet subscriptions into the notification handlers
    ///
    /// returns once `shutdown` fires or the provider closes both streams.
    /// the streams are consumed: a second call without re-initializing is a
    /// no-op.
    pub async fn run_events(&self) {
        let Some(streams) = self.streams.lock().await.take() else {
            tracing::debug!("no wallet subscriptions to drive");
            return;
        };
        let EventStreams {
            mut accounts,
            mut chain,
        } = streams;

        let mut accounts_open = true;
        let mut chain_open = true;
        while accounts_open || chain_open {
            tokio::select! {
                _ = self.stop.notified() => break,
                event = accounts.next(), if accounts_open => match event {
                    Some(accounts) => self.on_accounts_changed(accounts).await,
                    None => accounts_open = false,
                },
                event = chain.next(), if chain_open => match event {
                    Some(actual) => self.on_chain_changed(actual).await,
                    None => chain_open = false,
                },
            }
        }
        // streams drop here, detaching both wallet listeners
    }

    /// detach both wallet listeners and stop a running event loop
    pub async fn shutdown(&self) {
        self.streams.lock().await.take();
        self.stop.notify_one();
    }

    /// shell-facing view of the current state
    pub async fn view(&self) -> SessionView {
        let model = self.model.read().await;
        let busy = self.busy.load(Ordering::Acquire);
        let installed = !matches!(
            model.wallet,
            WalletStatus::Uninitialized | WalletStatus::Missing
        );
        let connected = matches!(model.wallet, WalletStatus::Connected { .. });
        let network_valid = match model.network {
            NetworkStatus::Unknown => None,
            NetworkStatus::Valid => Some(true),
            NetworkStatus::Invalid { .. } => Some(false),
        };
        let on_network = network_valid == Some(true);

        SessionView {
            extension_installed: installed,
            install_prompt: matches!(model.wallet, WalletStatus::Missing),
            connected,
            account: match &model.wallet {
                WalletStatus::Connected { account } => Some(account.clone()),
                _ => None,
            },
            network_name: self.config.network.name.clone(),
            network_valid,
            busy,
            can_connect: installed && !connected && !busy && on_network,
            can_fetch: connected && !busy && on_network,
            can_submit: connected && !busy && on_network,
            total_records: model.roster.as_ref().map(|r| r.total),
            records: model
                .roster
                .as_ref()
                .map(|r| r.records.clone())
                .unwrap_or_default(),
            validation: model.validation,
            error: model.error.clone(),
            notice: model.notice.clone(),
        }
    }

    pub fn wallet(&self) -> &W {
        &self.wallet
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    pub async fn wallet_status(&self) -> WalletStatus {
        self.model.read().await.wallet.clone()
    }

    pub async fn network_status(&self) -> NetworkStatus {
        self.model.read().await.network
    }

    pub async fn roster(&self) -> Option<RosterSnapshot> {
        self.model.read().await.roster.clone()
    }

    /// acquire the busy latch or reject the dispatch
    fn begin(&self) -> Result<BusyGuard<'_>> {
        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            Ok(BusyGuard(&self.busy))
        } else {
            Err(SessionError::Busy)
        }
    }

    fn classify(&self, actual: ChainId) -> NetworkStatus {
        if actual == self.config.network.chain_id {
            NetworkStatus::Valid
        } else {
            NetworkStatus::Invalid { actual }
        }
    }

    /// connected-and-on-network precondition shared by fetch and submit
    async fn require_ready(&self) -> Result<()> {
        let model = self.model.read().await;
        match &model.wallet {
            WalletStatus::Uninitialized | WalletStatus::Missing => {
                return Err(SessionError::WalletUnavailable)
            }
            WalletStatus::Disconnected => return Err(SessionError::NotConnected),
            WalletStatus::Connected { .. } => {}
        }
        match model.network {
            NetworkStatus::Valid => Ok(()),
            NetworkStatus::Invalid { actual } => Err(SessionError::WrongNetwork {
                expected: self.config.network.chain_id,
                actual: Some(actual),
            }),
            NetworkStatus::Unknown => Err(SessionError::WrongNetwork {
                expected: self.config.network.chain_id,
                actual: None,
            }),
        }
    }

    async fn ledger_failed(&self, error: LedgerError) -> SessionError {
        tracing::warn!("ledger call failed: {}", error);
        let error = SessionError::Ledger(error);
        let mut model = self.model.write().await;
        model.error = Some(error.to_string());
        error
    }
}
