//! wallet capability
//!
//! abstraction over the browser wallet extension (account access, chain id,
//! change notifications). the session never touches a global wallet object;
//! a provider is injected so shells can wire the real extension bridge and
//! tests can substitute a mock.

use std::sync::{Arc, Mutex};

use tokio::sync::{mpsc, Notify};

use crate::config::ChainId;
use crate::error::WalletError;

/// stream of change notifications from the wallet
///
/// dropping the stream detaches the listener: the provider observes the
/// closed channel and prunes its end of the subscription.
pub struct EventStream<T> {
    rx: mpsc::UnboundedReceiver<T>,
}

impl<T> EventStream<T> {
    /// build a stream plus the sender the provider keeps
    pub fn channel() -> (mpsc::UnboundedSender<T>, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        (tx, Self { rx })
    }

    /// next notification, or None once the provider side is gone
    pub async fn next(&mut self) -> Option<T> {
        self.rx.recv().await
    }
}

/// wallet capability trait
///
/// `request_accounts` may prompt the user and may be rejected; both queries
/// may fail if the extension misbehaves. subscriptions stay live until the
/// returned stream is dropped.
pub trait WalletProvider: Send + Sync {
    /// is the extension present at all
    fn is_available(&self) -> bool;

    /// ask the wallet for account access (eth_requestAccounts equivalent)
    fn request_accounts(
        &self,
    ) -> impl std::future::Future<Output = Result<Vec<String>, WalletError>> + Send;

    /// currently selected chain
    fn chain_id(&self) -> impl std::future::Future<Output = Result<ChainId, WalletError>> + Send;

    /// subscribe to account-set changes
    fn subscribe_accounts(&self) -> EventStream<Vec<String>>;

    /// subscribe to chain switches
    fn subscribe_chain(&self) -> EventStream<ChainId>;
}

/// mock wallet for testing/development
///
/// in real deployments the provider wraps the injected extension object
/// (via a WASM bridge or a walletconnect transport); the mock replays
/// configured answers and exposes emit hooks for the notification paths.
pub struct MockWallet {
    installed: bool,
    accounts: Vec<String>,
    chain: ChainId,
    reject_connect: bool,
    fail_chain_probe: bool,
    connect_gate: Option<Arc<Notify>>,
    account_subs: Mutex<Vec<mpsc::UnboundedSender<Vec<String>>>>,
    chain_subs: Mutex<Vec<mpsc::UnboundedSender<ChainId>>>,
}

impl MockWallet {
    /// extension present, no accounts authorized yet
    pub fn installed(chain: ChainId) -> Self {
        Self {
            installed: true,
            accounts: Vec::new(),
            chain,
            reject_connect: false,
            fail_chain_probe: false,
            connect_gate: None,
            account_subs: Mutex::new(Vec::new()),
            chain_subs: Mutex::new(Vec::new()),
        }
    }

    /// extension absent
    pub fn missing() -> Self {
        Self {
            installed: false,
            ..Self::installed(ChainId(0))
        }
    }

    /// accounts returned by a successful connect
    pub fn with_accounts<I, S>(mut self, accounts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.accounts = accounts.into_iter().map(Into::into).collect();
        self
    }

    /// make the connect prompt fail as a user rejection
    pub fn rejecting_connect(mut self) -> Self {
        self.reject_connect = true;
        self
    }

    /// make the startup chain-id probe fail
    pub fn failing_chain_probe(mut self) -> Self {
        self.fail_chain_probe = true;
        self
    }

    /// park `request_accounts` until the gate is notified, so tests can
    /// observe the session mid-connect
    pub fn holding_connect(mut self, gate: Arc<Notify>) -> Self {
        self.connect_gate = Some(gate);
        self
    }

    /// fire an accounts-changed notification at every live subscriber
    pub fn emit_accounts_changed(&self, accounts: Vec<String>) {
        let mut subs = self.account_subs.lock().unwrap();
        subs.retain(|tx| tx.send(accounts.clone()).is_ok());
    }

    /// fire a chain-changed notification at every live subscriber
    pub fn emit_chain_changed(&self, chain: ChainId) {
        let mut subs = self.chain_subs.lock().unwrap();
        subs.retain(|tx| tx.send(chain).is_ok());
    }

    /// number of attached listeners across both subscription kinds
    pub fn listener_count(&self) -> usize {
        let mut accounts = self.account_subs.lock().unwrap();
        let mut chains = self.chain_subs.lock().unwrap();
        accounts.retain(|tx| !tx.is_closed());
        chains.retain(|tx| !tx.is_closed());
        accounts.len() + chains.len()
    }
}

impl WalletProvider for MockWallet {
    fn is_available(&self) -> bool {
        self.installed
    }

    async fn request_accounts(&self) -> Result<Vec<String>, WalletError> {
        if let Some(gate) = &self.connect_gate {
            gate.notified().await;
        }
        if !self.installed {
            return Err(WalletError::Unavailable);
        }
        if self.reject_connect {
            return Err(WalletError::Rejected);
        }
        Ok(self.accounts.clone())
    }

    async fn chain_id(&self) -> Result<ChainId, WalletError> {
        if !self.installed {
            return Err(WalletError::Unavailable);
        }
        if self.fail_chain_probe {
            return Err(WalletError::Provider("chain id query failed".into()));
        }
        Ok(self.chain)
    }

    fn subscribe_accounts(&self) -> EventStream<Vec<String>> {
        let (tx, stream) = EventStream::channel();
        self.account_subs.lock().unwrap().push(tx);
        stream
    }

    fn subscribe_chain(&self) -> EventStream<ChainId> {
        let (tx, stream) = EventStream::channel();
        self.chain_subs.lock().unwrap().push(tx);
        stream
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_replays_configured_accounts() {
        let wallet = MockWallet::installed(ChainId(1)).with_accounts(["0xabc"]);
        assert!(wallet.is_available());
        assert_eq!(wallet.request_accounts().await.unwrap(), vec!["0xabc"]);
        assert_eq!(wallet.chain_id().await.unwrap(), ChainId(1));
    }

    #[tokio::test]
    async fn mock_rejection_paths() {
        let wallet = MockWallet::installed(ChainId(1)).rejecting_connect();
        assert_eq!(
            wallet.request_accounts().await.unwrap_err(),
            WalletError::Rejected
        );

        let missing = MockWallet::missing();
        assert!(!missing.is_available());
        assert_eq!(
            missing.request_accounts().await.unwrap_err(),
            WalletError::Unavailable
        );
    }

    #[tokio::test]
    async fn notifications_reach_subscribers() {
        let wallet = MockWallet::installed(ChainId(1));
        let mut accounts = wallet.subscribe_accounts();
        let mut chains = wallet.subscribe_chain();

        wallet.emit_accounts_changed(vec!["0xabc".into()]);
        wallet.emit_chain_changed(ChainId(5));

        assert_eq!(accounts.next().await.unwrap(), vec!["0xabc".to_string()]);
        assert_eq!(chains.next().await.unwrap(), ChainId(5));
    }

    #[tokio::test]
    async fn dropping_stream_detaches_listener() {
        let wallet = MockWallet::installed(ChainId(1));
        let accounts = wallet.subscribe_accounts();
        let chains = wallet.subscribe_chain();
        assert_eq!(wallet.listener_count(), 2);

        drop(accounts);
        drop(chains);
        assert_eq!(wallet.listener_count(), 0);

        // emitting into a fully detached wallet is a no-op
        wallet.emit_accounts_changed(vec![]);
    }
}
