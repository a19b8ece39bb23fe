//! roster-core - wallet connection and roster sync core
//!
//! Business logic for a dapp that lists person records kept on a smart
//! contract and lets a connected wallet append new ones. The crate owns the
//! connection/sync state machine; presentation shells (web, egui, tui)
//! render its `SessionView` and stay free of wallet plumbing.
//!
//! Key pieces:
//! - `Session` - guarded actions (connect, fetch, submit) plus wallet
//!   change-notification handling
//! - `WalletProvider` / `RosterLedger` - injected capability traits, with
//!   in-crate mocks for tests and development
//! - `SessionView` - serializable render model with per-control enablement

pub mod config;
pub mod error;
pub mod ledger;
pub mod session;
pub mod validate;
pub mod wallet;

pub use config::{ChainId, NetworkConfig, SessionConfig, CHAIN_ID_ENV};
pub use error::{ConfigError, LedgerError, Result, SessionError, WalletError};
pub use ledger::{MockLedger, PersonRecord, RosterLedger, RosterSnapshot, SubmitReceipt};
pub use session::{NetworkStatus, Session, SessionView, WalletStatus};
pub use validate::{validate_names, NameCheck, MIN_NAME_CHARS};
pub use wallet::{EventStream, MockWallet, WalletProvider};
