//! error types for the roster session

use thiserror::Error;

use crate::config::ChainId;
use crate::validate::NameCheck;

/// failures reported by the wallet capability
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum WalletError {
    #[error("wallet extension not available")]
    Unavailable,

    #[error("user rejected the request")]
    Rejected,

    #[error("provider error: {0}")]
    Provider(String),
}

/// failures reported by the ledger capability
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LedgerError {
    #[error("user rejected the transaction")]
    Rejected,

    #[error("read failed: {0}")]
    Read(String),

    #[error("submit failed: {0}")]
    Submit(String),
}

/// session-level errors surfaced to the presentation layer
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SessionError {
    #[error("wallet extension not installed")]
    WalletUnavailable,

    #[error("another operation is in flight")]
    Busy,

    #[error("wallet not connected")]
    NotConnected,

    #[error("wrong network: expected chain id {expected}")]
    WrongNetwork {
        expected: ChainId,
        actual: Option<ChainId>,
    },

    #[error("name validation failed: {0:?}")]
    InvalidInput(NameCheck),

    #[error(transparent)]
    Wallet(#[from] WalletError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// configuration errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid chain id: {0:?}")]
    InvalidChainId(String),

    #[error("missing environment variable {0}")]
    MissingEnv(&'static str),
}

pub type Result<T> = std::result::Result<T, SessionError>;
