//! Error types shared across the ledger, contract and storage layers

use thiserror::Error;

/// A single rejected input field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Validation error in {field}: {reason}")]
pub struct ValidationError {
    pub field: String,
    pub reason: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ValidationError {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Errors raised by the SQLite store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors surfaced by the ledger and the sales contract.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("{}", .0.reason)]
    Validation(#[from] ValidationError),
    #[error("Seller {0} is not registered. Please register first.")]
    SellerNotRegistered(String),
    #[error("Seller {0} is already registered")]
    SellerAlreadyRegistered(String),
    #[error("Seller {0} not found")]
    SellerNotFound(String),
    #[error("Sale {0} not found")]
    SaleNotFound(u64),
    #[error("Invalid wallet address: {0}")]
    InvalidWallet(String),
    #[error("Invalid chain: {0}")]
    InvalidChain(String),
    #[error("Arithmetic overflow while updating {0}")]
    Overflow(&'static str),
    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),
    #[error("Mining task failed: {0}")]
    Mining(String),
}

pub type LedgerResult<T> = Result<T, LedgerError>;

/// Invalid or unparsable configuration values.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {reason}")]
    InvalidValue { key: String, reason: String },
}
