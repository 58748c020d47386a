//! Error types for the marketplace ledger

use rust_decimal::Decimal;
use thiserror::Error;

/// Result type for marketplace operations
pub type Result<T> = std::result::Result<T, Error>;

/// Marketplace errors
#[derive(Error, Debug)]
pub enum Error {
    /// Caller is not the owner of an owner-only operation
    #[error("Unauthorized: caller {0} is not the owner")]
    Unauthorized(String),

    /// Referenced item does not exist
    #[error("Item not found: {0}")]
    ItemNotFound(u64),

    /// Purchase attempted with zero remaining stock
    #[error("Item out of stock: {0}")]
    OutOfStock(u64),

    /// Attached payment does not exactly equal the item cost
    #[error("Invalid payment: expected {expected}, paid {paid}")]
    InvalidPayment {
        /// The listed item cost
        expected: Decimal,
        /// The payment that was attached
        paid: Decimal,
    },

    /// Listing rejected before any state change
    #[error("Invalid listing: {0}")]
    InvalidListing(String),

    /// Funds transfer during withdrawal could not complete
    #[error("Transfer failed: {0}")]
    TransferFailure(String),

    /// Storage error (RocksDB)
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    /// Concurrency error (actor mailbox closed, etc.)
    #[error("Concurrency error: {0}")]
    Concurrency(String),

    /// Metrics registration error
    #[error("Metrics error: {0}")]
    Metrics(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl From<rocksdb::Error> for Error {
    fn from(err: rocksdb::Error) -> Self {
        Error::Storage(err.to_string())
    }
}

impl From<prometheus::Error> for Error {
    fn from(err: prometheus::Error) -> Self {
        Error::Metrics(err.to_string())
    }
}

impl From<String> for Error {
    fn from(msg: String) -> Self {
        Error::Other(msg)
    }
}

impl From<&str> for Error {
    fn from(msg: &str) -> Self {
        Error::Other(msg.to_string())
    }
}
