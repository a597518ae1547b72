//! Error types for the points ledger

use thiserror::Error;

/// Result type for ledger operations
pub type Result<T> = std::result::Result<T, Error>;

/// Ledger errors
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed or missing input, detected before any mutation
    #[error("Validation error: {0}")]
    Validation(String),

    /// Global total is below the requested spend
    #[error("Not enough points: requested {requested}, available {available}")]
    InsufficientBalance {
        /// Points requested by the caller
        requested: i64,
        /// Global total across all payers at the time of the request
        available: i64,
    },

    /// A points sum left the `i64` range
    #[error("Points out of range: {0}")]
    Overflow(String),

    /// Storage error (RocksDB, batch commit, unknown row)
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    /// Concurrency error (actor mailbox closed, etc.)
    #[error("Concurrency error: {0}")]
    Concurrency(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether the caller can fix this by changing its input.
    ///
    /// Boundary adapters map these to 4xx responses; everything else is a
    /// system fault.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Error::Validation(_) | Error::InsufficientBalance { .. } | Error::Overflow(_)
        )
    }

    /// Whether this is a storage-level failure
    pub fn is_storage_error(&self) -> bool {
        matches!(self, Error::Storage(_) | Error::Serialization(_) | Error::Io(_))
    }
}

impl From<rocksdb::Error> for Error {
    fn from(err: rocksdb::Error) -> Self {
        Error::Storage(err.to_string())
    }
}
