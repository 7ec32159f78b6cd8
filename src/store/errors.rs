//! # Store Errors

use thiserror::Error;

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors raised by a record store backend
#[derive(Debug, Error)]
pub enum StoreError {
    /// Filesystem failure preparing the database location
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Embedded SQLite failure
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// The remote database could not be reached or answered with a bad status
    #[error("Remote database request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The remote database rejected a statement
    #[error("Remote database error: {0}")]
    Remote(String),

    /// The remote database answered with a shape we do not understand
    #[error("Unexpected response from remote database: {0}")]
    Protocol(String),

    /// A stored row could not be decoded back into a record
    #[error("Corrupt record {id}: {reason}")]
    Corrupt { id: String, reason: String },

    /// The blocking task running a statement panicked or was cancelled
    #[error("Store task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    /// A writer panicked while holding the connection
    #[error("Store connection lock poisoned")]
    Poisoned,
}

impl StoreError {
    pub fn corrupt(id: impl Into<String>, reason: impl ToString) -> Self {
        Self::Corrupt {
            id: id.into(),
            reason: reason.to_string(),
        }
    }
}
