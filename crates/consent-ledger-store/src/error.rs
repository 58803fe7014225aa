//! Error types for the store module.

use thiserror::Error;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error from SQLite.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// The store could not be reached or is in an unusable state.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A write was rejected by the host's optimistic concurrency check.
    #[error("write conflict on key {key}")]
    Conflict { key: String },

    /// Selector parsing or cursor failure.
    #[error("query error: {0}")]
    Query(String),

    /// Migration error.
    #[error("migration error: {0}")]
    Migration(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
