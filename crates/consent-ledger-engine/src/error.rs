//! Error types for the consent engines.

use consent_ledger_core::CoreError;
use consent_ledger_store::StoreError;
use thiserror::Error;

/// Errors that can occur while checking or updating consent.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A get/put/delete failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Stored bytes did not decode as the expected record.
    #[error("failed to decode record at {key}: {source}")]
    Decode {
        key: String,
        #[source]
        source: CoreError,
    },

    /// A record failed to serialize.
    #[error("failed to encode record for {key}: {source}")]
    Encode {
        key: String,
        #[source]
        source: CoreError,
    },

    /// A well-formed check found no qualifying access in any scope.
    #[error("consent not found")]
    ConsentNotFound,
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;
