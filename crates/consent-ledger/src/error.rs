//! Error types for the Ledger.

use consent_ledger_core::CoreError;
use consent_ledger_engine::EngineError;
use consent_ledger_store::StoreError;
use thiserror::Error;

/// Errors that can occur during Ledger operations.
///
/// Every error aborts the call. Nothing is retried and partial progress is
/// not reported.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Malformed invocation arguments.
    #[error("invalid argument: {0}")]
    InvalidArgument(CoreError),

    /// The state store or query engine failed.
    #[error("store unavailable: {0}")]
    StoreUnavailable(#[from] StoreError),

    /// Stored bytes did not decode as the expected record.
    #[error("decode failure: {0}")]
    DecodeFailure(String),

    /// A record or payload failed to serialize.
    #[error("encode failure: {0}")]
    EncodeFailure(String),

    /// A well-formed check found no qualifying access.
    #[error("consent not found")]
    ConsentNotFound,

    /// Dispatch miss.
    #[error("unknown function: {0}")]
    UnknownFunction(String),

    /// The configuration failed to parse or holds an unusable value.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A rich query was requested but no query engine is configured.
    #[error("no rich-query engine configured")]
    QueryEngineMissing,
}

impl From<CoreError> for LedgerError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::EncodingError(msg) => LedgerError::EncodeFailure(msg),
            CoreError::DecodingError(msg) => LedgerError::DecodeFailure(msg),
            err @ CoreError::UnexpectedDocType { .. } => {
                LedgerError::DecodeFailure(err.to_string())
            }
            err => LedgerError::InvalidArgument(err),
        }
    }
}

impl From<EngineError> for LedgerError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Store(e) => LedgerError::StoreUnavailable(e),
            EngineError::Decode { key, source } => {
                LedgerError::DecodeFailure(format!("{}: {}", key, source))
            }
            EngineError::Encode { key, source } => {
                LedgerError::EncodeFailure(format!("{}: {}", key, source))
            }
            EngineError::ConsentNotFound => LedgerError::ConsentNotFound,
        }
    }
}

impl From<serde_json::Error> for LedgerError {
    fn from(err: serde_json::Error) -> Self {
        LedgerError::EncodeFailure(err.to_string())
    }
}

/// Result type for Ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;
