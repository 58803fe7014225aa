//! Error types for the Consent Ledger Core.

use thiserror::Error;

use crate::record::DocType;

/// Core errors: argument validation and record codec failures.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("incorrect number of arguments: expected {expected}, got {got}")]
    WrongArity { expected: usize, got: usize },

    #[error("argument {position} ({name}) must be a non-empty string")]
    EmptyArgument { position: usize, name: &'static str },

    #[error("argument {name} must not contain the reserved character '{separator}'")]
    ReservedCharacter { name: &'static str, separator: char },

    #[error("invalid consent action {0:?}: expected g/grant or r/revoke")]
    InvalidAction(String),

    #[error("column id list contains an empty entry")]
    EmptyColumnId,

    #[error("too many column ids: {got} exceeds the limit of {limit}")]
    TooManyColumns { got: usize, limit: usize },

    #[error("invalid page size {0:?}: expected a positive integer")]
    InvalidPageSize(String),

    #[error("encoding error: {0}")]
    EncodingError(String),

    #[error("decoding error: {0}")]
    DecodingError(String),

    #[error("unexpected record kind: expected {expected}, found {found}")]
    UnexpectedDocType { expected: DocType, found: DocType },
}

impl CoreError {
    /// Whether this error was caused by caller-supplied arguments.
    pub fn is_argument_error(&self) -> bool {
        matches!(
            self,
            CoreError::WrongArity { .. }
                | CoreError::EmptyArgument { .. }
                | CoreError::ReservedCharacter { .. }
                | CoreError::InvalidAction(_)
                | CoreError::EmptyColumnId
                | CoreError::TooManyColumns { .. }
                | CoreError::InvalidPageSize(_)
        )
    }
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
