//! Store traits: the abstract interface over the external state store and
//! rich-query engine.
//!
//! The consent engines are storage-agnostic. Implementations include SQLite
//! and in-memory; a ledger host plugs in its own adapter.

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::Result;

/// Key-value access to the state store.
///
/// Every method may fail with an I/O or connectivity error, which callers
/// must propagate. Writes are speculative until the host commits them: a
/// host adapter may reject a write with `StoreError::Conflict`.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Read the value at `key`, or `None` if absent.
    async fn get_state(&self, key: &str) -> Result<Option<Bytes>>;

    /// Write `value` at `key`, replacing any previous value.
    async fn put_state(&self, key: &str, value: Bytes) -> Result<()>;

    /// Delete `key`. Deleting an absent key is not an error.
    async fn delete_state(&self, key: &str) -> Result<()>;
}

/// One query result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyValue {
    pub key: String,
    pub value: Bytes,
}

/// A rich query: selector plus optional pagination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryRequest {
    /// Query-language string, passed to the engine as-is.
    pub selector: String,
    /// Only return keys strictly after this one.
    pub start_after: Option<String>,
    /// Maximum number of results.
    pub limit: Option<usize>,
}

impl QueryRequest {
    /// An unpaginated query.
    pub fn new(selector: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
            start_after: None,
            limit: None,
        }
    }

    /// Resume after a bookmark.
    pub fn after(mut self, bookmark: impl Into<String>) -> Self {
        self.start_after = Some(bookmark.into());
        self
    }

    /// Cap the number of results.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// A lazy, forward-only, non-restartable result cursor.
///
/// Results arrive in key order. Callers must call [`QueryCursor::close`] on
/// every exit path; `close` is idempotent.
#[async_trait]
pub trait QueryCursor: Send {
    /// Advance to the next result, or `None` when exhausted.
    async fn next(&mut self) -> Result<Option<KeyValue>>;

    /// Release the cursor's resources.
    async fn close(&mut self) -> Result<()>;
}

/// Selector-based document search over the state store.
#[async_trait]
pub trait RichQuery: Send + Sync {
    /// Open a cursor over the records matching `request`.
    async fn execute_query(&self, request: &QueryRequest) -> Result<Box<dyn QueryCursor>>;
}
