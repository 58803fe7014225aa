//! Fault injection for stores and query cursors.
//!
//! [`FaultyStore`] wraps a real store and fails selected calls.
//! [`ScriptedQuery`] plays back a fixed result sequence, optionally failing
//! part-way, and counts how often its cursors are closed.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use consent_ledger_store::{
    KeyValue, QueryCursor, QueryRequest, Result, RichQuery, StateStore, StoreError,
};

// ─────────────────────────────────────────────────────────────────────────────
// FaultyStore
// ─────────────────────────────────────────────────────────────────────────────

/// A store wrapper that fails selected calls with [`StoreError::Unavailable`].
pub struct FaultyStore<S> {
    inner: S,
    writes_allowed: Option<usize>,
    failing_prefix: Option<String>,
    fail_reads: bool,
    writes: AtomicUsize,
}

impl<S: StateStore> FaultyStore<S> {
    /// Wrap `inner` with no faults.
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            writes_allowed: None,
            failing_prefix: None,
            fail_reads: false,
            writes: AtomicUsize::new(0),
        }
    }

    /// Let `n` puts/deletes through, then fail every later one.
    pub fn fail_writes_after(mut self, n: usize) -> Self {
        self.writes_allowed = Some(n);
        self
    }

    /// Fail every call on a key starting with `prefix`.
    pub fn fail_keys_with_prefix(mut self, prefix: &str) -> Self {
        self.failing_prefix = Some(prefix.to_string());
        self
    }

    /// Fail every get.
    pub fn fail_reads(mut self) -> Self {
        self.fail_reads = true;
        self
    }

    /// The wrapped store.
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Writes that reached the wrapped store.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn check_key(&self, key: &str) -> Result<()> {
        match &self.failing_prefix {
            Some(prefix) if key.starts_with(prefix.as_str()) => Err(injected(key)),
            _ => Ok(()),
        }
    }

    fn check_write(&self, key: &str) -> Result<()> {
        self.check_key(key)?;
        if let Some(allowed) = self.writes_allowed {
            if self.writes.load(Ordering::SeqCst) >= allowed {
                return Err(injected(key));
            }
        }
        Ok(())
    }
}

fn injected(key: &str) -> StoreError {
    StoreError::Unavailable(format!("injected fault at {}", key))
}

#[async_trait]
impl<S: StateStore> StateStore for FaultyStore<S> {
    async fn get_state(&self, key: &str) -> Result<Option<Bytes>> {
        if self.fail_reads {
            return Err(injected(key));
        }
        self.check_key(key)?;
        self.inner.get_state(key).await
    }

    async fn put_state(&self, key: &str, value: Bytes) -> Result<()> {
        self.check_write(key)?;
        self.inner.put_state(key, value).await?;
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn delete_state(&self, key: &str) -> Result<()> {
        self.check_write(key)?;
        self.inner.delete_state(key).await?;
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// ScriptedQuery
// ─────────────────────────────────────────────────────────────────────────────

/// One step of a scripted cursor.
#[derive(Debug, Clone)]
pub enum Step {
    /// Yield a result.
    Yield(KeyValue),
    /// Fail the `next` call with a query error.
    Fail(String),
}

impl Step {
    /// A result with a JSON document value.
    pub fn record(key: &str, json: &str) -> Self {
        Step::Yield(KeyValue {
            key: key.to_string(),
            value: Bytes::from(json.to_string()),
        })
    }
}

/// A query engine that ignores the selector and replays a script.
#[derive(Debug, Default)]
pub struct ScriptedQuery {
    steps: Vec<Step>,
    fail_open: bool,
    fail_close: bool,
    opened: Arc<AtomicUsize>,
    closed: Arc<AtomicUsize>,
}

impl ScriptedQuery {
    pub fn new(steps: Vec<Step>) -> Self {
        Self {
            steps,
            ..Self::default()
        }
    }

    /// Fail `execute_query` itself.
    pub fn fail_open(mut self) -> Self {
        self.fail_open = true;
        self
    }

    /// Fail every cursor `close`.
    pub fn fail_close(mut self) -> Self {
        self.fail_close = true;
        self
    }

    /// Cursors opened so far.
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    /// Cursors closed at least once so far.
    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RichQuery for ScriptedQuery {
    async fn execute_query(&self, _request: &QueryRequest) -> Result<Box<dyn QueryCursor>> {
        if self.fail_open {
            return Err(StoreError::Query("injected open failure".into()));
        }
        self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(ScriptedCursor {
            steps: self.steps.iter().cloned().collect(),
            fail_close: self.fail_close,
            closed: Arc::clone(&self.closed),
            is_closed: false,
        }))
    }
}

/// Cursor replaying a [`ScriptedQuery`] script.
pub struct ScriptedCursor {
    steps: VecDeque<Step>,
    fail_close: bool,
    closed: Arc<AtomicUsize>,
    is_closed: bool,
}

#[async_trait]
impl QueryCursor for ScriptedCursor {
    async fn next(&mut self) -> Result<Option<KeyValue>> {
        if self.is_closed {
            return Err(StoreError::Query("cursor is closed".into()));
        }
        match self.steps.pop_front() {
            Some(Step::Yield(kv)) => Ok(Some(kv)),
            Some(Step::Fail(msg)) => Err(StoreError::Query(msg)),
            None => Ok(None),
        }
    }

    async fn close(&mut self) -> Result<()> {
        if !self.is_closed {
            self.is_closed = true;
            self.closed.fetch_add(1, Ordering::SeqCst);
        }
        if self.fail_close {
            return Err(StoreError::Query("injected close failure".into()));
        }
        Ok(())
    }
}
