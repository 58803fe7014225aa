//! In-memory implementation of the store traits.
//!
//! This is primarily for testing and embedding. It has the same semantics as
//! SQLite but keeps everything in memory with no persistence.

use std::collections::{BTreeMap, VecDeque};
use std::ops::Bound;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::{Result, StoreError};
use crate::selector::Selector;
use crate::traits::{KeyValue, QueryCursor, QueryRequest, RichQuery, StateStore};

/// Number of records a cursor pulls from the map per refill.
const CURSOR_BATCH: usize = 64;

type State = BTreeMap<String, Bytes>;

/// Counts of store calls, for asserting which calls wrote.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStats {
    pub gets: u64,
    pub puts: u64,
    pub deletes: u64,
}

impl StoreStats {
    /// Puts plus deletes.
    pub fn writes(&self) -> u64 {
        self.puts + self.deletes
    }
}

#[derive(Default)]
struct Counters {
    gets: AtomicU64,
    puts: AtomicU64,
    deletes: AtomicU64,
}

/// In-memory store implementation.
///
/// All data is lost when the last clone is dropped. Clones share state.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<RwLock<State>>,
    counters: Arc<Counters>,
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys in the store.
    pub fn len(&self) -> Result<usize> {
        Ok(self.read()?.len())
    }

    /// Whether the store holds no keys.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.read()?.is_empty())
    }

    /// All keys starting with `prefix`, in key order.
    pub fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        Ok(self
            .read()?
            .range::<str, _>((Bound::Included(prefix), Bound::Unbounded))
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, _)| key.clone())
            .collect())
    }

    /// Snapshot of call counts since creation.
    pub fn stats(&self) -> StoreStats {
        StoreStats {
            gets: self.counters.gets.load(Ordering::Relaxed),
            puts: self.counters.puts.load(Ordering::Relaxed),
            deletes: self.counters.deletes.load(Ordering::Relaxed),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, State>> {
        read_state(&self.state)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, State>> {
        self.state
            .write()
            .map_err(|e| StoreError::Unavailable(format!("lock poisoned: {}", e)))
    }
}

fn read_state(state: &RwLock<State>) -> Result<RwLockReadGuard<'_, State>> {
    state
        .read()
        .map_err(|e| StoreError::Unavailable(format!("lock poisoned: {}", e)))
}

#[async_trait]
impl StateStore for MemoryStore {
    async fn get_state(&self, key: &str) -> Result<Option<Bytes>> {
        self.counters.gets.fetch_add(1, Ordering::Relaxed);
        Ok(self.read()?.get(key).cloned())
    }

    async fn put_state(&self, key: &str, value: Bytes) -> Result<()> {
        self.counters.puts.fetch_add(1, Ordering::Relaxed);
        self.write()?.insert(key.to_string(), value);
        Ok(())
    }

    async fn delete_state(&self, key: &str) -> Result<()> {
        self.counters.deletes.fetch_add(1, Ordering::Relaxed);
        self.write()?.remove(key);
        Ok(())
    }
}

#[async_trait]
impl RichQuery for MemoryStore {
    async fn execute_query(&self, request: &QueryRequest) -> Result<Box<dyn QueryCursor>> {
        let selector = Selector::parse(&request.selector)?;
        Ok(Box::new(MemoryCursor {
            state: Arc::clone(&self.state),
            selector,
            last_key: request.start_after.clone(),
            remaining: request.limit,
            buffer: VecDeque::new(),
            exhausted: false,
            closed: false,
        }))
    }
}

/// Cursor over a live `MemoryStore`.
///
/// Reads the map in key-ordered batches, so writes behind the cursor
/// position are not seen and writes ahead of it are.
struct MemoryCursor {
    state: Arc<RwLock<State>>,
    selector: Selector,
    last_key: Option<String>,
    remaining: Option<usize>,
    buffer: VecDeque<KeyValue>,
    exhausted: bool,
    closed: bool,
}

impl MemoryCursor {
    fn refill(&mut self) -> Result<()> {
        let state = read_state(&self.state)?;
        let lower = match &self.last_key {
            Some(key) => Bound::Excluded(key.as_str()),
            None => Bound::Unbounded,
        };

        for (key, value) in state.range::<str, _>((lower, Bound::Unbounded)) {
            self.last_key = Some(key.clone());
            if self.selector.matches(value) {
                self.buffer.push_back(KeyValue {
                    key: key.clone(),
                    value: value.clone(),
                });
                if self.buffer.len() == CURSOR_BATCH {
                    return Ok(());
                }
            }
        }
        self.exhausted = true;
        Ok(())
    }
}

#[async_trait]
impl QueryCursor for MemoryCursor {
    async fn next(&mut self) -> Result<Option<KeyValue>> {
        if self.closed {
            return Err(StoreError::Query("cursor is closed".into()));
        }
        if self.remaining == Some(0) {
            return Ok(None);
        }
        if self.buffer.is_empty() && !self.exhausted {
            self.refill()?;
        }

        let next = self.buffer.pop_front();
        if next.is_some() {
            if let Some(remaining) = self.remaining.as_mut() {
                *remaining -= 1;
            }
        }
        Ok(next)
    }

    async fn close(&mut self) -> Result<()> {
        self.closed = true;
        self.buffer.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(owner: &str) -> Bytes {
        Bytes::from(format!(r#"{{"docType":"consentGrant","r_id":"{}"}}"#, owner))
    }

    async fn drain(cursor: &mut Box<dyn QueryCursor>) -> Vec<String> {
        let mut keys = Vec::new();
        while let Some(kv) = cursor.next().await.unwrap() {
            keys.push(kv.key);
        }
        keys
    }

    #[tokio::test]
    async fn test_memory_store_basic() {
        let store = MemoryStore::new();

        assert_eq!(store.get_state("k1").await.unwrap(), None);
        store.put_state("k1", doc("r1")).await.unwrap();
        assert_eq!(store.get_state("k1").await.unwrap(), Some(doc("r1")));

        store.delete_state("k1").await.unwrap();
        assert_eq!(store.get_state("k1").await.unwrap(), None);

        // Deleting an absent key is fine
        store.delete_state("k1").await.unwrap();

        let stats = store.stats();
        assert_eq!(stats.gets, 3);
        assert_eq!(stats.puts, 1);
        assert_eq!(stats.deletes, 2);
    }

    #[tokio::test]
    async fn test_keys_with_prefix() {
        let store = MemoryStore::new();
        for key in ["grant/a", "grant/b", "revoke/a", "grantx"] {
            store.put_state(key, doc("r1")).await.unwrap();
        }

        let keys = store.keys_with_prefix("grant/").unwrap();
        assert_eq!(keys, vec!["grant/a", "grant/b"]);
    }

    #[tokio::test]
    async fn test_query_in_key_order() {
        let store = MemoryStore::new();
        store.put_state("k3", doc("r1")).await.unwrap();
        store.put_state("k1", doc("r1")).await.unwrap();
        store.put_state("k2", doc("r2")).await.unwrap();
        store.put_state("k4", doc("r1")).await.unwrap();

        let request = QueryRequest::new(r#"{"selector":{"r_id":"r1"}}"#);
        let mut cursor = store.execute_query(&request).await.unwrap();
        assert_eq!(drain(&mut cursor).await, vec!["k1", "k3", "k4"]);
        cursor.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_query_pagination() {
        let store = MemoryStore::new();
        for i in 0..5 {
            store.put_state(&format!("k{}", i), doc("r1")).await.unwrap();
        }

        let request = QueryRequest::new(r#"{"selector":{}}"#).after("k1").limit(2);
        let mut cursor = store.execute_query(&request).await.unwrap();
        assert_eq!(drain(&mut cursor).await, vec!["k2", "k3"]);
    }

    #[tokio::test]
    async fn test_query_spans_batches() {
        let store = MemoryStore::new();
        for i in 0..(CURSOR_BATCH * 2 + 3) {
            store.put_state(&format!("k{:04}", i), doc("r1")).await.unwrap();
        }

        let request = QueryRequest::new(r#"{"selector":{"r_id":"r1"}}"#);
        let mut cursor = store.execute_query(&request).await.unwrap();
        let keys = drain(&mut cursor).await;

        assert_eq!(keys.len(), CURSOR_BATCH * 2 + 3);
        assert!(keys.windows(2).all(|w| w[0] < w[1]));
    }

    #[tokio::test]
    async fn test_closed_cursor_fails() {
        let store = MemoryStore::new();
        store.put_state("k1", doc("r1")).await.unwrap();

        let mut cursor = store
            .execute_query(&QueryRequest::new(r#"{"selector":{}}"#))
            .await
            .unwrap();
        cursor.close().await.unwrap();
        cursor.close().await.unwrap();
        assert!(cursor.next().await.is_err());
    }

    #[tokio::test]
    async fn test_bad_selector_fails_to_open() {
        let store = MemoryStore::new();
        let result = store.execute_query(&QueryRequest::new("{}")).await;
        assert!(matches!(result, Err(StoreError::Query(_))));
    }
}
