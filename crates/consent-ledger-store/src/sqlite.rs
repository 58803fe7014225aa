//! SQLite implementation of the store traits.
//!
//! This is the persistent backend for running the consent engines outside a
//! ledger host. It uses rusqlite with bundled SQLite, wrapped in async via
//! `tokio::task::spawn_blocking`. Rich queries are translated to
//! `json_extract` comparisons over the stored JSON values.

use std::collections::VecDeque;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use bytes::Bytes;
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};

use crate::error::{Result, StoreError};
use crate::migration::{self, now_millis};
use crate::selector::{Scalar, Selector};
use crate::traits::{KeyValue, QueryCursor, QueryRequest, RichQuery, StateStore};

/// Rows fetched per cursor refill.
const CURSOR_BATCH: usize = 64;

/// SQLite-based store implementation.
///
/// Thread-safe via internal Mutex. All operations use spawn_blocking
/// to avoid blocking the async runtime.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file and runs migrations if it doesn't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut conn = Connection::open(path)?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory SQLite database.
    ///
    /// Useful for testing.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run a blocking operation on the connection.
    async fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        run_blocking(Arc::clone(&self.conn), f).await
    }
}

async fn run_blocking<F, T>(conn: Arc<Mutex<Connection>>, f: F) -> Result<T>
where
    F: FnOnce(&Connection) -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        let conn = lock(&conn)?;
        f(&conn)
    })
    .await
    .map_err(|e| StoreError::Unavailable(format!("spawn_blocking failed: {}", e)))?
}

fn lock(conn: &Mutex<Connection>) -> Result<MutexGuard<'_, Connection>> {
    conn.lock()
        .map_err(|e| StoreError::Unavailable(format!("mutex poisoned: {}", e)))
}

#[async_trait]
impl StateStore for SqliteStore {
    async fn get_state(&self, key: &str) -> Result<Option<Bytes>> {
        let key = key.to_string();
        self.with_conn(move |conn| {
            let value: Option<Vec<u8>> = conn
                .query_row(
                    "SELECT value FROM state WHERE key = ?1",
                    params![key],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(value.map(Bytes::from))
        })
        .await
    }

    async fn put_state(&self, key: &str, value: Bytes) -> Result<()> {
        let key = key.to_string();
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO state (key, value, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE SET
                    value = excluded.value,
                    updated_at = excluded.updated_at",
                params![key, value.as_ref(), now_millis()],
            )?;
            Ok(())
        })
        .await
    }

    async fn delete_state(&self, key: &str) -> Result<()> {
        let key = key.to_string();
        self.with_conn(move |conn| {
            conn.execute("DELETE FROM state WHERE key = ?1", params![key])?;
            Ok(())
        })
        .await
    }
}

#[async_trait]
impl RichQuery for SqliteStore {
    async fn execute_query(&self, request: &QueryRequest) -> Result<Box<dyn QueryCursor>> {
        let selector = Selector::parse(&request.selector)?;
        Ok(Box::new(SqliteCursor {
            conn: Arc::clone(&self.conn),
            sql: Arc::new(selector_sql(&selector)),
            bindings: Arc::new(selector_bindings(&selector)),
            last_key: request.start_after.clone(),
            remaining: request.limit,
            buffer: VecDeque::new(),
            exhausted: false,
            closed: false,
        }))
    }
}

/// Build the batch query for a selector.
///
/// Parameters: `?1` resume key (nullable), then one (path, value) pair per
/// condition, then the batch limit. Each condition also checks the JSON type
/// at its path, so `true` never equals `1` and containers never match.
fn selector_sql(selector: &Selector) -> String {
    let doc = "CAST(value AS TEXT)";
    let mut sql = format!(
        "SELECT key, value FROM state WHERE (?1 IS NULL OR key > ?1) AND json_valid({doc})"
    );
    let mut next_param = 2;
    for condition in &selector.conditions {
        let (path, value) = (next_param, next_param + 1);
        let types = json_types(&condition.value);
        let guard =
            format!("json_type({doc}) = 'object' AND json_type({doc}, ?{path}) IN ({types})");
        sql.push_str(&format!(
            " AND (CASE WHEN {guard} THEN json_extract({doc}, ?{path}) END) = ?{value}"
        ));
        next_param += 2;
    }
    sql.push_str(&format!(" ORDER BY key LIMIT ?{}", next_param));
    sql
}

/// `json_type` names a scalar may compare equal to.
fn json_types(value: &Scalar) -> &'static str {
    match value {
        Scalar::String(_) => "'text'",
        Scalar::Integer(_) | Scalar::Float(_) => "'integer', 'real'",
        Scalar::Bool(true) => "'true'",
        Scalar::Bool(false) => "'false'",
    }
}

fn selector_bindings(selector: &Selector) -> Vec<SqlValue> {
    let mut bindings = Vec::with_capacity(selector.conditions.len() * 2);
    for condition in &selector.conditions {
        bindings.push(SqlValue::Text(condition.json_path()));
        bindings.push(match &condition.value {
            Scalar::String(s) => SqlValue::Text(s.clone()),
            Scalar::Integer(i) => SqlValue::Integer(*i),
            Scalar::Float(f) => SqlValue::Real(*f),
            Scalar::Bool(b) => SqlValue::Integer(i64::from(*b)),
        });
    }
    bindings
}

/// Cursor reading the state table in key-ordered batches.
struct SqliteCursor {
    conn: Arc<Mutex<Connection>>,
    sql: Arc<String>,
    bindings: Arc<Vec<SqlValue>>,
    last_key: Option<String>,
    remaining: Option<usize>,
    buffer: VecDeque<KeyValue>,
    exhausted: bool,
    closed: bool,
}

impl SqliteCursor {
    async fn refill(&mut self) -> Result<()> {
        let batch = self.remaining.map_or(CURSOR_BATCH, |r| r.min(CURSOR_BATCH));
        let sql = Arc::clone(&self.sql);
        let bindings = Arc::clone(&self.bindings);
        let last_key = self.last_key.clone();

        let rows = run_blocking(Arc::clone(&self.conn), move |conn| {
            let mut params = Vec::with_capacity(bindings.len() + 2);
            params.push(last_key.map_or(SqlValue::Null, SqlValue::Text));
            params.extend(bindings.iter().cloned());
            params.push(SqlValue::Integer(batch as i64));

            let mut stmt = conn.prepare_cached(&sql)?;
            let rows = stmt
                .query_map(params_from_iter(params), |row| {
                    Ok(KeyValue {
                        key: row.get(0)?,
                        value: Bytes::from(row.get::<_, Vec<u8>>(1)?),
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
        .await?;

        if rows.len() < batch {
            self.exhausted = true;
        }
        if let Some(last) = rows.last() {
            self.last_key = Some(last.key.clone());
        }
        self.buffer.extend(rows);
        Ok(())
    }
}

#[async_trait]
impl QueryCursor for SqliteCursor {
    async fn next(&mut self) -> Result<Option<KeyValue>> {
        if self.closed {
            return Err(StoreError::Query("cursor is closed".into()));
        }
        if self.remaining == Some(0) {
            return Ok(None);
        }
        if self.buffer.is_empty() && !self.exhausted {
            self.refill().await?;
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
    use crate::memory::MemoryStore;

    fn grant(role: &str, user: &str) -> Bytes {
        Bytes::from(format!(
            r#"{{"docType":"consentGrant","r_id":"{}","u_ids":{{"{}":1}}}}"#,
            role, user
        ))
    }

    async fn query_keys(store: &dyn RichQuery, request: QueryRequest) -> Vec<String> {
        let mut cursor = store.execute_query(&request).await.unwrap();
        let mut keys = Vec::new();
        while let Some(kv) = cursor.next().await.unwrap() {
            keys.push(kv.key);
        }
        cursor.close().await.unwrap();
        keys
    }

    #[tokio::test]
    async fn test_put_get_delete() {
        let store = SqliteStore::open_memory().unwrap();

        assert_eq!(store.get_state("k1").await.unwrap(), None);

        store.put_state("k1", grant("r1", "alice")).await.unwrap();
        store.put_state("k1", grant("r2", "alice")).await.unwrap();
        assert_eq!(store.get_state("k1").await.unwrap(), Some(grant("r2", "alice")));

        store.delete_state("k1").await.unwrap();
        store.delete_state("k1").await.unwrap();
        assert_eq!(store.get_state("k1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_persistence_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("consent.db");

        {
            let store = SqliteStore::open(&path).unwrap();
            store.put_state("k1", grant("r1", "alice")).await.unwrap();
        }

        let store = SqliteStore::open(&path).unwrap();
        assert_eq!(store.get_state("k1").await.unwrap(), Some(grant("r1", "alice")));
    }

    #[tokio::test]
    async fn test_query_selector() {
        let store = SqliteStore::open_memory().unwrap();
        store.put_state("k3", grant("r1", "alice")).await.unwrap();
        store.put_state("k1", grant("r1", "bob")).await.unwrap();
        store.put_state("k2", grant("r2", "alice")).await.unwrap();
        store
            .put_state("k0", Bytes::from_static(b"not json"))
            .await
            .unwrap();

        let by_role = query_keys(&store, QueryRequest::new(r#"{"selector":{"r_id":"r1"}}"#)).await;
        assert_eq!(by_role, vec!["k1", "k3"]);

        let by_member =
            query_keys(&store, QueryRequest::new(r#"{"selector":{"u_ids.alice":1}}"#)).await;
        assert_eq!(by_member, vec!["k2", "k3"]);

        let everything = query_keys(&store, QueryRequest::new(r#"{"selector":{}}"#)).await;
        assert_eq!(everything, vec!["k1", "k2", "k3"]);
    }

    #[tokio::test]
    async fn test_selectors_agree_with_memory_store() {
        let sqlite = SqliteStore::open_memory().unwrap();
        let memory = MemoryStore::new();
        let docs: [(&str, &[u8]); 6] = [
            ("k_int", br#"{"u_ids":{"alice":1}}"#),
            ("k_bool", br#"{"u_ids":{"alice":true}}"#),
            ("k_false", br#"{"u_ids":{"alice":false}}"#),
            ("k_real", br#"{"u_ids":{"alice":1.0}}"#),
            ("k_text", br#"{"u_ids":{"alice":"1"}}"#),
            ("k_array", br#"{"u_ids":[1]}"#),
        ];
        for (key, doc) in docs {
            let value = Bytes::copy_from_slice(doc);
            sqlite.put_state(key, value.clone()).await.unwrap();
            memory.put_state(key, value).await.unwrap();
        }

        for (selector, expected) in [
            (r#"{"selector":{"u_ids.alice":true}}"#, vec!["k_bool"]),
            (r#"{"selector":{"u_ids.alice":false}}"#, vec!["k_false"]),
            (r#"{"selector":{"u_ids.alice":1}}"#, vec!["k_int", "k_real"]),
            (r#"{"selector":{"u_ids.alice":1.0}}"#, vec!["k_int", "k_real"]),
            (r#"{"selector":{"u_ids.alice":"1"}}"#, vec!["k_text"]),
            (r#"{"selector":{"u_ids":"{\"alice\":1}"}}"#, vec![]),
            (r#"{"selector":{"u_ids":"[1]"}}"#, vec![]),
        ] {
            let from_sqlite = query_keys(&sqlite, QueryRequest::new(selector)).await;
            let from_memory = query_keys(&memory, QueryRequest::new(selector)).await;
            assert_eq!(from_sqlite, expected, "sqlite: {}", selector);
            assert_eq!(from_memory, expected, "memory: {}", selector);
        }
    }

    #[tokio::test]
    async fn test_query_pagination_across_batches() {
        let store = SqliteStore::open_memory().unwrap();
        for i in 0..(CURSOR_BATCH + 10) {
            store
                .put_state(&format!("k{:04}", i), grant("r1", "alice"))
                .await
                .unwrap();
        }

        let all = query_keys(&store, QueryRequest::new(r#"{"selector":{"r_id":"r1"}}"#)).await;
        assert_eq!(all.len(), CURSOR_BATCH + 10);

        let page = query_keys(
            &store,
            QueryRequest::new(r#"{"selector":{"r_id":"r1"}}"#)
                .after("k0009")
                .limit(3),
        )
        .await;
        assert_eq!(page, vec!["k0010", "k0011", "k0012"]);
    }
}
