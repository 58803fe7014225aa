//! # Consent Ledger Store
//!
//! Storage abstraction for the Consent Ledger. The ledger itself (ordering,
//! consensus, commit) is external; this crate defines the narrow interface
//! the consent engines need and ships two implementations.
//!
//! ## Key Types
//!
//! - [`StateStore`] - get/put/delete by key
//! - [`RichQuery`] - selector queries yielding a [`QueryCursor`]
//! - [`SqliteStore`] - SQLite-based persistent store
//! - [`MemoryStore`] - In-memory store for tests and embedding
//! - [`Selector`] - The selector subset understood by the bundled engines
//!
//! ## Usage
//!
//! ```rust,no_run
//! use bytes::Bytes;
//! use consent_ledger_store::{SqliteStore, StateStore};
//!
//! async fn example() {
//!     let store = SqliteStore::open("consent.db").unwrap();
//!
//!     store.put_state("k", Bytes::from_static(b"{}")).await.unwrap();
//!     let value = store.get_state("k").await.unwrap();
//!     assert!(value.is_some());
//! }
//! ```
//!
//! ## Design Notes
//!
//! - **No multi-key transactions**: each get/put/delete is independent.
//!   Callers that touch several keys in one call are not atomic as a group.
//! - **Optimistic concurrency is the host's job**: an adapter reports a
//!   rejected write as [`StoreError::Conflict`]; nothing here retries.
//! - **Forward-only cursors**: query results are read lazily in key order
//!   and cannot be rewound.

pub mod error;
pub mod memory;
pub mod migration;
pub mod selector;
pub mod sqlite;
pub mod traits;

pub use error::{Result, StoreError};
pub use memory::{MemoryStore, StoreStats};
pub use selector::{Condition, Scalar, Selector};
pub use sqlite::SqliteStore;
pub use traits::{KeyValue, QueryCursor, QueryRequest, RichQuery, StateStore};
