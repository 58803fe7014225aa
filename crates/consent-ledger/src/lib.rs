//! # Consent Ledger
//!
//! The unified API for scoped consent: who may access which data columns,
//! in which role, for which date range, under which watchdog.
//!
//! ## Overview
//!
//! The Consent Ledger provides:
//!
//! - **Access checks**: who currently has access to a set of scopes
//! - **Consent updates**: idempotent grant and revoke across columns
//! - **Rich queries**: selector queries streamed into a JSON result array,
//!   optionally paginated
//!
//! Two consent designs are available, selectable per call or by
//! configuration: a single membership record per scope, or additive grant
//! records overlaid with per-user revoke tombstones.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use consent_ledger::{Ledger, LedgerConfig};
//! use consent_ledger::store::SqliteStore;
//!
//! async fn example() {
//!     let store = SqliteStore::open("consent.db").unwrap();
//!     let ledger = Ledger::with_store_queries(store, LedgerConfig::default());
//!
//!     let response = ledger
//!         .invoke(
//!             "updateConsent",
//!             &["alice", "g", "r1", "2024-01-01", "2024-12-31", "colA,colB", "read", "w1"],
//!         )
//!         .await;
//!     assert!(response.is_ok());
//!
//!     let response = ledger
//!         .invoke("checkAccess", &["r1", "2024-01-01", "2024-12-31", "colA", "read", "w1"])
//!         .await;
//!     println!("{:?}", response.payload);
//! }
//! ```
//!
//! ## Re-exports
//!
//! This crate re-exports the component crates for convenience:
//!
//! - `consent_ledger::core` - Scopes, keys, records, argument validation
//! - `consent_ledger::store` - Storage abstraction, SQLite, in-memory
//! - `consent_ledger::engine` - The two consent engines

pub mod config;
pub mod error;
pub mod ledger;
pub mod query;

// Re-export component crates
pub use consent_ledger_core as core;
pub use consent_ledger_engine as engine;
pub use consent_ledger_store as store;

// Re-export main types for convenience
pub use config::LedgerConfig;
pub use error::{LedgerError, Result};
pub use ledger::{Function, Ledger, Response, Status};
pub use query::RecordEncoder;

// Re-export commonly used types
pub use consent_ledger_core::{
    AccessQuery, ConsentAction, ConsentUpdate, PagedQuery, Scope, ScopeKey,
};
pub use consent_ledger_engine::{AccessReport, EngineKind, ScopeChange, UpdateReport};
