//! # Consent Ledger Engine
//!
//! Consent check and update logic over a key-value state store.
//!
//! ## Overview
//!
//! Two interchangeable designs implement [`ConsentEngine`]:
//!
//! - **Membership record** ([`MembershipRecordEngine`]): one grant record per
//!   scope lists every member. Grants add, revokes remove, and an emptied
//!   record is deleted.
//! - **Tombstone overlay** ([`TombstoneOverlayEngine`]): grant records only
//!   grow. Revokes write a per-user tombstone, and access is members minus
//!   tombstoned users.
//!
//! Both designs are idempotent: repeating an update performs no writes.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use consent_ledger_core::{AccessQuery, ConsentUpdate};
//! use consent_ledger_engine::EngineKind;
//! use consent_ledger_store::MemoryStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = MemoryStore::new();
//! let engine = EngineKind::TombstoneOverlay.engine();
//!
//! let grant = ConsentUpdate::from_args(&[
//!     "alice", "g", "r1", "2024-01-01", "2024-12-31", "colA,colB", "read", "w1",
//! ][..])?;
//! engine.update_consent(&store, &grant).await?;
//!
//! let query = AccessQuery::from_args(&[
//!     "r1", "2024-01-01", "2024-12-31", "colA", "read", "w1",
//! ][..])?;
//! let report = engine.check_access(&store, &query).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Design Notes
//!
//! Engines are stateless unit structs. Columns of one update are applied in
//! order, one at a time; atomicity across columns is the host's concern.

pub mod engine;
pub mod error;
pub mod membership;
pub mod overlay;

pub use engine::{AccessReport, ConsentEngine, EngineKind, ScopeChange, UpdateReport};
pub use error::{EngineError, Result};
pub use membership::MembershipRecordEngine;
pub use overlay::TombstoneOverlayEngine;
