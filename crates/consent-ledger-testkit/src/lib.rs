//! # Consent Ledger Testkit
//!
//! Testing utilities for the Consent Ledger.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Fixtures**: [`ScopeFixture`] builds arguments, requests, and keys for a
//!   shared set of scope attributes
//! - **Fault injection**: [`FaultyStore`] fails selected store calls;
//!   [`ScriptedQuery`] replays a cursor script and counts closes
//! - **Generators**: Proptest strategies for property-based testing
//!
//! ## Test Fixtures
//!
//! ```rust
//! use consent_ledger_testkit::ScopeFixture;
//!
//! let fixture = ScopeFixture::new();
//! let args = fixture.update_args("alice", "g", "colA,colB");
//! assert_eq!(args.len(), 8);
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use consent_ledger_testkit::generators::consent_ops;
//!
//! proptest! {
//!     #[test]
//!     fn replay_is_idempotent(ops in consent_ops(8)) {
//!         // apply each op twice and compare store contents
//!     }
//! }
//! ```

pub mod faults;
pub mod fixtures;
pub mod generators;

pub use faults::{FaultyStore, ScriptedCursor, ScriptedQuery, Step};
pub use fixtures::ScopeFixture;
