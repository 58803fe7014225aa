//! # Consent Ledger Core
//!
//! Pure primitives for the Consent Ledger: scopes, scope keys, consent
//! records, and request validation.
//!
//! This crate contains no I/O, no storage, no async. It is pure computation
//! over the consent data model.
//!
//! ## Key Types
//!
//! - [`Scope`] - The six-attribute tuple identifying one access-control unit
//! - [`ScopeKey`] - Versioned storage key derived from a scope
//! - [`GrantRecord`] - Members granted access to a scope
//! - [`RevokeTombstone`] - Marker that one user's access to a scope was revoked
//! - [`AccessQuery`] / [`ConsentUpdate`] - Validated invocation arguments
//!
//! ## Key Encoding
//!
//! Keys are built from lowercased fields in one canonical order. See the
//! [`scope`] module.

pub mod error;
pub mod record;
pub mod request;
pub mod scope;

pub use error::{CoreError, Result};
pub use record::{DocType, GrantRecord, RevokeTombstone, PRESENT};
pub use request::{
    selector_from_args, AccessQuery, ConsentAction, ConsentUpdate, PagedQuery, ScopeTemplate,
    ACCESS_QUERY_ARITY, CONSENT_UPDATE_ARITY, PAGED_QUERY_ARITY, QUERY_ARITY,
};
pub use scope::{KeyNamespace, Scope, ScopeKey, FIELD_SEPARATOR, KEY_VERSION};
