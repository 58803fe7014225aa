//! The Ledger: unified API for consent checks, updates, and queries.
//!
//! The Ledger binds a state store, an optional rich-query engine, and a
//! configuration. It exposes typed methods and a string-dispatched
//! [`Ledger::invoke`] for hosts that route calls by function name.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use bytes::Bytes;
use serde::Serialize;

use consent_ledger_core::{selector_from_args, AccessQuery, ConsentUpdate, PagedQuery};
use consent_ledger_engine::{AccessReport, EngineKind, UpdateReport};
use consent_ledger_store::{RichQuery, StateStore};

use crate::config::LedgerConfig;
use crate::error::{LedgerError, Result};
use crate::query;

/// An invocable function.
///
/// `None` engine selects the configured default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    Init,
    CheckAccess(Option<EngineKind>),
    UpdateConsent(Option<EngineKind>),
    RunQuery,
    RunQueryPaged,
}

impl FromStr for Function {
    type Err = LedgerError;

    fn from_str(name: &str) -> Result<Self> {
        use EngineKind::{MembershipRecord, TombstoneOverlay};

        match name {
            "init" => Ok(Function::Init),
            "checkAccess" => Ok(Function::CheckAccess(None)),
            "checkAccessMembership" | "accessConsent" => {
                Ok(Function::CheckAccess(Some(MembershipRecord)))
            }
            "checkAccessOverlay" | "accessConsentNewDesign" => {
                Ok(Function::CheckAccess(Some(TombstoneOverlay)))
            }
            "updateConsent" => Ok(Function::UpdateConsent(None)),
            "updateConsentMembership" => Ok(Function::UpdateConsent(Some(MembershipRecord))),
            "updateConsentOverlay" | "updateConsentNewDesign" => {
                Ok(Function::UpdateConsent(Some(TombstoneOverlay)))
            }
            "runQuery" | "queryMarbles" | "queryConsents" => Ok(Function::RunQuery),
            "runQueryPaged" | "queryConsentsWithPagination" => Ok(Function::RunQueryPaged),
            other => Err(LedgerError::UnknownFunction(other.to_string())),
        }
    }
}

/// Outcome status of an invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Status {
    Ok,
    Error,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Ok => f.write_str("OK"),
            Status::Error => f.write_str("ERROR"),
        }
    }
}

/// Result of [`Ledger::invoke`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: Status,
    pub payload: Option<Bytes>,
    pub message: Option<String>,
}

impl Response {
    pub fn success(payload: Option<Bytes>) -> Self {
        Self {
            status: Status::Ok,
            payload,
            message: None,
        }
    }

    pub fn error(err: &LedgerError) -> Self {
        Self {
            status: Status::Error,
            payload: None,
            message: Some(err.to_string()),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == Status::Ok
    }
}

impl From<Result<Option<Bytes>>> for Response {
    fn from(result: Result<Option<Bytes>>) -> Self {
        match result {
            Ok(payload) => Response::success(payload),
            Err(err) => Response::error(&err),
        }
    }
}

/// The main Ledger struct.
pub struct Ledger<S: StateStore> {
    /// The state store.
    store: Arc<S>,
    /// Engine for selector queries, if any.
    query_engine: Option<Arc<dyn RichQuery>>,
    /// Configuration.
    config: LedgerConfig,
}

impl<S: StateStore> Ledger<S> {
    /// Create a ledger without a rich-query engine.
    pub fn new(store: S, config: LedgerConfig) -> Self {
        Self {
            store: Arc::new(store),
            query_engine: None,
            config,
        }
    }

    /// Route selector queries to `engine`.
    pub fn with_query_engine(mut self, engine: Arc<dyn RichQuery>) -> Self {
        self.query_engine = Some(engine);
        self
    }

    /// Get the store reference.
    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Consent Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Check access with the given engine, or the configured one.
    pub async fn check_access(
        &self,
        engine: Option<EngineKind>,
        query: &AccessQuery,
    ) -> Result<AccessReport> {
        query.check_column_limit(self.config.max_columns)?;
        let engine = engine.unwrap_or(self.config.engine).engine();
        Ok(engine.check_access(&*self.store, query).await?)
    }

    /// Grant or revoke with the given engine, or the configured one.
    pub async fn update_consent(
        &self,
        engine: Option<EngineKind>,
        update: &ConsentUpdate,
    ) -> Result<UpdateReport> {
        update.access.check_column_limit(self.config.max_columns)?;
        let engine = engine.unwrap_or(self.config.engine).engine();
        Ok(engine.update_consent(&*self.store, update).await?)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Query Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Run a selector query, returning a JSON array of results.
    pub async fn run_query(&self, selector: &str) -> Result<Bytes> {
        query::run_query(self.query_engine()?, selector).await
    }

    /// Run one page of a selector query.
    pub async fn run_query_paged(&self, paged: &PagedQuery) -> Result<Bytes> {
        query::run_query_paged(self.query_engine()?, paged, self.config.max_page_size).await
    }

    fn query_engine(&self) -> Result<&dyn RichQuery> {
        self.query_engine
            .as_deref()
            .ok_or(LedgerError::QueryEngineMissing)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Dispatch
    // ─────────────────────────────────────────────────────────────────────────

    /// Invoke a function by name with positional string arguments.
    pub async fn invoke<A: AsRef<str>>(&self, function: &str, args: &[A]) -> Response {
        let result = self.call(function, args).await;
        if let Err(err) = &result {
            tracing::warn!(function, error = %err, "invocation failed");
        }
        result.into()
    }

    /// Like [`Ledger::invoke`], keeping the typed error.
    pub async fn call<A: AsRef<str>>(&self, function: &str, args: &[A]) -> Result<Option<Bytes>> {
        let function: Function = function.parse()?;
        tracing::debug!(?function, args = args.len(), "dispatching");

        match function {
            // Arguments to init are ignored.
            Function::Init => Ok(None),
            Function::CheckAccess(engine) => {
                let query = AccessQuery::from_args(args)?;
                let report = self.check_access(engine, &query).await?;
                Ok(Some(Bytes::from(serde_json::to_vec(&report)?)))
            }
            Function::UpdateConsent(engine) => {
                let update = ConsentUpdate::from_args(args)?;
                self.update_consent(engine, &update).await?;
                Ok(None)
            }
            Function::RunQuery => {
                let selector = selector_from_args(args)?;
                self.run_query(&selector).await.map(Some)
            }
            Function::RunQueryPaged => {
                let paged = PagedQuery::from_args(args)?;
                self.run_query_paged(&paged).await.map(Some)
            }
        }
    }
}

impl<S: StateStore + RichQuery + 'static> Ledger<S> {
    /// Create a ledger whose store also answers selector queries.
    pub fn with_store_queries(store: S, config: LedgerConfig) -> Self {
        let store = Arc::new(store);
        let query_engine: Arc<dyn RichQuery> = store.clone();
        Self {
            store,
            query_engine: Some(query_engine),
            config,
        }
    }
}
