//! The consent engine interface and its reports.
//!
//! Both designs answer the same two questions: who currently has access to
//! a set of scopes, and what changes when a user grants or revokes. They
//! differ only in how state is laid out in the store.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use consent_ledger_core::{AccessQuery, ConsentAction, ConsentUpdate, GrantRecord, ScopeKey};
use consent_ledger_store::StateStore;

use crate::error::{EngineError, Result};
use crate::membership::MembershipRecordEngine;
use crate::overlay::TombstoneOverlayEngine;

/// A consent strategy.
///
/// Engines hold no state: every call re-reads the store, computes, and
/// writes back. Columns are processed sequentially and are not atomic as a
/// group; a failure on column N leaves writes for earlier columns in place.
#[async_trait]
pub trait ConsentEngine: Send + Sync {
    /// Which design this engine implements.
    fn kind(&self) -> EngineKind;

    /// Members with current access, per scope key.
    ///
    /// Fails with [`EngineError::ConsentNotFound`] if no scope has any.
    async fn check_access(
        &self,
        store: &dyn StateStore,
        query: &AccessQuery,
    ) -> Result<AccessReport>;

    /// Apply a grant or revoke to every column of the update.
    ///
    /// Idempotent: repeating an update leaves the store unchanged and
    /// reports every scope as [`ScopeChange::Unchanged`].
    async fn update_consent(
        &self,
        store: &dyn StateStore,
        update: &ConsentUpdate,
    ) -> Result<UpdateReport>;
}

/// Selects a consent design.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineKind {
    /// One mutable membership record per scope.
    #[default]
    MembershipRecord,
    /// Additive grant records plus per-user revoke tombstones.
    TombstoneOverlay,
}

impl EngineKind {
    /// Build the engine for this design.
    pub fn engine(self) -> Box<dyn ConsentEngine> {
        match self {
            EngineKind::MembershipRecord => Box::new(MembershipRecordEngine),
            EngineKind::TombstoneOverlay => Box::new(TombstoneOverlayEngine),
        }
    }
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineKind::MembershipRecord => f.write_str("membership_record"),
            EngineKind::TombstoneOverlay => f.write_str("tombstone_overlay"),
        }
    }
}

impl FromStr for EngineKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "membership_record" => Ok(EngineKind::MembershipRecord),
            "tombstone_overlay" => Ok(EngineKind::TombstoneOverlay),
            other => Err(format!("unknown engine kind: {}", other)),
        }
    }
}

/// Result of an access check: scope key -> users with access.
///
/// Serializes as a JSON object keyed by scope key. Only scopes with at
/// least one member appear.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct AccessReport {
    grants: BTreeMap<ScopeKey, Vec<String>>,
}

impl AccessReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the members of one scope. Empty lists are dropped.
    pub fn insert(&mut self, key: ScopeKey, members: Vec<String>) {
        if !members.is_empty() {
            self.grants.insert(key, members);
        }
    }

    /// Members with access to the scope at `key`.
    pub fn members(&self, key: &ScopeKey) -> Option<&[String]> {
        self.grants.get(key).map(Vec::as_slice)
    }

    /// Whether `user_id` has access to the scope at `key`.
    pub fn contains(&self, key: &ScopeKey, user_id: &str) -> bool {
        self.members(key)
            .is_some_and(|members| members.iter().any(|m| m == user_id))
    }

    pub fn len(&self) -> usize {
        self.grants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.grants.is_empty()
    }

}

/// What an update did to one key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopeChange {
    /// A new grant record was written.
    Created,
    /// The user was added to an existing grant record.
    MemberAdded,
    /// The user was removed and the shrunk record written.
    MemberRemoved,
    /// The user was the last member; the record was deleted.
    RecordDeleted,
    /// A revoke tombstone was written.
    TombstoneWritten,
    /// A stale revoke tombstone was deleted by a grant.
    TombstoneCleared,
    /// Nothing was written.
    Unchanged,
}

impl ScopeChange {
    /// Whether this change wrote to the store.
    pub fn is_write(self) -> bool {
        !matches!(self, ScopeChange::Unchanged)
    }
}

/// Result of a consent update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpdateReport {
    pub user_id: String,
    pub action: ConsentAction,
    /// One entry per key touched, in processing order.
    pub changes: Vec<(ScopeKey, ScopeChange)>,
}

impl UpdateReport {
    pub fn new(update: &ConsentUpdate) -> Self {
        Self {
            user_id: update.user_id.clone(),
            action: update.action,
            changes: Vec::new(),
        }
    }

    pub fn record(&mut self, key: ScopeKey, change: ScopeChange) {
        tracing::debug!(
            key = %key,
            user = %self.user_id,
            action = %self.action,
            change = ?change,
            "consent scope updated"
        );
        self.changes.push((key, change));
    }

    /// Number of store writes (puts and deletes) the update performed.
    pub fn writes(&self) -> usize {
        self.changes.iter().filter(|(_, c)| c.is_write()).count()
    }

    /// The change recorded for `key`, if any.
    pub fn change(&self, key: &ScopeKey) -> Option<ScopeChange> {
        self.changes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, change)| *change)
    }
}

/// Read and decode the grant record at `key`.
pub(crate) async fn load_grant(
    store: &dyn StateStore,
    key: &ScopeKey,
) -> Result<Option<GrantRecord>> {
    match store.get_state(key.as_str()).await? {
        Some(bytes) => GrantRecord::from_bytes(&bytes)
            .map(Some)
            .map_err(|source| EngineError::Decode {
                key: key.to_string(),
                source,
            }),
        None => Ok(None),
    }
}

/// Encode and write a grant record at `key`.
pub(crate) async fn save_grant(
    store: &dyn StateStore,
    key: &ScopeKey,
    record: &GrantRecord,
) -> Result<()> {
    let bytes = record.to_bytes().map_err(|source| EngineError::Encode {
        key: key.to_string(),
        source,
    })?;
    store.put_state(key.as_str(), bytes).await?;
    Ok(())
}
