//! Tombstone-overlay design.
//!
//! Grant records only ever gain members. A revoke writes a per-user
//! [`RevokeTombstone`] instead of editing the grant, and access is the
//! grant's members minus anyone with a tombstone for that scope. A later
//! grant clears the user's tombstone.
//!
//! Revokes never touch the grant record, so concurrent revokes by different
//! users write disjoint keys.

use async_trait::async_trait;

use consent_ledger_core::{
    AccessQuery, ConsentAction, ConsentUpdate, GrantRecord, RevokeTombstone, Scope, ScopeKey,
};
use consent_ledger_store::StateStore;

use crate::engine::{
    load_grant, save_grant, AccessReport, ConsentEngine, EngineKind, ScopeChange, UpdateReport,
};
use crate::error::{EngineError, Result};

/// Additive grant records plus per-user revoke tombstones.
#[derive(Debug, Clone, Copy, Default)]
pub struct TombstoneOverlayEngine;

impl TombstoneOverlayEngine {
    async fn grant(
        &self,
        store: &dyn StateStore,
        scope: Scope,
        user: &str,
        report: &mut UpdateReport,
    ) -> Result<()> {
        let key = scope.grant_key();
        let tombstone = scope.tombstone_key(user);

        let change = match load_grant(store, &key).await? {
            Some(mut record) => {
                if record.add_member(user) {
                    save_grant(store, &key, &record).await?;
                    ScopeChange::MemberAdded
                } else {
                    ScopeChange::Unchanged
                }
            }
            None => {
                save_grant(store, &key, &GrantRecord::with_member(scope, user)).await?;
                ScopeChange::Created
            }
        };
        report.record(key, change);

        // The grant is written first so a failure here still leaves the
        // user without access.
        if tombstone_exists(store, &tombstone).await? {
            store.delete_state(tombstone.as_str()).await?;
            report.record(tombstone, ScopeChange::TombstoneCleared);
        }
        Ok(())
    }

    async fn revoke(
        &self,
        store: &dyn StateStore,
        scope: Scope,
        user: &str,
        report: &mut UpdateReport,
    ) -> Result<()> {
        let key = scope.tombstone_key(user);

        let change = if tombstone_exists(store, &key).await? {
            ScopeChange::Unchanged
        } else {
            let bytes = RevokeTombstone::new(user, scope)
                .to_bytes()
                .map_err(|source| EngineError::Encode {
                    key: key.to_string(),
                    source,
                })?;
            store.put_state(key.as_str(), bytes).await?;
            ScopeChange::TombstoneWritten
        };
        report.record(key, change);
        Ok(())
    }
}

#[async_trait]
impl ConsentEngine for TombstoneOverlayEngine {
    fn kind(&self) -> EngineKind {
        EngineKind::TombstoneOverlay
    }

    async fn check_access(
        &self,
        store: &dyn StateStore,
        query: &AccessQuery,
    ) -> Result<AccessReport> {
        let mut report = AccessReport::new();

        for scope in query.scopes() {
            let key = scope.grant_key();
            let Some(record) = load_grant(store, &key).await? else {
                continue;
            };

            let mut members = Vec::new();
            for user in record.active_members() {
                if tombstone_exists(store, &scope.tombstone_key(user)).await? {
                    tracing::debug!(key = %key, user, "member masked by tombstone");
                    continue;
                }
                members.push(user.to_string());
            }
            report.insert(key, members);
        }

        if report.is_empty() {
            return Err(EngineError::ConsentNotFound);
        }
        Ok(report)
    }

    async fn update_consent(
        &self,
        store: &dyn StateStore,
        update: &ConsentUpdate,
    ) -> Result<UpdateReport> {
        let user = update.user_id.as_str();
        let mut report = UpdateReport::new(update);

        for scope in update.scopes() {
            match update.action {
                ConsentAction::Grant => self.grant(store, scope, user, &mut report).await?,
                ConsentAction::Revoke => self.revoke(store, scope, user, &mut report).await?,
            }
        }

        Ok(report)
    }
}

/// Tombstones carry meaning by existence alone; the value is not decoded.
async fn tombstone_exists(store: &dyn StateStore, key: &ScopeKey) -> Result<bool> {
    Ok(store.get_state(key.as_str()).await?.is_some())
}
