//! Membership-record design.
//!
//! Each scope has at most one [`GrantRecord`] holding every user with
//! access. A grant adds the user, a revoke removes them, and the record is
//! deleted once nobody is left. Access is whatever the record says.

use async_trait::async_trait;

use consent_ledger_core::{AccessQuery, ConsentAction, ConsentUpdate, GrantRecord};
use consent_ledger_store::StateStore;

use crate::engine::{
    load_grant, save_grant, AccessReport, ConsentEngine, EngineKind, ScopeChange, UpdateReport,
};
use crate::error::{EngineError, Result};

/// One mutable membership record per scope.
#[derive(Debug, Clone, Copy, Default)]
pub struct MembershipRecordEngine;

#[async_trait]
impl ConsentEngine for MembershipRecordEngine {
    fn kind(&self) -> EngineKind {
        EngineKind::MembershipRecord
    }

    async fn check_access(
        &self,
        store: &dyn StateStore,
        query: &AccessQuery,
    ) -> Result<AccessReport> {
        let mut report = AccessReport::new();

        for scope in query.scopes() {
            let key = scope.grant_key();
            if let Some(record) = load_grant(store, &key).await? {
                let members = record.active_members().map(String::from).collect();
                report.insert(key, members);
            }
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
            let key = scope.grant_key();
            let existing = load_grant(store, &key).await?;

            let change = match (update.action, existing) {
                (ConsentAction::Grant, None) => {
                    save_grant(store, &key, &GrantRecord::with_member(scope, user)).await?;
                    ScopeChange::Created
                }
                (ConsentAction::Grant, Some(mut record)) => {
                    if record.add_member(user) {
                        save_grant(store, &key, &record).await?;
                        ScopeChange::MemberAdded
                    } else {
                        ScopeChange::Unchanged
                    }
                }
                (ConsentAction::Revoke, None) => ScopeChange::Unchanged,
                (ConsentAction::Revoke, Some(mut record)) => {
                    if !record.remove_member(user) {
                        ScopeChange::Unchanged
                    } else if record.is_empty() {
                        store.delete_state(key.as_str()).await?;
                        ScopeChange::RecordDeleted
                    } else {
                        save_grant(store, &key, &record).await?;
                        ScopeChange::MemberRemoved
                    }
                }
            };

            report.record(key, change);
        }

        Ok(report)
    }
}
