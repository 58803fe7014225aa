//! Property tests over random grant/revoke sequences.

use proptest::prelude::*;

use consent_ledger::core::GrantRecord;
use consent_ledger::store::{MemoryStore, StateStore};
use consent_ledger::{AccessReport, EngineKind, Ledger, LedgerConfig, LedgerError};
use consent_ledger_testkit::generators::consent_ops;
use consent_ledger_testkit::ScopeFixture;

const ALL_COLUMNS: &str = "colA,colB,colC";

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap()
}

fn visible(result: Result<AccessReport, LedgerError>) -> Option<AccessReport> {
    match result {
        Ok(report) => Some(report),
        Err(LedgerError::ConsentNotFound) => None,
        Err(e) => panic!("unexpected error: {}", e),
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn test_repeating_any_update_writes_nothing(ops in consent_ops(12)) {
        let fixture = ScopeFixture::new();
        runtime().block_on(async {
            for engine in [EngineKind::MembershipRecord, EngineKind::TombstoneOverlay] {
                let ledger = Ledger::new(MemoryStore::new(), LedgerConfig::default());
                for op in &ops {
                    let update = fixture.update(&op.user_id, op.action_arg(), &op.columns);
                    ledger.update_consent(Some(engine), &update).await.unwrap();

                    let before = ledger.store().stats().writes();
                    let report = ledger.update_consent(Some(engine), &update).await.unwrap();
                    prop_assert_eq!(report.writes(), 0);
                    prop_assert_eq!(ledger.store().stats().writes(), before);
                }
            }
            Ok(())
        })?;
    }

    #[test]
    fn test_both_engines_grant_the_same_access(ops in consent_ops(16)) {
        let fixture = ScopeFixture::new();
        runtime().block_on(async {
            let membership = Ledger::new(MemoryStore::new(), LedgerConfig::default());
            let overlay = Ledger::new(MemoryStore::new(), LedgerConfig::default());

            for op in &ops {
                let update = fixture.update(&op.user_id, op.action_arg(), &op.columns);
                membership
                    .update_consent(Some(EngineKind::MembershipRecord), &update)
                    .await
                    .unwrap();
                overlay
                    .update_consent(Some(EngineKind::TombstoneOverlay), &update)
                    .await
                    .unwrap();
            }

            let query = fixture.query(ALL_COLUMNS);
            let a = membership
                .check_access(Some(EngineKind::MembershipRecord), &query)
                .await;
            let b = overlay
                .check_access(Some(EngineKind::TombstoneOverlay), &query)
                .await;
            prop_assert_eq!(visible(a), visible(b));
            Ok(())
        })?;
    }

    #[test]
    fn test_membership_store_never_holds_empty_records(ops in consent_ops(16)) {
        let fixture = ScopeFixture::new();
        runtime().block_on(async {
            let ledger = Ledger::new(MemoryStore::new(), LedgerConfig::default());
            for op in &ops {
                let update = fixture.update(&op.user_id, op.action_arg(), &op.columns);
                ledger
                    .update_consent(Some(EngineKind::MembershipRecord), &update)
                    .await
                    .unwrap();
            }

            let store = ledger.store();
            for key in store.keys_with_prefix("grant/").unwrap() {
                let raw = store.get_state(&key).await.unwrap().unwrap();
                let record = GrantRecord::from_bytes(&raw).unwrap();
                prop_assert!(!record.is_empty(), "empty record at {}", key);
            }
            Ok(())
        })?;
    }
}
