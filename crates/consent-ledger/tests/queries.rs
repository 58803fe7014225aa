//! Rich-query gateway behavior: encoding, pagination, and cursor lifecycle.

use std::sync::Arc;

use consent_ledger::store::{MemoryStore, SqliteStore};
use consent_ledger::{Ledger, LedgerConfig, LedgerError};
use consent_ledger_testkit::{ScopeFixture, ScriptedQuery, Step};

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn scripted_ledger(query: Arc<ScriptedQuery>) -> Ledger<MemoryStore> {
    Ledger::new(MemoryStore::new(), LedgerConfig::default()).with_query_engine(query)
}

#[tokio::test]
async fn test_results_in_cursor_order_and_cursor_closed() -> anyhow::Result<()> {
    init_tracing();
    let query = Arc::new(ScriptedQuery::new(vec![
        Step::record("k1", r#"{"n":1}"#),
        Step::record("k2", r#"{"n":2}"#),
        Step::record("k3", r#"{"n":3}"#),
    ]));
    let ledger = scripted_ledger(query.clone());

    let payload = ledger.call("queryMarbles", &["{}"]).await?.unwrap();
    assert_eq!(
        std::str::from_utf8(&payload)?,
        r#"[{"Key":"k1","Record":{"n":1}},{"Key":"k2","Record":{"n":2}},{"Key":"k3","Record":{"n":3}}]"#
    );
    assert_eq!(query.opened(), 1);
    assert_eq!(query.closed(), 1);
    Ok(())
}

#[tokio::test]
async fn test_cursor_closed_when_advance_fails() -> anyhow::Result<()> {
    init_tracing();
    let query = Arc::new(ScriptedQuery::new(vec![
        Step::record("k1", "{}"),
        Step::Fail("connection reset".into()),
        Step::record("k2", "{}"),
    ]));
    let ledger = scripted_ledger(query.clone());

    let result = ledger.call("runQuery", &["{}"]).await;
    assert!(matches!(result, Err(LedgerError::StoreUnavailable(_))));
    assert_eq!(query.closed(), 1);
    Ok(())
}

#[tokio::test]
async fn test_close_failure_does_not_discard_results() -> anyhow::Result<()> {
    init_tracing();
    let query = Arc::new(ScriptedQuery::new(vec![Step::record("k1", "{}")]).fail_close());
    let ledger = scripted_ledger(query.clone());

    let payload = ledger.call("runQuery", &["{}"]).await?.unwrap();
    assert_eq!(&payload[..], br#"[{"Key":"k1","Record":{}}]"#);
    assert_eq!(query.closed(), 1);
    Ok(())
}

#[tokio::test]
async fn test_open_failure_is_store_error() -> anyhow::Result<()> {
    init_tracing();
    let query = Arc::new(ScriptedQuery::new(vec![]).fail_open());
    let ledger = scripted_ledger(query.clone());

    let result = ledger.call("runQuery", &["{}"]).await;
    assert!(matches!(result, Err(LedgerError::StoreUnavailable(_))));
    assert_eq!(query.opened(), 0);
    Ok(())
}

#[tokio::test]
async fn test_empty_result_is_empty_array() -> anyhow::Result<()> {
    init_tracing();
    let query = Arc::new(ScriptedQuery::new(vec![]));
    let ledger = scripted_ledger(query.clone());

    let payload = ledger.call("queryConsents", &["{}"]).await?.unwrap();
    assert_eq!(&payload[..], b"[]");
    assert_eq!(query.closed(), 1);
    Ok(())
}

#[tokio::test]
async fn test_query_grants_by_member_on_sqlite() -> anyhow::Result<()> {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let store = SqliteStore::open(dir.path().join("consent.db"))?;
    let ledger = Ledger::with_store_queries(store, LedgerConfig::default());
    let fixture = ScopeFixture::new();

    ledger.call("updateConsent", &fixture.update_args("alice", "g", "colA,colB")).await?;
    ledger.call("updateConsent", &fixture.update_args("bob", "g", "colB,colC")).await?;

    let selector = r#"{"selector":{"docType":"consentGrant","u_ids.alice":1}}"#;
    let payload = ledger.call("runQuery", &[selector]).await?.unwrap();
    let results: serde_json::Value = serde_json::from_slice(&payload)?;
    let results = results.as_array().unwrap();

    assert_eq!(results.len(), 2);
    assert_eq!(results[0]["Key"], fixture.grant_key("colA").as_str());
    assert_eq!(results[1]["Key"], fixture.grant_key("colB").as_str());
    assert_eq!(results[1]["Record"]["u_ids"]["bob"], 1);
    assert_eq!(results[1]["Record"]["c_id"], "colb");
    Ok(())
}

#[tokio::test]
async fn test_paged_query_over_memory_store() -> anyhow::Result<()> {
    init_tracing();
    let ledger = Ledger::with_store_queries(MemoryStore::new(), LedgerConfig::default());
    let fixture = ScopeFixture::new();

    ledger
        .call("updateConsent", &fixture.update_args("alice", "g", "c1,c2,c3"))
        .await?;

    let selector = r#"{"selector":{"r_id":{"$eq":"r1"}}}"#;
    let first = ledger
        .call("queryConsentsWithPagination", &[selector, "2", ""])
        .await?
        .unwrap();
    let first: serde_json::Value = serde_json::from_slice(&first)?;
    assert_eq!(first["ResponseMetadata"]["RecordsCount"], 2);

    let bookmark = first["ResponseMetadata"]["Bookmark"].as_str().unwrap().to_string();
    assert_eq!(bookmark, fixture.grant_key("c2").as_str());

    let second = ledger
        .call("runQueryPaged", &[selector, "2", bookmark.as_str()])
        .await?
        .unwrap();
    let second: serde_json::Value = serde_json::from_slice(&second)?;
    assert_eq!(second["ResponseMetadata"]["RecordsCount"], 1);
    assert_eq!(second["Records"][0]["Key"], fixture.grant_key("c3").as_str());
    Ok(())
}

#[tokio::test]
async fn test_query_argument_errors() -> anyhow::Result<()> {
    init_tracing();
    let ledger = Ledger::with_store_queries(MemoryStore::new(), LedgerConfig::default());

    let result = ledger.call("runQuery", &[""]).await;
    assert!(matches!(result, Err(LedgerError::InvalidArgument(_))));

    let result = ledger.call("runQueryPaged", &["{}", "0", ""]).await;
    assert!(matches!(result, Err(LedgerError::InvalidArgument(_))));

    let result = ledger.call("runQuery", &[r#"{"selector":{"r_id":{"$gt":"a"}}}"#]).await;
    assert!(matches!(result, Err(LedgerError::StoreUnavailable(_))));
    Ok(())
}
