//! End-to-end runs of the reconciliation pipeline against the nullable
//! store, chain, and sink: backup → allocate → resolve/update → aggregate
//! → report.

use std::sync::Arc;

use serde_json::json;

use regsync_nullables::{nft_node, NullChain, NullRandom, NullSink, NullStore};
use regsync_reconcile::{ReconcileConfig, ReconcileError, Reconciler};
use regsync_store::WriteOp;
use regsync_types::{ObjectId, RefNumber, StoredNft, UserRecord, WalletAddress};

const HERO: &str = "0xpkg::hero::Hero";

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

struct Harness {
    store: Arc<NullStore>,
    chain: Arc<NullChain>,
    sink: Arc<NullSink>,
    config: ReconcileConfig,
    _dir: tempfile::TempDir,
}

impl Harness {
    fn new(records: Vec<UserRecord>) -> Self {
        let dir = tempfile::tempdir().expect("temp dir");
        let config = ReconcileConfig {
            nft_type: HERO.to_string(),
            report_dir: dir.path().join("reports"),
            retry_max_attempts: 3,
            retry_backoff_ms: 1,
            ..Default::default()
        };
        Self {
            store: Arc::new(NullStore::with_records(records)),
            chain: Arc::new(NullChain::new()),
            sink: Arc::new(NullSink::new()),
            config,
            _dir: dir,
        }
    }

    fn reconciler(&self) -> Reconciler {
        Reconciler::new(
            self.config.clone(),
            self.store.clone(),
            self.chain.clone(),
            self.sink.clone(),
        )
        .with_draw(Box::new(NullRandom::counting(20_000)))
    }
}

fn user(id: &str, wallet: &str) -> UserRecord {
    let mut rec = UserRecord::new(id);
    rec.wallet_address = Some(WalletAddress::new(wallet));
    rec
}

// ---------------------------------------------------------------------------
// 1. Full run
// ---------------------------------------------------------------------------

#[tokio::test]
async fn full_run_links_and_numbers_records() {
    let mut b = user("b", "0xb");
    b.ref_number = Some(RefNumber::new(20_000));
    b.population = Some(700);
    let mut a = user("a", "0xa");
    a.population = Some(500);
    let h = Harness::new(vec![a, b]);
    h.chain.add_holder("0xa", HERO, "0xn1", "0xw1", 5_000);
    h.chain.add_holder("0xb", HERO, "0xn2", "0xw2", 1_000);

    let report = h.reconciler().run_reconciliation().await.unwrap();

    let a = h.store.get("a").unwrap();
    assert_eq!(a.ref_number, Some(RefNumber::new(20_001)));
    assert_eq!(a.wallet_object_id, Some(ObjectId::new("0xw1")));
    assert_eq!(a.nft_id(), Some(&ObjectId::new("0xn1")));
    assert_eq!(a.nft_name.as_deref(), Some("0xn1"));
    assert!(a.nft_data.is_some());

    assert_eq!(report.refs_generated, 1);
    assert_eq!(report.wasted_draws, 1);
    assert_eq!(report.updates.wallet_updates, 2);
    assert_eq!(report.updates.nft_updates, 2);
    assert_eq!(report.population, 1_200);
    assert_eq!(report.balances.total, 6.0);
    assert_eq!(report.balances.entries.len(), 2);
    assert!(report.backup.is_some());
    assert_eq!(h.store.backup_count(), 1);

    let delivered = h.sink.delivered();
    assert_eq!(delivered.len(), 1);
    assert_eq!(delivered[0].attachments.len(), 3);
    assert!(delivered[0].summary.contains("Total population: 1.20k"));
    assert!(h.config.report_dir.join("balances_sorted.json").exists());
}

// ---------------------------------------------------------------------------
// 2. Idempotence
// ---------------------------------------------------------------------------

#[tokio::test]
async fn second_run_against_same_chain_writes_nothing() {
    let h = Harness::new(vec![user("a", "0xa"), user("b", "0xb"), UserRecord::new("c")]);
    h.chain.add_holder("0xa", HERO, "0xn1", "0xw1", 10);
    h.chain.add_holder("0xb", HERO, "0xn2", "0xw2", 20);

    h.reconciler().run_reconciliation().await.unwrap();
    assert!(h.store.bulk_write_calls() > 0);
    h.store.clear_write_log();

    let report = h.reconciler().run_reconciliation().await.unwrap();
    assert_eq!(h.store.bulk_write_calls(), 0);
    assert_eq!(report.updates.unchanged, 2);
    assert_eq!(report.refs_generated, 0);
}

// ---------------------------------------------------------------------------
// 3. Deletion
// ---------------------------------------------------------------------------

#[tokio::test]
async fn record_without_qualifying_nft_is_removed_once() {
    let h = Harness::new(vec![user("u", "0xabc")]);
    h.chain.own("0xabc", "0xcoin", "0x2::coin::Coin");

    let report = h.reconciler().run_reconciliation().await.unwrap();
    assert!(h.store.get("u").is_none());
    assert_eq!(report.updates.deleted, 1);
    assert!(h.store.written_ops().iter().any(WriteOp::is_delete));

    h.store.clear_write_log();
    let report = h.reconciler().run_reconciliation().await.unwrap();
    assert_eq!(report.updates.deleted, 0);
    assert!(h.store.written_ops().is_empty());
}

// ---------------------------------------------------------------------------
// 4. Retry exhaustion
// ---------------------------------------------------------------------------

#[tokio::test]
async fn always_throttled_lookup_keeps_record_and_run_continues() {
    let mut throttled = user("t", "0xabc");
    throttled.ref_number = Some(RefNumber::new(30_000));
    let h = Harness::new(vec![throttled, user("ok", "0xa")]);
    h.chain.throttle_owner("0xabc");
    h.chain.add_holder("0xa", HERO, "0xn1", "0xw1", 10);

    let report = h.reconciler().run_reconciliation().await.unwrap();

    assert_eq!(h.chain.list_calls_for("0xabc"), 3);
    assert_eq!(report.updates.lookup_failures, 1);
    assert_eq!(report.updates.deleted, 0);
    assert!(h.store.get("t").is_some());
    assert!(h.store.get("ok").unwrap().wallet_object_id.is_some());
    assert_eq!(report.queries.rate_limited, 3);
}

// ---------------------------------------------------------------------------
// 5. Fault isolation in aggregation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn malformed_stake_structure_does_not_block_other_totals() {
    let h = Harness::new(vec![user("good", "0xa"), user("bad", "0xb")]);
    h.chain.own("0xa", "0xn1", HERO);
    h.chain.put_object(nft_node("0xn1", HERO, "0xw1", "Good", Some(json!([0, [1, 0, 2, 0, 0, 0]]))));
    h.chain.own("0xb", "0xn2", HERO);
    h.chain.put_object(nft_node("0xn2", HERO, "0xw2", "Bad", Some(json!([0, [1, 2, 3], 9]))));

    let report = h.reconciler().run_reconciliation().await.unwrap();

    assert_eq!(report.stakes.per_category, [1, 0, 2, 0, 0, 0]);
    assert_eq!(report.stakes.total, 3);
    assert_eq!(report.stakes.stakers, 1);
    assert_eq!(report.stakes.malformed, 1);
    // Wallet containers were never registered: both balance fetches fail.
    assert_eq!(report.balances.fetch_failures, 2);
}

#[tokio::test]
async fn failed_balance_fetch_is_counted_not_fatal() {
    let h = Harness::new(vec![user("a", "0xa"), user("b", "0xb")]);
    h.chain.add_holder("0xa", HERO, "0xn1", "0xw1", 4_000);
    h.chain.add_holder("0xb", HERO, "0xn2", "0xw2", 1_000);
    h.chain.throttle_object("0xw2");

    let report = h.reconciler().run_reconciliation().await.unwrap();
    assert_eq!(report.balances.fetch_failures, 1);
    assert_eq!(report.balances.entries.len(), 1);
    assert_eq!(report.balances.entries[0].percent, "100.00");
}

// ---------------------------------------------------------------------------
// 6. Duplicates and shared lookups
// ---------------------------------------------------------------------------

#[tokio::test]
async fn shared_identities_are_reported_and_looked_up_once() {
    let mut a = user("a", "0xa");
    a.telegram_id = Some("42".into());
    let mut b = user("b", "0xa");
    b.telegram_id = Some("42".into());
    let h = Harness::new(vec![a, b]);
    h.chain.add_holder("0xa", HERO, "0xn1", "0xw1", 10);

    let report = h.reconciler().run_reconciliation().await.unwrap();

    assert_eq!(report.duplicates.wallet_addresses, vec![WalletAddress::new("0xa")]);
    assert_eq!(report.duplicates.telegram_ids, vec!["42".to_string()]);
    assert!(report.duplicates.ref_numbers.is_empty());
    assert_eq!(h.chain.list_calls_for("0xa"), 1);

    let refs: Vec<_> = h.store.records().iter().filter_map(|r| r.ref_number).collect();
    assert_eq!(refs.len(), 2);
    assert_ne!(refs[0], refs[1]);
}

// ---------------------------------------------------------------------------
// 7. Schema drift
// ---------------------------------------------------------------------------

#[tokio::test]
async fn legacy_embedded_nft_is_normalized() {
    let mut rec = user("a", "0xa");
    rec.ref_number = Some(RefNumber::new(20_500));
    rec.wallet_object_id = Some(ObjectId::new("0xw1"));
    rec.nft = Some(StoredNft::Legacy(json!({ "objectId": "0xn1", "version": "3" })));
    rec.nft_data = Some(json!({ "objectId": "0xn1" }));
    let h = Harness::new(vec![rec]);
    h.chain.add_holder("0xa", HERO, "0xn1", "0xw1", 10);

    let report = h.reconciler().run_reconciliation().await.unwrap();
    let stored = h.store.get("a").unwrap();
    assert_eq!(stored.nft, Some(StoredNft::Id(ObjectId::new("0xn1"))));
    assert_eq!(stored.nft_data.as_ref().unwrap()["type"], HERO);
    assert_eq!(report.updates.wallet_updates, 0);
    assert_eq!(report.updates.nft_updates, 1);
}

// ---------------------------------------------------------------------------
// 8. Dry run, chunking, failures
// ---------------------------------------------------------------------------

#[tokio::test]
async fn dry_run_reports_without_touching_the_store() {
    let mut h = Harness::new(vec![user("gone", "0xabc"), user("a", "0xa")]);
    h.config.dry_run = true;
    h.chain.add_holder("0xa", HERO, "0xn1", "0xw1", 2_000);

    let report = h.reconciler().run_reconciliation().await.unwrap();

    assert!(report.dry_run);
    assert!(report.backup.is_none());
    assert_eq!(report.refs_generated, 2);
    assert_eq!(report.updates.deleted, 1);
    assert_eq!(report.balances.total, 2.0);
    assert_eq!(h.store.backup_count(), 0);
    assert_eq!(h.store.bulk_write_calls(), 0);
    assert_eq!(h.store.records().len(), 2);
    assert!(h.store.get("a").unwrap().ref_number.is_none());
}

#[tokio::test]
async fn writes_are_chunked_per_round_trip() {
    let records = (0..5).map(|i| UserRecord::new(format!("u{i}"))).collect();
    let mut h = Harness::new(records);
    h.config.bulk_write_chunk = 2;

    let report = h.reconciler().run_reconciliation().await.unwrap();
    assert_eq!(report.refs_generated, 5);
    assert_eq!(report.updates.without_wallet, 5);
    assert_eq!(h.store.bulk_write_calls(), 3);
    assert_eq!(report.writes.modified, 5);
}

#[tokio::test]
async fn unavailable_store_aborts_the_run() {
    let h = Harness::new(vec![user("a", "0xa")]);
    h.store.set_unavailable("connection refused");

    let err = h.reconciler().run_reconciliation().await.unwrap_err();
    assert!(matches!(err, ReconcileError::StoreUnavailable(_)));
    assert!(h.sink.delivered().is_empty());
}

#[tokio::test]
async fn rejected_attachments_fall_back_to_text_summary() {
    let h = Harness::new(vec![user("a", "0xa")]);
    h.chain.add_holder("0xa", HERO, "0xn1", "0xw1", 10);
    h.sink.reject_attachments();

    h.reconciler().run_reconciliation().await.unwrap();
    let delivered = h.sink.delivered();
    assert_eq!(delivered.len(), 1);
    assert!(delivered[0].attachments.is_empty());
}

#[tokio::test]
async fn sorted_balance_artifact_uses_numeric_order() {
    let mut h = Harness::new(vec![user("a", "0xa"), user("b", "0xb"), user("c", "0xc")]);
    h.config.balance_divisor = 1;
    h.chain.add_holder("0xa", HERO, "0xn1", "0xw1", 950);
    h.chain.add_holder("0xb", HERO, "0xn2", "0xw2", 1_200);
    h.chain.add_holder("0xc", HERO, "0xn3", "0xw3", 999_000);

    h.reconciler().run_reconciliation().await.unwrap();

    let bytes = std::fs::read(h.config.report_dir.join("balances_sorted.json")).unwrap();
    let sorted: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    let formatted: Vec<&str> = sorted
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["balanceFormatted"].as_str().unwrap())
        .collect();
    assert_eq!(formatted, vec!["999.00k", "1.20k", "950.00"]);
}
