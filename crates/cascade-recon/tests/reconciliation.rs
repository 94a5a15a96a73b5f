//! End-to-end reconciliation scenarios against an in-memory database.

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use tokio::sync::mpsc;

use cascade_core::{
    RecordKind, RecordStatus, ReferenceSource, Tier, TierMultipliers, UnverifiedRecord,
    FALLBACK_SETTINGS_ID,
};
use cascade_db::{Database, DbConfig, NewCommissionSettings};
use cascade_recon::{
    NewSale, NoOpNotificationSink, ReconConfig, ReconciliationOrchestrator, RecordOutcome,
    RecordingNotificationSink, ReconError, RewardEvent, SaleService, SettingsVersionStore,
};

async fn test_db() -> Database {
    Database::new(DbConfig::in_memory()).await.unwrap()
}

/// Wide amount tolerance so tests can shape sub-threshold confidences;
/// the default 1-cent tolerance admits only near-perfect candidates.
fn wide_config() -> ReconConfig {
    let mut config = ReconConfig::default();
    config.matching.amount_tolerance_cents = 1_000;
    config
}

fn orchestrator(db: &Database, config: ReconConfig) -> ReconciliationOrchestrator {
    ReconciliationOrchestrator::new(db.clone(), config, Arc::new(NoOpNotificationSink))
}

fn record(id: &str, kind: RecordKind, amount_cents: i64, occurred_at: DateTime<Utc>) -> UnverifiedRecord {
    UnverifiedRecord {
        id: id.to_string(),
        user_id: "user-1".to_string(),
        store_id: "store-1".to_string(),
        kind,
        invoice_number: format!("INV-{id}"),
        amount_cents,
        occurred_at,
        status: RecordStatus::Provisional,
        matched_reference_id: None,
        matched_reference_source: None,
        matched_at: None,
        confidence: None,
        points_awarded: 0,
        cashback_awarded_cents: 0,
        claimed_at: None,
        created_at: occurred_at,
        updated_at: occurred_at,
    }
}

// =============================================================================
// Matching Scenarios
// =============================================================================

#[tokio::test]
async fn qualifying_source_beats_better_ranked_weak_one() {
    let db = test_db().await;
    let t = Utc::now();

    db.unverified_records()
        .insert(&record("rec-1", RecordKind::Scan, 50_000, t))
        .await
        .unwrap();

    // Internal entry: exact amount and time, confidence 1.0.
    let internal = db
        .reference_records()
        .insert_purchase_entry("user-1", "store-1", 50_000, t)
        .await
        .unwrap();
    // Online order: amount off by 900 cents -> amount_score 0.1,
    // confidence 0.37, below threshold.
    db.reference_records()
        .insert_online_order("user-1", 50_900, t)
        .await
        .unwrap();

    let engine = orchestrator(&db, wide_config());
    let outcome = engine.reconcile_record("rec-1").await;

    match outcome {
        RecordOutcome::Matched {
            reference_id,
            source,
            confidence,
            points,
            cashback_cents,
            ..
        } => {
            assert_eq!(reference_id, internal);
            assert_eq!(source, ReferenceSource::PurchaseEntry);
            assert_eq!(confidence, 1.0);
            // 500.00 -> 50 points (1 per 10 units), 2% cashback.
            assert_eq!(points, 50);
            assert_eq!(cashback_cents, 1_000);
        }
        other => panic!("expected Matched, got {other:?}"),
    }

    let stored = db.unverified_records().get_by_id("rec-1").await.unwrap().unwrap();
    assert_eq!(stored.status, RecordStatus::Final);
    assert_eq!(stored.matched_reference_id, Some(internal));
    assert_eq!(
        stored.matched_reference_source,
        Some(ReferenceSource::PurchaseEntry)
    );
}

#[tokio::test]
async fn higher_confidence_wins_across_sources_regardless_of_priority() {
    let db = test_db().await;
    let t = Utc::now();

    db.unverified_records()
        .insert(&record("rec-1", RecordKind::Scan, 50_000, t))
        .await
        .unwrap();

    // Internal entry is plausible but imperfect (amount off 200 cents).
    db.reference_records()
        .insert_purchase_entry("user-1", "store-1", 50_200, t)
        .await
        .unwrap();
    // Online order is exact: must win despite lower source priority.
    let online = db
        .reference_records()
        .insert_online_order("user-1", 50_000, t)
        .await
        .unwrap();

    let engine = orchestrator(&db, wide_config());
    match engine.reconcile_record("rec-1").await {
        RecordOutcome::Matched {
            reference_id,
            source,
            ..
        } => {
            assert_eq!(reference_id, online);
            assert_eq!(source, ReferenceSource::OnlineOrder);
        }
        other => panic!("expected Matched, got {other:?}"),
    }
}

#[tokio::test]
async fn equal_confidence_resolves_by_source_priority() {
    let db = test_db().await;
    let t = Utc::now();

    db.unverified_records()
        .insert(&record("rec-1", RecordKind::Scan, 50_000, t))
        .await
        .unwrap();

    // Both sources hold an exact match (confidence 1.0 each).
    let internal = db
        .reference_records()
        .insert_purchase_entry("user-1", "store-1", 50_000, t)
        .await
        .unwrap();
    db.reference_records()
        .insert_online_order("user-1", 50_000, t)
        .await
        .unwrap();

    let engine = orchestrator(&db, wide_config());
    match engine.reconcile_record("rec-1").await {
        RecordOutcome::Matched {
            reference_id,
            source,
            ..
        } => {
            // Default priority: internal purchase entry first.
            assert_eq!(reference_id, internal);
            assert_eq!(source, ReferenceSource::PurchaseEntry);
        }
        other => panic!("expected Matched, got {other:?}"),
    }
}

#[tokio::test]
async fn below_threshold_stays_provisional() {
    let db = test_db().await;
    let t = Utc::now();

    db.unverified_records()
        .insert(&record("rec-1", RecordKind::Scan, 50_000, t))
        .await
        .unwrap();
    // Amount off by 900 cents: confidence 0.37, below the 0.8 threshold.
    db.reference_records()
        .insert_purchase_entry("user-1", "store-1", 50_900, t)
        .await
        .unwrap();

    let engine = orchestrator(&db, wide_config());
    match engine.reconcile_record("rec-1").await {
        RecordOutcome::NoMatch {
            best_confidence, ..
        } => {
            let best = best_confidence.expect("a candidate existed");
            assert!(best < 0.8, "confidence {best} should miss the threshold");
        }
        other => panic!("expected NoMatch, got {other:?}"),
    }

    // Still provisional, unawarded, claim released for the next batch.
    let stored = db.unverified_records().get_by_id("rec-1").await.unwrap().unwrap();
    assert_eq!(stored.status, RecordStatus::Provisional);
    assert_eq!(stored.points_awarded, 0);
    assert!(stored.claimed_at.is_none());
}

#[tokio::test]
async fn no_candidates_is_a_clean_no_match() {
    let db = test_db().await;
    let t = Utc::now();

    db.unverified_records()
        .insert(&record("rec-1", RecordKind::Scan, 50_000, t))
        .await
        .unwrap();

    let engine = orchestrator(&db, ReconConfig::default());
    match engine.reconcile_record("rec-1").await {
        RecordOutcome::NoMatch {
            best_confidence, ..
        } => assert!(best_confidence.is_none()),
        other => panic!("expected NoMatch, got {other:?}"),
    }
}

#[tokio::test]
async fn double_reconciliation_changes_nothing() {
    let db = test_db().await;
    let t = Utc::now();

    db.unverified_records()
        .insert(&record("rec-1", RecordKind::Scan, 50_000, t))
        .await
        .unwrap();
    db.reference_records()
        .insert_purchase_entry("user-1", "store-1", 50_000, t)
        .await
        .unwrap();

    let engine = orchestrator(&db, ReconConfig::default());
    assert!(matches!(
        engine.reconcile_record("rec-1").await,
        RecordOutcome::Matched { .. }
    ));
    let first = db.unverified_records().get_by_id("rec-1").await.unwrap().unwrap();

    // Replay: pure no-op.
    assert!(matches!(
        engine.reconcile_record("rec-1").await,
        RecordOutcome::Skipped { .. }
    ));
    let second = db.unverified_records().get_by_id("rec-1").await.unwrap().unwrap();

    assert_eq!(first.status, second.status);
    assert_eq!(first.points_awarded, second.points_awarded);
    assert_eq!(first.cashback_awarded_cents, second.cashback_awarded_cents);
    assert_eq!(first.matched_at, second.matched_at);

    // Exactly one ledger credit despite two runs.
    assert_eq!(db.ledger().points_entry_count("rec-1").await.unwrap(), 1);
    assert_eq!(db.ledger().total_points("user-1").await.unwrap(), 50);
}

#[tokio::test]
async fn external_invoice_matches_finalized_scan() {
    let db = test_db().await;
    let t = Utc::now();

    // A scan already verified by an earlier batch.
    let mut verified_scan = record("scan-1", RecordKind::Scan, 50_000, t);
    verified_scan.status = RecordStatus::Final;
    db.unverified_records().insert(&verified_scan).await.unwrap();

    // The invoice covering the same purchase arrives from the billing
    // provider.
    db.unverified_records()
        .insert(&record("inv-1", RecordKind::ExternalInvoice, 50_000, t))
        .await
        .unwrap();

    let engine = orchestrator(&db, ReconConfig::default());
    match engine.reconcile_record("inv-1").await {
        RecordOutcome::Matched {
            reference_id,
            source,
            ..
        } => {
            assert_eq!(reference_id, "scan-1");
            assert_eq!(source, ReferenceSource::ExternalScan);
        }
        other => panic!("expected Matched, got {other:?}"),
    }
}

#[tokio::test]
async fn scans_never_match_other_scans() {
    let db = test_db().await;
    let t = Utc::now();

    let mut verified_scan = record("scan-1", RecordKind::Scan, 50_000, t);
    verified_scan.status = RecordStatus::Final;
    db.unverified_records().insert(&verified_scan).await.unwrap();

    // A second scan of the same purchase must not use the first as truth.
    db.unverified_records()
        .insert(&record("scan-2", RecordKind::Scan, 50_000, t))
        .await
        .unwrap();

    let engine = orchestrator(&db, ReconConfig::default());
    assert!(matches!(
        engine.reconcile_record("scan-2").await,
        RecordOutcome::NoMatch { .. }
    ));
}

#[tokio::test]
async fn matched_record_notifies_sink() {
    let db = test_db().await;
    let t = Utc::now();

    db.unverified_records()
        .insert(&record("rec-1", RecordKind::Scan, 50_000, t))
        .await
        .unwrap();
    db.reference_records()
        .insert_purchase_entry("user-1", "store-1", 50_000, t)
        .await
        .unwrap();

    let sink = Arc::new(RecordingNotificationSink::new());
    let engine = ReconciliationOrchestrator::new(db.clone(), ReconConfig::default(), sink.clone());
    engine.reconcile_record("rec-1").await;

    let events = sink.events();
    assert_eq!(
        events,
        vec![RewardEvent::RecordMatched {
            user_id: "user-1".to_string(),
            record_id: "rec-1".to_string(),
            points: 50,
            cashback_cents: 1_000,
        }]
    );
}

// =============================================================================
// Batch Runner
// =============================================================================

#[tokio::test]
async fn batch_processes_all_pending_and_reports() {
    let db = test_db().await;
    let t = Utc::now();

    // Distinct amounts: only "a" has truth behind it.
    for (id, amount) in [("a", 50_000_i64), ("b", 70_000_i64), ("c", 90_000_i64)] {
        db.unverified_records()
            .insert(&record(id, RecordKind::Scan, amount, t))
            .await
            .unwrap();
    }
    db.reference_records()
        .insert_purchase_entry("user-1", "store-1", 50_000, t)
        .await
        .unwrap();

    let engine = orchestrator(&db, ReconConfig::default());
    let report = engine.run_batch().await.unwrap();

    assert!(!report.cancelled);
    assert_eq!(report.matched, 1);
    assert_eq!(report.no_match, 2);
    assert_eq!(report.errors, 0);
    assert_eq!(report.processed(), 3);
}

#[tokio::test]
async fn one_failing_record_reports_error_and_batch_continues() {
    let db = test_db().await;
    let t = Utc.with_ymd_and_hms(2026, 3, 15, 12, 0, 0).unwrap();

    let mut bad = record("rec-bad", RecordKind::Scan, 30_000, t);
    bad.user_id = "user-2".to_string();
    db.unverified_records().insert(&bad).await.unwrap();
    db.unverified_records()
        .insert(&record("rec-good", RecordKind::Scan, 50_000, t))
        .await
        .unwrap();

    // An online order inside rec-bad's window whose timestamp cannot be
    // decoded: the candidate query for that record fails.
    sqlx::query(
        r#"
        INSERT INTO online_orders (id, user_id, amount_cents, occurred_at, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5)
        "#,
    )
    .bind("order-bad")
    .bind("user-2")
    .bind(30_000_i64)
    .bind("2026-03-15 99:99:99")
    .bind("2026-03-15 99:99:99")
    .execute(db.pool())
    .await
    .unwrap();

    db.reference_records()
        .insert_purchase_entry("user-1", "store-1", 50_000, t)
        .await
        .unwrap();

    let engine = orchestrator(&db, ReconConfig::default());
    let report = engine.run_batch().await.unwrap();

    // The bad record folds into an Error outcome; the rest of the batch
    // still settles.
    assert!(!report.cancelled);
    assert_eq!(report.matched, 1);
    assert_eq!(report.errors, 1);
    assert_eq!(report.processed(), 2);

    let error = report
        .outcomes
        .iter()
        .find(|o| matches!(o, RecordOutcome::Error { .. }))
        .unwrap();
    match error {
        RecordOutcome::Error {
            record_id,
            transient,
            ..
        } => {
            assert_eq!(record_id, "rec-bad");
            assert!(!transient);
        }
        other => panic!("expected Error, got {other:?}"),
    }

    // The failed record stays provisional with its claim released, so a
    // later batch retries it.
    let stored = db.unverified_records().get_by_id("rec-bad").await.unwrap().unwrap();
    assert_eq!(stored.status, RecordStatus::Provisional);
    assert_eq!(stored.claimed_at, None);
    assert_eq!(stored.points_awarded, 0);

    let settled = db.unverified_records().get_by_id("rec-good").await.unwrap().unwrap();
    assert_eq!(settled.status, RecordStatus::Final);
}

#[tokio::test]
async fn shutdown_before_start_cancels_batch() {
    let db = test_db().await;
    let t = Utc::now();

    for id in ["a", "b"] {
        db.unverified_records()
            .insert(&record(id, RecordKind::Scan, 50_000, t))
            .await
            .unwrap();
    }

    let (tx, mut rx) = mpsc::channel(1);
    tx.send(()).await.unwrap();

    let engine = orchestrator(&db, ReconConfig::default());
    let report = engine.run_batch_with_shutdown(&mut rx).await.unwrap();

    assert!(report.cancelled);
    assert_eq!(report.processed(), 0);

    // Unprocessed records are untouched.
    for id in ["a", "b"] {
        let stored = db.unverified_records().get_by_id(id).await.unwrap().unwrap();
        assert_eq!(stored.status, RecordStatus::Provisional);
    }
}

// =============================================================================
// Settings Store
// =============================================================================

#[tokio::test]
async fn settings_fall_back_before_first_snapshot() {
    let db = test_db().await;
    let store = SettingsVersionStore::new(db.settings());

    let current = store.current().await.unwrap();
    assert_eq!(current.id, FALLBACK_SETTINGS_ID);

    let early = Utc::now() - Duration::days(365);
    let at = store.at_time(early).await.unwrap();
    assert_eq!(at.id, FALLBACK_SETTINGS_ID);
}

#[tokio::test]
async fn settings_store_rejects_malformed_versions() {
    let db = test_db().await;
    let store = SettingsVersionStore::new(db.settings());

    let err = store
        .create_new(NewCommissionSettings {
            base_rate_bps: 500,
            tier_multipliers: TierMultipliers::default(),
            commission_cap_cents: 0,
            cashback_rate_per_liter_cents: 50,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, ReconError::Configuration { .. }));

    // Nothing was written.
    assert_eq!(db.settings().version_count().await.unwrap(), 0);
}

// =============================================================================
// Sale Service
// =============================================================================

fn sale_settings(commission_cap_cents: i64) -> NewCommissionSettings {
    NewCommissionSettings {
        base_rate_bps: 500,
        tier_multipliers: TierMultipliers::default(),
        commission_cap_cents,
        // 2.00 per liter, matching the worked commission example.
        cashback_rate_per_liter_cents: 200,
    }
}

fn sale_service(db: &Database) -> SaleService {
    SaleService::new(
        db.clone(),
        SettingsVersionStore::new(db.settings()),
        Arc::new(NoOpNotificationSink),
    )
}

#[tokio::test]
async fn sale_freezes_commission_snapshot() {
    let db = test_db().await;
    let store = SettingsVersionStore::new(db.settings());
    let v1 = store.create_new(sale_settings(100_000)).await.unwrap();

    // 1000.00 at 5% base, gold 1.5x -> commission 75.00; 50 L at 2.00/L
    // with the 1.5x tier -> cashback 150.00.
    let sale = sale_service(&db)
        .create_sale(NewSale {
            user_id: "user-1".to_string(),
            store_id: "store-1".to_string(),
            amount_cents: 100_000,
            liters: 50.0,
            tier: Some(Tier::Gold),
        })
        .await
        .unwrap();

    assert_eq!(sale.commission_cents, 7_500);
    assert_eq!(sale.commission_rate_bps, 750);
    assert_eq!(sale.cashback_earned_cents, 15_000);
    assert_eq!(sale.settings_snapshot_id, v1.id);
    assert_eq!(sale.tier_used, Some(Tier::Gold));

    // Sale-path cashback landed in the ledger.
    assert_eq!(db.ledger().total_cashback_cents("user-1").await.unwrap(), 15_000);

    // A later settings change never alters the stored sale.
    store.create_new(sale_settings(50_000)).await.unwrap();
    let stored = db.sales().get_by_id(&sale.id).await.unwrap().unwrap();
    assert_eq!(stored.commission_cents, 7_500);
    assert_eq!(stored.settings_snapshot_id, v1.id);
}

#[tokio::test]
async fn sale_cap_reduces_effective_rate() {
    let db = test_db().await;
    let store = SettingsVersionStore::new(db.settings());
    // Cap 50.00: tiered 75.00 clamps down, effective rate 5.0% not 7.5%.
    store.create_new(sale_settings(5_000)).await.unwrap();

    let sale = sale_service(&db)
        .create_sale(NewSale {
            user_id: "user-1".to_string(),
            store_id: "store-1".to_string(),
            amount_cents: 100_000,
            liters: 0.0,
            tier: Some(Tier::Gold),
        })
        .await
        .unwrap();

    assert_eq!(sale.commission_cents, 5_000);
    assert_eq!(sale.commission_rate_bps, 500);
}

#[tokio::test]
async fn sale_without_configured_settings_uses_fallback() {
    let db = test_db().await;

    let sale = sale_service(&db)
        .create_sale(NewSale {
            user_id: "user-1".to_string(),
            store_id: "store-1".to_string(),
            amount_cents: 100_000,
            liters: 10.0,
            tier: None,
        })
        .await
        .unwrap();

    assert_eq!(sale.settings_snapshot_id, FALLBACK_SETTINGS_ID);
    // Fallback: 5% base, no tier -> 1.0x -> 50.00 commission.
    assert_eq!(sale.commission_cents, 5_000);
    assert_eq!(sale.commission_rate_bps, 500);
}

#[tokio::test]
async fn sale_rejects_invalid_input() {
    let db = test_db().await;
    let service = sale_service(&db);

    let err = service
        .create_sale(NewSale {
            user_id: "user-1".to_string(),
            store_id: "store-1".to_string(),
            amount_cents: 0,
            liters: 10.0,
            tier: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, ReconError::Validation(_)));

    let err = service
        .create_sale(NewSale {
            user_id: "".to_string(),
            store_id: "store-1".to_string(),
            amount_cents: 10_000,
            liters: 10.0,
            tier: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, ReconError::Validation(_)));
}
