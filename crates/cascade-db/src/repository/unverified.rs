//! # Unverified Record Repository
//!
//! Database operations for unverified proof-of-purchase records.
//!
//! ## Record Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                  Unverified Record Lifecycle                            │
//! │                                                                         │
//! │  1. INGEST (OCR upload / external invoice sync)                        │
//! │     └── insert() → { status: provisional }                             │
//! │                                                                         │
//! │  2. CLAIM (reconciliation worker)                                      │
//! │     └── claim() → conditional UPDATE stamps claimed_at                 │
//! │         (0 rows affected = another worker owns it, back off)           │
//! │                                                                         │
//! │  3. FINALIZE or stay provisional                                       │
//! │     └── finalize_match() → ONE transaction:                            │
//! │         status = final + match block + award credits + ledger rows     │
//! │         (guarded by status = 'provisional': second call is a no-op)    │
//! │                                                                         │
//! │  4. (MANUAL) REJECT                                                    │
//! │     └── reject() → { status: rejected }                                │
//! │                                                                         │
//! │  Records are NEVER deleted, only status-transitioned.                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Duration, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use crate::repository::ledger;
use cascade_core::{LedgerSource, RecordStatus, ReferenceSource, UnverifiedRecord};

// =============================================================================
// Finalization Types
// =============================================================================

/// Everything needed to finalize a match in one transaction.
#[derive(Debug, Clone)]
pub struct MatchFinalization {
    pub record_id: String,
    pub user_id: String,
    pub reference_id: String,
    pub reference_source: ReferenceSource,
    pub confidence: f64,
    pub matched_at: DateTime<Utc>,
    /// Reconciliation-path points to credit (skipped if already credited).
    pub points: i64,
    /// Reconciliation-path cashback to credit, in cents.
    pub cashback_cents: i64,
}

/// What the finalize transaction actually did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FinalizeOutcome {
    /// The `provisional → final` transition was applied by THIS call.
    /// `false` means the record had already left `provisional` - the
    /// call was a no-op (idempotency by status transition).
    pub finalized: bool,
    /// Points/cashback were credited by THIS call. `false` with
    /// `finalized = true` means awards were already non-zero (the record
    /// got a status-only correction).
    pub credited: bool,
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for unverified record database operations.
#[derive(Debug, Clone)]
pub struct UnverifiedRecordRepository {
    pool: SqlitePool,
}

impl UnverifiedRecordRepository {
    /// Creates a new UnverifiedRecordRepository.
    pub fn new(pool: SqlitePool) -> Self {
        UnverifiedRecordRepository { pool }
    }

    /// Inserts a freshly ingested record.
    pub async fn insert(&self, record: &UnverifiedRecord) -> DbResult<()> {
        debug!(id = %record.id, invoice = %record.invoice_number, "Inserting unverified record");

        sqlx::query(
            r#"
            INSERT INTO unverified_records (
                id, user_id, store_id, kind, invoice_number,
                amount_cents, occurred_at, status,
                matched_reference_id, matched_reference_source, matched_at, confidence,
                points_awarded, cashback_awarded_cents, claimed_at,
                created_at, updated_at
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5,
                ?6, ?7, ?8,
                ?9, ?10, ?11, ?12,
                ?13, ?14, ?15,
                ?16, ?17
            )
            "#,
        )
        .bind(&record.id)
        .bind(&record.user_id)
        .bind(&record.store_id)
        .bind(record.kind)
        .bind(&record.invoice_number)
        .bind(record.amount_cents)
        .bind(record.occurred_at)
        .bind(record.status)
        .bind(&record.matched_reference_id)
        .bind(record.matched_reference_source)
        .bind(record.matched_at)
        .bind(record.confidence)
        .bind(record.points_awarded)
        .bind(record.cashback_awarded_cents)
        .bind(record.claimed_at)
        .bind(record.created_at)
        .bind(record.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Gets a record by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<UnverifiedRecord>> {
        let record = sqlx::query_as::<_, UnverifiedRecord>(
            r#"
            SELECT id, user_id, store_id, kind, invoice_number,
                   amount_cents, occurred_at, status,
                   matched_reference_id, matched_reference_source, matched_at, confidence,
                   points_awarded, cashback_awarded_cents, claimed_at,
                   created_at, updated_at
            FROM unverified_records
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    /// Lists the pending working set, oldest first.
    ///
    /// This is the bounded batch the orchestrator iterates; records still
    /// claimed by a live worker are included (the claim check happens
    /// per-record at processing time).
    pub async fn list_pending(&self, limit: u32) -> DbResult<Vec<UnverifiedRecord>> {
        let records = sqlx::query_as::<_, UnverifiedRecord>(
            r#"
            SELECT id, user_id, store_id, kind, invoice_number,
                   amount_cents, occurred_at, status,
                   matched_reference_id, matched_reference_source, matched_at, confidence,
                   points_awarded, cashback_awarded_cents, claimed_at,
                   created_at, updated_at
            FROM unverified_records
            WHERE status = 'provisional'
            ORDER BY created_at, id
            LIMIT ?1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    /// Atomically claims a record for processing.
    ///
    /// ## Why a Claim?
    /// Two workers reconciling the same record would both pass the status
    /// check and both attempt ledger writes. The conditional UPDATE here
    /// is the serialization point: exactly one worker wins. Claims older
    /// than `claim_ttl` are treated as abandoned (worker died mid-record)
    /// and can be re-claimed.
    ///
    /// ## Returns
    /// `true` if this caller now owns the record.
    pub async fn claim(
        &self,
        id: &str,
        now: DateTime<Utc>,
        claim_ttl: Duration,
    ) -> DbResult<bool> {
        let stale_before = now - claim_ttl;

        let result = sqlx::query(
            r#"
            UPDATE unverified_records SET
                claimed_at = ?2,
                updated_at = ?2
            WHERE id = ?1
              AND status = 'provisional'
              AND (claimed_at IS NULL OR claimed_at < ?3)
            "#,
        )
        .bind(id)
        .bind(now)
        .bind(stale_before)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Releases a claim without changing status (no-match outcome: the
    /// record stays provisional and is retried by a later batch).
    pub async fn release_claim(&self, id: &str) -> DbResult<()> {
        sqlx::query(
            r#"
            UPDATE unverified_records SET claimed_at = NULL
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Finalizes a successful match in a single transaction.
    ///
    /// ## Transaction Steps
    /// 1. Guarded status transition `provisional → final` with the match
    ///    block. Zero rows affected means the record already left
    ///    `provisional`: the whole call degrades to a no-op.
    /// 2. Guarded award credit: `points_awarded`/`cashback_awarded_cents`
    ///    are written only if both are still zero - the record's own
    ///    fields are the idempotency guard against double-crediting.
    /// 3. Ledger rows are appended only when step 2 actually credited.
    ///
    /// All-or-nothing: a crash can never leave awards on the record
    /// without the matching ledger rows.
    pub async fn finalize_match(&self, params: &MatchFinalization) -> DbResult<FinalizeOutcome> {
        let mut tx = self.pool.begin().await?;
        let now = params.matched_at;

        let result = sqlx::query(
            r#"
            UPDATE unverified_records SET
                status = 'final',
                matched_reference_id = ?2,
                matched_reference_source = ?3,
                matched_at = ?4,
                confidence = ?5,
                claimed_at = NULL,
                updated_at = ?4
            WHERE id = ?1 AND status = 'provisional'
            "#,
        )
        .bind(&params.record_id)
        .bind(&params.reference_id)
        .bind(params.reference_source)
        .bind(params.matched_at)
        .bind(params.confidence)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            // Already final or rejected; nothing to do. Dropping the
            // transaction rolls back.
            debug!(id = %params.record_id, "finalize_match no-op: record not provisional");
            return Ok(FinalizeOutcome {
                finalized: false,
                credited: false,
            });
        }

        let credit = sqlx::query(
            r#"
            UPDATE unverified_records SET
                points_awarded = ?2,
                cashback_awarded_cents = ?3
            WHERE id = ?1
              AND points_awarded = 0
              AND cashback_awarded_cents = 0
            "#,
        )
        .bind(&params.record_id)
        .bind(params.points)
        .bind(params.cashback_cents)
        .execute(&mut *tx)
        .await?;

        let credited = credit.rows_affected() == 1;

        if credited {
            ledger::insert_points(
                &mut tx,
                &params.user_id,
                params.points,
                LedgerSource::Reconciliation,
                &params.record_id,
                now,
            )
            .await?;
            ledger::insert_cashback(
                &mut tx,
                &params.user_id,
                params.cashback_cents,
                LedgerSource::Reconciliation,
                &params.record_id,
                now,
            )
            .await?;
        }

        tx.commit().await?;

        debug!(
            id = %params.record_id,
            reference = %params.reference_id,
            source = %params.reference_source,
            confidence = params.confidence,
            credited,
            "Finalized match"
        );

        Ok(FinalizeOutcome {
            finalized: true,
            credited,
        })
    }

    /// Manually rejects a provisional record.
    ///
    /// ## Returns
    /// `true` if the transition was applied; `false` if the record had
    /// already left `provisional` (terminal states are never overwritten).
    pub async fn reject(&self, id: &str, now: DateTime<Utc>) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE unverified_records SET
                status = 'rejected',
                claimed_at = NULL,
                updated_at = ?2
            WHERE id = ?1 AND status = 'provisional'
            "#,
        )
        .bind(id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Counts records by status, for batch reporting and diagnostics.
    pub async fn count_by_status(&self, status: RecordStatus) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM unverified_records WHERE status = ?1
            "#,
        )
        .bind(status)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
