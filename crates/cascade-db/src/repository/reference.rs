//! # Reference Record Repository
//!
//! Candidate queries against the "truth" tables an unverified record is
//! matched against.
//!
//! ## Candidate Predicate (per source)
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  user_id      = record.user_id                                         │
//! │  store_id     = record.store_id      (where the source models a store) │
//! │  amount_cents ∈ record.amount ± tolerance        (default 0.01)        │
//! │  occurred_at  ∈ record.occurred_at ± window      (default 24h)         │
//! │                                                                         │
//! │  An empty result set is a valid, non-error outcome.                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each query projects rows into [`ReferenceRecord`] with a literal
//! `source` column, so the engine never needs to know which table a
//! candidate came from. Result ordering is stable (`occurred_at, id`) -
//! scoring tie-breaks rely on deterministic first-seen order.

use chrono::{DateTime, Duration, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::error::DbResult;
use cascade_core::ReferenceRecord;

/// A candidate search window around an unverified record.
#[derive(Debug, Clone)]
pub struct CandidateQuery {
    pub user_id: String,
    pub store_id: String,
    pub amount_cents: i64,
    pub occurred_at: DateTime<Utc>,
    /// Absolute amount tolerance in cents.
    pub amount_tolerance_cents: i64,
    /// Half-width of the time window.
    pub window: Duration,
}

impl CandidateQuery {
    fn amount_bounds(&self) -> (i64, i64) {
        (
            self.amount_cents - self.amount_tolerance_cents,
            self.amount_cents + self.amount_tolerance_cents,
        )
    }

    fn time_bounds(&self) -> (DateTime<Utc>, DateTime<Utc>) {
        (self.occurred_at - self.window, self.occurred_at + self.window)
    }
}

/// Repository for reference-record candidate queries.
#[derive(Debug, Clone)]
pub struct ReferenceRepository {
    pool: SqlitePool,
}

impl ReferenceRepository {
    /// Creates a new ReferenceRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ReferenceRepository { pool }
    }

    /// Candidates from internal purchase entries (store-scoped).
    pub async fn find_purchase_entry_candidates(
        &self,
        query: &CandidateQuery,
    ) -> DbResult<Vec<ReferenceRecord>> {
        let (amount_lo, amount_hi) = query.amount_bounds();
        let (time_lo, time_hi) = query.time_bounds();

        let records = sqlx::query_as::<_, ReferenceRecord>(
            r#"
            SELECT id, 'purchase_entry' AS source, user_id, store_id,
                   amount_cents, occurred_at
            FROM purchase_entries
            WHERE user_id = ?1
              AND store_id = ?2
              AND amount_cents BETWEEN ?3 AND ?4
              AND occurred_at BETWEEN ?5 AND ?6
            ORDER BY occurred_at, id
            "#,
        )
        .bind(&query.user_id)
        .bind(&query.store_id)
        .bind(amount_lo)
        .bind(amount_hi)
        .bind(time_lo)
        .bind(time_hi)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    /// Candidates from online purchase orders.
    ///
    /// Online orders don't model a store, so the predicate drops the
    /// store equality (and the projection carries a NULL store).
    pub async fn find_online_order_candidates(
        &self,
        query: &CandidateQuery,
    ) -> DbResult<Vec<ReferenceRecord>> {
        let (amount_lo, amount_hi) = query.amount_bounds();
        let (time_lo, time_hi) = query.time_bounds();

        let records = sqlx::query_as::<_, ReferenceRecord>(
            r#"
            SELECT id, 'online_order' AS source, user_id, NULL AS store_id,
                   amount_cents, occurred_at
            FROM online_orders
            WHERE user_id = ?1
              AND amount_cents BETWEEN ?2 AND ?3
              AND occurred_at BETWEEN ?4 AND ?5
            ORDER BY occurred_at, id
            "#,
        )
        .bind(&query.user_id)
        .bind(amount_lo)
        .bind(amount_hi)
        .bind(time_lo)
        .bind(time_hi)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    /// Candidates from finalized-but-unlinked scan uploads.
    ///
    /// Consulted symmetrically when reconciling an EXTERNAL INVOICE: a
    /// scan the reconciliation already verified can stand in as truth for
    /// the invoice covering the same purchase. "Unlinked" means no other
    /// invoice has already matched against that scan.
    pub async fn find_finalized_scan_candidates(
        &self,
        query: &CandidateQuery,
        exclude_record_id: &str,
    ) -> DbResult<Vec<ReferenceRecord>> {
        let (amount_lo, amount_hi) = query.amount_bounds();
        let (time_lo, time_hi) = query.time_bounds();

        let records = sqlx::query_as::<_, ReferenceRecord>(
            r#"
            SELECT u.id, 'external_scan' AS source, u.user_id, u.store_id,
                   u.amount_cents, u.occurred_at
            FROM unverified_records u
            WHERE u.kind = 'scan'
              AND u.status = 'final'
              AND u.id <> ?1
              AND u.user_id = ?2
              AND u.store_id = ?3
              AND u.amount_cents BETWEEN ?4 AND ?5
              AND u.occurred_at BETWEEN ?6 AND ?7
              AND NOT EXISTS (
                  SELECT 1 FROM unverified_records linked
                  WHERE linked.matched_reference_source = 'external_scan'
                    AND linked.matched_reference_id = u.id
              )
            ORDER BY u.occurred_at, u.id
            "#,
        )
        .bind(exclude_record_id)
        .bind(&query.user_id)
        .bind(&query.store_id)
        .bind(amount_lo)
        .bind(amount_hi)
        .bind(time_lo)
        .bind(time_hi)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    /// Inserts an internal purchase entry (ingestion path, test seeding).
    ///
    /// ## Returns
    /// The generated entry ID.
    pub async fn insert_purchase_entry(
        &self,
        user_id: &str,
        store_id: &str,
        amount_cents: i64,
        occurred_at: DateTime<Utc>,
    ) -> DbResult<String> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO purchase_entries (id, user_id, store_id, amount_cents, occurred_at, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&id)
        .bind(user_id)
        .bind(store_id)
        .bind(amount_cents)
        .bind(occurred_at)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(id)
    }

    /// Inserts an online purchase order (ingestion path, test seeding).
    pub async fn insert_online_order(
        &self,
        user_id: &str,
        amount_cents: i64,
        occurred_at: DateTime<Utc>,
    ) -> DbResult<String> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO online_orders (id, user_id, amount_cents, occurred_at, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(&id)
        .bind(user_id)
        .bind(amount_cents)
        .bind(occurred_at)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(id)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
