//! # Reward Ledger Repository
//!
//! Append-only points and cashback ledgers.
//!
//! ## Append-Only Discipline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Ledger rows are NEVER updated or deleted. A correction is a new       │
//! │  row. Idempotency is NOT enforced here - it lives on the record        │
//! │  being credited (award fields on unverified_records), so ledger        │
//! │  inserts happen at most once per record inside the finalize           │
//! │  transaction.                                                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::debug;
use uuid::Uuid;

use crate::error::DbResult;
use cascade_core::LedgerSource;

// =============================================================================
// Transactional Inserts
// =============================================================================
// Shared by the finalize transaction (unverified.rs), the sale create
// transaction (sale.rs), and the standalone repository methods below.

/// Appends a points-earned row inside an existing transaction.
pub(crate) async fn insert_points(
    tx: &mut Transaction<'_, Sqlite>,
    user_id: &str,
    points: i64,
    source: LedgerSource,
    reference_id: &str,
    now: DateTime<Utc>,
) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO points_ledger (id, user_id, points, source, reference_id, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(user_id)
    .bind(points)
    .bind(source)
    .bind(reference_id)
    .bind(now)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

/// Appends a cashback-earned row inside an existing transaction.
pub(crate) async fn insert_cashback(
    tx: &mut Transaction<'_, Sqlite>,
    user_id: &str,
    amount_cents: i64,
    source: LedgerSource,
    reference_id: &str,
    now: DateTime<Utc>,
) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO cashback_ledger (id, user_id, amount_cents, source, reference_id, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(user_id)
    .bind(amount_cents)
    .bind(source)
    .bind(reference_id)
    .bind(now)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for the append-only reward ledgers.
#[derive(Debug, Clone)]
pub struct LedgerRepository {
    pool: SqlitePool,
}

impl LedgerRepository {
    /// Creates a new LedgerRepository.
    pub fn new(pool: SqlitePool) -> Self {
        LedgerRepository { pool }
    }

    /// Appends a points-earned entry.
    pub async fn record_points_earned(
        &self,
        user_id: &str,
        points: i64,
        source: LedgerSource,
        reference_id: &str,
        now: DateTime<Utc>,
    ) -> DbResult<()> {
        debug!(user = %user_id, points, %source, reference = %reference_id, "Recording points");

        let mut tx = self.pool.begin().await?;
        insert_points(&mut tx, user_id, points, source, reference_id, now).await?;
        tx.commit().await?;

        Ok(())
    }

    /// Appends a cashback-earned entry.
    pub async fn record_cashback_earned(
        &self,
        user_id: &str,
        amount_cents: i64,
        source: LedgerSource,
        reference_id: &str,
        now: DateTime<Utc>,
    ) -> DbResult<()> {
        debug!(user = %user_id, amount_cents, %source, reference = %reference_id, "Recording cashback");

        let mut tx = self.pool.begin().await?;
        insert_cashback(&mut tx, user_id, amount_cents, source, reference_id, now).await?;
        tx.commit().await?;

        Ok(())
    }

    /// Total points balance for a user.
    pub async fn total_points(&self, user_id: &str) -> DbResult<i64> {
        let total: Option<i64> = sqlx::query_scalar(
            r#"
            SELECT SUM(points) FROM points_ledger WHERE user_id = ?1
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(total.unwrap_or(0))
    }

    /// Total cashback balance for a user, in cents.
    pub async fn total_cashback_cents(&self, user_id: &str) -> DbResult<i64> {
        let total: Option<i64> = sqlx::query_scalar(
            r#"
            SELECT SUM(amount_cents) FROM cashback_ledger WHERE user_id = ?1
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(total.unwrap_or(0))
    }

    /// Number of ledger rows crediting a given reference (used by tests to
    /// prove single-crediting).
    pub async fn points_entry_count(&self, reference_id: &str) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM points_ledger WHERE reference_id = ?1
            "#,
        )
        .bind(reference_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    #[tokio::test]
    async fn test_corrections_accumulate_as_new_rows() {
        let db = test_db().await;
        let ledger = db.ledger();
        let now = Utc::now();

        ledger
            .record_points_earned("user-1", 50, LedgerSource::Reconciliation, "rec-1", now)
            .await
            .unwrap();
        // A correction is a new row, never an update.
        ledger
            .record_points_earned("user-1", -10, LedgerSource::Reconciliation, "rec-1", now)
            .await
            .unwrap();
        ledger
            .record_cashback_earned("user-1", 1_000, LedgerSource::Sale, "sale-1", now)
            .await
            .unwrap();

        assert_eq!(ledger.total_points("user-1").await.unwrap(), 40);
        assert_eq!(ledger.total_cashback_cents("user-1").await.unwrap(), 1_000);
        assert_eq!(ledger.total_points("user-2").await.unwrap(), 0);
    }
}
