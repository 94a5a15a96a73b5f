//! # Sale Repository
//!
//! Persistence for direct sales and their frozen commission snapshots.
//!
//! A stored sale carries the commission amount, the effective rate, the
//! tier that was applied, and the ID of the settings version used. A
//! later settings change never alters what a stored sale reports.

use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use crate::repository::ledger;
use cascade_core::{LedgerSource, Sale};

const SELECT_COLUMNS: &str = r#"
    id, user_id, store_id, amount_cents, liters, tier,
    commission_cents, commission_rate_bps, tier_used,
    settings_snapshot_id, cashback_earned_cents, created_at
"#;

/// Repository for sale database operations.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    /// Creates a new SaleRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    /// Creates a completed sale with its frozen commission snapshot.
    ///
    /// The sale row and its sale-path cashback ledger entry commit in ONE
    /// transaction; a failure anywhere leaves neither behind.
    pub async fn create(&self, sale: &Sale) -> DbResult<()> {
        debug!(id = %sale.id, user = %sale.user_id, "Creating sale");

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO sales (
                id, user_id, store_id, amount_cents, liters, tier,
                commission_cents, commission_rate_bps, tier_used,
                settings_snapshot_id, cashback_earned_cents, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
        )
        .bind(&sale.id)
        .bind(&sale.user_id)
        .bind(&sale.store_id)
        .bind(sale.amount_cents)
        .bind(sale.liters)
        .bind(sale.tier)
        .bind(sale.commission_cents)
        .bind(sale.commission_rate_bps as i64)
        .bind(sale.tier_used)
        .bind(&sale.settings_snapshot_id)
        .bind(sale.cashback_earned_cents)
        .bind(sale.created_at)
        .execute(&mut *tx)
        .await?;

        if sale.cashback_earned_cents > 0 {
            ledger::insert_cashback(
                &mut tx,
                &sale.user_id,
                sale.cashback_earned_cents,
                LedgerSource::Sale,
                &sale.id,
                sale.created_at,
            )
            .await?;
        }

        tx.commit().await?;

        Ok(())
    }

    /// Gets a sale by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Sale>> {
        let sql = format!("SELECT {SELECT_COLUMNS} FROM sales WHERE id = ?1");

        let sale = sqlx::query_as::<_, Sale>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(sale)
    }

    /// Lists a user's sales, newest first.
    pub async fn list_by_user(&self, user_id: &str, limit: u32) -> DbResult<Vec<Sale>> {
        let sql = format!(
            r#"
            SELECT {SELECT_COLUMNS} FROM sales
            WHERE user_id = ?1
            ORDER BY created_at DESC, id DESC
            LIMIT ?2
            "#
        );

        let sales = sqlx::query_as::<_, Sale>(&sql)
            .bind(user_id)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(sales)
    }

    /// Total commission paid to a user, in cents.
    pub async fn total_commission_cents(&self, user_id: &str) -> DbResult<i64> {
        let total: Option<i64> =
            sqlx::query_scalar("SELECT SUM(commission_cents) FROM sales WHERE user_id = ?1")
                .bind(user_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(total.unwrap_or(0))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use cascade_core::Tier;
    use chrono::Utc;

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    fn sample_sale(id: &str, cashback_cents: i64) -> Sale {
        Sale {
            id: id.to_string(),
            user_id: "user-1".to_string(),
            store_id: "store-1".to_string(),
            amount_cents: 100_000,
            liters: 50.0,
            tier: Some(Tier::Gold),
            commission_cents: 5_000,
            commission_rate_bps: 500,
            tier_used: Some(Tier::Gold),
            settings_snapshot_id: "settings-1".to_string(),
            cashback_earned_cents: cashback_cents,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_create_commits_sale_and_cashback_together() {
        let db = test_db().await;

        db.sales().create(&sample_sale("sale-1", 1_500)).await.unwrap();

        let stored = db.sales().get_by_id("sale-1").await.unwrap().unwrap();
        assert_eq!(stored.cashback_earned_cents, 1_500);
        assert_eq!(
            db.ledger().total_cashback_cents("user-1").await.unwrap(),
            1_500
        );
    }

    #[tokio::test]
    async fn test_failed_create_leaves_no_ledger_entry() {
        let db = test_db().await;

        db.sales().create(&sample_sale("sale-1", 1_500)).await.unwrap();

        // Duplicate primary key: the sale insert fails, so the cashback
        // append must roll back with it.
        let result = db.sales().create(&sample_sale("sale-1", 9_999)).await;
        assert!(result.is_err());

        assert_eq!(
            db.ledger().total_cashback_cents("user-1").await.unwrap(),
            1_500
        );
        let stored = db.sales().get_by_id("sale-1").await.unwrap().unwrap();
        assert_eq!(stored.cashback_earned_cents, 1_500);
    }

    #[tokio::test]
    async fn test_zero_cashback_sale_writes_no_ledger_row() {
        let db = test_db().await;

        db.sales().create(&sample_sale("sale-1", 0)).await.unwrap();

        assert!(db.sales().get_by_id("sale-1").await.unwrap().is_some());
        assert_eq!(db.ledger().total_cashback_cents("user-1").await.unwrap(), 0);
    }
}
