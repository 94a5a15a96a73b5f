//! # Commission Settings Repository
//!
//! Append-only storage of commission configuration versions.
//!
//! ## Versioning Model
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                 commission_settings (append-only)                       │
//! │                                                                         │
//! │  id     | base_rate | cap     | is_active | created_at                 │
//! │  ───────┼───────────┼─────────┼───────────┼─────────────               │
//! │  v1     | 500       | 100000  | 0         | 2026-01-01   ← retained    │
//! │  v2     | 600       | 100000  | 0         | 2026-03-01   ← retained    │
//! │  v3     | 600       | 150000  | 1         | 2026-06-01   ← active      │
//! │                                                                         │
//! │  create_new(): ONE transaction deactivates v2 and inserts v3 -        │
//! │  at most one active row ever, enforced HERE, not by callers.           │
//! │                                                                         │
//! │  at_time(2026-04-10) → v2  (latest created_at <= T)                    │
//! │  Historical sales must report the rule in force when they occurred.    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The repository returns `Option`; the engine-level store layers the
//! documented fallback snapshot on top (see cascade-recon).

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::info;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use cascade_core::{CommissionSettings, TierMultipliers};

// =============================================================================
// Row Mapping
// =============================================================================

/// Raw settings row; `tier_multipliers` is a JSON column.
#[derive(Debug, sqlx::FromRow)]
struct SettingsRow {
    id: String,
    base_rate_bps: i64,
    tier_multipliers: String,
    commission_cap_cents: i64,
    cashback_rate_per_liter_cents: i64,
    is_active: bool,
    created_at: DateTime<Utc>,
}

impl SettingsRow {
    /// Converts a stored row into the domain type.
    ///
    /// A row that fails here is corrupt configuration - the error carries
    /// the row ID so operators can find and fix it. It must NOT silently
    /// become a zero-rate snapshot.
    fn into_domain(self) -> DbResult<CommissionSettings> {
        let tier_multipliers: TierMultipliers = serde_json::from_str(&self.tier_multipliers)
            .map_err(|e| {
                DbError::corrupt(
                    "CommissionSettings",
                    &self.id,
                    format!("tier_multipliers JSON: {e}"),
                )
            })?;

        let base_rate_bps = u32::try_from(self.base_rate_bps).map_err(|_| {
            DbError::corrupt(
                "CommissionSettings",
                &self.id,
                format!("base_rate_bps out of range: {}", self.base_rate_bps),
            )
        })?;

        Ok(CommissionSettings {
            id: self.id,
            base_rate_bps,
            tier_multipliers,
            commission_cap_cents: self.commission_cap_cents,
            cashback_rate_per_liter_cents: self.cashback_rate_per_liter_cents,
            is_active: self.is_active,
            created_at: self.created_at,
        })
    }
}

const SELECT_COLUMNS: &str = r#"
    id, base_rate_bps, tier_multipliers, commission_cap_cents,
    cashback_rate_per_liter_cents, is_active, created_at
"#;

// =============================================================================
// New Settings Input
// =============================================================================

/// Input for creating a new settings version.
#[derive(Debug, Clone)]
pub struct NewCommissionSettings {
    pub base_rate_bps: u32,
    pub tier_multipliers: TierMultipliers,
    pub commission_cap_cents: i64,
    pub cashback_rate_per_liter_cents: i64,
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for commission settings versions.
#[derive(Debug, Clone)]
pub struct SettingsRepository {
    pool: SqlitePool,
}

impl SettingsRepository {
    /// Creates a new SettingsRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SettingsRepository { pool }
    }

    /// Latest active snapshot, if any configuration exists.
    pub async fn current(&self) -> DbResult<Option<CommissionSettings>> {
        let sql = format!(
            r#"
            SELECT {SELECT_COLUMNS}
            FROM commission_settings
            WHERE is_active = 1
            ORDER BY created_at DESC, id DESC
            LIMIT 1
            "#
        );

        let row = sqlx::query_as::<_, SettingsRow>(&sql)
            .fetch_optional(&self.pool)
            .await?;

        row.map(SettingsRow::into_domain).transpose()
    }

    /// Latest snapshot with `created_at <= at`, if any.
    pub async fn at_time(&self, at: DateTime<Utc>) -> DbResult<Option<CommissionSettings>> {
        let sql = format!(
            r#"
            SELECT {SELECT_COLUMNS}
            FROM commission_settings
            WHERE created_at <= ?1
            ORDER BY created_at DESC, id DESC
            LIMIT 1
            "#
        );

        let row = sqlx::query_as::<_, SettingsRow>(&sql)
            .bind(at)
            .fetch_optional(&self.pool)
            .await?;

        row.map(SettingsRow::into_domain).transpose()
    }

    /// Fetches a specific snapshot by ID (sale snapshots reference these).
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<CommissionSettings>> {
        let sql = format!(
            r#"
            SELECT {SELECT_COLUMNS}
            FROM commission_settings
            WHERE id = ?1
            "#
        );

        let row = sqlx::query_as::<_, SettingsRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(SettingsRow::into_domain).transpose()
    }

    /// Creates a new settings version and activates it.
    ///
    /// ## Atomicity
    /// Deactivating the previous active snapshot and activating the new
    /// one happen in ONE transaction. At most one snapshot is ever
    /// active - this invariant is enforced here, not by callers.
    pub async fn create_new(
        &self,
        new: &NewCommissionSettings,
        now: DateTime<Utc>,
    ) -> DbResult<CommissionSettings> {
        let settings = CommissionSettings {
            id: Uuid::new_v4().to_string(),
            base_rate_bps: new.base_rate_bps,
            tier_multipliers: new.tier_multipliers,
            commission_cap_cents: new.commission_cap_cents,
            cashback_rate_per_liter_cents: new.cashback_rate_per_liter_cents,
            is_active: true,
            created_at: now,
        };

        let multipliers_json = serde_json::to_string(&settings.tier_multipliers)
            .map_err(|e| DbError::Internal(format!("serialize tier_multipliers: {e}")))?;

        let mut tx = self.pool.begin().await?;

        let deactivated = sqlx::query(
            r#"
            UPDATE commission_settings SET is_active = 0 WHERE is_active = 1
            "#,
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO commission_settings (
                id, base_rate_bps, tier_multipliers, commission_cap_cents,
                cashback_rate_per_liter_cents, is_active, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, 1, ?6)
            "#,
        )
        .bind(&settings.id)
        .bind(settings.base_rate_bps as i64)
        .bind(&multipliers_json)
        .bind(settings.commission_cap_cents)
        .bind(settings.cashback_rate_per_liter_cents)
        .bind(settings.created_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(
            id = %settings.id,
            base_rate_bps = settings.base_rate_bps,
            deactivated = deactivated.rows_affected(),
            "Created new commission settings version"
        );

        Ok(settings)
    }

    /// Number of stored versions (old versions are retained forever).
    pub async fn version_count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM commission_settings")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    /// Number of active versions; the invariant says this is 0 or 1.
    pub async fn active_count(&self) -> DbResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM commission_settings WHERE is_active = 1")
                .fetch_one(&self.pool)
                .await?;

        Ok(count)
    }

    /// Debug helper: overwrite a row's multiplier JSON with arbitrary
    /// text, used by tests to prove corrupt settings fail loudly.
    #[doc(hidden)]
    pub async fn overwrite_multipliers_raw(&self, id: &str, raw: &str) -> DbResult<()> {
        sqlx::query("UPDATE commission_settings SET tier_multipliers = ?2 WHERE id = ?1")
            .bind(id)
            .bind(raw)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use chrono::TimeZone;

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    fn new_settings(base_rate_bps: u32) -> NewCommissionSettings {
        NewCommissionSettings {
            base_rate_bps,
            tier_multipliers: TierMultipliers::default(),
            commission_cap_cents: 100_000,
            cashback_rate_per_liter_cents: 50,
        }
    }

    #[tokio::test]
    async fn test_current_is_none_when_unconfigured() {
        let db = test_db().await;
        assert!(db.settings().current().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_new_version_supersedes_but_retains_old() {
        let db = test_db().await;
        let repo = db.settings();

        let t1 = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let t2 = Utc.with_ymd_and_hms(2026, 6, 1, 0, 0, 0).unwrap();

        let v1 = repo.create_new(&new_settings(500), t1).await.unwrap();
        let v2 = repo.create_new(&new_settings(600), t2).await.unwrap();

        let current = repo.current().await.unwrap().unwrap();
        assert_eq!(current.id, v2.id);
        assert_eq!(current.base_rate_bps, 600);

        // Old version is kept, just inactive.
        assert_eq!(repo.version_count().await.unwrap(), 2);
        assert_eq!(repo.active_count().await.unwrap(), 1);
        let old = repo.get_by_id(&v1.id).await.unwrap().unwrap();
        assert!(!old.is_active);
        assert_eq!(old.base_rate_bps, 500);
    }

    #[tokio::test]
    async fn test_at_time_returns_version_in_force() {
        let db = test_db().await;
        let repo = db.settings();

        let t1 = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let t2 = Utc.with_ymd_and_hms(2026, 6, 1, 0, 0, 0).unwrap();
        let v1 = repo.create_new(&new_settings(500), t1).await.unwrap();
        let v2 = repo.create_new(&new_settings(600), t2).await.unwrap();

        let march = Utc.with_ymd_and_hms(2026, 3, 15, 0, 0, 0).unwrap();
        assert_eq!(repo.at_time(march).await.unwrap().unwrap().id, v1.id);

        let july = Utc.with_ymd_and_hms(2026, 7, 1, 0, 0, 0).unwrap();
        assert_eq!(repo.at_time(july).await.unwrap().unwrap().id, v2.id);

        let before = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        assert!(repo.at_time(before).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_corrupt_multipliers_fail_loudly() {
        let db = test_db().await;
        let repo = db.settings();

        let v = repo.create_new(&new_settings(500), Utc::now()).await.unwrap();
        repo.overwrite_multipliers_raw(&v.id, "not-json").await.unwrap();

        let err = repo.current().await.unwrap_err();
        assert!(matches!(err, DbError::CorruptData { .. }));
    }
}
