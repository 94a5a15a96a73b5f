//! # Settings Version Store
//!
//! Engine-level view of commission settings. The database repository
//! returns `Option`; this store layers the documented behavior on top:
//!
//! - `current()` / `at_time(T)` fall back to the hard-coded default
//!   snapshot when nothing is configured (yet) - never an error.
//! - New versions are validated before they are written.
//! - Corrupt stored settings surface as `Configuration` errors and are
//!   logged at `error!` - a broken rate must never silently become zero.

use chrono::{DateTime, Utc};
use tracing::{debug, error};

use crate::error::{ReconError, ReconResult};
use cascade_db::{DbError, NewCommissionSettings, SettingsRepository};
use cascade_core::CommissionSettings;

/// Versioned commission settings with default fallback.
#[derive(Debug, Clone)]
pub struct SettingsVersionStore {
    repo: SettingsRepository,
}

impl SettingsVersionStore {
    /// Creates a store over the settings repository.
    pub fn new(repo: SettingsRepository) -> Self {
        SettingsVersionStore { repo }
    }

    /// The snapshot in force right now.
    ///
    /// Falls back to [`CommissionSettings::fallback`] when no snapshot
    /// has ever been configured.
    pub async fn current(&self) -> ReconResult<CommissionSettings> {
        match self.repo.current().await {
            Ok(Some(settings)) => Ok(settings),
            Ok(None) => {
                debug!("No commission settings configured, using fallback snapshot");
                Ok(CommissionSettings::fallback())
            }
            Err(e) => Err(Self::surface(e)),
        }
    }

    /// The snapshot in force at `at`.
    ///
    /// A time before the first snapshot yields the fallback, never an
    /// error - historical queries must always be answerable.
    pub async fn at_time(&self, at: DateTime<Utc>) -> ReconResult<CommissionSettings> {
        match self.repo.at_time(at).await {
            Ok(Some(settings)) => Ok(settings),
            Ok(None) => {
                debug!(%at, "No settings snapshot existed at requested time, using fallback");
                Ok(CommissionSettings::fallback())
            }
            Err(e) => Err(Self::surface(e)),
        }
    }

    /// A specific snapshot by ID (stored sales reference these).
    pub async fn get_by_id(&self, id: &str) -> ReconResult<CommissionSettings> {
        match self.repo.get_by_id(id).await {
            Ok(Some(settings)) => Ok(settings),
            Ok(None) => Err(ReconError::not_found("commission settings", id)),
            Err(e) => Err(Self::surface(e)),
        }
    }

    /// Validates and activates a new settings version.
    ///
    /// The previous active version is deactivated in the same database
    /// transaction; old versions are retained for historical queries.
    pub async fn create_new(&self, new: NewCommissionSettings) -> ReconResult<CommissionSettings> {
        // Reject malformed settings before they ever hit storage.
        let candidate = CommissionSettings {
            id: "pending".to_string(),
            base_rate_bps: new.base_rate_bps,
            tier_multipliers: new.tier_multipliers,
            commission_cap_cents: new.commission_cap_cents,
            cashback_rate_per_liter_cents: new.cashback_rate_per_liter_cents,
            is_active: true,
            created_at: Utc::now(),
        };
        candidate.validate()?;

        Ok(self.repo.create_new(&new, Utc::now()).await?)
    }

    /// Maps storage failures; corrupt settings rows become loud
    /// `Configuration` errors.
    fn surface(err: DbError) -> ReconError {
        match err {
            DbError::CorruptData { entity, id, reason } => {
                error!(%entity, %id, %reason, "Corrupt commission settings");
                ReconError::Configuration {
                    settings_id: id,
                    reason,
                }
            }
            other => ReconError::Db(other),
        }
    }
}
