//! # Engine Error Types
//!
//! Error types for reconciliation and sale operations.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Engine Error Categories                            │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │    NotFound     │  │  Configuration  │  │      Validation         │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  record/ref by  │  │  malformed      │  │  bad sale input,        │ │
//! │  │  ID missing     │  │  settings row,  │  │  bad config values      │ │
//! │  │                 │  │  bad rates      │  │                         │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────────────────────────────────┐ │
//! │  │    Transient    │  │                   Db                        │ │
//! │  │                 │  │                                             │ │
//! │  │  lookup timeout │  │  everything else the database layer         │ │
//! │  │  pool exhausted │  │  reports (corruption, constraint, query)    │ │
//! │  │  connectivity   │  │                                             │ │
//! │  └─────────────────┘  └─────────────────────────────────────────────┘ │
//! │                                                                         │
//! │  A NO-MATCH IS NOT AN ERROR. It is a reported outcome; records         │
//! │  simply stay provisional and retry in a later batch.                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

use cascade_core::{CoreError, ValidationError};
use cascade_db::DbError;

/// Result type alias for engine operations.
pub type ReconResult<T> = Result<T, ReconError>;

/// Engine error type covering reconciliation and sale failures.
///
/// ## Design Principles
/// - Each variant includes enough context for debugging
/// - `Transient` is the retry category: batch drivers may re-run those
///   records without operator involvement
/// - All errors are `Send + Sync` for async compatibility
#[derive(Debug, Error)]
pub enum ReconError {
    /// A record or reference looked up by ID does not exist.
    #[error("Not found: {entity} '{id}'")]
    NotFound { entity: &'static str, id: String },

    /// Commission settings are malformed or unusable.
    ///
    /// Callers log this at `error!` - a misconfigured rate must never
    /// silently become a zero commission.
    #[error("Configuration error in settings '{settings_id}': {reason}")]
    Configuration { settings_id: String, reason: String },

    /// Input failed business validation (sale amounts, liters, IDs).
    #[error("Validation failed: {0}")]
    Validation(String),

    /// A transient infrastructure failure: lookup timeout, pool
    /// exhaustion, connectivity. Safe to retry.
    #[error("Transient failure: {0}")]
    Transient(String),

    /// Database failure that is not transient.
    #[error("Database error: {0}")]
    Db(#[from] DbError),
}

impl ReconError {
    /// True when retrying without operator action could succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            ReconError::Transient(_) => true,
            ReconError::Db(e) => e.is_transient(),
            _ => false,
        }
    }

    pub(crate) fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        ReconError::NotFound {
            entity,
            id: id.into(),
        }
    }
}

impl From<ValidationError> for ReconError {
    fn from(err: ValidationError) -> Self {
        ReconError::Validation(err.to_string())
    }
}

impl From<CoreError> for ReconError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Configuration {
                settings_id,
                reason,
            } => ReconError::Configuration {
                settings_id,
                reason,
            },
            CoreError::Validation(v) => ReconError::Validation(v.to_string()),
            other => ReconError::Validation(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(ReconError::Transient("timeout".into()).is_transient());
        assert!(ReconError::Db(DbError::PoolExhausted).is_transient());
        assert!(!ReconError::not_found("record", "x").is_transient());
        assert!(!ReconError::Configuration {
            settings_id: "s".into(),
            reason: "bad rate".into()
        }
        .is_transient());
    }

    #[test]
    fn test_core_configuration_maps_through() {
        let core = CoreError::configuration("settings-1", "base rate over 1000%");
        let recon: ReconError = core.into();
        assert!(matches!(recon, ReconError::Configuration { .. }));
    }
}
