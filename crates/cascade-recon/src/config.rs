//! # Engine Configuration
//!
//! Configuration for the reconciliation engine.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. TOML Config File (when provided by the batch driver)               │
//! │     /etc/cascade/recon.toml                                            │
//! │                                                                         │
//! │  2. Default Values                                                     │
//! │     Match threshold 0.8, tolerance 1 cent, window 24h,                 │
//! │     source priority internal > online > external                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # recon.toml
//! [matching]
//! threshold = 0.8
//! amount_tolerance_cents = 1
//! window_hours = 24
//! source_priority = ["purchase_entry", "online_order", "external_scan"]
//!
//! [batch]
//! worker_count = 4
//! batch_size = 100
//! lookup_timeout_secs = 10
//! claim_ttl_secs = 300
//!
//! [rewards]
//! cents_per_point = 1000
//! cashback_bps = 200
//! ```
//!
//! Every field is defaulted: an empty file (or no file) yields a working
//! configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{ReconError, ReconResult};
use cascade_core::{
    ReferenceSource, AMOUNT_TOLERANCE_CENTS, MATCH_THRESHOLD, MATCH_WINDOW_HOURS,
    RECON_CASHBACK_BPS, RECON_CENTS_PER_POINT,
};

// =============================================================================
// Matching Configuration
// =============================================================================

/// Matching thresholds and the candidate search envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchingConfig {
    /// Minimum confidence for a match to finalize automatically.
    #[serde(default = "default_threshold")]
    pub threshold: f64,

    /// Absolute amount tolerance for candidate queries, in cents.
    #[serde(default = "default_amount_tolerance")]
    pub amount_tolerance_cents: i64,

    /// Half-width of the candidate time window, in hours.
    #[serde(default = "default_window_hours")]
    pub window_hours: i64,

    /// Source order used to break confidence ties across sources. The
    /// order is also the query order; sources omitted here are never
    /// consulted.
    #[serde(default = "default_source_priority")]
    pub source_priority: Vec<ReferenceSource>,
}

fn default_threshold() -> f64 {
    MATCH_THRESHOLD
}

fn default_amount_tolerance() -> i64 {
    AMOUNT_TOLERANCE_CENTS
}

fn default_window_hours() -> i64 {
    MATCH_WINDOW_HOURS
}

fn default_source_priority() -> Vec<ReferenceSource> {
    vec![
        ReferenceSource::PurchaseEntry,
        ReferenceSource::OnlineOrder,
        ReferenceSource::ExternalScan,
    ]
}

impl Default for MatchingConfig {
    fn default() -> Self {
        MatchingConfig {
            threshold: default_threshold(),
            amount_tolerance_cents: default_amount_tolerance(),
            window_hours: default_window_hours(),
            source_priority: default_source_priority(),
        }
    }
}

// =============================================================================
// Batch Configuration
// =============================================================================

/// Worker pool and timeout settings for batch runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Records reconciled concurrently.
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,

    /// Maximum records pulled into one batch.
    #[serde(default = "default_batch_size")]
    pub batch_size: u32,

    /// Per-record processing timeout, in seconds. Expiry surfaces as a
    /// transient per-record error, never a batch abort.
    #[serde(default = "default_lookup_timeout")]
    pub lookup_timeout_secs: u64,

    /// Age after which a claim counts as abandoned, in seconds.
    #[serde(default = "default_claim_ttl")]
    pub claim_ttl_secs: i64,
}

fn default_worker_count() -> usize {
    4
}

fn default_batch_size() -> u32 {
    100
}

fn default_lookup_timeout() -> u64 {
    10
}

fn default_claim_ttl() -> i64 {
    300
}

impl Default for BatchConfig {
    fn default() -> Self {
        BatchConfig {
            worker_count: default_worker_count(),
            batch_size: default_batch_size(),
            lookup_timeout_secs: default_lookup_timeout(),
            claim_ttl_secs: default_claim_ttl(),
        }
    }
}

// =============================================================================
// Reward Configuration
// =============================================================================

/// Reconciliation-path reward rules.
///
/// These are intentionally flat (no tier scaling): a reconciled external
/// record carries no loyalty tier context at match time, unlike the
/// sale-time tiered calculator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewardConfig {
    /// Cents of matched amount per loyalty point, floored.
    #[serde(default = "default_cents_per_point")]
    pub cents_per_point: i64,

    /// Flat cashback rate on the matched amount, in basis points.
    #[serde(default = "default_cashback_bps")]
    pub cashback_bps: u32,
}

fn default_cents_per_point() -> i64 {
    RECON_CENTS_PER_POINT
}

fn default_cashback_bps() -> u32 {
    RECON_CASHBACK_BPS
}

impl Default for RewardConfig {
    fn default() -> Self {
        RewardConfig {
            cents_per_point: default_cents_per_point(),
            cashback_bps: default_cashback_bps(),
        }
    }
}

// =============================================================================
// Root Configuration
// =============================================================================

/// Full engine configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReconConfig {
    #[serde(default)]
    pub matching: MatchingConfig,

    #[serde(default)]
    pub batch: BatchConfig,

    #[serde(default)]
    pub rewards: RewardConfig,
}

impl ReconConfig {
    /// Loads configuration from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> ReconResult<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            ReconError::Validation(format!("failed to read config {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&contents)
    }

    /// Parses configuration from a TOML string.
    pub fn from_toml_str(contents: &str) -> ReconResult<Self> {
        let config: ReconConfig = toml::from_str(contents)
            .map_err(|e| ReconError::Validation(format!("invalid config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Sanity-checks configuration values.
    pub fn validate(&self) -> ReconResult<()> {
        if !(0.0..=1.0).contains(&self.matching.threshold) {
            return Err(ReconError::Validation(format!(
                "matching.threshold must be in [0, 1], got {}",
                self.matching.threshold
            )));
        }
        if self.matching.amount_tolerance_cents < 0 {
            return Err(ReconError::Validation(
                "matching.amount_tolerance_cents must be >= 0".to_string(),
            ));
        }
        if self.matching.window_hours <= 0 {
            return Err(ReconError::Validation(
                "matching.window_hours must be positive".to_string(),
            ));
        }
        if self.matching.source_priority.is_empty() {
            return Err(ReconError::Validation(
                "matching.source_priority must name at least one source".to_string(),
            ));
        }
        if self.batch.worker_count == 0 {
            return Err(ReconError::Validation(
                "batch.worker_count must be at least 1".to_string(),
            ));
        }
        if self.rewards.cents_per_point <= 0 {
            return Err(ReconError::Validation(
                "rewards.cents_per_point must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Rank of a source in the configured priority order (lower wins);
    /// `None` when the source is not configured at all.
    pub fn source_rank(&self, source: ReferenceSource) -> Option<usize> {
        self.matching
            .source_priority
            .iter()
            .position(|s| *s == source)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_toml_yields_defaults() {
        let config = ReconConfig::from_toml_str("").unwrap();
        assert_eq!(config.matching.threshold, MATCH_THRESHOLD);
        assert_eq!(config.matching.amount_tolerance_cents, 1);
        assert_eq!(config.matching.window_hours, 24);
        assert_eq!(
            config.matching.source_priority,
            vec![
                ReferenceSource::PurchaseEntry,
                ReferenceSource::OnlineOrder,
                ReferenceSource::ExternalScan,
            ]
        );
        assert_eq!(config.batch.worker_count, 4);
        assert_eq!(config.rewards.cents_per_point, 1_000);
        assert_eq!(config.rewards.cashback_bps, 200);
    }

    #[test]
    fn test_partial_toml_overrides() {
        let toml = r#"
            [matching]
            threshold = 0.9
            source_priority = ["online_order", "purchase_entry"]

            [batch]
            worker_count = 8
        "#;
        let config = ReconConfig::from_toml_str(toml).unwrap();
        assert_eq!(config.matching.threshold, 0.9);
        assert_eq!(config.source_rank(ReferenceSource::OnlineOrder), Some(0));
        assert_eq!(config.source_rank(ReferenceSource::PurchaseEntry), Some(1));
        assert_eq!(config.source_rank(ReferenceSource::ExternalScan), None);
        assert_eq!(config.batch.worker_count, 8);
        // Untouched sections keep defaults.
        assert_eq!(config.matching.amount_tolerance_cents, 1);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(ReconConfig::from_toml_str("[matching]\nthreshold = 1.5").is_err());
        assert!(ReconConfig::from_toml_str("[batch]\nworker_count = 0").is_err());
        assert!(ReconConfig::from_toml_str("[matching]\nwindow_hours = 0").is_err());
        assert!(ReconConfig::from_toml_str("[matching]\nsource_priority = []").is_err());
    }
}
