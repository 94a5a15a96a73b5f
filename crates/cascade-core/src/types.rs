//! # Domain Types
//!
//! Core domain types used throughout Cascade Loyalty.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌──────────────────┐  ┌──────────────────┐  ┌──────────────────┐      │
//! │  │ UnverifiedRecord │  │ ReferenceRecord  │  │      Sale        │      │
//! │  │  ──────────────  │  │  ──────────────  │  │  ──────────────  │      │
//! │  │  id (UUID)       │  │  id (UUID)       │  │  id (UUID)       │      │
//! │  │  status          │  │  source          │  │  tier            │      │
//! │  │  amount_cents    │  │  amount_cents    │  │  commission_*    │      │
//! │  │  matched_* ...   │  │  occurred_at     │  │  (frozen block)  │      │
//! │  └──────────────────┘  └──────────────────┘  └──────────────────┘      │
//! │                                                                         │
//! │  ┌──────────────────┐  ┌──────────────────┐  ┌──────────────────┐      │
//! │  │   RecordStatus   │  │ ReferenceSource  │  │      Tier        │      │
//! │  │  ──────────────  │  │  ──────────────  │  │  ──────────────  │      │
//! │  │  Provisional     │  │  PurchaseEntry   │  │  Lead            │      │
//! │  │  Final           │  │  OnlineOrder     │  │  Silver          │      │
//! │  │  Rejected        │  │  ExternalScan    │  │  Gold            │      │
//! │  └──────────────────┘  └──────────────────┘  │  Platinum        │      │
//! │                                              └──────────────────┘      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Status Machine
//! An `UnverifiedRecord` transitions `provisional → final` or
//! `provisional → rejected` exactly once. No record re-enters
//! `provisional`. The transition itself is the idempotency guard for
//! reconciliation - there is deliberately no unique index on matches.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::BASE_MULTIPLIER_BPS;

// =============================================================================
// Record Status
// =============================================================================

/// Lifecycle status of an unverified proof-of-purchase record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum RecordStatus {
    /// Ingested but not yet linked to a reference record.
    Provisional,
    /// Successfully matched and credited.
    Final,
    /// Manually rejected; terminal.
    Rejected,
}

impl Default for RecordStatus {
    fn default() -> Self {
        RecordStatus::Provisional
    }
}

impl fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RecordStatus::Provisional => "provisional",
            RecordStatus::Final => "final",
            RecordStatus::Rejected => "rejected",
        };
        write!(f, "{s}")
    }
}

// =============================================================================
// Record Kind
// =============================================================================

/// How an unverified record entered the system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    /// OCR'd receipt uploaded by a user.
    Scan,
    /// Invoice synced from a third-party billing provider.
    ExternalInvoice,
}

// =============================================================================
// Reference Source
// =============================================================================

/// Identifies which "truth" table a reference record came from.
///
/// Source priority for cross-source tie-breaks is configuration, not an
/// implicit ordering of this enum - see the engine config.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum ReferenceSource {
    /// Internal purchase entry recorded at a store.
    PurchaseEntry,
    /// Online purchase order.
    OnlineOrder,
    /// A finalized-but-unlinked scan upload (consulted only when
    /// reconciling an external invoice).
    ExternalScan,
}

impl ReferenceSource {
    /// Stable string form used in persisted match metadata and logs.
    pub const fn as_str(&self) -> &'static str {
        match self {
            ReferenceSource::PurchaseEntry => "purchase_entry",
            ReferenceSource::OnlineOrder => "online_order",
            ReferenceSource::ExternalScan => "external_scan",
        }
    }
}

impl fmt::Display for ReferenceSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Loyalty Tier
// =============================================================================

/// Loyalty level used to scale commission and cashback.
///
/// Tier strings from upstream systems are parsed through [`Tier::parse`];
/// an unknown or missing tier is `None` and maps to the base multiplier
/// (1.0×). That default lives in [`TierMultipliers::for_tier`], a total
/// function - never a key-miss.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Lead,
    Silver,
    Gold,
    Platinum,
}

impl Tier {
    /// Parses a tier from an upstream string, case-insensitively.
    ///
    /// Returns `None` for unknown tiers; callers treat `None` as "base
    /// multiplier", never as an error.
    pub fn parse(s: &str) -> Option<Tier> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lead" => Some(Tier::Lead),
            "silver" => Some(Tier::Silver),
            "gold" => Some(Tier::Gold),
            "platinum" => Some(Tier::Platinum),
            _ => None,
        }
    }

    /// Stable string form.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Tier::Lead => "lead",
            Tier::Silver => "silver",
            Tier::Gold => "gold",
            Tier::Platinum => "platinum",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Tier Multipliers
// =============================================================================

/// Per-tier commission/cashback multipliers in basis points.
///
/// 10000 = 1.0×, 15000 = 1.5×. Persisted as a JSON column on the settings
/// row, so the shape here is the wire shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierMultipliers {
    pub lead: u32,
    pub silver: u32,
    pub gold: u32,
    pub platinum: u32,
}

impl TierMultipliers {
    /// Total lookup: every tier maps to a multiplier, and "no tier" maps
    /// to the base multiplier (1.0×).
    pub const fn for_tier(&self, tier: Option<Tier>) -> u32 {
        match tier {
            Some(Tier::Lead) => self.lead,
            Some(Tier::Silver) => self.silver,
            Some(Tier::Gold) => self.gold,
            Some(Tier::Platinum) => self.platinum,
            None => BASE_MULTIPLIER_BPS,
        }
    }
}

impl Default for TierMultipliers {
    /// Matches the documented fallback settings snapshot.
    fn default() -> Self {
        TierMultipliers {
            lead: 10_000,
            silver: 12_500,
            gold: 15_000,
            platinum: 20_000,
        }
    }
}

// =============================================================================
// Commission Settings
// =============================================================================

/// A time-stamped commission configuration snapshot.
///
/// ## Versioning Rules
/// - Append-only: every configuration change creates a NEW row
/// - The previous active snapshot is deactivated, never deleted
/// - Historical sales reference their snapshot by `id`, so reports stay
///   stable when rates change later
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommissionSettings {
    /// Unique identifier (UUID v4), referenced by sale snapshots.
    pub id: String,

    /// Base commission rate in basis points (500 = 5%).
    pub base_rate_bps: u32,

    /// Per-tier multipliers in basis points (15000 = 1.5×).
    pub tier_multipliers: TierMultipliers,

    /// Hard ceiling on commission per transaction, in cents.
    /// Applied AFTER tier scaling.
    pub commission_cap_cents: i64,

    /// Cashback earned per liter of volume, in cents.
    pub cashback_rate_per_liter_cents: i64,

    /// Whether this is the currently active snapshot.
    /// The store enforces at most one active snapshot.
    pub is_active: bool,

    /// When this snapshot was created. Point-in-time lookup finds the
    /// latest snapshot with `created_at <= T`.
    pub created_at: DateTime<Utc>,
}

/// Identifier of the documented fallback snapshot used before any
/// configuration has been created.
pub const FALLBACK_SETTINGS_ID: &str = "settings-fallback";

impl CommissionSettings {
    /// The documented hard-coded fallback snapshot.
    ///
    /// Returned by the settings store when no snapshot exists yet (or none
    /// existed at the requested time), so the system stays operable before
    /// first configuration: 5% base rate, 1.0×/1.25×/1.5×/2.0× tiers,
    /// 1000.00 cap, 0.50 cashback per liter.
    pub fn fallback() -> Self {
        CommissionSettings {
            id: FALLBACK_SETTINGS_ID.to_string(),
            base_rate_bps: 500,
            tier_multipliers: TierMultipliers::default(),
            commission_cap_cents: 100_000,
            cashback_rate_per_liter_cents: 50,
            is_active: false,
            created_at: DateTime::<Utc>::UNIX_EPOCH,
        }
    }

    /// Returns the commission cap as Money.
    #[inline]
    pub fn commission_cap(&self) -> Money {
        Money::from_cents(self.commission_cap_cents)
    }

    /// Validates that this snapshot is usable for commission computation.
    ///
    /// A malformed snapshot fails loudly with `CoreError::Configuration`
    /// rather than silently producing a zero commission.
    pub fn validate(&self) -> CoreResult<()> {
        if self.base_rate_bps > 100_000 {
            return Err(CoreError::configuration(
                &self.id,
                format!("base rate {} bps exceeds 1000%", self.base_rate_bps),
            ));
        }
        if self.commission_cap_cents <= 0 {
            return Err(CoreError::configuration(
                &self.id,
                "commission cap must be positive",
            ));
        }
        if self.cashback_rate_per_liter_cents < 0 {
            return Err(CoreError::configuration(
                &self.id,
                "cashback rate per liter must not be negative",
            ));
        }
        let m = &self.tier_multipliers;
        if m.lead == 0 || m.silver == 0 || m.gold == 0 || m.platinum == 0 {
            return Err(CoreError::configuration(
                &self.id,
                "tier multipliers must be positive",
            ));
        }
        Ok(())
    }
}

// =============================================================================
// Unverified Record
// =============================================================================

/// A proof-of-purchase (scanned receipt or third-party invoice) not yet
/// linked to an internal transaction.
///
/// Created on ingestion (OCR or external sync); mutated only by the
/// reconciliation orchestrator (status + match fields) or by a manual
/// reject action; never deleted, only status-transitioned.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct UnverifiedRecord {
    pub id: String,
    pub user_id: String,
    pub store_id: String,
    pub kind: RecordKind,
    pub invoice_number: String,
    /// Claimed purchase amount in cents.
    pub amount_cents: i64,
    /// When the purchase claims to have occurred (OCR/date parsing makes
    /// this noisier than the amount).
    pub occurred_at: DateTime<Utc>,
    pub status: RecordStatus,

    /// ID of the matched reference record, set on finalization.
    pub matched_reference_id: Option<String>,
    /// Which source the match came from.
    pub matched_reference_source: Option<ReferenceSource>,
    /// When the match was finalized.
    pub matched_at: Option<DateTime<Utc>>,
    /// Match confidence in [0, 1] at finalization time.
    pub confidence: Option<f64>,

    /// Points credited by reconciliation. Non-zero means "already
    /// credited" - the idempotency guard for ledger side effects.
    pub points_awarded: i64,
    /// Cashback credited by reconciliation, in cents. Same guard role.
    pub cashback_awarded_cents: i64,

    /// Worker claim stamp; serializes concurrent reconciliation attempts
    /// on the same record. Stale claims expire via the engine config.
    pub claimed_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UnverifiedRecord {
    /// Returns the claimed amount as Money.
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }

    /// Whether this record is still awaiting reconciliation.
    #[inline]
    pub fn is_provisional(&self) -> bool {
        self.status == RecordStatus::Provisional
    }

    /// Whether reconciliation has already credited this record.
    #[inline]
    pub fn has_awards(&self) -> bool {
        self.points_awarded != 0 || self.cashback_awarded_cents != 0
    }
}

// =============================================================================
// Reference Record
// =============================================================================

/// An internal purchase/sale record treated as ground truth for matching.
///
/// Read-only from the engine's perspective; rows are projected out of the
/// per-source tables (`purchase_entries`, `online_orders`, finalized scans).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct ReferenceRecord {
    pub id: String,
    pub source: ReferenceSource,
    pub user_id: String,
    /// Not every source models a store (online orders ship, they aren't
    /// bought at a counter).
    pub store_id: Option<String>,
    pub amount_cents: i64,
    pub occurred_at: DateTime<Utc>,
}

impl ReferenceRecord {
    /// Returns the recorded amount as Money.
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }
}

// =============================================================================
// Sale
// =============================================================================

/// A confirmed sale with its frozen commission snapshot.
///
/// ## Snapshot Pattern
/// The commission block (`commission_cents`, `commission_rate_bps`,
/// `tier_used`, `settings_snapshot_id`) is computed once at creation and
/// never recomputed, so historical reports remain stable even if tier
/// multipliers change later.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Sale {
    pub id: String,
    pub user_id: String,
    pub store_id: String,
    pub amount_cents: i64,
    /// Volume sold, in liters.
    pub liters: f64,
    /// Loyalty tier at time of sale; `None` when the buyer had no tier.
    pub tier: Option<Tier>,

    /// Frozen commission amount in cents. Invariant: never exceeds the
    /// cap of the referenced settings snapshot.
    pub commission_cents: i64,
    /// Effective commission rate in bps after cap enforcement.
    pub commission_rate_bps: u32,
    /// Tier the multiplier was resolved from (mirrors `tier`).
    pub tier_used: Option<Tier>,
    /// The settings snapshot in force when this sale was created.
    pub settings_snapshot_id: String,

    /// Cashback earned at sale time, in cents.
    pub cashback_earned_cents: i64,

    pub created_at: DateTime<Utc>,
}

impl Sale {
    /// Returns the sale amount as Money.
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }

    /// Returns the frozen commission as Money.
    #[inline]
    pub fn commission(&self) -> Money {
        Money::from_cents(self.commission_cents)
    }
}

// =============================================================================
// Ledger Source
// =============================================================================

/// Which code path credited a ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum LedgerSource {
    /// Flat-rate crediting on a successful reconciliation match.
    Reconciliation,
    /// Tiered crediting at sale-creation time.
    Sale,
}

impl LedgerSource {
    pub const fn as_str(&self) -> &'static str {
        match self {
            LedgerSource::Reconciliation => "reconciliation",
            LedgerSource::Sale => "sale",
        }
    }
}

impl fmt::Display for LedgerSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_parse() {
        assert_eq!(Tier::parse("gold"), Some(Tier::Gold));
        assert_eq!(Tier::parse("GOLD"), Some(Tier::Gold));
        assert_eq!(Tier::parse("  Platinum "), Some(Tier::Platinum));
        // Unknown tiers map to None, which resolves to the base multiplier
        assert_eq!(Tier::parse("diamond"), None);
        assert_eq!(Tier::parse(""), None);
    }

    #[test]
    fn test_tier_multipliers_total_lookup() {
        let m = TierMultipliers::default();
        assert_eq!(m.for_tier(Some(Tier::Gold)), 15_000);
        assert_eq!(m.for_tier(None), BASE_MULTIPLIER_BPS);
    }

    #[test]
    fn test_fallback_settings_are_valid() {
        // The fallback must always pass its own validation - it is the
        // last-known-good snapshot of last resort.
        let settings = CommissionSettings::fallback();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.id, FALLBACK_SETTINGS_ID);
    }

    #[test]
    fn test_settings_validation_rejects_malformed() {
        let mut settings = CommissionSettings::fallback();
        settings.commission_cap_cents = 0;
        assert!(matches!(
            settings.validate(),
            Err(CoreError::Configuration { .. })
        ));

        let mut settings = CommissionSettings::fallback();
        settings.tier_multipliers.gold = 0;
        assert!(settings.validate().is_err());

        let mut settings = CommissionSettings::fallback();
        settings.cashback_rate_per_liter_cents = -1;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_record_status_display() {
        assert_eq!(RecordStatus::Provisional.to_string(), "provisional");
        assert_eq!(RecordStatus::Final.to_string(), "final");
    }

    #[test]
    fn test_reference_source_as_str() {
        assert_eq!(ReferenceSource::PurchaseEntry.as_str(), "purchase_entry");
        assert_eq!(ReferenceSource::OnlineOrder.as_str(), "online_order");
        assert_eq!(ReferenceSource::ExternalScan.as_str(), "external_scan");
    }
}
