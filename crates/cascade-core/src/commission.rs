//! # Commission Calculation
//!
//! Pure tiered, capped commission and cashback computation.
//!
//! ## Computation Pipeline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                  calculate(amount, liters, tier, settings)              │
//! │                                                                         │
//! │  base       = amount × base_rate                                       │
//! │  tiered     = base × tier_multiplier      (unknown tier → 1.0×)        │
//! │  commission = min(tiered, cap)            (cap AFTER tier scaling)     │
//! │  rate       = commission / amount         (0 when amount = 0)          │
//! │  cashback   = liters × rate_per_liter × tier_multiplier                │
//! │                                                                         │
//! │  Rounding: half-up to whole cents ONCE at the function boundary.       │
//! │  Malformed settings → ConfigurationError, never silent zeros.          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The cashback channel is volume-based (per liter), not a percentage of
//! the amount - water is sold by volume, and tier benefits apply uniformly
//! to both reward channels through the same multiplier.

use crate::error::{CoreResult, ValidationError};
use crate::money::Money;
use crate::types::{CommissionSettings, Tier};

// =============================================================================
// Commission Breakdown
// =============================================================================

/// Result of a commission computation; frozen into the sale row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CommissionBreakdown {
    /// Commission payable, in cents. Never exceeds the settings cap.
    pub commission_cents: i64,
    /// Effective rate in bps after cap enforcement - reported for
    /// display, so a capped commission shows its real rate, not the
    /// nominal tier rate.
    pub commission_rate_bps: u32,
    /// Cashback earned, in cents.
    pub cashback_cents: i64,
}

impl CommissionBreakdown {
    /// Returns the commission as Money.
    #[inline]
    pub fn commission(&self) -> Money {
        Money::from_cents(self.commission_cents)
    }

    /// Returns the cashback as Money.
    #[inline]
    pub fn cashback(&self) -> Money {
        Money::from_cents(self.cashback_cents)
    }
}

// =============================================================================
// Calculator
// =============================================================================

/// Computes commission and cashback for a confirmed transaction.
///
/// Pure function: no clock, no I/O, no hidden settings singleton. Callers
/// pass the settings snapshot explicitly (current or point-in-time), which
/// is what makes historical sales reproducible.
///
/// ## Errors
/// - `CoreError::Configuration` when `settings` fails validation
/// - `CoreError::Validation` when `liters` is negative or non-finite
///
/// ## Example
/// ```rust
/// use cascade_core::commission::calculate;
/// use cascade_core::money::Money;
/// use cascade_core::types::{CommissionSettings, Tier};
///
/// let mut settings = CommissionSettings::fallback();
/// settings.cashback_rate_per_liter_cents = 200;
///
/// let breakdown =
///     calculate(Money::from_cents(100_000), 50.0, Some(Tier::Gold), &settings).unwrap();
/// assert_eq!(breakdown.commission_cents, 7_500); // 1000 × 5% × 1.5
/// assert_eq!(breakdown.cashback_cents, 15_000);  // 50 L × 2.00 × 1.5
/// ```
pub fn calculate(
    amount: Money,
    liters: f64,
    tier: Option<Tier>,
    settings: &CommissionSettings,
) -> CoreResult<CommissionBreakdown> {
    // Fail loudly on misconfiguration before touching any numbers
    settings.validate()?;

    if !liters.is_finite() || liters < 0.0 {
        return Err(ValidationError::InvalidFormat {
            field: "liters".to_string(),
            reason: format!("must be a non-negative finite number, got {liters}"),
        }
        .into());
    }

    let multiplier_bps = settings.tier_multipliers.for_tier(tier);

    // base × tier in one integer expression: rounding happens once, at the
    // boundary, not between the two factors
    let tiered = amount.apply_bps_scaled(settings.base_rate_bps, multiplier_bps);

    // The cap is a hard ceiling applied AFTER tier scaling
    let commission = tiered.min(settings.commission_cap());

    // Effective (possibly capped) rate; guard amount = 0
    let commission_rate_bps = commission.bps_of(amount);

    // Volume-based cashback, scaled by the same tier multiplier.
    // f64 is fine here: liters is already fractional, and we round
    // half-up to cents exactly once.
    let cashback_raw = liters
        * settings.cashback_rate_per_liter_cents as f64
        * (multiplier_bps as f64 / 10_000.0);
    let cashback_cents = (cashback_raw + 0.5).floor() as i64;

    Ok(CommissionBreakdown {
        commission_cents: commission.cents(),
        commission_rate_bps,
        cashback_cents,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;
    use crate::types::TierMultipliers;
    use chrono::{DateTime, Utc};

    /// Settings matching the canonical worked example: 5% base,
    /// gold 1.5×, cap 1000.00, cashback 2.00/liter.
    fn example_settings() -> CommissionSettings {
        CommissionSettings {
            id: "settings-test".to_string(),
            base_rate_bps: 500,
            tier_multipliers: TierMultipliers {
                lead: 10_000,
                silver: 12_500,
                gold: 15_000,
                platinum: 20_000,
            },
            commission_cap_cents: 100_000,
            cashback_rate_per_liter_cents: 200,
            is_active: true,
            created_at: DateTime::<Utc>::UNIX_EPOCH,
        }
    }

    #[test]
    fn test_gold_tier_within_cap() {
        // 1000.00 at 5% = 50.00 base, × 1.5 = 75.00, under the 1000.00 cap
        let breakdown = calculate(
            Money::from_cents(100_000),
            50.0,
            Some(Tier::Gold),
            &example_settings(),
        )
        .unwrap();

        assert_eq!(breakdown.commission_cents, 7_500);
        assert_eq!(breakdown.commission_rate_bps, 750); // 7.5%
        assert_eq!(breakdown.cashback_cents, 15_000); // 50 × 2.00 × 1.5
    }

    #[test]
    fn test_cap_enforced_after_tier_scaling() {
        let mut settings = example_settings();
        settings.commission_cap_cents = 5_000; // cap at 50.00

        let breakdown =
            calculate(Money::from_cents(100_000), 50.0, Some(Tier::Gold), &settings).unwrap();

        // Tiered commission would be 75.00; the cap clamps it to 50.00
        assert_eq!(breakdown.commission_cents, 5_000);
        // Reported rate reflects the CAPPED effective rate (5.0%),
        // not the nominal tier rate (7.5%)
        assert_eq!(breakdown.commission_rate_bps, 500);
        // Cashback is not subject to the commission cap
        assert_eq!(breakdown.cashback_cents, 15_000);
    }

    #[test]
    fn test_unknown_tier_defaults_to_base_multiplier() {
        let with_none =
            calculate(Money::from_cents(100_000), 0.0, None, &example_settings()).unwrap();
        let with_lead = calculate(
            Money::from_cents(100_000),
            0.0,
            Some(Tier::Lead),
            &example_settings(),
        )
        .unwrap();

        // None → 1.0× base multiplier; lead is configured at 1.0× too
        assert_eq!(with_none.commission_cents, 5_000);
        assert_eq!(with_none.commission_cents, with_lead.commission_cents);
    }

    #[test]
    fn test_zero_amount_reports_zero_rate() {
        let breakdown =
            calculate(Money::zero(), 10.0, Some(Tier::Silver), &example_settings()).unwrap();
        assert_eq!(breakdown.commission_cents, 0);
        assert_eq!(breakdown.commission_rate_bps, 0);
        // Cashback is volume-based and still accrues
        assert_eq!(breakdown.cashback_cents, 2_500); // 10 × 2.00 × 1.25
    }

    #[test]
    fn test_rounding_half_up_at_boundary() {
        // 10.10 × 5% × 1.5 = 0.7575 -> 0.76 with a single half-up rounding
        let breakdown = calculate(
            Money::from_cents(1_010),
            0.0,
            Some(Tier::Gold),
            &example_settings(),
        )
        .unwrap();
        assert_eq!(breakdown.commission_cents, 76);
    }

    #[test]
    fn test_fractional_liters_cashback() {
        // 12.5 L × 2.00 × 1.0 = 25.00
        let breakdown = calculate(
            Money::from_cents(10_000),
            12.5,
            Some(Tier::Lead),
            &example_settings(),
        )
        .unwrap();
        assert_eq!(breakdown.cashback_cents, 2_500);
    }

    #[test]
    fn test_malformed_settings_fail_loudly() {
        let mut settings = example_settings();
        settings.commission_cap_cents = 0;

        let err = calculate(Money::from_cents(100_000), 1.0, None, &settings).unwrap_err();
        assert!(matches!(err, CoreError::Configuration { .. }));
    }

    #[test]
    fn test_invalid_liters_rejected() {
        let err = calculate(
            Money::from_cents(100_000),
            -1.0,
            None,
            &example_settings(),
        )
        .unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));

        assert!(calculate(
            Money::from_cents(100_000),
            f64::NAN,
            None,
            &example_settings()
        )
        .is_err());
    }
}
