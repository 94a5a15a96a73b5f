//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In floating point:                                                     │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │                                                                         │
//! │  A commission engine that drifts by fractions of a cent per            │
//! │  transaction does not stay reconcilable for long.                      │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Cents                                            │
//! │    All amounts, caps, and ledger values are i64 cents.                 │
//! │    Rounding happens exactly once, half-up, at computation              │
//! │    boundaries - never mid-calculation.                                 │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use cascade_core::money::Money;
//!
//! // Create from cents (preferred)
//! let amount = Money::from_cents(100_000); // 1000.00
//!
//! // Apply a basis-point rate with half-up rounding
//! let commission = amount.apply_bps(500); // 5% -> 50.00
//! assert_eq!(commission.cents(), 5_000);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Sub, SubAssign};

// =============================================================================
// Money Type
// =============================================================================

/// Represents a monetary value in the smallest currency unit (cents).
///
/// ## Design Decisions
/// - **i64 (signed)**: Allows negative values for corrections/adjustments
/// - **Single field tuple struct**: Zero-cost abstraction over i64
/// - **Derives**: Full serde support for JSON serialization
///
/// Every monetary value in the engine flows through this type: record
/// amounts, commission caps, ledger credits, and commission snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents (the smallest currency unit).
    ///
    /// ## Example
    /// ```rust
    /// use cascade_core::money::Money;
    ///
    /// let amount = Money::from_cents(1099); // 10.99
    /// assert_eq!(amount.cents(), 1099);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Returns the value in cents (smallest currency unit).
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the major unit portion.
    #[inline]
    pub const fn units(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the minor unit portion (always 0-99).
    #[inline]
    pub const fn cents_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the value is positive (greater than zero).
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Returns the absolute value.
    #[inline]
    pub const fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    /// Returns the smaller of two money values.
    ///
    /// Used to enforce commission caps: `tiered.min(cap)`.
    #[inline]
    pub fn min(self, other: Self) -> Self {
        Money(self.0.min(other.0))
    }

    /// Applies a basis-point rate with half-up rounding.
    ///
    /// ## Basis Points
    /// 1 bps = 0.01% = 1/10000. 500 bps = 5%.
    ///
    /// ## Implementation
    /// Integer math in i128: `(cents * bps + 5000) / 10000`
    /// The +5000 implements half-up rounding (5000/10000 = 0.5).
    ///
    /// ## Example
    /// ```rust
    /// use cascade_core::money::Money;
    ///
    /// let amount = Money::from_cents(100_000); // 1000.00
    /// assert_eq!(amount.apply_bps(500).cents(), 5_000); // 5% = 50.00
    /// ```
    pub fn apply_bps(&self, bps: u32) -> Money {
        // i128 prevents overflow on large amounts
        let cents = (self.0 as i128 * bps as i128 + 5_000) / 10_000;
        Money(cents as i64)
    }

    /// Applies two stacked basis-point factors with a single half-up rounding.
    ///
    /// Commission = amount × base_rate × tier_multiplier, rounded ONCE at
    /// the boundary. Rounding after the base rate and again after the tier
    /// multiplier would compound rounding error, so both factors are applied
    /// in one integer expression.
    ///
    /// ## Example
    /// ```rust
    /// use cascade_core::money::Money;
    ///
    /// let amount = Money::from_cents(100_000); // 1000.00
    /// // 5% base rate × 1.5 tier multiplier = 75.00
    /// assert_eq!(amount.apply_bps_scaled(500, 15_000).cents(), 7_500);
    /// ```
    pub fn apply_bps_scaled(&self, rate_bps: u32, multiplier_bps: u32) -> Money {
        let numerator = self.0 as i128 * rate_bps as i128 * multiplier_bps as i128;
        // Divisor is 10000 × 10000; +half for half-up rounding
        let cents = (numerator + 50_000_000) / 100_000_000;
        Money(cents as i64)
    }

    /// Computes this value as a basis-point fraction of `total`, half-up.
    ///
    /// Used to report the effective commission rate after the cap is
    /// enforced. Returns 0 when `total` is zero (never divides by zero).
    ///
    /// ## Example
    /// ```rust
    /// use cascade_core::money::Money;
    ///
    /// let commission = Money::from_cents(5_000);
    /// let amount = Money::from_cents(100_000);
    /// assert_eq!(commission.bps_of(amount), 500); // 5.0%
    /// ```
    pub fn bps_of(&self, total: Money) -> u32 {
        if total.0 <= 0 {
            return 0;
        }
        let bps = (self.0 as i128 * 10_000 + total.0 as i128 / 2) / total.0 as i128;
        bps.max(0) as u32
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Display implementation shows money in a human-readable format.
///
/// For logs and diagnostics; display formatting for end users lives
/// in the reporting layer, not here.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}{}.{:02}", sign, self.units().abs(), self.cents_part())
    }
}

/// Default money is zero.
impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_cents() {
        let money = Money::from_cents(1099);
        assert_eq!(money.cents(), 1099);
        assert_eq!(money.units(), 10);
        assert_eq!(money.cents_part(), 99);
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", Money::from_cents(1099)), "10.99");
        assert_eq!(format!("{}", Money::from_cents(500)), "5.00");
        assert_eq!(format!("{}", Money::from_cents(-550)), "-5.50");
        assert_eq!(format!("{}", Money::from_cents(0)), "0.00");
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::from_cents(1000);
        let b = Money::from_cents(500);

        assert_eq!((a + b).cents(), 1500);
        assert_eq!((a - b).cents(), 500);
        assert_eq!(a.min(b).cents(), 500);
    }

    #[test]
    fn test_apply_bps_exact() {
        // 1000.00 at 5% = 50.00, no rounding involved
        let amount = Money::from_cents(100_000);
        assert_eq!(amount.apply_bps(500).cents(), 5_000);
    }

    #[test]
    fn test_apply_bps_half_up() {
        // 10.01 at 5% = 0.5005 -> 0.50; 10.10 at 5% = 0.505 -> 0.51 (half-up)
        assert_eq!(Money::from_cents(1001).apply_bps(500).cents(), 50);
        assert_eq!(Money::from_cents(1010).apply_bps(500).cents(), 51);
    }

    #[test]
    fn test_apply_bps_scaled_single_rounding() {
        // 10.01 × 5% × 1.5 = 0.75075 -> 0.75
        // Rounding twice (0.50 then ×1.5 = 0.75) happens to agree here, but
        // 10.10 × 5% × 1.5 = 0.7575 -> 0.76, while round-then-scale would
        // give 0.51 × 1.5 = 0.765 -> 0.77. Single rounding is the contract.
        assert_eq!(Money::from_cents(1001).apply_bps_scaled(500, 15_000).cents(), 75);
        assert_eq!(Money::from_cents(1010).apply_bps_scaled(500, 15_000).cents(), 76);
    }

    #[test]
    fn test_bps_of() {
        let commission = Money::from_cents(5_000);
        let amount = Money::from_cents(100_000);
        assert_eq!(commission.bps_of(amount), 500);

        // Guard: zero total reports a zero rate, never a division panic
        assert_eq!(commission.bps_of(Money::zero()), 0);
    }

    #[test]
    fn test_zero_and_checks() {
        let zero = Money::zero();
        assert!(zero.is_zero());
        assert!(!zero.is_positive());

        let positive = Money::from_cents(100);
        assert!(positive.is_positive());
        assert_eq!(Money::from_cents(-100).abs().cents(), 100);
    }
}
