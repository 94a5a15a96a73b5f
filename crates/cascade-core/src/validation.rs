//! # Validation Module
//!
//! Input validation for ingested records and sale creation.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Ingestion (OCR pipeline / external sync)                     │
//! │  ├── Shape checks at the boundary                                      │
//! │  └── THIS MODULE: business rule validation                             │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Database (SQLite)                                            │
//! │  ├── NOT NULL constraints                                              │
//! │  ├── CHECK constraints on status values                                │
//! │  └── Foreign key constraints                                           │
//! │                                                                         │
//! │  Defense in depth: malformed amounts/dates become typed               │
//! │  ValidationErrors here, never surprises inside the engine             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Duration, Utc};

use crate::error::ValidationError;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Upper bound for a single transaction amount (1,000,000.00).
/// Anything larger is almost certainly an OCR misread.
pub const MAX_AMOUNT_CENTS: i64 = 100_000_000;

/// Upper bound for liters in a single sale.
pub const MAX_LITERS: f64 = 100_000.0;

/// How far in the future an occurrence timestamp may sit.
/// Tolerates device clock skew without admitting nonsense dates.
const FUTURE_SKEW_HOURS: i64 = 24;

// =============================================================================
// Amount / Volume Validators
// =============================================================================

/// Validates a transaction amount in cents.
///
/// ## Rules
/// - Must be positive (zero-amount proofs carry no reward)
/// - Must not exceed [`MAX_AMOUNT_CENTS`]
///
/// ## Example
/// ```rust
/// use cascade_core::validation::validate_amount_cents;
///
/// assert!(validate_amount_cents(10_000).is_ok());
/// assert!(validate_amount_cents(0).is_err());
/// assert!(validate_amount_cents(-500).is_err());
/// ```
pub fn validate_amount_cents(amount_cents: i64) -> ValidationResult<()> {
    if amount_cents <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "amount".to_string(),
        });
    }
    if amount_cents > MAX_AMOUNT_CENTS {
        return Err(ValidationError::OutOfRange {
            field: "amount".to_string(),
            min: 1,
            max: MAX_AMOUNT_CENTS,
        });
    }
    Ok(())
}

/// Validates a sale volume in liters.
pub fn validate_liters(liters: f64) -> ValidationResult<()> {
    if !liters.is_finite() {
        return Err(ValidationError::InvalidFormat {
            field: "liters".to_string(),
            reason: "must be a finite number".to_string(),
        });
    }
    if liters < 0.0 || liters > MAX_LITERS {
        return Err(ValidationError::OutOfRange {
            field: "liters".to_string(),
            min: 0,
            max: MAX_LITERS as i64,
        });
    }
    Ok(())
}

// =============================================================================
// String / Date Validators
// =============================================================================

/// Validates an invoice number.
///
/// ## Rules
/// - Must not be empty
/// - Must be at most 64 characters
/// - Alphanumeric plus `-`, `_`, `/` (covers every billing provider seen
///   so far)
pub fn validate_invoice_number(invoice_number: &str) -> ValidationResult<()> {
    let invoice_number = invoice_number.trim();

    if invoice_number.is_empty() {
        return Err(ValidationError::Required {
            field: "invoice_number".to_string(),
        });
    }

    if invoice_number.len() > 64 {
        return Err(ValidationError::TooLong {
            field: "invoice_number".to_string(),
            max: 64,
        });
    }

    if !invoice_number
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_' || c == '/')
    {
        return Err(ValidationError::InvalidFormat {
            field: "invoice_number".to_string(),
            reason: "must contain only letters, numbers, hyphens, underscores, and slashes"
                .to_string(),
        });
    }

    Ok(())
}

/// Validates an occurrence timestamp against the ingestion clock.
///
/// OCR date parsing produces garbage often enough that an explicit check
/// here beats debugging a zero-confidence match later.
pub fn validate_occurred_at(occurred_at: DateTime<Utc>, now: DateTime<Utc>) -> ValidationResult<()> {
    if occurred_at > now + Duration::hours(FUTURE_SKEW_HOURS) {
        return Err(ValidationError::InvalidFormat {
            field: "occurred_at".to_string(),
            reason: "timestamp is in the future".to_string(),
        });
    }
    Ok(())
}

/// Validates an entity identifier (user, store).
pub fn validate_entity_id(field: &str, id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }
    if id.len() > 64 {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: 64,
        });
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_amount() {
        assert!(validate_amount_cents(1).is_ok());
        assert!(validate_amount_cents(MAX_AMOUNT_CENTS).is_ok());
        assert!(validate_amount_cents(0).is_err());
        assert!(validate_amount_cents(-100).is_err());
        assert!(validate_amount_cents(MAX_AMOUNT_CENTS + 1).is_err());
    }

    #[test]
    fn test_validate_liters() {
        assert!(validate_liters(0.0).is_ok());
        assert!(validate_liters(18.9).is_ok());
        assert!(validate_liters(-0.1).is_err());
        assert!(validate_liters(f64::NAN).is_err());
        assert!(validate_liters(f64::INFINITY).is_err());
    }

    #[test]
    fn test_validate_invoice_number() {
        assert!(validate_invoice_number("INV-2026/0042").is_ok());
        assert!(validate_invoice_number("").is_err());
        assert!(validate_invoice_number("   ").is_err());
        assert!(validate_invoice_number(&"X".repeat(65)).is_err());
        assert!(validate_invoice_number("INV 0042").is_err()); // space
    }

    #[test]
    fn test_validate_occurred_at() {
        let now = Utc::now();
        assert!(validate_occurred_at(now, now).is_ok());
        assert!(validate_occurred_at(now - Duration::days(30), now).is_ok());
        // Within clock-skew tolerance
        assert!(validate_occurred_at(now + Duration::hours(2), now).is_ok());
        // Beyond tolerance
        assert!(validate_occurred_at(now + Duration::hours(48), now).is_err());
    }

    #[test]
    fn test_validate_entity_id() {
        assert!(validate_entity_id("user_id", "user-1").is_ok());
        assert!(validate_entity_id("user_id", " ").is_err());
    }
}
