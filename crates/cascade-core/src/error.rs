//! # Error Types
//!
//! Domain-specific error types for cascade-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  cascade-core errors (this file)                                       │
//! │  ├── CoreError        - Business rule violations                       │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  cascade-db errors (separate crate)                                    │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  cascade-recon errors (separate crate)                                 │
//! │  └── ReconError       - Engine taxonomy: NotFound / Configuration /    │
//! │                         Validation / Transient                         │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → ReconError → caller     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (record ID, settings ID, etc.)
//! 3. Errors are enum variants, never String
//! 4. A configuration failure must never masquerade as "zero commission" -
//!    malformed settings are a loud, typed error

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
///
/// These errors represent business rule violations or domain logic failures.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Unverified record cannot be found.
    #[error("Unverified record not found: {0}")]
    RecordNotFound(String),

    /// Reference record cannot be found.
    ///
    /// ## When This Occurs
    /// - A matched reference ID points at a record that has since vanished
    /// - Source table and reference ID disagree
    #[error("Reference record not found: {reference_source}/{id}")]
    ReferenceNotFound { reference_source: String, id: String },

    /// Commission settings are malformed.
    ///
    /// ## When This Occurs
    /// - Tier multiplier map fails to parse
    /// - Commission cap is missing or non-positive
    /// - A tier multiplier is zero
    ///
    /// ## Why Loud?
    /// This indicates operational misconfiguration, not a data-quality
    /// issue. Callers fall back to the last-known-good snapshot and log at
    /// high severity; they never proceed with an undefined rate.
    #[error("Invalid commission settings {settings_id}: {reason}")]
    Configuration { settings_id: String, reason: String },

    /// Record is not in a state that allows the requested operation.
    ///
    /// ## When This Occurs
    /// - Finalizing a record that is already `final` or `rejected`
    /// - Rejecting a record that already left `provisional`
    #[error("Record {record_id} is {current_status}, cannot perform operation")]
    InvalidStatusTransition {
        record_id: String,
        current_status: String,
    },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Creates a Configuration error for a given settings snapshot.
    pub fn configuration(settings_id: impl Into<String>, reason: impl Into<String>) -> Self {
        CoreError::Configuration {
            settings_id: settings_id.into(),
            reason: reason.into(),
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when ingested data doesn't meet requirements.
/// Used for early validation before business logic runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., non-finite liters, malformed invoice number).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
