//! # cascade-core: Pure Business Logic for Cascade Loyalty
//!
//! This crate is the **heart** of the reconciliation and commission engine.
//! It contains all business logic as pure functions with zero I/O
//! dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Cascade Loyalty Architecture                        │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                External Batch Driver / Back Office              │   │
//! │  │         (feeds pending records, reads batch reports)            │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 cascade-recon (Engine Layer)                    │   │
//! │  │    orchestrator, candidate finder, ledger side effects          │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ cascade-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌────────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │  scoring   │  │commission │  │   │
//! │  │   │  Record   │  │   Money   │  │ confidence │  │  tiered,  │  │   │
//! │  │   │  Tier...  │  │ bps math  │  │  weights   │  │  capped   │  │   │
//! │  │   └───────────┘  └───────────┘  └────────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO CLOCK • PURE FUNCTIONS             │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                  cascade-db (Database Layer)                    │   │
//! │  │           SQLite queries, migrations, repositories              │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (UnverifiedRecord, ReferenceRecord, Sale, ...)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`scoring`] - Confidence scoring for match candidates
//! - [`commission`] - Tiered, capped commission and cashback computation
//! - [`error`] - Domain error types
//! - [`validation`] - Business rule validation
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: same input = same output; settings snapshots are
//!    passed in explicitly, never read from a global
//! 2. **No I/O**: database, network, clock access is FORBIDDEN here
//! 3. **Integer Money**: all monetary values are cents (i64)
//! 4. **Explicit Errors**: misconfiguration is a typed error, never a
//!    silent zero

// =============================================================================
// Module Declarations
// =============================================================================

pub mod commission;
pub mod error;
pub mod money;
pub mod scoring;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use cascade_core::Money` instead of
// `use cascade_core::money::Money`

pub use commission::{calculate, CommissionBreakdown};
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use scoring::{best_candidate, MatchCandidate};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Minimum confidence for a match to finalize automatically.
///
/// ## Business Reason
/// Below this line a match is plausible but not safe to credit without the
/// reference record (or a human) catching up; the record stays provisional
/// and is retried by a later batch.
pub const MATCH_THRESHOLD: f64 = 0.8;

/// Absolute amount tolerance for candidate queries: 0.01 currency unit.
pub const AMOUNT_TOLERANCE_CENTS: i64 = 1;

/// Candidate query time window: ±24 hours around the record's date.
pub const MATCH_WINDOW_HOURS: i64 = 24;

/// The base (1.0×) tier multiplier in basis points.
pub const BASE_MULTIPLIER_BPS: u32 = 10_000;

/// Reconciliation-path points rule: 1 point per 10 currency units,
/// i.e. one point per this many cents, floored.
///
/// ## Why separate from the tiered calculator?
/// A reconciled external record has no loyalty tier context at the point
/// of matching, so the reconciliation path credits flat-rate defaults.
/// This divergence from sale-time commission is intentional and flagged
/// for product review - do not unify without a decision.
pub const RECON_CENTS_PER_POINT: i64 = 1_000;

/// Reconciliation-path cashback rule: flat 2% of amount, in bps.
/// Same tier-context caveat as [`RECON_CENTS_PER_POINT`].
pub const RECON_CASHBACK_BPS: u32 = 200;
