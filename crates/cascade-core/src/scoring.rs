//! # Match Scoring
//!
//! Confidence scoring for (candidate, unverified-record) pairs.
//!
//! ## Scoring Model
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Confidence Formula                                 │
//! │                                                                         │
//! │  amount_score = max(0, 1 - |amount_delta| / 10.00)                     │
//! │  date_score   = max(0, 1 - |time_delta|  / 24h)                        │
//! │                                                                         │
//! │  confidence   = 0.7 × amount_score + 0.3 × date_score                  │
//! │                                                                         │
//! │  WHY 70/30? Invoice amounts are rarely ambiguous, while timestamps     │
//! │  from OCR/date parsing are noisy. The amount match dominates.          │
//! │                                                                         │
//! │  Properties (tested below):                                            │
//! │  • 0 <= confidence <= 1 for every pair                                 │
//! │  • monotonically non-increasing in each delta, other held fixed        │
//! │  • exact match (both deltas zero) scores exactly 1.0                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Tie-Breaking
//! Within one source, the best candidate is selected by confidence via this
//! same formula (never by raw deltas); ties keep the first-seen candidate,
//! so selection is deterministic for a given query order.

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::types::{ReferenceRecord, ReferenceSource, UnverifiedRecord};

// =============================================================================
// Constants
// =============================================================================

/// Amount differences beyond 10 currency units contribute zero.
pub const AMOUNT_SCORE_SPAN_CENTS: i64 = 1_000;

/// Time differences beyond 24 hours contribute zero.
pub const DATE_SCORE_SPAN_MS: i64 = 86_400_000;

/// Weight of the amount sub-score.
pub const AMOUNT_WEIGHT: f64 = 0.7;

/// Weight of the date sub-score.
pub const DATE_WEIGHT: f64 = 0.3;

// =============================================================================
// Match Candidate
// =============================================================================

/// A scored pairing of a reference record with an unverified record.
///
/// Transient: produced and discarded within one reconciliation pass,
/// never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchCandidate {
    /// The reference record under consideration.
    pub reference: ReferenceRecord,
    /// Signed amount difference (reference - unverified), in cents.
    pub amount_delta_cents: i64,
    /// Signed time difference (reference - unverified), in milliseconds.
    pub time_delta_ms: i64,
    /// Confidence in [0, 1].
    pub confidence: f64,
}

impl MatchCandidate {
    /// Scores a reference record against an unverified record.
    pub fn score(reference: ReferenceRecord, record: &UnverifiedRecord) -> Self {
        let amount_delta_cents = reference.amount_cents - record.amount_cents;
        let time_delta_ms = (reference.occurred_at - record.occurred_at).num_milliseconds();
        let confidence = confidence(amount_delta_cents, Duration::milliseconds(time_delta_ms));

        MatchCandidate {
            reference,
            amount_delta_cents,
            time_delta_ms,
            confidence,
        }
    }

    /// Which source this candidate came from.
    #[inline]
    pub fn source(&self) -> ReferenceSource {
        self.reference.source
    }
}

// =============================================================================
// Scoring Functions
// =============================================================================

/// Amount sub-score: linear falloff over 10 currency units.
pub fn amount_score(amount_delta_cents: i64) -> f64 {
    let delta = amount_delta_cents.abs() as f64;
    (1.0 - delta / AMOUNT_SCORE_SPAN_CENTS as f64).max(0.0)
}

/// Date sub-score: linear falloff over 24 hours.
pub fn date_score(time_delta: Duration) -> f64 {
    let delta = time_delta.num_milliseconds().abs() as f64;
    (1.0 - delta / DATE_SCORE_SPAN_MS as f64).max(0.0)
}

/// Combined confidence in [0, 1].
pub fn confidence(amount_delta_cents: i64, time_delta: Duration) -> f64 {
    AMOUNT_WEIGHT * amount_score(amount_delta_cents) + DATE_WEIGHT * date_score(time_delta)
}

/// Selects the best candidate from one source's result set.
///
/// Strictly-greater comparison keeps the FIRST candidate on ties, which
/// makes selection deterministic (query order is stable).
pub fn best_candidate(candidates: Vec<MatchCandidate>) -> Option<MatchCandidate> {
    let mut best: Option<MatchCandidate> = None;
    for candidate in candidates {
        match &best {
            Some(current) if candidate.confidence <= current.confidence => {}
            _ => best = Some(candidate),
        }
    }
    best
}

// =============================================================================
// Unit Tests
// =============================================================================
