//! # Ledger Side Effects
//!
//! Applies the reward side of a successful match: points, cashback, the
//! status transition, ledger rows, audit trail and user notification.
//!
//! ## Reward Rules (reconciliation path)
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  points   = floor(amount_cents / cents_per_point)   (1 pt / 10 units)  │
//! │  cashback = amount × cashback_bps                   (flat 2%)          │
//! │                                                                         │
//! │  These are FLAT, not tiered: a reconciled external record carries      │
//! │  no loyalty tier context at match time. The tiered calculator is       │
//! │  the sale path's concern.                                              │
//! │                                                                         │
//! │  Durability classes:                                                    │
//! │    status + awards + ledger rows   → ONE transaction (cascade-db)      │
//! │    audit entry, notification       → fire-and-forget, never fail       │
//! │                                      the reconciliation                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::config::RewardConfig;
use crate::error::ReconResult;
use crate::sinks::{NotificationSink, RewardEvent};
use cascade_core::{MatchCandidate, Money, UnverifiedRecord};
use cascade_db::{AuditRepository, MatchFinalization, UnverifiedRecordRepository};

/// What a finalization attempt awarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AwardSummary {
    /// The record transitioned to `final` in this call. `false` means
    /// another path settled it first; nothing else happened.
    pub finalized: bool,
    pub points: i64,
    pub cashback_cents: i64,
}

/// Applies reward side effects for finalized matches.
#[derive(Clone)]
pub struct LedgerSideEffects {
    records: UnverifiedRecordRepository,
    audit: AuditRepository,
    notifications: Arc<dyn NotificationSink>,
    rewards: RewardConfig,
}

impl LedgerSideEffects {
    pub fn new(
        records: UnverifiedRecordRepository,
        audit: AuditRepository,
        notifications: Arc<dyn NotificationSink>,
        rewards: RewardConfig,
    ) -> Self {
        LedgerSideEffects {
            records,
            audit,
            notifications,
            rewards,
        }
    }

    /// Points for a matched amount, floored.
    pub fn points_for(&self, amount_cents: i64) -> i64 {
        amount_cents / self.rewards.cents_per_point
    }

    /// Cashback for a matched amount, in cents (half-up).
    pub fn cashback_for(&self, amount_cents: i64) -> i64 {
        Money::from_cents(amount_cents)
            .apply_bps(self.rewards.cashback_bps)
            .cents()
    }

    /// Finalizes a match and credits rewards.
    ///
    /// Idempotent end to end: the status transition and the record's own
    /// award fields guard re-crediting inside the database transaction.
    /// A replay returns `finalized: false` and changes nothing.
    pub async fn finalize(
        &self,
        record: &UnverifiedRecord,
        candidate: &MatchCandidate,
        now: DateTime<Utc>,
    ) -> ReconResult<AwardSummary> {
        let points = self.points_for(record.amount_cents);
        let cashback_cents = self.cashback_for(record.amount_cents);

        let outcome = self
            .records
            .finalize_match(&MatchFinalization {
                record_id: record.id.clone(),
                user_id: record.user_id.clone(),
                reference_id: candidate.reference.id.clone(),
                reference_source: candidate.source(),
                confidence: candidate.confidence,
                matched_at: now,
                points,
                cashback_cents,
            })
            .await?;

        if !outcome.finalized {
            return Ok(AwardSummary {
                finalized: false,
                points: 0,
                cashback_cents: 0,
            });
        }

        info!(
            record = %record.id,
            reference = %candidate.reference.id,
            source = %candidate.source(),
            confidence = candidate.confidence,
            points,
            cashback_cents,
            "Record matched and credited"
        );

        self.emit_audit(record, candidate, points, cashback_cents, now)
            .await;
        self.notifications.notify(RewardEvent::RecordMatched {
            user_id: record.user_id.clone(),
            record_id: record.id.clone(),
            points,
            cashback_cents,
        });

        Ok(AwardSummary {
            finalized: true,
            points,
            cashback_cents,
        })
    }

    /// Audit is advisory: log and swallow failures.
    async fn emit_audit(
        &self,
        record: &UnverifiedRecord,
        candidate: &MatchCandidate,
        points: i64,
        cashback_cents: i64,
        now: DateTime<Utc>,
    ) {
        let metadata = serde_json::json!({
            "reference_id": candidate.reference.id,
            "reference_source": candidate.source().as_str(),
            "confidence": candidate.confidence,
            "points": points,
            "cashback_cents": cashback_cents,
        });

        if let Err(e) = self
            .audit
            .record("record_matched", "unverified_record", &record.id, &metadata, now)
            .await
        {
            warn!(record = %record.id, error = %e, "Audit write failed (ignored)");
        }
    }
}
