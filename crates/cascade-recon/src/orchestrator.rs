//! # Reconciliation Orchestrator
//!
//! Drives reconciliation for single records and bounded-parallel batches.
//!
//! ## Per-Record Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    reconcile_record(id)                                 │
//! │                                                                         │
//! │  1. Load record                                                        │
//! │     └── missing            ──► error (not_found)                       │
//! │     └── not provisional    ──► SKIPPED (idempotent no-op, no work)     │
//! │                                                                         │
//! │  2. Claim (atomic conditional UPDATE on claimed_at)                    │
//! │     └── lost the race      ──► SKIPPED (another worker owns it)        │
//! │                                                                         │
//! │  3. Query each configured source (per-record timeout)                  │
//! │     score all candidates ──► best per source ──► global best           │
//! │     (confidence first, configured source priority breaks ties)         │
//! │                                                                         │
//! │  4. best.confidence >= threshold?                                      │
//! │     YES ──► finalize: status + awards + ledger in ONE transaction      │
//! │             ──► MATCHED                                                │
//! │     NO  ──► release claim, record stays provisional ──► NO_MATCH       │
//! │             (not an error - a later batch retries)                     │
//! │                                                                         │
//! │  Any error inside 3/4 releases the claim and becomes that record's     │
//! │  ERROR outcome. One bad record never aborts the batch.                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{Duration, Utc};
use futures_util::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::Duration as StdDuration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::candidates::CandidateFinder;
use crate::config::ReconConfig;
use crate::error::{ReconError, ReconResult};
use crate::ledger::LedgerSideEffects;
use crate::sinks::NotificationSink;
use cascade_core::{best_candidate, MatchCandidate, ReferenceSource, UnverifiedRecord};
use cascade_db::Database;

// =============================================================================
// Outcomes
// =============================================================================

/// What happened to one record in a batch.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordOutcome {
    /// Finalized against a reference record.
    Matched {
        record_id: String,
        reference_id: String,
        source: ReferenceSource,
        confidence: f64,
        points: i64,
        cashback_cents: i64,
    },
    /// No candidate cleared the threshold; the record stays provisional
    /// and retries in a later batch.
    NoMatch {
        record_id: String,
        /// Best confidence seen, if any candidate existed at all.
        best_confidence: Option<f64>,
    },
    /// Nothing to do: the record had already left `provisional`, or
    /// another worker holds the claim.
    Skipped { record_id: String },
    /// Processing this record failed; the batch continued without it.
    Error {
        record_id: String,
        message: String,
        transient: bool,
    },
}

impl RecordOutcome {
    pub fn record_id(&self) -> &str {
        match self {
            RecordOutcome::Matched { record_id, .. }
            | RecordOutcome::NoMatch { record_id, .. }
            | RecordOutcome::Skipped { record_id }
            | RecordOutcome::Error { record_id, .. } => record_id,
        }
    }
}

/// Summary of one batch run.
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub matched: usize,
    pub no_match: usize,
    pub skipped: usize,
    pub errors: usize,
    /// Per-record outcomes, in completion order.
    pub outcomes: Vec<RecordOutcome>,
    /// The batch was cancelled via the shutdown channel; unprocessed
    /// records were left untouched.
    pub cancelled: bool,
}

impl BatchReport {
    fn push(&mut self, outcome: RecordOutcome) {
        match &outcome {
            RecordOutcome::Matched { .. } => self.matched += 1,
            RecordOutcome::NoMatch { .. } => self.no_match += 1,
            RecordOutcome::Skipped { .. } => self.skipped += 1,
            RecordOutcome::Error { .. } => self.errors += 1,
        }
        self.outcomes.push(outcome);
    }

    pub fn processed(&self) -> usize {
        self.outcomes.len()
    }
}

// =============================================================================
// Orchestrator
// =============================================================================

/// The reconciliation engine.
///
/// Cheap to clone; all state lives in the database. A batch driver
/// typically holds one orchestrator and calls [`run_batch`] on a
/// schedule.
///
/// [`run_batch`]: ReconciliationOrchestrator::run_batch
#[derive(Clone)]
pub struct ReconciliationOrchestrator {
    db: Database,
    config: ReconConfig,
    finder: CandidateFinder,
    effects: LedgerSideEffects,
}

impl ReconciliationOrchestrator {
    /// Creates an orchestrator over a database with the given config and
    /// notification sink.
    pub fn new(
        db: Database,
        config: ReconConfig,
        notifications: Arc<dyn NotificationSink>,
    ) -> Self {
        let finder = CandidateFinder::new(db.reference_records(), &config.matching);
        let effects = LedgerSideEffects::new(
            db.unverified_records(),
            db.audit(),
            notifications,
            config.rewards.clone(),
        );

        ReconciliationOrchestrator {
            db,
            config,
            finder,
            effects,
        }
    }

    pub fn config(&self) -> &ReconConfig {
        &self.config
    }

    // =========================================================================
    // Single Record
    // =========================================================================

    /// Reconciles one record. Never returns an error: failures fold into
    /// the [`RecordOutcome::Error`] variant so batches keep moving.
    pub async fn reconcile_record(&self, record_id: &str) -> RecordOutcome {
        match self.try_reconcile(record_id).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(record = %record_id, error = %e, "Reconciliation failed");
                RecordOutcome::Error {
                    record_id: record_id.to_string(),
                    message: e.to_string(),
                    transient: e.is_transient(),
                }
            }
        }
    }

    async fn try_reconcile(&self, record_id: &str) -> ReconResult<RecordOutcome> {
        let records = self.db.unverified_records();

        // Idempotency first: settled records are pure no-ops, before any
        // claim or query work.
        let record = records
            .get_by_id(record_id)
            .await?
            .ok_or_else(|| ReconError::not_found("unverified record", record_id))?;

        if !record.is_provisional() {
            debug!(record = %record_id, status = %record.status, "Already settled, skipping");
            return Ok(RecordOutcome::Skipped {
                record_id: record_id.to_string(),
            });
        }

        let now = Utc::now();
        let claim_ttl = Duration::seconds(self.config.batch.claim_ttl_secs);
        if !records.claim(record_id, now, claim_ttl).await? {
            debug!(record = %record_id, "Claimed by another worker, skipping");
            return Ok(RecordOutcome::Skipped {
                record_id: record_id.to_string(),
            });
        }

        // From here on the claim is ours: any failure releases it so the
        // record retries in the next batch instead of pinning until TTL.
        match self.settle_claimed(&record).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                if let Err(release_err) = records.release_claim(record_id).await {
                    warn!(record = %record_id, error = %release_err, "Claim release failed");
                }
                Err(e)
            }
        }
    }

    /// Scores and settles a record this worker has already claimed.
    async fn settle_claimed(&self, record: &UnverifiedRecord) -> ReconResult<RecordOutcome> {
        let record_id = record.id.as_str();
        let best = self.find_best_candidate(record).await?;

        match best {
            Some(candidate) if candidate.confidence >= self.config.matching.threshold => {
                let award = self.effects.finalize(record, &candidate, Utc::now()).await?;
                if !award.finalized {
                    // Lost a race after claiming; someone else settled it.
                    return Ok(RecordOutcome::Skipped {
                        record_id: record_id.to_string(),
                    });
                }
                Ok(RecordOutcome::Matched {
                    record_id: record_id.to_string(),
                    reference_id: candidate.reference.id.clone(),
                    source: candidate.source(),
                    confidence: candidate.confidence,
                    points: award.points,
                    cashback_cents: award.cashback_cents,
                })
            }
            best => {
                let best_confidence = best.map(|c| c.confidence);
                debug!(
                    record = %record_id,
                    best_confidence = ?best_confidence,
                    threshold = self.config.matching.threshold,
                    "No qualifying candidate, staying provisional"
                );
                self.db.unverified_records().release_claim(record_id).await?;
                Ok(RecordOutcome::NoMatch {
                    record_id: record_id.to_string(),
                    best_confidence,
                })
            }
        }
    }

    /// Queries every configured source and picks the global best
    /// candidate: highest confidence, configured source priority on ties.
    ///
    /// Sources are consulted in priority order and a later source must
    /// STRICTLY beat the incumbent, so ties resolve to the higher
    /// priority source deterministically.
    async fn find_best_candidate(
        &self,
        record: &UnverifiedRecord,
    ) -> ReconResult<Option<MatchCandidate>> {
        let timeout = StdDuration::from_secs(self.config.batch.lookup_timeout_secs);
        let mut best: Option<MatchCandidate> = None;

        for &source in &self.config.matching.source_priority {
            let references = tokio::time::timeout(timeout, self.finder.find(source, record))
                .await
                .map_err(|_| {
                    ReconError::Transient(format!(
                        "candidate lookup in {source} timed out after {}s",
                        timeout.as_secs()
                    ))
                })??;

            let candidates: Vec<MatchCandidate> = references
                .into_iter()
                .map(|reference| MatchCandidate::score(reference, record))
                .collect();

            if let Some(source_best) = best_candidate(candidates) {
                let wins = match &best {
                    Some(incumbent) => source_best.confidence > incumbent.confidence,
                    None => true,
                };
                if wins {
                    best = Some(source_best);
                }
            }
        }

        Ok(best)
    }

    // =========================================================================
    // Batch Runner
    // =========================================================================

    /// Runs one batch to completion (no cancellation).
    pub async fn run_batch(&self) -> ReconResult<BatchReport> {
        let (_tx, mut rx) = mpsc::channel(1);
        self.run_batch_with_shutdown(&mut rx).await
    }

    /// Runs one batch with bounded parallelism, stopping early if the
    /// shutdown channel fires. Cancelled batches leave unprocessed
    /// records untouched (still provisional, claims expire via TTL).
    pub async fn run_batch_with_shutdown(
        &self,
        shutdown_rx: &mut mpsc::Receiver<()>,
    ) -> ReconResult<BatchReport> {
        let pending = self
            .db
            .unverified_records()
            .list_pending(self.config.batch.batch_size)
            .await?;

        info!(
            pending = pending.len(),
            workers = self.config.batch.worker_count,
            "Starting reconciliation batch"
        );

        let mut report = BatchReport::default();

        let mut outcomes = stream::iter(pending)
            .map(|record| {
                let this = self.clone();
                async move { this.reconcile_record(&record.id).await }
            })
            .buffer_unordered(self.config.batch.worker_count);

        loop {
            tokio::select! {
                biased;
                _ = shutdown_rx.recv() => {
                    info!(processed = report.processed(), "Batch cancelled by shutdown signal");
                    report.cancelled = true;
                    break;
                }
                next = outcomes.next() => match next {
                    Some(outcome) => report.push(outcome),
                    None => break,
                },
            }
        }

        info!(
            matched = report.matched,
            no_match = report.no_match,
            skipped = report.skipped,
            errors = report.errors,
            cancelled = report.cancelled,
            "Reconciliation batch finished"
        );

        Ok(report)
    }
}
