//! # Candidate Finder
//!
//! Per-source candidate lookup for an unverified record.
//!
//! ## Dispatch
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  find(source, record)                                                   │
//! │                                                                         │
//! │  purchase_entry ──► purchase_entries  (user + store + amount + time)   │
//! │  online_order   ──► online_orders     (user + amount + time, no store) │
//! │  external_scan  ──► finalized, unlinked scan uploads                   │
//! │                     │                                                   │
//! │                     └── consulted ONLY for external_invoice records:   │
//! │                         a scan cannot vouch for another scan.          │
//! │                                                                         │
//! │  Empty result = valid non-error outcome (no_match candidate pool).     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Duration;

use crate::config::MatchingConfig;
use crate::error::ReconResult;
use cascade_core::{RecordKind, ReferenceRecord, ReferenceSource, UnverifiedRecord};
use cascade_db::{CandidateQuery, ReferenceRepository};

/// Finds plausible reference records for unverified records.
#[derive(Debug, Clone)]
pub struct CandidateFinder {
    references: ReferenceRepository,
    amount_tolerance_cents: i64,
    window: Duration,
}

impl CandidateFinder {
    /// Creates a finder with the configured search envelope.
    pub fn new(references: ReferenceRepository, config: &MatchingConfig) -> Self {
        CandidateFinder {
            references,
            amount_tolerance_cents: config.amount_tolerance_cents,
            window: Duration::hours(config.window_hours),
        }
    }

    /// Candidates from one source for one record.
    pub async fn find(
        &self,
        source: ReferenceSource,
        record: &UnverifiedRecord,
    ) -> ReconResult<Vec<ReferenceRecord>> {
        let query = self.query_for(record);

        let candidates = match source {
            ReferenceSource::PurchaseEntry => {
                self.references.find_purchase_entry_candidates(&query).await?
            }
            ReferenceSource::OnlineOrder => {
                self.references.find_online_order_candidates(&query).await?
            }
            ReferenceSource::ExternalScan => {
                if record.kind != RecordKind::ExternalInvoice {
                    return Ok(Vec::new());
                }
                self.references
                    .find_finalized_scan_candidates(&query, &record.id)
                    .await?
            }
        };

        Ok(candidates)
    }

    fn query_for(&self, record: &UnverifiedRecord) -> CandidateQuery {
        CandidateQuery {
            user_id: record.user_id.clone(),
            store_id: record.store_id.clone(),
            amount_cents: record.amount_cents,
            occurred_at: record.occurred_at,
            amount_tolerance_cents: self.amount_tolerance_cents,
            window: self.window,
        }
    }
}
