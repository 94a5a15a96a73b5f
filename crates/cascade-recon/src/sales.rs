//! # Sale Service
//!
//! Records direct sales with tiered commission and a frozen settings
//! snapshot.
//!
//! ## Snapshot Freezing
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  create_sale(input)                                                     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SettingsVersionStore::current()     (fallback default when empty)     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  commission::calculate(amount, liters, tier, settings)                 │
//! │       │         (tiered, capped, half-up at the boundary)              │
//! │       ▼                                                                 │
//! │  Sale row freezes: commission, effective rate, tier used,              │
//! │  settings_snapshot_id, cashback                                        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  sale row + cashback ledger entry ──► ONE transaction                  │
//! │  audit + notification ──► fire-and-forget                              │
//! │                                                                         │
//! │  A later settings change NEVER alters what a stored sale reports.      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::error::ReconResult;
use crate::settings::SettingsVersionStore;
use crate::sinks::{NotificationSink, RewardEvent};
use cascade_core::{commission, validation, Money, Sale, Tier};
use cascade_db::Database;

/// Input for recording a sale.
#[derive(Debug, Clone)]
pub struct NewSale {
    pub user_id: String,
    pub store_id: String,
    pub amount_cents: i64,
    pub liters: f64,
    /// The buyer's loyalty tier, if known. Unknown tiers get the base
    /// multiplier, never an error.
    pub tier: Option<Tier>,
}

/// Records sales and their commission snapshots.
#[derive(Clone)]
pub struct SaleService {
    db: Database,
    settings: SettingsVersionStore,
    notifications: Arc<dyn NotificationSink>,
}

impl SaleService {
    pub fn new(
        db: Database,
        settings: SettingsVersionStore,
        notifications: Arc<dyn NotificationSink>,
    ) -> Self {
        SaleService {
            db,
            settings,
            notifications,
        }
    }

    /// Validates, computes and persists a sale.
    pub async fn create_sale(&self, input: NewSale) -> ReconResult<Sale> {
        validation::validate_entity_id("user_id", &input.user_id)?;
        validation::validate_entity_id("store_id", &input.store_id)?;
        validation::validate_amount_cents(input.amount_cents)?;
        validation::validate_liters(input.liters)?;

        let settings = self.settings.current().await?;

        let breakdown = commission::calculate(
            Money::from_cents(input.amount_cents),
            input.liters,
            input.tier,
            &settings,
        )
        .map_err(|e| {
            // Misconfiguration must be loud, not a silent zero commission.
            error!(settings = %settings.id, error = %e, "Commission computation rejected settings");
            e
        })?;

        let now = Utc::now();
        let sale = Sale {
            id: Uuid::new_v4().to_string(),
            user_id: input.user_id,
            store_id: input.store_id,
            amount_cents: input.amount_cents,
            liters: input.liters,
            tier: input.tier,
            commission_cents: breakdown.commission_cents,
            commission_rate_bps: breakdown.commission_rate_bps,
            tier_used: input.tier,
            settings_snapshot_id: settings.id.clone(),
            cashback_earned_cents: breakdown.cashback_cents,
            created_at: now,
        };

        // Sale row and its cashback ledger entry commit together.
        self.db.sales().create(&sale).await?;

        info!(
            sale = %sale.id,
            user = %sale.user_id,
            amount_cents = sale.amount_cents,
            commission_cents = sale.commission_cents,
            rate_bps = sale.commission_rate_bps,
            settings = %sale.settings_snapshot_id,
            "Sale recorded"
        );

        self.emit_audit(&sale).await;
        self.notifications.notify(RewardEvent::SaleRecorded {
            user_id: sale.user_id.clone(),
            sale_id: sale.id.clone(),
            commission_cents: sale.commission_cents,
            cashback_cents: sale.cashback_earned_cents,
        });

        Ok(sale)
    }

    /// Audit is advisory: log and swallow failures.
    async fn emit_audit(&self, sale: &Sale) {
        let metadata = serde_json::json!({
            "amount_cents": sale.amount_cents,
            "liters": sale.liters,
            "tier": sale.tier_used.map(|t| t.as_str()),
            "commission_cents": sale.commission_cents,
            "commission_rate_bps": sale.commission_rate_bps,
            "settings_snapshot_id": sale.settings_snapshot_id,
        });

        if let Err(e) = self
            .db
            .audit()
            .record("sale_recorded", "sale", &sale.id, &metadata, sale.created_at)
            .await
        {
            warn!(sale = %sale.id, error = %e, "Audit write failed (ignored)");
        }
    }
}
