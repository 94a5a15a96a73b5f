//! # cascade-recon: Reconciliation & Commission Engine
//!
//! This crate orchestrates the two reward paths of the Cascade loyalty
//! system: matching unverified proof-of-purchase records against trusted
//! reference sources, and recording direct sales with tiered commission.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Cascade Engine Layer                                │
//! │                                                                         │
//! │  Batch driver (cron / CLI)           Back office                       │
//! │       │                                   │                             │
//! │       ▼                                   ▼                             │
//! │  ┌─────────────────────────┐   ┌─────────────────────────┐             │
//! │  │ ReconciliationOrchestr. │   │ SaleService             │             │
//! │  │                         │   │                         │             │
//! │  │ list pending → claim →  │   │ validate → settings →   │             │
//! │  │ candidates → score →    │   │ commission → freeze     │             │
//! │  │ finalize / release      │   │ snapshot → ledger       │             │
//! │  └───────────┬─────────────┘   └───────────┬─────────────┘             │
//! │              │                             │                           │
//! │              ▼                             ▼                           │
//! │  ┌─────────────────────────────────────────────────────────┐           │
//! │  │  CandidateFinder · LedgerSideEffects · SettingsStore    │           │
//! │  └───────────────────────────┬─────────────────────────────┘           │
//! │                              │                                         │
//! │              cascade-core (pure logic) + cascade-db (SQLite)           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`orchestrator`] - Per-record reconciliation and the batch runner
//! - [`candidates`] - Per-source candidate lookup
//! - [`ledger`] - Reward side effects for finalized matches
//! - [`sales`] - Direct sale recording with frozen commission snapshots
//! - [`settings`] - Versioned settings store with default fallback
//! - [`config`] - TOML engine configuration
//! - [`sinks`] - Notification sinks (fire-and-forget)
//! - [`error`] - Engine error taxonomy
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use cascade_db::{Database, DbConfig};
//! use cascade_recon::{NoOpNotificationSink, ReconConfig, ReconciliationOrchestrator};
//!
//! let db = Database::new(DbConfig::new("cascade.db")).await?;
//! let orchestrator = ReconciliationOrchestrator::new(
//!     db,
//!     ReconConfig::default(),
//!     Arc::new(NoOpNotificationSink),
//! );
//! let report = orchestrator.run_batch().await?;
//! println!("matched {} of {}", report.matched, report.processed());
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod candidates;
pub mod config;
pub mod error;
pub mod ledger;
pub mod orchestrator;
pub mod sales;
pub mod settings;
pub mod sinks;

// =============================================================================
// Re-exports
// =============================================================================

pub use candidates::CandidateFinder;
pub use config::{BatchConfig, MatchingConfig, ReconConfig, RewardConfig};
pub use error::{ReconError, ReconResult};
pub use ledger::{AwardSummary, LedgerSideEffects};
pub use orchestrator::{BatchReport, ReconciliationOrchestrator, RecordOutcome};
pub use sales::{NewSale, SaleService};
pub use settings::SettingsVersionStore;
pub use sinks::{NoOpNotificationSink, NotificationSink, RecordingNotificationSink, RewardEvent};
