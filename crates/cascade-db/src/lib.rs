//! # cascade-db: Database Layer for the Cascade Loyalty Engine
//!
//! This crate provides database access for the Cascade reconciliation and
//! commission engine. It uses SQLite for local storage with sqlx for
//! async operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Cascade Engine Data Flow                           │
//! │                                                                         │
//! │  Reconciliation orchestrator / sale service (cascade-recon)            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    cascade-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │(unverified.rs)│    │  (embedded)  │  │   │
//! │  │   │               │    │               │    │              │  │   │
//! │  │   │ SqlitePool    │    │ UnverifiedRepo│    │ 001_initial  │  │   │
//! │  │   │ Connection    │◄───│ ReferenceRepo │    │  _schema.sql │  │   │
//! │  │   │ Management    │    │ SettingsRepo  │    │              │  │   │
//! │  │   │               │    │ LedgerRepo    │    │              │  │   │
//! │  │   │               │    │ SaleRepo      │    │              │  │   │
//! │  │   │               │    │ AuditRepo     │    │              │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database (WAL)                       │   │
//! │  │   unverified_records, purchase_entries, online_orders,          │   │
//! │  │   commission_settings, points_ledger, cashback_ledger,          │   │
//! │  │   sales, audit_log                                              │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations (unverified, reference,
//!   settings, ledger, sale, audit)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use cascade_db::{Database, DbConfig};
//!
//! let config = DbConfig::new("path/to/cascade.db");
//! let db = Database::new(config).await?;
//!
//! let pending = db.unverified_records().list_pending(100).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::audit::{AuditEntry, AuditRepository};
pub use repository::ledger::LedgerRepository;
pub use repository::reference::{CandidateQuery, ReferenceRepository};
pub use repository::sale::SaleRepository;
pub use repository::settings::{NewCommissionSettings, SettingsRepository};
pub use repository::unverified::{
    FinalizeOutcome, MatchFinalization, UnverifiedRecordRepository,
};
