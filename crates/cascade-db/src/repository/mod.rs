//! # Repository Modules
//!
//! One repository per aggregate, all backed by the shared pool:
//!
//! - [`unverified`]: ingested proof-of-purchase records and the
//!   claim/finalize lifecycle
//! - [`reference`]: candidate queries against the truth tables
//! - [`settings`]: versioned commission configuration
//! - [`ledger`]: append-only points and cashback ledgers
//! - [`sale`]: direct sales with frozen commission snapshots
//! - [`audit`]: append-only audit trail

pub mod audit;
pub mod ledger;
pub mod reference;
pub mod sale;
pub mod settings;
pub mod unverified;
