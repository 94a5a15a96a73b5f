//! # Reconciliation Batch Driver
//!
//! Runs one reconciliation batch against a Cascade database and prints
//! the report. Meant for cron or manual runs.
//!
//! ## Usage
//! ```bash
//! # Run one batch against the default database
//! cargo run -p cascade-recon --bin reconcile
//!
//! # Specify database and config paths
//! cargo run -p cascade-recon --bin reconcile -- --db ./cascade.db --config ./recon.toml
//! ```

use std::env;
use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use cascade_db::{Database, DbConfig};
use cascade_recon::{NoOpNotificationSink, ReconConfig, ReconciliationOrchestrator};

/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=cascade=trace` - Show trace for cascade crates only
/// - Default: INFO level
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,cascade=debug,sqlx=warn"));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse command line arguments
    let args: Vec<String> = env::args().collect();

    let mut db_path = String::from("./cascade_dev.db");
    let mut config_path: Option<String> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--config" | "-c" => {
                if i + 1 < args.len() {
                    config_path = Some(args[i + 1].clone());
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Cascade Reconciliation Batch Driver");
                println!();
                println!("Usage: reconcile [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>      Database file path (default: ./cascade_dev.db)");
                println!("  -c, --config <PATH>  TOML config file (default: built-in defaults)");
                println!("  -h, --help           Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    init_tracing();

    let config = match config_path {
        Some(path) => ReconConfig::from_toml_file(&path)?,
        None => ReconConfig::default(),
    };

    let db = Database::new(DbConfig::new(&db_path)).await?;
    let orchestrator =
        ReconciliationOrchestrator::new(db.clone(), config, Arc::new(NoOpNotificationSink));

    let report = orchestrator.run_batch().await?;

    println!("Reconciliation batch complete");
    println!("=============================");
    println!("  processed: {}", report.processed());
    println!("  matched:   {}", report.matched);
    println!("  no match:  {}", report.no_match);
    println!("  skipped:   {}", report.skipped);
    println!("  errors:    {}", report.errors);

    db.close().await;
    Ok(())
}
