//! Folio Auditor
//!
//! Checks the stored publishing model for referential violations:
//! 1. Loads every row into an in-memory catalog
//! 2. Runs every cross-entity rule over it
//! 3. Logs each finding and updates the audit metrics
//!
//! With `audit.interval_secs = 0` it runs once and exits, otherwise it
//! repeats until interrupted.
//!
//! Usage: `auditor [CONFIG_FILE]`. Without a file the layered `config/`
//! directory and `APP__*` variables are used.

mod runner;

use crate::runner::AuditRunner;
use folio_common::{
    config::AppConfig,
    db::{schema, DbPool},
    metrics, Repository, VERSION,
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let loaded = match std::env::args().nth(1) {
        Some(path) => AppConfig::from_file(&path),
        None => AppConfig::load(),
    };
    let config = loaded.map_err(|e| {
        eprintln!("Failed to load configuration: {}", e);
        e
    })?;

    init_tracing(&config);

    info!(
        service = %config.observability.service_name,
        "Starting Folio Auditor v{}", VERSION
    );

    metrics::register_metrics();

    // Initialize database connection
    info!("Connecting to database...");
    let db = DbPool::new(&config.database).await?;
    db.ping().await?;

    if config.database.create_schema {
        schema::create_schema(db.write()).await?;
    }

    let repository = Repository::new(db).with_integrity(config.integrity.clone());
    let runner = AuditRunner::new(repository);

    let Some(interval) = config.audit_interval() else {
        // One-shot mode
        let report = runner.run_once().await?;
        if !report.is_clean() && config.audit.fail_on_findings {
            error!(findings = report.findings.len(), "Audit failed");
            std::process::exit(1);
        }
        return Ok(());
    };

    info!(interval_secs = interval.as_secs(), "Auditor ready, starting audit loop...");

    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown signal received");
                break;
            }
            _ = ticker.tick() => {
                if let Err(e) = runner.run_once().await {
                    error!(error = %e, code = e.code().as_str(), "Audit run failed");
                }
            }
        }
    }

    info!("Auditor shutting down");
    Ok(())
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.observability.log_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    if config.observability.json_logging {
        builder.json().init();
    } else {
        builder.init();
    }
}
