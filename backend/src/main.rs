//! Stock Ledger - background worker
//!
//! Connects to the datastore and periodically takes stock of every account
//! holding stock lines. Each account's reconciliation runs as its own job
//! with per-account mutual exclusion; completed stock takes email their
//! reports to administrators and the account owner.

use sqlx::postgres::PgPoolOptions;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use stock_ledger_backend::error::AppError;
use stock_ledger_backend::jobs::StockTakeJobs;
use stock_ledger_backend::services::StockLineService;
use stock_ledger_backend::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "stock_worker=debug,stock_ledger_backend=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::load()?;

    tracing::info!("Starting Stock Ledger worker");
    tracing::info!("Environment: {}", config.environment);

    // Create database connection pool
    tracing::info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .acquire_timeout(Duration::from_secs(30))
        .connect(&config.database.url)
        .await?;

    tracing::info!("Database connection established");

    // Run migrations in development
    if config.environment == "development" {
        tracing::info!("Running database migrations...");
        sqlx::migrate!("./migrations").run(&db_pool).await?;
        tracing::info!("Migrations completed");
    }

    let stock_lines = StockLineService::new(db_pool.clone());
    let jobs = StockTakeJobs::new(db_pool, &config);

    tokio::select! {
        _ = run_scheduler(&jobs, &stock_lines, config.stock_take.interval_secs) => {}
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutting down");
        }
    }

    Ok(())
}

/// Sweep all accounts on a fixed interval, submitting one stock-take job per
/// account holding stock.
async fn run_scheduler(jobs: &StockTakeJobs, stock_lines: &StockLineService, interval_secs: u64) {
    let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs.max(1)));
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    // the first tick completes immediately; don't take stock at boot
    ticker.tick().await;

    loop {
        ticker.tick().await;
        sweep(jobs, stock_lines).await;
    }
}

async fn sweep(jobs: &StockTakeJobs, stock_lines: &StockLineService) {
    let owners = match stock_lines.owners_with_stock().await {
        Ok(owners) => owners,
        Err(e) => {
            tracing::error!(error = %e, "could not enumerate accounts for the stock take sweep");
            return;
        }
    };

    tracing::info!(accounts = owners.len(), "starting stock take sweep");
    for owner_id in owners {
        match jobs.submit(owner_id).await {
            Ok(_handle) => tracing::debug!(%owner_id, "stock take submitted"),
            Err(AppError::AccountLocked(_)) => {
                tracing::debug!(%owner_id, "stock take already in flight")
            }
            Err(e) => tracing::warn!(%owner_id, error = %e, "could not submit stock take"),
        }
    }
}
