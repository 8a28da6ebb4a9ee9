//! Background worker: periodic imported-by sweeps plus the
//! excluded-prefix poller.

mod config;

use clap::Parser;
use config::Config;
use modfind_search::ExcludedPrefixes;
use modfind_store::{Db, Store};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::parse();
    if let Err(err) = run(config).await {
        error!(error = %err, "worker exited with error");
        std::process::exit(1);
    }
}

async fn run(config: Config) -> modfind_store::Result<()> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await?;
    let db = Db::new(pool);
    if config.migrate {
        db.migrate().await?;
        info!("schema migrations applied");
    }
    let store = Arc::new(Store::new(db));

    let excluded = Arc::new(ExcludedPrefixes::new());
    let poller = Arc::clone(&excluded).spawn_poller(
        Arc::clone(&store),
        Duration::from_secs(config.excluded_refresh_secs),
    );

    info!(
        interval_secs = config.imported_by_interval_secs,
        "starting imported-by sweep loop"
    );
    let mut ticker = tokio::time::interval(Duration::from_secs(config.imported_by_interval_secs));
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let started = Instant::now();
                match store.update_search_documents_imported_by_count().await {
                    Ok(updated) => info!(
                        updated,
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "imported-by sweep finished"
                    ),
                    Err(err) => warn!(error = %err, "imported-by sweep failed"),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("shutdown signal received");
                break;
            }
        }
    }
    poller.abort();
    Ok(())
}
