//! Standalone import worker
//!
//! Runs only the worker pool, for deployments that scale import capacity
//! separately from the HTTP server. Both processes share the queue and the
//! advisory table locks, so any number of them may run side by side.

use anyhow::Result;
use reel_common::logging::{init_logging, LogConfig};
use std::time::Duration;
use tracing::{info, warn};

use reel_server::{
    config::Config,
    db::{self, DbConfig},
    ingest::WorkerPool,
};

#[tokio::main]
async fn main() -> Result<()> {
    let log_config = LogConfig::builder()
        .log_file_prefix("reel-worker")
        .filter_directives("reel_server=debug,sqlx=warn")
        .build()
        .merge_env()?;

    let _log_guard = init_logging(&log_config)?;

    let config = Config::load()?;

    let db_pool = db::create_pool(&DbConfig::from(&config.database)).await?;
    db::run_migrations(&db_pool).await?;
    let queue_pool = db::create_queue_pool(&config, &db_pool).await?;

    let pool = WorkerPool::from_config(db_pool, queue_pool, &config);
    let shutdown = pool.shutdown_token();
    let handles = pool.start();

    info!(concurrency = config.queue.concurrency, "Reel worker running, press Ctrl+C to stop");

    tokio::signal::ctrl_c().await?;
    info!("Received Ctrl+C, finishing in-flight imports");
    shutdown.cancel();

    let timeout = Duration::from_secs(config.server.shutdown_timeout_secs);
    if tokio::time::timeout(timeout, futures::future::join_all(handles)).await.is_err() {
        warn!("Import workers did not stop in time");
    }

    info!("Reel worker stopped");
    Ok(())
}
