//! Reel Server - Main entry point

use anyhow::Result;
use reel_common::logging::{init_logging, LogConfig};
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::signal;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use reel_server::{
    api,
    config::Config,
    db::{self, DbConfig},
    features::{imports::SubmissionGateway, FeatureState},
    ingest::{PgJobQueue, PgStatusStore, WorkerPool},
    storage::ChunkStore,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging with configuration from environment
    let log_config = LogConfig::builder()
        .log_file_prefix("reel-server")
        .filter_directives("reel_server=debug,tower_http=debug,sqlx=warn")
        .build()
        .merge_env()?;

    let _log_guard = init_logging(&log_config)?;

    info!("Starting Reel Server");

    // Load configuration
    let config = Config::load()?;
    info!(
        "Configuration loaded - server will bind to {}:{}",
        config.server.host, config.server.port
    );

    let db_pool = db::create_pool(&DbConfig::from(&config.database)).await?;
    info!("Database connection pool established");

    db::run_migrations(&db_pool).await?;
    info!("Database migrations completed");

    let queue_pool = db::create_queue_pool(&config, &db_pool).await?;

    // Start import workers if enabled
    let workers = if config.queue.workers_enabled {
        let pool = WorkerPool::from_config(db_pool.clone(), queue_pool.clone(), &config);
        let token = pool.shutdown_token();
        Some((token, pool.start()))
    } else {
        info!("Import workers are disabled (WORKERS_ENABLED=false)");
        None
    };

    let store = Arc::new(PgStatusStore::new(db_pool.clone()));
    let gateway = SubmissionGateway::new(
        Arc::new(PgJobQueue::new(queue_pool, &config.queue)),
        store.clone(),
        ChunkStore::from_config(&config.storage),
    );
    let state = FeatureState {
        db: db_pool,
        store,
        gateway,
    };

    let app = api::create_router(state, &config);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Start server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some((token, handles)) = workers {
        stop_workers(token, handles, config.server.shutdown_timeout_secs).await;
    }

    info!("Server shut down gracefully");

    Ok(())
}

/// Cancel the worker loops and wait for in-flight jobs to finish
async fn stop_workers(token: CancellationToken, handles: Vec<JoinHandle<()>>, timeout_secs: u64) {
    token.cancel();
    info!("Waiting up to {} seconds for import workers to stop", timeout_secs);

    let joined = tokio::time::timeout(Duration::from_secs(timeout_secs), futures::future::join_all(handles)).await;
    if joined.is_err() {
        // Unacked jobs are redelivered once their queue lock expires.
        warn!("Import workers did not stop in time");
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            },
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        },
        _ = terminate => {
            info!("Received terminate signal, starting graceful shutdown");
        },
    }
}
