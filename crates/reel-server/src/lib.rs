//! Reel Server Library
//!
//! HTTP service that bulk-imports MovieLens-style CSV files into PostgreSQL.
//!
//! # Overview
//!
//! - **API Endpoints**: submit imports, poll job status, page through movies
//! - **Import Pipeline**: durable queue, worker pool and per-job state machine
//! - **Database Management**: PostgreSQL integration with SQLx
//! - **Configuration**: Environment-based configuration management
//! - **Middleware**: CORS and request logging
//!
//! # Architecture
//!
//! Features are vertical slices in the CQRS style:
//!
//! - **Commands** change state: `POST /convert` queues a file for import.
//! - **Queries** only read: `GET /tasks`, `GET /tasks/:job_id`, `GET /movies`.
//!
//! A submitted file travels through the pipeline in [`ingest`]:
//!
//! 1. the gateway enqueues an [`ingest::ImportJob`] and records it as `queued`
//! 2. a worker claims the job and hands it to the [`ingest::JobOrchestrator`]
//! 3. the orchestrator stages the CSV with `COPY`, swaps it into place
//!    atomically and refreshes the `mv_movie_ratings` view
//!
//! # Example
//!
//! ```no_run
//! use reel_server::{config::Config, db};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load()?;
//!     let pool = db::create_pool(&db::DbConfig::from(&config.database)).await?;
//!     db::run_migrations(&pool).await?;
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod features;
pub mod ingest;
pub mod middleware;
pub mod storage;

// Re-export commonly used types
pub use error::{ApiResult, AppError};
