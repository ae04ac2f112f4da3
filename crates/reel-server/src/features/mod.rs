//! Feature modules implementing the Reel API
//!
//! Each feature is a vertical slice with its own commands, queries and
//! routes. Commands and queries are plain data types marked with the
//! `mediator` `Request` trait and served by standalone `handle` functions.
//!
//! # Features
//!
//! - **imports**: `POST /convert`, queue a CSV file for import
//! - **tasks**: `GET /tasks`, `GET /tasks/:job_id`, job status
//! - **movies**: `GET /movies`, the paginated movie catalogue

pub mod imports;
pub mod movies;
pub mod shared;
pub mod tasks;

use axum::Router;
use std::sync::Arc;

use crate::ingest::StatusStore;
use imports::SubmissionGateway;

/// Shared state for all feature routes
#[derive(Clone)]
pub struct FeatureState {
    /// Pool for the read-only catalogue queries
    pub db: sqlx::PgPool,
    /// Job record store shared by submission and the task queries
    pub store: Arc<dyn StatusStore>,
    /// Queue, status store and chunk storage used by `/convert`
    pub gateway: SubmissionGateway,
}

/// Creates the feature router; every route is mounted at the root
pub fn router(state: FeatureState) -> Router<()> {
    Router::new()
        .merge(imports::imports_routes().with_state(state.gateway))
        .merge(tasks::tasks_routes().with_state(state.store))
        .merge(movies::movies_routes().with_state(state.db))
}
