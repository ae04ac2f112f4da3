//! Task routes
//!
//! - `GET /tasks` - every job record, newest first
//! - `GET /tasks/:job_id` - one job record

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use std::sync::Arc;

use super::queries::{get_task, list_tasks, GetTaskQuery, GetTaskResponse, ListTasksQuery, ListTasksResponse};
use crate::error::ApiResult;
use crate::ingest::StatusStore;

pub fn tasks_routes() -> Router<Arc<dyn StatusStore>> {
    Router::new()
        .route("/tasks", get(list_tasks_handler))
        .route("/tasks/:job_id", get(get_task_handler))
}

async fn list_tasks_handler(State(store): State<Arc<dyn StatusStore>>) -> ApiResult<Json<ListTasksResponse>> {
    let response = list_tasks::handle(store.as_ref(), ListTasksQuery::default()).await?;
    Ok(Json(response))
}

#[tracing::instrument(skip(store))]
async fn get_task_handler(
    State(store): State<Arc<dyn StatusStore>>,
    Path(job_id): Path<String>,
) -> ApiResult<Json<GetTaskResponse>> {
    let response = get_task::handle(store.as_ref(), GetTaskQuery { job_id }).await?;
    Ok(Json(response))
}
