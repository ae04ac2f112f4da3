//! Get task query

use mediator::Request;
use serde::{Deserialize, Serialize};

use crate::ingest::{JobRecord, StatusStore, StatusStoreError};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetTaskQuery {
    pub job_id: String,
}

/// `{"task": {...}}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetTaskResponse {
    pub task: JobRecord,
}

impl Request<Result<GetTaskResponse, StatusStoreError>> for GetTaskQuery {}

pub async fn handle(store: &dyn StatusStore, query: GetTaskQuery) -> Result<GetTaskResponse, StatusStoreError> {
    let task = store.get(&query.job_id).await?;
    Ok(GetTaskResponse { task })
}
