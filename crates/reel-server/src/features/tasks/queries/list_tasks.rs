//! List tasks query
//!
//! Returns every job record, newest first. The table is small (one row per
//! submitted file) so the list is not paginated.

use mediator::Request;
use serde::{Deserialize, Serialize};

use crate::api::response::ListResponse;
use crate::ingest::{JobRecord, StatusStore, StatusStoreError};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListTasksQuery {}

pub type ListTasksResponse = ListResponse<JobRecord>;

impl Request<Result<ListTasksResponse, StatusStoreError>> for ListTasksQuery {}

pub async fn handle(store: &dyn StatusStore, _query: ListTasksQuery) -> Result<ListTasksResponse, StatusStoreError> {
    let records = store.list().await?;
    Ok(records.into())
}
