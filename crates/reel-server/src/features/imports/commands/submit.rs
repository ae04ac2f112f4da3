//! Submit import command
//!
//! Validates the request, checks the source file is present in chunk
//! storage, enqueues one job and records it as `queued`.

use mediator::Request;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::ingest::{ImportJob, JobQueue, QueueError, StatusStore, StatusStoreError, StatusUpdate};
use crate::storage::{ChunkStore, StorageError};

/// Command to import one CSV file into a target table
///
/// Both fields default to empty so a body that omits them is reported as a
/// validation error rather than a deserialization failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubmitImportCommand {
    /// Bare file name under the chunk storage root
    #[serde(default)]
    pub name: String,

    /// Target table (`ratings`, `tags`, `movies`, `links`, `genome_scores`, `genome_tags`)
    #[serde(default)]
    pub table: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitImportResponse {
    pub job_id: String,
}

#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    FileNotFound(String),

    #[error("{0}")]
    Enqueue(#[from] QueueError),

    #[error("{0}")]
    Storage(#[from] StatusStoreError),
}

impl Request<Result<SubmitImportResponse, SubmitError>> for SubmitImportCommand {}

impl SubmitImportCommand {
    /// Require both fields after trimming
    pub fn validate(&self) -> Result<(), SubmitError> {
        if self.name.trim().is_empty() || self.table.trim().is_empty() {
            return Err(SubmitError::Validation(
                "Both \"name\" and \"table\" fields are required".to_string(),
            ));
        }
        Ok(())
    }
}

/// Everything the submission handler touches
///
/// The table name is not checked against the supported set here; an
/// unsupported table fails the job when it is staged.
#[derive(Clone)]
pub struct SubmissionGateway {
    pub queue: Arc<dyn JobQueue>,
    pub store: Arc<dyn StatusStore>,
    pub chunks: ChunkStore,
}

impl SubmissionGateway {
    pub fn new(queue: Arc<dyn JobQueue>, store: Arc<dyn StatusStore>, chunks: ChunkStore) -> Self {
        Self { queue, store, chunks }
    }
}

#[tracing::instrument(skip(gateway, command), fields(name = %command.name, table = %command.table))]
pub async fn handle(
    gateway: &SubmissionGateway,
    command: SubmitImportCommand,
) -> Result<SubmitImportResponse, SubmitError> {
    command.validate()?;

    let name = command.name.trim();
    let table = command.table.trim();

    let path = gateway.chunks.resolve(name).map_err(|e| SubmitError::Validation(e.to_string()))?;

    let exists = match gateway.chunks.exists(&path).await {
        Ok(exists) => exists,
        Err(StorageError::Io(e)) => {
            tracing::warn!(path = %path.display(), error = %e, "Could not stat source file");
            false
        },
        Err(e) => return Err(SubmitError::Validation(e.to_string())),
    };
    if !exists {
        return Err(SubmitError::FileNotFound(format!("File {} does not exist.", name)));
    }

    let job_id = gateway.queue.enqueue(&ImportJob::new(name, table, path)).await?;

    // A worker may already have written `started`; the store keeps that.
    if let Err(e) = gateway.store.upsert(&StatusUpdate::queued(job_id.as_str(), name, table)).await {
        // Take the job back so a failed submission never imports the file.
        match gateway.queue.cancel(&job_id).await {
            Ok(true) => {
                tracing::warn!(job_id = %job_id, error = %e, "Withdrew job that could not be recorded");
                return Err(e.into());
            },
            Ok(false) => {
                // Already claimed: the worker's own status writes create the record.
                tracing::warn!(job_id = %job_id, error = %e, "Job claimed before it was recorded");
            },
            Err(cancel_err) => {
                tracing::error!(job_id = %job_id, error = %cancel_err, "Failed to withdraw unrecorded job");
                return Err(e.into());
            },
        }
    }

    tracing::info!(job_id = %job_id, "Import job queued");

    Ok(SubmitImportResponse { job_id })
}
