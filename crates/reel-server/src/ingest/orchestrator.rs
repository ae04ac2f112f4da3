//! Import job orchestrator
//!
//! Drives one job through `started → {completed | failed}`:
//!
//! 1. skip the job if its record is already terminal (redelivery)
//! 2. record `started`, then wait for the table's in-process lock
//! 3. open an import session (advisory lock), stage the file, swap it in
//! 4. delete the source file, whatever happened after pickup
//! 5. record the terminal state with timing and row counts, then release
//!    the in-process lock
//! 6. after a completed import, rebuild the aggregate view (best-effort)
//!
//! The terminal check is repeated after each lock is taken: a duplicate
//! delivery that waited behind the run which finished the job must not
//! import a second time.
//!
//! Nothing here returns an error: failures end up in the job record.

use reel_common::{JobStatus, TargetTable};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

use super::backend::{ImportBackend, ImportError};
use super::jobs::{ImportJob, ImportStats};
use super::locks::TableLocks;
use super::models::StatusUpdate;
use super::status_store::{StatusStore, StatusStoreError};
use crate::storage::ChunkStore;

/// Final result of running one job
#[derive(Debug, Clone, PartialEq)]
pub enum JobOutcome {
    Completed(ImportStats),
    Failed { error: String, stats: ImportStats },
    /// The record was already terminal; nothing was touched
    Skipped(JobStatus),
}

impl JobOutcome {
    pub fn status(&self) -> JobStatus {
        match self {
            JobOutcome::Completed(_) => JobStatus::Completed,
            JobOutcome::Failed { .. } => JobStatus::Failed,
            JobOutcome::Skipped(status) => *status,
        }
    }
}

/// An import step failed after `rows` rows had been counted
struct StepFailure {
    error: ImportError,
    rows: i64,
}

impl StepFailure {
    fn new(error: impl Into<ImportError>, rows: i64) -> Self {
        Self {
            error: error.into(),
            rows,
        }
    }
}

/// How far one delivery got once it owned the table
enum Attempt {
    Imported(i64),
    /// Another delivery of the same job finished while this one waited
    Superseded(JobStatus),
    Failed(StepFailure),
}

#[derive(Clone)]
pub struct JobOrchestrator {
    store: Arc<dyn StatusStore>,
    backend: Arc<dyn ImportBackend>,
    chunks: ChunkStore,
    locks: TableLocks,
}

impl JobOrchestrator {
    pub fn new(
        store: Arc<dyn StatusStore>,
        backend: Arc<dyn ImportBackend>,
        chunks: ChunkStore,
        locks: TableLocks,
    ) -> Self {
        Self {
            store,
            backend,
            chunks,
            locks,
        }
    }

    /// Run a delivered job to a terminal state
    #[tracing::instrument(skip(self, job), fields(table = %job.table, file = %job.name))]
    pub async fn run(&self, job_id: &str, job: &ImportJob) -> JobOutcome {
        if let Some(status) = self.terminal_status(job_id).await {
            info!(status = %status, "Job already finished, skipping redelivery");
            return JobOutcome::Skipped(status);
        }

        let started = Instant::now();
        self.record(
            StatusUpdate::new(job_id, JobStatus::Started)
                .with_name(job.name.as_str())
                .with_table_name(job.table.as_str()),
        )
        .await;

        let outcome = match job.table.parse::<TargetTable>() {
            Ok(table) => {
                // Held until the terminal state is recorded, so a duplicate
                // waiting here sees it on its re-check.
                let _guard = self.locks.acquire(table).await;
                match self.import(job_id, table, job).await {
                    Attempt::Superseded(status) => {
                        info!(status = %status, "Job finished by another delivery while waiting for the table");
                        return JobOutcome::Skipped(status);
                    },
                    attempt => self.conclude(job_id, job, attempt, started).await,
                }
            },
            Err(e) => {
                let attempt = Attempt::Failed(StepFailure::new(e, 0));
                self.conclude(job_id, job, attempt, started).await
            },
        };

        if matches!(outcome, JobOutcome::Completed(_)) {
            if let Err(e) = self.backend.refresh_derived_view().await {
                error!(error = %e, "View refresh failed; job stays completed");
            }
        }

        outcome
    }

    /// Remove the source file and record how the attempt ended
    async fn conclude(&self, job_id: &str, job: &ImportJob, attempt: Attempt, started: Instant) -> JobOutcome {
        self.discard_source(job).await;

        match attempt {
            Attempt::Imported(rows) => {
                let stats = ImportStats::new(rows).finish(started.elapsed());
                self.record(StatusUpdate::completed(job_id, &stats)).await;
                info!(
                    rows_inserted = stats.rows_inserted,
                    duration_secs = stats.duration_secs,
                    "Import completed"
                );
                JobOutcome::Completed(stats)
            },
            Attempt::Failed(failure) => {
                let stats = ImportStats::new(failure.rows).finish(started.elapsed());
                let message = failure.error.to_string();
                error!(error = %message, rows_inserted = stats.rows_inserted, "Import failed");
                self.record(StatusUpdate::failed(job_id, message.clone(), &stats)).await;

                JobOutcome::Failed {
                    error: message,
                    stats,
                }
            },
            Attempt::Superseded(status) => JobOutcome::Skipped(status),
        }
    }

    /// Give up on a job that will not be delivered again
    ///
    /// The record is set `failed` with `reason` and the source file removed,
    /// unless the record is already terminal; in that case the file was
    /// consumed by the run that finished it.
    pub async fn retire(&self, job_id: &str, job: &ImportJob, reason: &str) -> JobOutcome {
        if let Some(status) = self.terminal_status(job_id).await {
            return JobOutcome::Skipped(status);
        }

        let stats = ImportStats::default();
        self.record(StatusUpdate::failed(job_id, reason, &stats)).await;
        self.discard_source(job).await;

        JobOutcome::Failed {
            error: reason.to_string(),
            stats,
        }
    }

    /// Stage and swap the file; the caller holds the table's in-process lock
    async fn import(&self, job_id: &str, table: TargetTable, job: &ImportJob) -> Attempt {
        if let Some(status) = self.terminal_status(job_id).await {
            return Attempt::Superseded(status);
        }

        let mut session = match self.backend.open_session(table).await {
            Ok(session) => session,
            Err(e) => return Attempt::Failed(StepFailure::new(e, 0)),
        };
        // The session holds the cross-process lock; check again now that
        // no other process can be importing this table.
        if let Some(status) = self.terminal_status(job_id).await {
            return Attempt::Superseded(status);
        }

        let rows = match session.stage(&job.file_path).await {
            Ok(rows) => rows,
            Err(e) => return Attempt::Failed(StepFailure::new(e, session.rows_staged())),
        };

        match session.swap().await {
            Ok(()) => Attempt::Imported(rows),
            Err(e) => Attempt::Failed(StepFailure::new(e, rows)),
        }
    }

    async fn discard_source(&self, job: &ImportJob) {
        match self.chunks.remove(&job.file_path).await {
            Ok(true) => {},
            Ok(false) => warn!(path = %job.file_path.display(), "Source file was already gone"),
            Err(e) => warn!(path = %job.file_path.display(), error = %e, "Failed to delete source file"),
        }
    }

    async fn terminal_status(&self, job_id: &str) -> Option<JobStatus> {
        match self.store.get(job_id).await {
            Ok(record) if record.status.is_terminal() => Some(record.status),
            Ok(_) | Err(StatusStoreError::NotFound(_)) => None,
            Err(e) => {
                warn!(error = %e, "Could not read job record");
                None
            },
        }
    }

    async fn record(&self, update: StatusUpdate) {
        match self.store.upsert(&update).await {
            Ok(true) => {},
            Ok(false) => warn!(status = %update.status, "Status store refused transition"),
            Err(e) => error!(status = %update.status, error = %e, "Failed to record job status"),
        }
    }
}
