//! Data models for import tracking
//!
//! One [`JobRecord`] per job lives in the `tasks` table. Writers never build
//! rows directly; they send a [`StatusUpdate`] and the status store merges it.

use chrono::{DateTime, Utc};
use reel_common::JobStatus;
use serde::{Deserialize, Serialize};

use super::jobs::ImportStats;

/// Job record as stored and served by `/tasks`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    pub job_id: String,
    pub name: Option<String>,
    pub table_name: Option<String>,
    pub status: JobStatus,
    pub result: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Seconds from pickup to the terminal write
    pub processing_time: Option<f64>,
    pub rows_inserted: i64,
    pub rows_failed: i64,
}

/// Raw `tasks` row; `status` is validated when converted into a [`JobRecord`]
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct TaskRow {
    pub job_id: String,
    pub name: Option<String>,
    pub table_name: Option<String>,
    pub status: String,
    pub result: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub processing_time: Option<f64>,
    pub rows_inserted: i64,
    pub rows_failed: i64,
}

impl TryFrom<TaskRow> for JobRecord {
    type Error = reel_common::ReelError;

    fn try_from(row: TaskRow) -> Result<Self, Self::Error> {
        Ok(Self {
            status: row.status.parse()?,
            job_id: row.job_id,
            name: row.name,
            table_name: row.table_name,
            result: row.result,
            created_at: row.created_at,
            updated_at: row.updated_at,
            completed_at: row.completed_at,
            processing_time: row.processing_time,
            rows_inserted: row.rows_inserted,
            rows_failed: row.rows_failed,
        })
    }
}

/// Partial update of a job record
///
/// Only `Some` fields overwrite what is stored.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusUpdate {
    pub job_id: String,
    pub status: JobStatus,
    pub name: Option<String>,
    pub table_name: Option<String>,
    pub result: Option<String>,
    pub processing_time: Option<f64>,
    pub rows_inserted: Option<i64>,
    pub rows_failed: Option<i64>,
}

impl StatusUpdate {
    pub fn new(job_id: impl Into<String>, status: JobStatus) -> Self {
        Self {
            job_id: job_id.into(),
            status,
            name: None,
            table_name: None,
            result: None,
            processing_time: None,
            rows_inserted: None,
            rows_failed: None,
        }
    }

    /// Initial record written by the submission gateway
    pub fn queued(job_id: impl Into<String>, name: &str, table_name: &str) -> Self {
        Self::new(job_id, JobStatus::Queued)
            .with_name(name)
            .with_table_name(table_name)
    }

    /// Terminal success with the import's statistics
    pub fn completed(job_id: impl Into<String>, stats: &ImportStats) -> Self {
        Self::new(job_id, JobStatus::Completed)
            .with_stats(stats)
            .with_result("Import completed successfully")
    }

    /// Terminal failure carrying the error text and whatever was counted
    pub fn failed(job_id: impl Into<String>, error: impl Into<String>, stats: &ImportStats) -> Self {
        Self::new(job_id, JobStatus::Failed)
            .with_stats(stats)
            .with_result(error)
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_table_name(mut self, table_name: impl Into<String>) -> Self {
        self.table_name = Some(table_name.into());
        self
    }

    pub fn with_result(mut self, result: impl Into<String>) -> Self {
        self.result = Some(result.into());
        self
    }

    pub fn with_stats(mut self, stats: &ImportStats) -> Self {
        self.processing_time = Some(stats.duration_secs);
        self.rows_inserted = Some(stats.rows_inserted);
        self.rows_failed = Some(stats.rows_failed);
        self
    }
}
