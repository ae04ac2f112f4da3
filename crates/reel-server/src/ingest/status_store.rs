//! Durable job status store
//!
//! Every write is an upsert keyed by `job_id`. The database decides whether
//! the incoming status may replace the stored one, so concurrent or replayed
//! writers can never move a job backwards or out of a terminal state.

use async_trait::async_trait;
use reel_common::JobStatus;
use sqlx::PgPool;
use thiserror::Error;

use super::models::{JobRecord, StatusUpdate, TaskRow};

#[derive(Error, Debug)]
pub enum StatusStoreError {
    #[error("Task {0} not found")]
    NotFound(String),

    #[error("Status store query failed: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Corrupt task row: {0}")]
    InvalidRow(#[from] reel_common::ReelError),
}

pub type Result<T> = std::result::Result<T, StatusStoreError>;

#[async_trait]
pub trait StatusStore: Send + Sync {
    /// Insert or merge a status update.
    ///
    /// Returns `false` when the stored status does not allow the transition
    /// and the update was discarded.
    async fn upsert(&self, update: &StatusUpdate) -> Result<bool>;

    async fn get(&self, job_id: &str) -> Result<JobRecord>;

    /// All records, newest first
    async fn list(&self) -> Result<Vec<JobRecord>>;
}

const SELECT_TASK_COLUMNS: &str = r#"
    SELECT job_id, name, table_name, status, result,
           created_at, updated_at, completed_at,
           EXTRACT(EPOCH FROM processing_time)::float8 AS processing_time,
           rows_inserted, rows_failed
    FROM tasks
"#;

/// PostgreSQL-backed status store over the `tasks` table
#[derive(Clone)]
pub struct PgStatusStore {
    pool: PgPool,
}

impl PgStatusStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl StatusStore for PgStatusStore {
    async fn upsert(&self, update: &StatusUpdate) -> Result<bool> {
        // The WHERE clause mirrors JobStatus::can_transition_to.
        let result = sqlx::query(
            r#"
            INSERT INTO tasks (
                job_id, name, table_name, status, result,
                processing_time, rows_inserted, rows_failed, completed_at
            )
            VALUES (
                $1, $2, $3, $4::text, $5,
                $6::float8 * INTERVAL '1 second',
                COALESCE($7::bigint, 0), COALESCE($8::bigint, 0),
                CASE WHEN $4::text = 'completed' THEN NOW() END
            )
            ON CONFLICT (job_id) DO UPDATE SET
                name = COALESCE($2, tasks.name),
                table_name = COALESCE($3, tasks.table_name),
                status = $4::text,
                result = COALESCE($5, tasks.result),
                processing_time = COALESCE($6::float8 * INTERVAL '1 second', tasks.processing_time),
                rows_inserted = COALESCE($7::bigint, tasks.rows_inserted),
                rows_failed = COALESCE($8::bigint, tasks.rows_failed),
                completed_at = CASE WHEN $4::text = 'completed' THEN NOW() ELSE tasks.completed_at END,
                updated_at = NOW()
            WHERE tasks.status NOT IN ('completed', 'failed')
              AND (CASE tasks.status WHEN 'queued' THEN 0 WHEN 'started' THEN 1 ELSE 2 END) <= $9
            "#,
        )
        .bind(&update.job_id)
        .bind(&update.name)
        .bind(&update.table_name)
        .bind(update.status.as_str())
        .bind(&update.result)
        .bind(update.processing_time)
        .bind(update.rows_inserted)
        .bind(update.rows_failed)
        .bind(i32::from(update.status.rank()))
        .execute(&self.pool)
        .await?;

        let applied = result.rows_affected() > 0;
        if !applied {
            tracing::debug!(
                job_id = %update.job_id,
                status = %update.status,
                "Status update discarded: transition not allowed"
            );
        }
        Ok(applied)
    }

    async fn get(&self, job_id: &str) -> Result<JobRecord> {
        let sql = format!("{SELECT_TASK_COLUMNS} WHERE job_id = $1");
        let row: Option<TaskRow> = sqlx::query_as(&sql)
            .bind(job_id)
            .fetch_optional(&self.pool)
            .await?;

        let row = row.ok_or_else(|| StatusStoreError::NotFound(job_id.to_string()))?;
        Ok(JobRecord::try_from(row)?)
    }

    async fn list(&self) -> Result<Vec<JobRecord>> {
        let sql = format!("{SELECT_TASK_COLUMNS} ORDER BY created_at DESC");
        let rows: Vec<TaskRow> = sqlx::query_as(&sql).fetch_all(&self.pool).await?;

        rows.into_iter()
            .map(|row| JobRecord::try_from(row).map_err(StatusStoreError::from))
            .collect()
    }
}

/// Merge an update into an in-memory record with the same rules the SQL applies
pub(crate) fn merge_update(existing: &mut JobRecord, update: &StatusUpdate) -> bool {
    if !existing.status.can_transition_to(update.status) {
        return false;
    }

    let now = chrono::Utc::now();
    existing.status = update.status;
    if let Some(ref name) = update.name {
        existing.name = Some(name.clone());
    }
    if let Some(ref table_name) = update.table_name {
        existing.table_name = Some(table_name.clone());
    }
    if let Some(ref result) = update.result {
        existing.result = Some(result.clone());
    }
    if let Some(processing_time) = update.processing_time {
        existing.processing_time = Some(processing_time);
    }
    if let Some(rows) = update.rows_inserted {
        existing.rows_inserted = rows;
    }
    if let Some(rows) = update.rows_failed {
        existing.rows_failed = rows;
    }
    if update.status == JobStatus::Completed {
        existing.completed_at = Some(now);
    }
    existing.updated_at = now;
    true
}

/// Build the record an insert of `update` would create
pub(crate) fn record_from_update(update: &StatusUpdate) -> JobRecord {
    let now = chrono::Utc::now();
    JobRecord {
        job_id: update.job_id.clone(),
        name: update.name.clone(),
        table_name: update.table_name.clone(),
        status: update.status,
        result: update.result.clone(),
        created_at: now,
        updated_at: now,
        completed_at: (update.status == JobStatus::Completed).then_some(now),
        processing_time: update.processing_time,
        rows_inserted: update.rows_inserted.unwrap_or(0),
        rows_failed: update.rows_failed.unwrap_or(0),
    }
}
