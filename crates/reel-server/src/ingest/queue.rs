//! Durable import queue
//!
//! Jobs live in the `import_queue` table. Delivery is at-least-once: a worker
//! claims an entry with `FOR UPDATE SKIP LOCKED`, keeps its lock fresh with a
//! heartbeat, and acks it when the job reaches a terminal state. An entry
//! whose lock goes stale (worker crashed, host lost) is handed out again.

use async_trait::async_trait;
use serde_json::Value;
use sqlx::PgPool;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

use super::jobs::ImportJob;
use crate::config::QueueConfig;

#[derive(Error, Debug)]
pub enum QueueError {
    #[error("Queue unavailable: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Failed to encode job payload: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("Queue entry {id} has an unreadable payload: {source}")]
    Payload {
        id: String,
        #[source]
        source: serde_json::Error,
    },
}

pub type Result<T> = std::result::Result<T, QueueError>;

/// Producer side of the queue
#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Persist `job` and return its newly assigned id
    async fn enqueue(&self, job: &ImportJob) -> Result<String>;

    /// Withdraw an entry no worker has claimed yet
    ///
    /// Returns `false` when the entry is already running or finished.
    async fn cancel(&self, id: &str) -> Result<bool>;
}

/// A delivered queue entry
#[derive(Debug, Clone)]
pub struct ClaimedJob {
    pub id: String,
    pub job: ImportJob,
    /// Deliveries so far, including this one
    pub attempts: i32,
}

#[derive(Clone)]
pub struct PgJobQueue {
    pool: PgPool,
    lock_timeout: Duration,
}

impl PgJobQueue {
    pub fn new(pool: PgPool, config: &QueueConfig) -> Self {
        Self {
            pool,
            lock_timeout: Duration::from_secs(config.lock_timeout_secs),
        }
    }

    /// Claim the oldest runnable entry, or one whose lock has expired
    pub async fn claim(&self, worker_id: &str) -> Result<Option<ClaimedJob>> {
        let row: Option<(String, Value, i32)> = sqlx::query_as(
            r#"
            UPDATE import_queue
            SET status = 'running',
                attempts = attempts + 1,
                locked_at = NOW(),
                locked_by = $1
            WHERE id = (
                SELECT id FROM import_queue
                WHERE (status = 'pending' AND run_at <= NOW())
                   OR (status = 'running' AND locked_at < NOW() - $2::float8 * INTERVAL '1 second')
                ORDER BY run_at, created_at
                LIMIT 1
                FOR UPDATE SKIP LOCKED
            )
            RETURNING id, payload, attempts
            "#,
        )
        .bind(worker_id)
        .bind(self.lock_timeout.as_secs_f64())
        .fetch_optional(&self.pool)
        .await?;

        let Some((id, payload, attempts)) = row else {
            return Ok(None);
        };

        match serde_json::from_value::<ImportJob>(payload) {
            Ok(job) => {
                if attempts > 1 {
                    tracing::warn!(job_id = %id, attempts, "Redelivering import job");
                }
                Ok(Some(ClaimedJob { id, job, attempts }))
            },
            Err(source) => {
                // Park it so it is not handed out again.
                self.dead_letter(&id, &format!("unreadable payload: {source}")).await?;
                Err(QueueError::Payload { id, source })
            },
        }
    }

    /// Refresh the lock on a running entry
    pub async fn heartbeat(&self, id: &str, worker_id: &str) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE import_queue
            SET locked_at = NOW()
            WHERE id = $1 AND locked_by = $2 AND status = 'running'
            "#,
        )
        .bind(id)
        .bind(worker_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Mark an entry as finished
    pub async fn ack(&self, id: &str) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE import_queue
            SET status = 'done', done_at = NOW(), locked_at = NULL
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Finish an entry that must not be retried, keeping the reason
    pub async fn dead_letter(&self, id: &str, reason: &str) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE import_queue
            SET status = 'done', done_at = NOW(), locked_at = NULL, last_error = $2
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(reason)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl JobQueue for PgJobQueue {
    async fn enqueue(&self, job: &ImportJob) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        let payload = serde_json::to_value(job).map_err(QueueError::Encode)?;

        sqlx::query("INSERT INTO import_queue (id, payload) VALUES ($1, $2)")
            .bind(&id)
            .bind(payload)
            .execute(&self.pool)
            .await?;

        tracing::debug!(job_id = %id, table = %job.table, "Job enqueued");
        Ok(id)
    }

    async fn cancel(&self, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM import_queue WHERE id = $1 AND status = 'pending'")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

/// Identity written into `locked_by`: `<hostname>-<uuid>`
pub fn worker_identity() -> String {
    let host = hostname::get()
        .map(|h| h.to_string_lossy().to_string())
        .unwrap_or_else(|_| "unknown".to_string());
    format!("{}-{}", host, Uuid::new_v4())
}
