//! Import worker pool
//!
//! Each worker loop claims one queue entry at a time, keeps its lock alive
//! with a heartbeat while the orchestrator runs, and acks the entry once the
//! job has a terminal status. Loops stop between jobs when the shutdown
//! token is cancelled.

use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn, Instrument};

use super::backend::PgImportBackend;
use super::locks::TableLocks;
use super::orchestrator::JobOrchestrator;
use super::queue::{worker_identity, ClaimedJob, PgJobQueue};
use super::status_store::PgStatusStore;
use crate::config::{Config, QueueConfig};
use crate::storage::ChunkStore;

/// Error recorded for a job that kept failing to reach a terminal state
pub const ATTEMPTS_EXHAUSTED: &str = "attempts exhausted";

pub struct WorkerPool {
    queue: PgJobQueue,
    orchestrator: JobOrchestrator,
    config: QueueConfig,
    shutdown: CancellationToken,
}

impl WorkerPool {
    /// Wire the Postgres-backed store, backend and queue from configuration
    pub fn from_config(db: PgPool, queue_pool: PgPool, config: &Config) -> Self {
        let orchestrator = JobOrchestrator::new(
            Arc::new(PgStatusStore::new(db.clone())),
            Arc::new(PgImportBackend::new(db)),
            ChunkStore::from_config(&config.storage),
            TableLocks::new(),
        );
        let queue = PgJobQueue::new(queue_pool, &config.queue);
        Self::new(queue, orchestrator, config.queue.clone())
    }

    pub fn new(queue: PgJobQueue, orchestrator: JobOrchestrator, config: QueueConfig) -> Self {
        Self {
            queue,
            orchestrator,
            config,
            shutdown: CancellationToken::new(),
        }
    }

    /// Token that stops every loop once cancelled
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Spawn `concurrency` worker loops
    pub fn start(self) -> Vec<JoinHandle<()>> {
        info!(concurrency = self.config.concurrency, "Starting import workers");

        (0..self.config.concurrency)
            .map(|index| {
                let worker = Worker {
                    id: worker_identity(),
                    queue: self.queue.clone(),
                    orchestrator: self.orchestrator.clone(),
                    poll_interval: Duration::from_millis(self.config.poll_interval_ms),
                    heartbeat_interval: Duration::from_secs(self.config.heartbeat_secs),
                    max_attempts: self.config.max_attempts,
                };
                let shutdown = self.shutdown.clone();
                let span = tracing::info_span!("worker", index, worker_id = %worker.id);
                tokio::spawn(worker.run(shutdown).instrument(span))
            })
            .collect()
    }
}

struct Worker {
    id: String,
    queue: PgJobQueue,
    orchestrator: JobOrchestrator,
    poll_interval: Duration,
    heartbeat_interval: Duration,
    max_attempts: i32,
}

impl Worker {
    async fn run(self, shutdown: CancellationToken) {
        info!("Worker started");

        while !shutdown.is_cancelled() {
            match self.queue.claim(&self.id).await {
                Ok(Some(claimed)) => self.process(claimed).await,
                Ok(None) => self.idle(&shutdown).await,
                Err(e) => {
                    error!(error = %e, "Failed to claim import job");
                    self.idle(&shutdown).await;
                },
            }
        }

        info!("Worker stopped");
    }

    async fn idle(&self, shutdown: &CancellationToken) {
        tokio::select! {
            _ = shutdown.cancelled() => {},
            _ = tokio::time::sleep(self.poll_interval) => {},
        }
    }

    async fn process(&self, claimed: ClaimedJob) {
        let ClaimedJob { id, job, attempts } = claimed;

        if attempts_exhausted(attempts, self.max_attempts) {
            warn!(job_id = %id, attempts, "Giving up on import job");
            self.orchestrator.retire(&id, &job, ATTEMPTS_EXHAUSTED).await;
            if let Err(e) = self.queue.dead_letter(&id, ATTEMPTS_EXHAUSTED).await {
                error!(job_id = %id, error = %e, "Failed to retire exhausted job");
            }
            return;
        }

        debug!(job_id = %id, attempts, "Claimed import job");
        let heartbeat = self.start_heartbeat_task(&id);

        let outcome = self.orchestrator.run(&id, &job).await;

        heartbeat.abort();

        if let Err(e) = self.queue.ack(&id).await {
            // The lock will expire and the job is redelivered; the
            // orchestrator skips it because its record is terminal.
            error!(job_id = %id, error = %e, "Failed to ack import job");
        }

        info!(job_id = %id, status = %outcome.status(), "Import job finished");
    }

    /// Keep the queue lock fresh while the job runs
    fn start_heartbeat_task(&self, job_id: &str) -> JoinHandle<()> {
        let queue = self.queue.clone();
        let job_id = job_id.to_string();
        let worker_id = self.id.clone();
        let period = self.heartbeat_interval;

        tokio::spawn(async move {
            let mut timer = interval(period);
            timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately; the claim just set the lock.
            timer.tick().await;

            loop {
                timer.tick().await;
                if let Err(e) = queue.heartbeat(&job_id, &worker_id).await {
                    warn!(job_id = %job_id, error = %e, "Heartbeat failed");
                }
            }
        })
    }
}

fn attempts_exhausted(attempts: i32, max_attempts: i32) -> bool {
    attempts > max_attempts
}
