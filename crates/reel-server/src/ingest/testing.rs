//! In-memory doubles for the import seams

use async_trait::async_trait;
use reel_common::{JobStatus, TargetTable};
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::backend::{ImportBackend, ImportError, ImportSession};
use super::jobs::ImportJob;
use super::models::{JobRecord, StatusUpdate};
use super::queue::{JobQueue, QueueError};
use super::status_store::{self, StatusStore, StatusStoreError};

#[derive(Default)]
pub struct MemoryStatusStore {
    records: Mutex<HashMap<String, JobRecord>>,
    history: Mutex<Vec<(String, JobStatus)>>,
    fail_writes: AtomicBool,
}

impl MemoryStatusStore {
    pub fn failing() -> Self {
        let store = Self::default();
        store.fail_writes.store(true, Ordering::SeqCst);
        store
    }

    pub fn seed(&self, update: StatusUpdate) {
        self.apply(&update);
    }

    pub fn record(&self, job_id: &str) -> Option<JobRecord> {
        self.records.lock().unwrap().get(job_id).cloned()
    }

    /// Statuses that were actually applied, in order
    pub fn statuses_written(&self, job_id: &str) -> Vec<JobStatus> {
        self.history
            .lock()
            .unwrap()
            .iter()
            .filter(|(id, _)| id == job_id)
            .map(|(_, status)| *status)
            .collect()
    }

    fn apply(&self, update: &StatusUpdate) -> bool {
        let mut records = self.records.lock().unwrap();
        let applied = match records.get_mut(&update.job_id) {
            Some(existing) => status_store::merge_update(existing, update),
            None => {
                records.insert(update.job_id.clone(), status_store::record_from_update(update));
                true
            },
        };
        if applied {
            self.history.lock().unwrap().push((update.job_id.clone(), update.status));
        }
        applied
    }
}

#[async_trait]
impl StatusStore for MemoryStatusStore {
    async fn upsert(&self, update: &StatusUpdate) -> status_store::Result<bool> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StatusStoreError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(self.apply(update))
    }

    async fn get(&self, job_id: &str) -> status_store::Result<JobRecord> {
        self.record(job_id)
            .ok_or_else(|| StatusStoreError::NotFound(job_id.to_string()))
    }

    async fn list(&self) -> status_store::Result<Vec<JobRecord>> {
        let mut records: Vec<_> = self.records.lock().unwrap().values().cloned().collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records)
    }
}

#[derive(Default)]
pub struct RecordingQueue {
    jobs: Mutex<Vec<(String, ImportJob)>>,
    unavailable: bool,
    claimed: bool,
}

impl RecordingQueue {
    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Default::default()
        }
    }

    /// Every entry is taken by a worker as soon as it is enqueued
    pub fn claimed_on_enqueue() -> Self {
        Self {
            claimed: true,
            ..Default::default()
        }
    }

    pub fn jobs(&self) -> Vec<(String, ImportJob)> {
        self.jobs.lock().unwrap().clone()
    }
}

#[async_trait]
impl JobQueue for RecordingQueue {
    async fn enqueue(&self, job: &ImportJob) -> Result<String, QueueError> {
        if self.unavailable {
            return Err(QueueError::Database(sqlx::Error::PoolTimedOut));
        }
        let job_id = uuid::Uuid::new_v4().to_string();
        self.jobs.lock().unwrap().push((job_id.clone(), job.clone()));
        Ok(job_id)
    }

    async fn cancel(&self, id: &str) -> Result<bool, QueueError> {
        if self.unavailable {
            return Err(QueueError::Database(sqlx::Error::PoolTimedOut));
        }
        if self.claimed {
            return Ok(false);
        }
        let mut jobs = self.jobs.lock().unwrap();
        let before = jobs.len();
        jobs.retain(|(job_id, _)| job_id != id);
        Ok(jobs.len() < before)
    }
}

#[derive(Clone, Copy, PartialEq)]
enum FailAt {
    Nowhere,
    Stage,
    Swap,
}

struct FakeState {
    rows: i64,
    fail_at: FailAt,
    message: String,
    swapped: Mutex<Vec<TargetTable>>,
    stage_delay: Duration,
    /// Sessions currently between `stage` and drop
    active: AtomicUsize,
    peak: AtomicUsize,
}

impl FakeState {
    fn error(&self) -> ImportError {
        ImportError::Database(sqlx::Error::Protocol(self.message.clone()))
    }
}

type OpenHook = Box<dyn Fn(TargetTable) + Send + Sync>;

pub struct FakeBackend {
    state: Arc<FakeState>,
    on_open: Option<OpenHook>,
    refresh_fails: bool,
    sessions: AtomicUsize,
    refreshes: AtomicUsize,
}

impl FakeBackend {
    fn build(rows: i64, fail_at: FailAt, message: &str) -> Self {
        Self {
            state: Arc::new(FakeState {
                rows,
                fail_at,
                message: message.to_string(),
                swapped: Mutex::new(Vec::new()),
                stage_delay: Duration::ZERO,
                active: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
            }),
            on_open: None,
            refresh_fails: false,
            sessions: AtomicUsize::new(0),
            refreshes: AtomicUsize::new(0),
        }
    }

    pub fn staging_rows(rows: i64) -> Self {
        Self::build(rows, FailAt::Nowhere, "")
    }

    /// Staging counts `rows` and then fails with `message`
    pub fn failing_stage(rows: i64, message: &str) -> Self {
        Self::build(rows, FailAt::Stage, message)
    }

    pub fn failing_swap(rows: i64) -> Self {
        Self::build(rows, FailAt::Swap, "relation is locked")
    }

    pub fn with_refresh_failure(mut self) -> Self {
        self.refresh_fails = true;
        self
    }

    /// Make each `stage` call take `delay`
    pub fn with_stage_delay(mut self, delay: Duration) -> Self {
        if let Some(state) = Arc::get_mut(&mut self.state) {
            state.stage_delay = delay;
        }
        self
    }

    /// Run `hook` each time a session is opened, after the session exists
    pub fn with_open_hook(mut self, hook: impl Fn(TargetTable) + Send + Sync + 'static) -> Self {
        self.on_open = Some(Box::new(hook));
        self
    }

    /// Most sessions that were staging at the same time
    pub fn peak_concurrency(&self) -> usize {
        self.state.peak.load(Ordering::SeqCst)
    }

    pub fn sessions_opened(&self) -> usize {
        self.sessions.load(Ordering::SeqCst)
    }

    pub fn refreshes(&self) -> usize {
        self.refreshes.load(Ordering::SeqCst)
    }

    pub fn swaps(&self) -> Vec<TargetTable> {
        self.state.swapped.lock().unwrap().clone()
    }
}

struct FakeSession {
    state: Arc<FakeState>,
    table: TargetTable,
    rows_staged: i64,
    counted: bool,
}

impl Drop for FakeSession {
    fn drop(&mut self) {
        if self.counted {
            self.state.active.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

#[async_trait]
impl ImportSession for FakeSession {
    async fn stage(&mut self, path: &Path) -> Result<i64, ImportError> {
        if !path.exists() {
            return Err(ImportError::FileNotFound(path.to_path_buf()));
        }
        if !self.counted {
            self.counted = true;
            let active = self.state.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.state.peak.fetch_max(active, Ordering::SeqCst);
        }
        if !self.state.stage_delay.is_zero() {
            tokio::time::sleep(self.state.stage_delay).await;
        }
        self.rows_staged = self.state.rows;
        if self.state.fail_at == FailAt::Stage {
            return Err(self.state.error());
        }
        Ok(self.rows_staged)
    }

    async fn swap(&mut self) -> Result<(), ImportError> {
        if self.state.fail_at == FailAt::Swap {
            return Err(self.state.error());
        }
        self.state.swapped.lock().unwrap().push(self.table);
        Ok(())
    }

    fn rows_staged(&self) -> i64 {
        self.rows_staged
    }
}

#[async_trait]
impl ImportBackend for FakeBackend {
    async fn open_session(&self, table: TargetTable) -> Result<Box<dyn ImportSession>, ImportError> {
        self.sessions.fetch_add(1, Ordering::SeqCst);
        let session: Box<dyn ImportSession> = Box::new(FakeSession {
            state: self.state.clone(),
            table,
            rows_staged: 0,
            counted: false,
        });
        if let Some(ref hook) = self.on_open {
            hook(table);
        }
        Ok(session)
    }

    async fn refresh_derived_view(&self) -> Result<(), ImportError> {
        self.refreshes.fetch_add(1, Ordering::SeqCst);
        if self.refresh_fails {
            return Err(ImportError::Refresh(sqlx::Error::PoolClosed));
        }
        Ok(())
    }
}
