//! CSV import pipeline
//!
//! # Architecture
//!
//! - **jobs**: queue payload (`ImportJob`) and import statistics
//! - **models**: job records and partial status updates
//! - **status_store**: monotonic upsert over the `tasks` table
//! - **queue**: durable `import_queue` with claim, heartbeat and ack
//! - **schema**: fixed table layouts and the aggregate view
//! - **backend**: staging via COPY, atomic swap, view refresh
//! - **locks**: in-process per-table exclusion
//! - **orchestrator**: the per-job state machine
//! - **worker**: the pool of loops feeding jobs to the orchestrator
//!
//! # Public API
//!
//! The HTTP endpoints live in `features`:
//! - `POST /convert` - submit a file for import
//! - `GET /tasks` - list job records
//! - `GET /tasks/:job_id` - get one job record

pub mod backend;
pub mod jobs;
pub mod locks;
pub mod models;
pub mod orchestrator;
pub mod queue;
pub mod schema;
pub mod status_store;
pub mod worker;

#[cfg(test)]
pub(crate) mod testing;

pub use backend::{ImportBackend, ImportError, ImportSession, PgImportBackend};
pub use jobs::{ImportJob, ImportStats};
pub use locks::TableLocks;
pub use models::{JobRecord, StatusUpdate};
pub use orchestrator::{JobOrchestrator, JobOutcome};
pub use queue::{ClaimedJob, JobQueue, PgJobQueue, QueueError};
pub use status_store::{PgStatusStore, StatusStore, StatusStoreError};
pub use worker::WorkerPool;
