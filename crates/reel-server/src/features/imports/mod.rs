//! Import submission
//!
//! `POST /convert` hands a file in chunk storage to the import queue.

pub mod commands;
pub mod routes;

pub use commands::{SubmissionGateway, SubmitError, SubmitImportCommand, SubmitImportResponse};
pub use routes::imports_routes;
