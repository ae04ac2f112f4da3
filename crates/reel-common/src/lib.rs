//! Reel Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared types, logging, and error handling for the Reel workspace.
//!
//! # Overview
//!
//! - **Error Handling**: `ReelError` and the `Result` alias
//! - **Logging**: `tracing` subscriber setup driven by `LOG_*` environment variables
//! - **Types**: import job status and the supported target tables
//!
//! # Example
//!
//! ```no_run
//! use reel_common::types::{JobStatus, TargetTable};
//!
//! let table: TargetTable = "genome-scores".parse().unwrap();
//! assert_eq!(table.as_str(), "genome_scores");
//! assert!(JobStatus::Completed.is_terminal());
//! ```

pub mod error;
pub mod logging;
pub mod types;

// Re-export commonly used types
pub use error::{ReelError, Result};
pub use types::{JobStatus, TargetTable};
