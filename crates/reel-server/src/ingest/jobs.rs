//! Job definitions for CSV imports
//!
//! Defines the payload carried through the durable queue and the statistics
//! a finished import reports.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Import job payload
///
/// `table` is kept as the raw string the caller submitted; it is only mapped
/// onto a [`reel_common::TargetTable`] when the worker stages the file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportJob {
    /// Bare source file name, as submitted
    pub name: String,
    /// Requested target table
    pub table: String,
    /// Resolved location of the file under the chunk root
    pub file_path: PathBuf,
    /// Timestamp when the job was submitted
    pub enqueued_at: DateTime<Utc>,
}

impl ImportJob {
    pub fn new(name: impl Into<String>, table: impl Into<String>, file_path: PathBuf) -> Self {
        Self {
            name: name.into(),
            table: table.into(),
            file_path,
            enqueued_at: Utc::now(),
        }
    }
}

/// Statistics collected during an import
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ImportStats {
    /// Rows present in the staging table after the bulk load
    pub rows_inserted: i64,
    /// Rows rejected by the load. COPY is all-or-nothing, so this stays 0.
    pub rows_failed: i64,
    /// Wall-clock seconds from pickup to the terminal write
    pub duration_secs: f64,
}

impl ImportStats {
    pub fn new(rows_inserted: i64) -> Self {
        Self {
            rows_inserted,
            ..Default::default()
        }
    }

    /// Stamp the elapsed processing time
    pub fn finish(mut self, elapsed: Duration) -> Self {
        self.duration_secs = elapsed.as_secs_f64();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_payload_round_trips_through_json() {
        let job = ImportJob::new("ratings.csv", "ratings", PathBuf::from("/chunks/ratings.csv"));
        let json = serde_json::to_value(&job).unwrap();
        assert_eq!(json["name"], "ratings.csv");
        assert_eq!(json["table"], "ratings");

        let back: ImportJob = serde_json::from_value(json).unwrap();
        assert_eq!(back, job);
    }

    #[test]
    fn test_stats_finish_records_duration() {
        let stats = ImportStats::new(42).finish(Duration::from_millis(1500));
        assert_eq!(stats.rows_inserted, 42);
        assert_eq!(stats.rows_failed, 0);
        assert!((stats.duration_secs - 1.5).abs() < f64::EPSILON);
    }
}
