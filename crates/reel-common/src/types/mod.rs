//! Common types used across Reel

use serde::{Deserialize, Serialize};

use crate::error::ReelError;

// ============================================================================
// Job Status
// ============================================================================

/// Lifecycle state of an import job.
///
/// Jobs move strictly forward: `queued → started → {completed | failed}`.
/// The two terminal states are mutually exclusive and final.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Accepted by the gateway, waiting in the queue
    Queued,
    /// Picked up by a worker
    Started,
    /// Staged and swapped into the live table
    Completed,
    /// Staging or swap failed
    Failed,
}

impl JobStatus {
    pub const ALL: [JobStatus; 4] = [
        JobStatus::Queued,
        JobStatus::Started,
        JobStatus::Completed,
        JobStatus::Failed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Started => "started",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    /// Position in the lifecycle. Both terminal states share the last rank.
    pub fn rank(&self) -> i16 {
        match self {
            JobStatus::Queued => 0,
            JobStatus::Started => 1,
            JobStatus::Completed | JobStatus::Failed => 2,
        }
    }

    /// Whether a record currently in `self` may be overwritten with `next`.
    ///
    /// Rewriting the same non-terminal state is allowed so that retried
    /// writes converge; nothing leaves a terminal state.
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        if self.is_terminal() {
            return false;
        }
        next.rank() >= self.rank()
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for JobStatus {
    type Err = ReelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "queued" => Ok(JobStatus::Queued),
            "started" => Ok(JobStatus::Started),
            "completed" => Ok(JobStatus::Completed),
            "failed" => Ok(JobStatus::Failed),
            other => Err(ReelError::InvalidStatus(other.to_string())),
        }
    }
}

// ============================================================================
// Target Tables
// ============================================================================

/// The fixed set of tables an import can replace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetTable {
    Ratings,
    Tags,
    Movies,
    Links,
    GenomeScores,
    GenomeTags,
}

impl TargetTable {
    pub const ALL: [TargetTable; 6] = [
        TargetTable::Ratings,
        TargetTable::Tags,
        TargetTable::Movies,
        TargetTable::Links,
        TargetTable::GenomeScores,
        TargetTable::GenomeTags,
    ];

    /// Live table name in the database
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetTable::Ratings => "ratings",
            TargetTable::Tags => "tags",
            TargetTable::Movies => "movies",
            TargetTable::Links => "links",
            TargetTable::GenomeScores => "genome_scores",
            TargetTable::GenomeTags => "genome_tags",
        }
    }

    /// Name of the staging table owned by the running import
    pub fn staging_name(&self) -> String {
        format!("{}_temp", self.as_str())
    }

    /// Tables whose `timestamp` column arrives as Unix epoch seconds
    pub fn has_epoch_timestamp(&self) -> bool {
        matches!(self, TargetTable::Ratings | TargetTable::Tags)
    }
}

impl std::fmt::Display for TargetTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TargetTable {
    type Err = ReelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ratings" => Ok(TargetTable::Ratings),
            "tags" => Ok(TargetTable::Tags),
            "movies" => Ok(TargetTable::Movies),
            "links" => Ok(TargetTable::Links),
            "genome_scores" | "genome-scores" | "genomescores" => Ok(TargetTable::GenomeScores),
            "genome_tags" | "genome-tags" | "genometags" => Ok(TargetTable::GenomeTags),
            _ => Err(ReelError::UnsupportedTable(s.to_string())),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_job_status_round_trip_names() {
        for status in JobStatus::ALL {
            assert_eq!(status.as_str().parse::<JobStatus>().unwrap(), status);
        }
        assert!("running".parse::<JobStatus>().is_err());
    }

    #[test]
    fn test_job_status_forward_transitions() {
        assert!(JobStatus::Queued.can_transition_to(JobStatus::Started));
        assert!(JobStatus::Queued.can_transition_to(JobStatus::Queued));
        assert!(JobStatus::Started.can_transition_to(JobStatus::Completed));
        assert!(JobStatus::Started.can_transition_to(JobStatus::Failed));
        assert!(JobStatus::Queued.can_transition_to(JobStatus::Failed));
    }

    #[test]
    fn test_job_status_never_moves_backwards() {
        assert!(!JobStatus::Started.can_transition_to(JobStatus::Queued));
    }

    #[test]
    fn test_terminal_states_are_final() {
        for next in JobStatus::ALL {
            assert!(!JobStatus::Completed.can_transition_to(next));
            assert!(!JobStatus::Failed.can_transition_to(next));
        }
    }

    #[test]
    fn test_job_status_serde_lowercase() {
        let json = serde_json::to_string(&JobStatus::Completed).unwrap();
        assert_eq!(json, "\"completed\"");
    }

    #[test]
    fn test_target_table_aliases() {
        assert_eq!("genome-scores".parse::<TargetTable>().unwrap(), TargetTable::GenomeScores);
        assert_eq!("genomescores".parse::<TargetTable>().unwrap(), TargetTable::GenomeScores);
        assert_eq!("genome-tags".parse::<TargetTable>().unwrap(), TargetTable::GenomeTags);
        assert_eq!("Ratings".parse::<TargetTable>().unwrap(), TargetTable::Ratings);
    }

    #[test]
    fn test_target_table_unsupported() {
        let err = "users".parse::<TargetTable>().unwrap_err();
        assert_eq!(err.to_string(), "Unsupported table: users");
    }

    #[test]
    fn test_staging_names() {
        assert_eq!(TargetTable::Ratings.staging_name(), "ratings_temp");
        assert_eq!(TargetTable::GenomeTags.staging_name(), "genome_tags_temp");
    }

    #[test]
    fn test_epoch_timestamp_tables() {
        let with_epoch: Vec<_> = TargetTable::ALL
            .iter()
            .filter(|t| t.has_epoch_timestamp())
            .collect();
        assert_eq!(with_epoch, vec![&TargetTable::Ratings, &TargetTable::Tags]);
    }
}
