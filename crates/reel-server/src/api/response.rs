//! API response types
//!
//! Submission and error responses share a `{status, message}` envelope; the
//! read endpoints return their own top-level shapes.

use serde::{Deserialize, Serialize};

/// `{"status": "success" | "error", "message": ..., "job_id"?: ...}`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatusEnvelope {
    pub status: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,
}

impl StatusEnvelope {
    /// Accepted submission
    pub fn accepted(job_id: impl Into<String>) -> Self {
        Self {
            status: "success".to_string(),
            message: "File is being processed".to_string(),
            job_id: Some(job_id.into()),
        }
    }

    /// Failure body used by every error response
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            message: message.into(),
            job_id: None,
        }
    }
}

/// Unpaginated list wrapper: `{"count": n, "results": [...]}`
#[derive(Debug, Serialize, Deserialize)]
pub struct ListResponse<T> {
    pub count: usize,
    pub results: Vec<T>,
}

impl<T> From<Vec<T>> for ListResponse<T> {
    fn from(results: Vec<T>) -> Self {
        Self {
            count: results.len(),
            results,
        }
    }
}
