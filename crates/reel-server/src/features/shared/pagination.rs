//! Shared pagination utilities
//!
//! Offset/limit pagination with `next`/`previous` links.
//!
//! # Examples
//!
//! ```rust,ignore
//! use reel_server::features::shared::pagination::{OffsetParams, OffsetPage};
//!
//! let params = OffsetParams::new(Some(30), Some(60));
//! // After fetching rows and the total count...
//! let page = OffsetPage::new("/movies", rows, total, &params);
//! ```

use serde::{Deserialize, Serialize};

/// Default page size
pub const DEFAULT_LIMIT: i64 = 30;

/// Largest page size a caller may request
pub const MAX_LIMIT: i64 = 1000;

/// Offset pagination request parameters
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq)]
pub struct OffsetParams {
    /// Items per page. Defaults to 30, clamped to 1-1000.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<i64>,

    /// Items to skip. Defaults to 0; negative values count as 0.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<i64>,
}

impl OffsetParams {
    pub fn new(limit: Option<i64>, offset: Option<i64>) -> Self {
        Self { limit, offset }
    }

    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
    }

    pub fn offset(&self) -> i64 {
        self.offset.unwrap_or(0).max(0)
    }
}

/// One page of results: `{"count", "next", "previous", "results"}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OffsetPage<T> {
    /// Total matching rows, across all pages
    pub count: i64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}

impl<T> OffsetPage<T> {
    /// Build a page and its navigation links relative to `path`
    pub fn new(path: &str, results: Vec<T>, count: i64, params: &OffsetParams) -> Self {
        let limit = params.limit();
        let offset = params.offset();

        let next_offset = offset + limit;
        let next = (next_offset < count).then(|| format!("{path}?limit={limit}&offset={next_offset}"));
        let previous = (offset > 0).then(|| format!("{path}?limit={limit}&offset={}", (offset - limit).max(0)));

        Self {
            count,
            next,
            previous,
            results,
        }
    }
}
