//! Job status queries
//!
//! Read-only views over the status store.

pub mod queries;
pub mod routes;

pub use queries::{GetTaskQuery, GetTaskResponse, ListTasksQuery, ListTasksResponse};
pub use routes::tasks_routes;
