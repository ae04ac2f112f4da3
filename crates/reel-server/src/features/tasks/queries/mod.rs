pub mod get_task;
pub mod list_tasks;

pub use get_task::{GetTaskQuery, GetTaskResponse};
pub use list_tasks::{ListTasksQuery, ListTasksResponse};
