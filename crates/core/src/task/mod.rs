//! Tasks and the registry of active tasks.

mod registry;
mod types;

pub use registry::{TaskContext, TaskRegistry};
pub use types::{
    sanitize_display_name, validate_source_url, Task, TaskError, TaskFailure, TaskId, TaskState,
};
