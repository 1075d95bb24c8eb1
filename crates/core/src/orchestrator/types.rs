//! Types for the task orchestrator.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::task::JoinHandle;

use crate::downloader::{DownloaderError, Quality};
use crate::notifier::MessageRef;
use crate::task::{Task, TaskError, TaskFailure, TaskId};
use crate::uploader::RemoteArtifact;

/// Errors that can occur during orchestration.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// The request was rejected before a task was created.
    #[error("invalid input: {0}")]
    InvalidInput(#[from] TaskError),

    /// No active task with this id.
    #[error("task not found: {0}")]
    TaskNotFound(TaskId),

    /// The orchestrator no longer accepts tasks.
    #[error("orchestrator is shutting down")]
    ShuttingDown,

    #[error("downloader error: {0}")]
    Downloader(#[from] DownloaderError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Final result of a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "detail", rename_all = "snake_case")]
pub enum TaskOutcome {
    Completed(RemoteArtifact),
    Failed(TaskFailure),
    Cancelled,
}

impl TaskOutcome {
    /// Metric/log label for this outcome.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Completed(_) => "completed",
            Self::Failed(_) => "failed",
            Self::Cancelled => "cancelled",
        }
    }
}

/// Parameters for starting a task.
#[derive(Debug, Clone)]
pub struct StartTaskRequest {
    pub source_url: String,
    /// Raw display name; sanitized before use.
    pub display_name: String,
    pub quality: Quality,
    /// The operator message that will show this task's progress.
    pub message: MessageRef,
}

/// Result of a successful cancellation.
#[derive(Debug, Clone, Serialize)]
pub struct CancelledTask {
    /// The task as it was when cancelled.
    pub task: Task,
    /// Whether a retrieval process tree was signalled.
    pub process_terminated: bool,
}

/// Current status of the orchestrator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrchestratorStatus {
    /// Whether new tasks are accepted.
    pub accepting: bool,
    /// Number of tasks in the registry.
    pub active_tasks: usize,
    pub downloading_count: usize,
    pub uploading_count: usize,
}

/// Handle to a spawned task pipeline.
#[derive(Debug)]
pub struct TaskHandle {
    pub id: TaskId,
    pub(crate) join: JoinHandle<TaskOutcome>,
}

impl TaskHandle {
    /// Waits for the pipeline to finish.
    pub async fn outcome(self) -> TaskOutcome {
        match self.join.await {
            Ok(outcome) => outcome,
            Err(e) => TaskOutcome::Failed(TaskFailure::Internal(e.to_string())),
        }
    }
}
