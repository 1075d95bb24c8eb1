//! Task API handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::str::FromStr;
use std::sync::Arc;
use mediarelay_core::orchestrator::OrchestratorError;
use mediarelay_core::{Task, TaskId, TaskState};

use crate::state::AppState;

// ============================================================================
// Response Types
// ============================================================================

/// Task as exposed over the API
#[derive(Debug, Serialize)]
pub struct TaskResponse {
    pub id: String,
    pub source_url: String,
    pub display_name: String,
    pub quality: String,
    pub state: TaskState,
    /// Retrieval process id while downloading
    pub process_id: Option<u32>,
    pub chat_id: i64,
    pub message_id: i64,
    pub created_at: DateTime<Utc>,
}

impl From<Task> for TaskResponse {
    fn from(task: Task) -> Self {
        Self {
            id: task.id.to_string(),
            source_url: task.source_url,
            display_name: task.display_name,
            quality: task.quality.to_string(),
            state: task.state,
            process_id: task.process_id,
            chat_id: task.target.message.chat_id,
            message_id: task.target.message.message_id,
            created_at: task.created_at,
        }
    }
}

/// Response for listing tasks
#[derive(Debug, Serialize)]
pub struct ListTasksResponse {
    pub tasks: Vec<TaskResponse>,
    pub count: usize,
}

/// Response for a cancelled task
#[derive(Debug, Serialize)]
pub struct CancelTaskResponse {
    pub id: String,
    /// Whether a retrieval process tree was signalled
    pub process_terminated: bool,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct TaskErrorResponse {
    pub error: String,
}

fn error_response(status: StatusCode, error: String) -> (StatusCode, Json<TaskErrorResponse>) {
    (status, Json(TaskErrorResponse { error }))
}

fn parse_id(id: &str) -> Result<TaskId, (StatusCode, Json<TaskErrorResponse>)> {
    TaskId::from_str(id).map_err(|_| {
        error_response(StatusCode::BAD_REQUEST, format!("Invalid task id: {}", id))
    })
}

// ============================================================================
// Handlers
// ============================================================================

/// List active tasks, oldest first
pub async fn list_tasks(State(state): State<Arc<AppState>>) -> Json<ListTasksResponse> {
    let tasks: Vec<TaskResponse> = state
        .orchestrator()
        .list_tasks()
        .into_iter()
        .map(TaskResponse::from)
        .collect();
    Json(ListTasksResponse {
        count: tasks.len(),
        tasks,
    })
}

/// Get a single active task
pub async fn get_task(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<TaskResponse>, impl IntoResponse> {
    let task_id = match parse_id(&id) {
        Ok(task_id) => task_id,
        Err(e) => return Err(e),
    };
    match state.orchestrator().get_task(&task_id) {
        Some(task) => Ok(Json(TaskResponse::from(task))),
        None => Err(error_response(
            StatusCode::NOT_FOUND,
            format!("Task not found: {}", id),
        )),
    }
}

/// Cancel an active task
pub async fn cancel_task(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<CancelTaskResponse>, impl IntoResponse> {
    let task_id = match parse_id(&id) {
        Ok(task_id) => task_id,
        Err(e) => return Err(e),
    };
    match state.orchestrator().cancel(&task_id).await {
        Ok(cancelled) => Ok(Json(CancelTaskResponse {
            id: cancelled.task.id.to_string(),
            process_terminated: cancelled.process_terminated,
        })),
        Err(OrchestratorError::TaskNotFound(_)) => Err(error_response(
            StatusCode::NOT_FOUND,
            format!("Task not found: {}", id),
        )),
        Err(e) => Err(error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            e.to_string(),
        )),
    }
}
