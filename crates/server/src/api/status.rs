//! Orchestrator status handler.

use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;

use crate::state::AppState;

/// Orchestrator status response
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    /// Whether new tasks are accepted
    pub accepting: bool,
    /// Number of tasks in the registry
    pub active_tasks: usize,
    pub downloading_count: usize,
    pub uploading_count: usize,
    /// Pending quality selections awaiting a button click
    pub pending_selections: usize,
}

pub async fn get_status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    let status = state.orchestrator().status();
    Json(StatusResponse {
        accepting: status.accepting,
        active_tasks: status.active_tasks,
        downloading_count: status.downloading_count,
        uploading_count: status.uploading_count,
        pending_selections: state.pending_selections(),
    })
}
