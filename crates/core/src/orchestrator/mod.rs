//! Task orchestrator.
//!
//! Creates tasks, runs their download and upload phases, renders the
//! operator-facing status, and guarantees cleanup:
//! - **Start**: validate input, register, spawn the pipeline
//! - **Run**: download, then upload only if the download succeeded
//! - **Finish**: terminal message, then registry entry and artifact removed

mod config;
mod messages;
mod runner;
mod types;

pub use config::OrchestratorConfig;
pub use runner::{cancel_action, TaskOrchestrator, CANCEL_TOKEN_PREFIX};
pub use types::{
    CancelledTask, OrchestratorError, OrchestratorStatus, StartTaskRequest, TaskHandle,
    TaskOutcome,
};
