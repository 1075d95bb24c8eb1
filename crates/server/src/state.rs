use std::sync::Arc;
use mediarelay_core::{Config, SanitizedConfig, TaskOrchestrator};

use crate::telegram::SelectionStore;

/// Shared application state
pub struct AppState {
    config: Config,
    orchestrator: TaskOrchestrator,
    selections: Arc<SelectionStore>,
}

impl AppState {
    pub fn new(
        config: Config,
        orchestrator: TaskOrchestrator,
        selections: Arc<SelectionStore>,
    ) -> Self {
        Self {
            config,
            orchestrator,
            selections,
        }
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn orchestrator(&self) -> &TaskOrchestrator {
        &self.orchestrator
    }

    pub fn pending_selections(&self) -> usize {
        self.selections.len()
    }
}
