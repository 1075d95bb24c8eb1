//! Notifier configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the rate-limited notifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifierConfig {
    /// Minimum time between two progress renders of the same message (milliseconds).
    #[serde(default = "default_min_interval")]
    pub min_interval_ms: u64,
}

fn default_min_interval() -> u64 {
    1000
}

impl NotifierConfig {
    pub fn min_interval(&self) -> Duration {
        Duration::from_millis(self.min_interval_ms)
    }
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            min_interval_ms: default_min_interval(),
        }
    }
}
