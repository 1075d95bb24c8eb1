//! Progress value types.

use serde::{Deserialize, Serialize};

/// One of the two sequential stages of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Download,
    Upload,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Download => "download",
            Phase::Upload => "upload",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A normalized progress reading.
///
/// `percent` is always in `0..=100`. Within a phase the drivers only ever
/// emit non-decreasing percentages. When the source reports size and rate as
/// text, that text is kept verbatim alongside the byte counts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    pub phase: Phase,
    pub percent: u8,
    pub bytes_done: u64,
    pub bytes_total: u64,
    pub rate_bytes_per_sec: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eta_secs: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate_text: Option<String>,
}

impl ProgressSnapshot {
    /// A zeroed snapshot for the start of a phase.
    pub fn starting(phase: Phase, bytes_total: u64) -> Self {
        Self {
            phase,
            percent: 0,
            bytes_done: 0,
            bytes_total,
            rate_bytes_per_sec: 0.0,
            eta_secs: None,
            size_text: None,
            rate_text: None,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.percent >= 100
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_serialization() {
        assert_eq!(
            serde_json::to_string(&Phase::Download).unwrap(),
            "\"download\""
        );
        assert_eq!(Phase::Upload.to_string(), "upload");
    }

    #[test]
    fn test_starting_snapshot() {
        let snapshot = ProgressSnapshot::starting(Phase::Upload, 1024);
        assert_eq!(snapshot.percent, 0);
        assert_eq!(snapshot.bytes_total, 1024);
        assert!(!snapshot.is_complete());
    }
}
