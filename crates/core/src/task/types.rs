//! Task data types.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::downloader::Quality;
use crate::notifier::NotificationTarget;

/// Unique identifier of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(Uuid);

impl TaskId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TaskId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Lifecycle state of a task.
///
/// `Created -> Downloading -> Uploading -> Completed`, with `Failed` and
/// `Cancelled` reachable from any non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    Created,
    Downloading,
    Uploading,
    Completed,
    Failed,
    Cancelled,
}

impl TaskState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Downloading => "downloading",
            Self::Uploading => "uploading",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One unit of work: retrieve one video and store it remotely.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub source_url: String,
    pub display_name: String,
    pub quality: Quality,
    pub state: TaskState,
    /// OS pid of the external retrieval process while it runs.
    pub process_id: Option<u32>,
    /// Local file produced by the download phase.
    pub artifact_path: PathBuf,
    pub target: NotificationTarget,
    pub created_at: DateTime<Utc>,
}

/// Why a task failed.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum TaskFailure {
    /// No usable remote-storage credential.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// The external retrieval process failed; carries the tail of its stderr.
    #[error("retrieval failed: {0}")]
    Retrieval(String),

    /// The upload failed after authentication succeeded.
    #[error("transfer failed: {0}")]
    Transfer(String),

    #[error("internal error: {0}")]
    Internal(String),
}

/// Errors raised while creating a task.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TaskError {
    #[error("Invalid source URL: {0}")]
    InvalidUrl(String),

    #[error("Display name is empty after sanitization")]
    EmptyName,

    #[error("Task already registered: {0}")]
    AlreadyRegistered(TaskId),
}

static URL_SCHEME: Lazy<Regex> = Lazy::new(|| Regex::new(r"^https?://\S+$").unwrap());

/// Checks that a source URL uses http or https.
pub fn validate_source_url(url: &str) -> Result<(), TaskError> {
    if URL_SCHEME.is_match(url.trim()) {
        Ok(())
    } else {
        Err(TaskError::InvalidUrl(url.to_string()))
    }
}

/// Removes characters that are not allowed in file names.
pub fn sanitize_display_name(name: &str) -> Result<String, TaskError> {
    const FORBIDDEN: &[char] = &['\\', '/', '*', '?', ':', '"', '<', '>', '|'];

    let cleaned: String = name
        .chars()
        .filter(|c| !FORBIDDEN.contains(c) && !c.is_control())
        .collect();
    let cleaned = cleaned.trim().to_string();

    if cleaned.is_empty() {
        Err(TaskError::EmptyName)
    } else {
        Ok(cleaned)
    }
}
