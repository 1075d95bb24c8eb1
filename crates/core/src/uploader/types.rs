//! Types for the uploader module.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::task::TaskId;

/// A bearer credential for the storage service.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    pub access_token: String,
}

impl Credential {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("access_token", &"[REDACTED]")
            .finish()
    }
}

/// Metadata of the remote object to create.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadMetadata {
    pub name: String,
    /// Destination folder; `None` uploads to the storage root.
    pub parent_folder_id: Option<String>,
    pub mime_type: String,
}

/// An open resumable upload.
#[derive(Debug, Clone)]
pub struct UploadSession {
    /// Opaque location chunks are sent to.
    pub session_uri: String,
    pub file_path: PathBuf,
    pub bytes_total: u64,
    /// Bytes the service has confirmed so far.
    pub bytes_done: u64,
    pub credential: Credential,
}

/// The object created by a completed upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteArtifact {
    pub remote_id: String,
    /// Link for viewing the object in the storage web UI.
    pub view_link: Option<String>,
}

/// Result of sending one chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChunkStatus {
    Progress { bytes_done: u64 },
    Complete(RemoteArtifact),
}

/// One file to upload.
#[derive(Debug, Clone)]
pub struct UploadJob {
    pub task_id: TaskId,
    pub file_path: PathBuf,
    /// Name of the remote object.
    pub remote_name: String,
}

/// Why an upload did not complete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadFailure {
    /// No usable credential; the storage service was never contacted.
    Auth(String),
    Transfer(String),
}

impl fmt::Display for UploadFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auth(reason) => write!(f, "authentication failed: {reason}"),
            Self::Transfer(reason) => write!(f, "transfer failed: {reason}"),
        }
    }
}

/// How an upload phase ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    Completed(RemoteArtifact),
    Failed(UploadFailure),
    Cancelled,
}
