//! Upload phase driver.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::metrics;
use crate::progress::{parse_upload_status, ProgressSnapshot};
use crate::task::TaskContext;

use super::config::UploaderConfig;
use super::traits::{CredentialProvider, StorageService};
use super::types::{ChunkStatus, UploadFailure, UploadJob, UploadMetadata, UploadOutcome};

/// Drives a resumable upload chunk by chunk.
///
/// The credential is obtained before the storage service is contacted; a
/// missing credential fails the upload without any network traffic.
/// Cancellation is checked before every chunk, so an in-flight chunk is
/// allowed to finish.
pub struct UploadDriver {
    credentials: Arc<dyn CredentialProvider>,
    storage: Arc<dyn StorageService>,
    folder_id: Option<String>,
    mime_type: String,
}

impl UploadDriver {
    pub fn new(
        credentials: Arc<dyn CredentialProvider>,
        storage: Arc<dyn StorageService>,
        folder_id: Option<String>,
        mime_type: impl Into<String>,
    ) -> Self {
        Self {
            credentials,
            storage,
            folder_id,
            mime_type: mime_type.into(),
        }
    }

    pub fn from_config(
        config: &UploaderConfig,
        credentials: Arc<dyn CredentialProvider>,
        storage: Arc<dyn StorageService>,
    ) -> Self {
        let folder_id = Some(config.folder_id.trim())
            .filter(|id| !id.is_empty())
            .map(str::to_string);
        Self::new(credentials, storage, folder_id, config.mime_type.clone())
    }

    pub fn storage_name(&self) -> &str {
        self.storage.name()
    }

    /// Uploads `job.file_path`, reporting progress on `progress_tx`.
    pub async fn upload(
        &self,
        job: &UploadJob,
        ctx: &TaskContext,
        progress_tx: mpsc::Sender<ProgressSnapshot>,
    ) -> UploadOutcome {
        let credential = match self.credentials.get_credential().await {
            Ok(Some(credential)) => credential,
            Ok(None) => {
                warn!(task_id = %job.task_id, "No storage credential available");
                return UploadOutcome::Failed(UploadFailure::Auth(
                    "no valid credential available".to_string(),
                ));
            }
            Err(e) => {
                error!(task_id = %job.task_id, error = %e, "Failed to obtain storage credential");
                return UploadOutcome::Failed(UploadFailure::Auth(e.to_string()));
            }
        };

        if ctx.is_cancelled() {
            return UploadOutcome::Cancelled;
        }

        let metadata = UploadMetadata {
            name: job.remote_name.clone(),
            parent_folder_id: self.folder_id.clone(),
            mime_type: self.mime_type.clone(),
        };

        let mut session = match self
            .storage
            .create_upload_session(&credential, &metadata, &job.file_path)
            .await
        {
            Ok(session) => session,
            Err(e) => {
                error!(task_id = %job.task_id, error = %e, "Failed to open upload session");
                return if e.is_auth() {
                    UploadOutcome::Failed(UploadFailure::Auth(e.to_string()))
                } else {
                    UploadOutcome::Failed(UploadFailure::Transfer(e.to_string()))
                };
            }
        };

        info!(
            task_id = %job.task_id,
            storage = self.storage.name(),
            bytes = session.bytes_total,
            "Upload started"
        );

        let total = session.bytes_total;
        let mut previous_bytes = session.bytes_done;
        let mut last_percent = 0u8;
        let mut last_tick = Instant::now();

        loop {
            if ctx.is_cancelled() {
                info!(task_id = %job.task_id, bytes_done = previous_bytes, "Upload cancelled");
                return UploadOutcome::Cancelled;
            }

            let status = match self.storage.next_chunk(&mut session).await {
                Ok(status) => status,
                Err(e) => {
                    error!(task_id = %job.task_id, error = %e, "Chunk upload failed");
                    return UploadOutcome::Failed(UploadFailure::Transfer(e.to_string()));
                }
            };

            let bytes_done = match &status {
                ChunkStatus::Progress { bytes_done } => *bytes_done,
                ChunkStatus::Complete(_) => total,
            };

            let elapsed = last_tick.elapsed().as_secs_f64();
            let mut snapshot = parse_upload_status(bytes_done, total, previous_bytes, elapsed);
            snapshot.percent = snapshot.percent.max(last_percent);
            last_percent = snapshot.percent;

            metrics::BYTES_UPLOADED.inc_by(bytes_done.saturating_sub(previous_bytes));
            debug!(task_id = %job.task_id, bytes_done, total, "Chunk accepted");

            previous_bytes = bytes_done;
            last_tick = Instant::now();
            let _ = progress_tx.send(snapshot).await;

            if let ChunkStatus::Complete(artifact) = status {
                info!(task_id = %job.task_id, remote_id = %artifact.remote_id, "Upload finished");
                return UploadOutcome::Completed(artifact);
            }
        }
    }
}
