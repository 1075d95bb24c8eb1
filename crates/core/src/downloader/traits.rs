//! Trait definitions for the downloader module.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::progress::ProgressSnapshot;
use crate::task::TaskContext;

use super::error::DownloaderError;
use super::types::{DownloadJob, DownloadOutcome};

/// Drives an external retrieval process for one task.
#[async_trait]
pub trait Downloader: Send + Sync {
    /// Returns the name of this downloader implementation.
    fn name(&self) -> &str;

    /// File extension of the artifacts this downloader produces.
    fn artifact_extension(&self) -> &str {
        "mp4"
    }

    /// Looks up the title of the video behind `url`.
    async fn fetch_title(&self, url: &str) -> Result<String, DownloaderError>;

    /// Runs the download until it exits or `ctx` is cancelled.
    ///
    /// Progress snapshots are sent on `progress_tx` with non-decreasing
    /// percent. A process that fails is reported as
    /// [`DownloadOutcome::Failure`], not as an error; errors are reserved for
    /// not being able to run the process at all.
    async fn download(
        &self,
        job: &DownloadJob,
        ctx: &TaskContext,
        progress_tx: mpsc::Sender<ProgressSnapshot>,
    ) -> Result<DownloadOutcome, DownloaderError>;

    /// Checks that the downloader can run (binary present).
    async fn validate(&self) -> Result<(), DownloaderError> {
        Ok(())
    }
}
