//! Mock downloader for testing.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, RwLock};

use crate::downloader::{DownloadJob, DownloadOutcome, Downloader, DownloaderError};
use crate::progress::{Phase, ProgressSnapshot};
use crate::task::TaskContext;

/// How a mock download ends after its progress steps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockDownloadBehavior {
    /// Writes the artifact and succeeds.
    Succeed,
    /// Exits with the given stderr tail.
    Fail(String),
    /// Keeps running until cancelled.
    Hang,
}

/// Mock implementation of the Downloader trait.
///
/// Writes a partial artifact as soon as the download starts, emits one
/// snapshot per configured percent step, then ends according to its
/// [`MockDownloadBehavior`]. Cancellation is honoured between steps.
#[derive(Debug)]
pub struct MockDownloader {
    behavior: Arc<RwLock<MockDownloadBehavior>>,
    steps: Arc<RwLock<Vec<u8>>>,
    step_delay: Arc<RwLock<Duration>>,
    file_size: Arc<RwLock<u64>>,
    title: Arc<RwLock<Option<String>>>,
    jobs: Arc<RwLock<Vec<DownloadJob>>>,
}

impl Default for MockDownloader {
    fn default() -> Self {
        Self::new()
    }
}

impl MockDownloader {
    pub fn new() -> Self {
        Self {
            behavior: Arc::new(RwLock::new(MockDownloadBehavior::Succeed)),
            steps: Arc::new(RwLock::new(vec![10, 50, 100])),
            step_delay: Arc::new(RwLock::new(Duration::from_millis(5))),
            file_size: Arc::new(RwLock::new(1024)),
            title: Arc::new(RwLock::new(Some("Mock Title".to_string()))),
            jobs: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub async fn set_behavior(&self, behavior: MockDownloadBehavior) {
        *self.behavior.write().await = behavior;
    }

    /// Percent values reported, in order.
    pub async fn set_steps(&self, steps: Vec<u8>) {
        *self.steps.write().await = steps;
    }

    pub async fn set_step_delay(&self, delay: Duration) {
        *self.step_delay.write().await = delay;
    }

    pub async fn set_file_size(&self, bytes: u64) {
        *self.file_size.write().await = bytes;
    }

    /// `None` makes title lookups fail.
    pub async fn set_title(&self, title: Option<String>) {
        *self.title.write().await = title;
    }

    pub async fn recorded_jobs(&self) -> Vec<DownloadJob> {
        self.jobs.read().await.clone()
    }
}

#[async_trait]
impl Downloader for MockDownloader {
    fn name(&self) -> &str {
        "mock"
    }

    async fn fetch_title(&self, url: &str) -> Result<String, DownloaderError> {
        self.title
            .read()
            .await
            .clone()
            .ok_or_else(|| DownloaderError::title_lookup_failed(format!("no title for {url}")))
    }

    async fn download(
        &self,
        job: &DownloadJob,
        ctx: &TaskContext,
        progress_tx: mpsc::Sender<ProgressSnapshot>,
    ) -> Result<DownloadOutcome, DownloaderError> {
        self.jobs.write().await.push(job.clone());

        let size = *self.file_size.read().await;
        let steps = self.steps.read().await.clone();
        let delay = *self.step_delay.read().await;
        let behavior = self.behavior.read().await.clone();

        // Partial artifact, like a real retrieval process leaves behind
        tokio::fs::write(&job.output_path, vec![0u8; (size / 2) as usize]).await?;

        for percent in steps {
            tokio::select! {
                biased;
                _ = ctx.cancelled() => return Ok(DownloadOutcome::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }
            let bytes_done = size * percent as u64 / 100;
            let _ = progress_tx
                .send(ProgressSnapshot {
                    phase: Phase::Download,
                    percent,
                    bytes_done,
                    bytes_total: size,
                    rate_bytes_per_sec: 1024.0,
                    eta_secs: Some((size - bytes_done) / 1024),
                    size_text: None,
                    rate_text: None,
                })
                .await;
        }

        match behavior {
            MockDownloadBehavior::Succeed => {
                tokio::fs::write(&job.output_path, vec![0u8; size as usize]).await?;
                Ok(DownloadOutcome::Success(job.output_path.clone()))
            }
            MockDownloadBehavior::Fail(stderr) => Ok(DownloadOutcome::Failure(stderr)),
            MockDownloadBehavior::Hang => {
                ctx.cancelled().await;
                Ok(DownloadOutcome::Cancelled)
            }
        }
    }
}
