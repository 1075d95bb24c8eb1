//! yt-dlp based downloader implementation.

use std::process::{ExitStatus, Stdio};

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::progress::{parse_download_line, ProgressSnapshot};
use crate::task::TaskContext;

use super::config::DownloaderConfig;
use super::error::DownloaderError;
use super::process::terminate_tree;
use super::rewrite::UrlRewriter;
use super::traits::Downloader;
use super::types::{DownloadJob, DownloadOutcome};

/// Characters of stderr kept for failure reports.
pub const STDERR_TAIL_CHARS: usize = 1000;

/// Bytes of stderr buffered before older output is discarded.
const STDERR_BUFFER_BYTES: usize = 16 * 1024;

/// Downloader that shells out to yt-dlp.
pub struct YtDlpDownloader {
    config: DownloaderConfig,
    rewriter: UrlRewriter,
}

impl YtDlpDownloader {
    pub fn new(config: DownloaderConfig) -> Result<Self, DownloaderError> {
        let rewriter = UrlRewriter::new(&config.rewrite_rules)?;
        Ok(Self { config, rewriter })
    }

    pub fn with_defaults() -> Result<Self, DownloaderError> {
        Self::new(DownloaderConfig::default())
    }

    pub fn config(&self) -> &DownloaderConfig {
        &self.config
    }

    fn header_args(&self) -> Vec<String> {
        self.config
            .headers
            .iter()
            .flat_map(|(name, value)| ["--add-header".to_string(), format!("{name}: {value}")])
            .collect()
    }

    /// Builds the yt-dlp argument list for a download.
    pub fn build_args(&self, job: &DownloadJob, url: &str) -> Vec<String> {
        let mut args = vec![
            "-f".to_string(),
            job.quality.selector(),
            "--remux-video".to_string(),
            self.config.remux_video.clone(),
        ];
        args.extend(self.header_args());
        args.extend(self.config.extra_args.iter().cloned());
        args.push("-o".to_string());
        args.push(job.output_path.to_string_lossy().into_owned());
        args.push(url.to_string());
        args
    }

    /// Builds the yt-dlp argument list for a title lookup.
    pub fn build_title_args(&self, url: &str) -> Vec<String> {
        let mut args = vec!["--get-title".to_string(), "--no-warnings".to_string()];
        args.extend(self.header_args());
        args.push(url.to_string());
        args
    }

    fn spawn_error(&self, e: std::io::Error) -> DownloaderError {
        if e.kind() == std::io::ErrorKind::NotFound {
            DownloaderError::BinaryNotFound(self.config.binary_path.clone())
        } else {
            DownloaderError::Io(e)
        }
    }

    /// Kills the process tree and reaps the child.
    async fn abort(child: &mut Child, ctx: &TaskContext, stderr_task: JoinHandle<String>) {
        if let Some(pid) = child.id() {
            match tokio::task::spawn_blocking(move || terminate_tree(pid)).await {
                Ok(count) => debug!(task_id = %ctx.task_id(), pid, count, "Terminated process tree"),
                Err(e) => warn!(task_id = %ctx.task_id(), error = %e, "Process tree termination panicked"),
            }
        }
        if let Err(e) = child.kill().await {
            debug!(task_id = %ctx.task_id(), error = %e, "Child already exited");
        }
        stderr_task.abort();
        ctx.detach_process();
    }

    async fn finish(
        &self,
        job: &DownloadJob,
        status: ExitStatus,
        stderr_tail: String,
    ) -> DownloadOutcome {
        let exists = tokio::fs::try_exists(&job.output_path)
            .await
            .unwrap_or(false);

        if status.success() && exists {
            info!(task_id = %job.task_id, path = %job.output_path.display(), "Download finished");
            return DownloadOutcome::Success(job.output_path.clone());
        }

        let reason = if !stderr_tail.trim().is_empty() {
            stderr_tail.trim().to_string()
        } else if status.success() {
            "yt-dlp exited successfully but produced no output file".to_string()
        } else {
            format!("yt-dlp exited with {status}")
        };
        warn!(task_id = %job.task_id, %status, "Download failed");
        DownloadOutcome::Failure(reason)
    }
}

#[async_trait]
impl Downloader for YtDlpDownloader {
    fn name(&self) -> &str {
        "yt-dlp"
    }

    fn artifact_extension(&self) -> &str {
        &self.config.remux_video
    }

    async fn fetch_title(&self, url: &str) -> Result<String, DownloaderError> {
        let url = self.rewriter.rewrite(url);
        let output = Command::new(&self.config.binary_path)
            .args(self.build_title_args(&url))
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| self.spawn_error(e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(DownloaderError::title_lookup_failed(tail_chars(
                stderr.trim(),
                STDERR_TAIL_CHARS,
            )));
        }

        String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .map(str::to_string)
            .ok_or_else(|| DownloaderError::title_lookup_failed("yt-dlp returned an empty title"))
    }

    async fn download(
        &self,
        job: &DownloadJob,
        ctx: &TaskContext,
        progress_tx: mpsc::Sender<ProgressSnapshot>,
    ) -> Result<DownloadOutcome, DownloaderError> {
        if ctx.is_cancelled() {
            return Ok(DownloadOutcome::Cancelled);
        }

        let url = self.rewriter.rewrite(&job.url);
        let args = self.build_args(job, &url);
        info!(task_id = %job.task_id, quality = %job.quality, "Starting yt-dlp");
        debug!(task_id = %job.task_id, ?args, "yt-dlp arguments");

        let mut child = Command::new(&self.config.binary_path)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| self.spawn_error(e))?;

        if let Some(pid) = child.id() {
            ctx.attach_process(pid);
        }

        let (Some(mut stdout), Some(stderr)) = (child.stdout.take(), child.stderr.take()) else {
            let _ = child.kill().await;
            ctx.detach_process();
            return Err(DownloaderError::Io(std::io::Error::other(
                "yt-dlp output pipes were not captured",
            )));
        };
        let stderr_task = tokio::spawn(collect_tail(stderr, STDERR_TAIL_CHARS));

        let mut frames = FrameBuffer::default();
        let mut buf = vec![0u8; self.config.read_chunk_bytes.max(1)];
        let mut last_percent: Option<u8> = None;

        loop {
            let read = tokio::select! {
                biased;
                _ = ctx.cancelled() => None,
                read = stdout.read(&mut buf) => Some(read),
            };

            let (lines, eof) = match read {
                None => {
                    info!(task_id = %job.task_id, "Download cancelled");
                    Self::abort(&mut child, ctx, stderr_task).await;
                    return Ok(DownloadOutcome::Cancelled);
                }
                Some(Ok(0)) => (frames.finish(), true),
                Some(Ok(n)) => (frames.push(&buf[..n]), false),
                Some(Err(e)) => {
                    warn!(task_id = %job.task_id, error = %e, "Failed to read yt-dlp output");
                    (frames.finish(), true)
                }
            };

            for line in &lines {
                let Some(snapshot) = parse_download_line(line) else {
                    continue;
                };
                if last_percent.is_some_and(|p| snapshot.percent <= p) {
                    continue;
                }
                last_percent = Some(snapshot.percent);
                let _ = progress_tx.send(snapshot).await;
            }

            if eof {
                break;
            }
        }

        let status = tokio::select! {
            biased;
            _ = ctx.cancelled() => None,
            status = child.wait() => Some(status),
        };

        let status = match status {
            Some(status) => status?,
            None => {
                info!(task_id = %job.task_id, "Download cancelled while exiting");
                Self::abort(&mut child, ctx, stderr_task).await;
                return Ok(DownloadOutcome::Cancelled);
            }
        };
        ctx.detach_process();

        if ctx.is_cancelled() {
            stderr_task.abort();
            return Ok(DownloadOutcome::Cancelled);
        }

        let stderr_tail = stderr_task.await.unwrap_or_default();
        Ok(self.finish(job, status, stderr_tail).await)
    }

    async fn validate(&self) -> Result<(), DownloaderError> {
        let output = Command::new(&self.config.binary_path)
            .arg("--version")
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| self.spawn_error(e))?;

        if !output.status.success() {
            return Err(DownloaderError::BinaryNotFound(format!(
                "{} --version exited with {}",
                self.config.binary_path, output.status
            )));
        }
        Ok(())
    }
}

/// Splits a byte stream into CR- or LF-terminated text frames.
#[derive(Debug, Default)]
struct FrameBuffer {
    pending: Vec<u8>,
}

impl FrameBuffer {
    /// Appends bytes and returns every frame completed by them.
    fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        let mut frames = Vec::new();
        for &b in bytes {
            if b == b'\r' || b == b'\n' {
                if !self.pending.is_empty() {
                    frames.push(String::from_utf8_lossy(&self.pending).into_owned());
                    self.pending.clear();
                }
            } else {
                self.pending.push(b);
            }
        }
        frames
    }

    /// Returns the unterminated remainder, if any.
    fn finish(&mut self) -> Vec<String> {
        if self.pending.is_empty() {
            return Vec::new();
        }
        let frame = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        vec![frame]
    }
}

/// Drains a stream and returns its last `max_chars` characters.
async fn collect_tail<R>(mut reader: R, max_chars: usize) -> String
where
    R: AsyncRead + Unpin,
{
    let mut kept: Vec<u8> = Vec::new();
    let mut buf = [0u8; 1024];
    loop {
        match reader.read(&mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                kept.extend_from_slice(&buf[..n]);
                if kept.len() > STDERR_BUFFER_BYTES {
                    let excess = kept.len() - STDERR_BUFFER_BYTES;
                    kept.drain(..excess);
                }
            }
        }
    }
    tail_chars(&String::from_utf8_lossy(&kept), max_chars)
}

/// The last `max_chars` characters of `text`.
pub(crate) fn tail_chars(text: &str, max_chars: usize) -> String {
    let count = text.chars().count();
    if count <= max_chars {
        return text.to_string();
    }
    text.chars().skip(count - max_chars).collect()
}
