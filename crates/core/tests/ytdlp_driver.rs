//! yt-dlp driver tests against a scripted stand-in binary.

#![cfg(unix)]

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tempfile::TempDir;
use tokio::sync::mpsc;

use mediarelay_core::{
    downloader::{
        DownloadJob, DownloadOutcome, Downloader, DownloaderConfig, DownloaderError, Quality,
        YtDlpDownloader,
    },
    progress::ProgressSnapshot,
    task::{TaskContext, TaskId},
};

/// Writes an executable script that records its arguments next to itself.
fn fake_ytdlp(dir: &Path, body: &str) -> PathBuf {
    let path = dir.join("yt-dlp");
    let script = format!(
        "#!/bin/sh\necho \"$@\" > \"{}\"\n{}\n",
        dir.join("args.txt").display(),
        body
    );
    std::fs::write(&path, script).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// Shell snippet that finds the `-o` argument.
const FIND_OUTPUT: &str = r#"
out=""
prev=""
for arg in "$@"; do
  if [ "$prev" = "-o" ]; then out="$arg"; fi
  prev="$arg"
done
"#;

fn downloader(binary: &Path) -> YtDlpDownloader {
    YtDlpDownloader::new(DownloaderConfig {
        binary_path: binary.display().to_string(),
        ..Default::default()
    })
    .unwrap()
}

fn job(dir: &Path, url: &str) -> DownloadJob {
    DownloadJob {
        task_id: TaskId::new(),
        url: url.to_string(),
        quality: Quality::MaxHeight(720),
        output_path: dir.join("Movie.mp4"),
    }
}

async fn drain(mut rx: mpsc::Receiver<ProgressSnapshot>) -> Vec<u8> {
    let mut percents = Vec::new();
    while let Some(snapshot) = rx.recv().await {
        percents.push(snapshot.percent);
    }
    percents
}

#[tokio::test]
async fn test_download_success_reports_progress() {
    let dir = TempDir::new().unwrap();
    let body = format!(
        "{FIND_OUTPUT}\
printf '[info] Downloading 1 format(s): 22\\n'\n\
printf '[download]  10.0%% of 10.00MiB at 1.00MiB/s ETA 00:09\\r'\n\
printf '[download]  10.0%% of 10.00MiB at 1.00MiB/s ETA 00:09\\r'\n\
printf '[download]  55.5%% of 10.00MiB at 2.00MiB/s ETA 00:02\\r'\n\
printf '[download] 100.0%% of 10.00MiB at 2.00MiB/s ETA 00:00\\n'\n\
echo data > \"$out\"\n"
    );
    let binary = fake_ytdlp(dir.path(), &body);
    let downloader = downloader(&binary);
    let job = job(dir.path(), "https://example.com/watch?v=1");
    let ctx = TaskContext::detached(job.task_id);

    let (tx, rx) = mpsc::channel(16);
    let collector = tokio::spawn(drain(rx));
    let outcome = downloader.download(&job, &ctx, tx).await.unwrap();

    assert_eq!(outcome, DownloadOutcome::Success(job.output_path.clone()));
    assert_eq!(collector.await.unwrap(), vec![10, 55, 100]);

    let args = std::fs::read_to_string(dir.path().join("args.txt")).unwrap();
    assert!(args.contains("-f bestvideo[height<=720]+bestaudio/best[height<=720]"));
    assert!(args.contains("--remux-video mp4"));
    assert!(args.trim_end().ends_with("https://example.com/watch?v=1"));
}

#[tokio::test]
async fn test_download_failure_returns_stderr_tail() {
    let dir = TempDir::new().unwrap();
    let binary = fake_ytdlp(
        dir.path(),
        "echo 'ERROR: [generic] Unsupported URL: https://example.com' >&2\nexit 1",
    );
    let downloader = downloader(&binary);
    let job = job(dir.path(), "https://example.com");
    let ctx = TaskContext::detached(job.task_id);

    let (tx, _rx) = mpsc::channel(16);
    let outcome = downloader.download(&job, &ctx, tx).await.unwrap();

    let DownloadOutcome::Failure(reason) = outcome else {
        panic!("expected failure, got {outcome:?}");
    };
    assert!(reason.contains("Unsupported URL"));
}

#[tokio::test]
async fn test_zero_exit_without_file_is_failure() {
    let dir = TempDir::new().unwrap();
    let binary = fake_ytdlp(dir.path(), "exit 0");
    let downloader = downloader(&binary);
    let job = job(dir.path(), "https://example.com");
    let ctx = TaskContext::detached(job.task_id);

    let (tx, _rx) = mpsc::channel(16);
    let outcome = downloader.download(&job, &ctx, tx).await.unwrap();
    assert!(matches!(outcome, DownloadOutcome::Failure(_)));
}

#[tokio::test]
async fn test_cancel_terminates_running_process() {
    let dir = TempDir::new().unwrap();
    let body = "printf '[download]   5.0%% of 10.00MiB at 1.00MiB/s ETA 00:09\\r'\nsleep 30";
    let binary = fake_ytdlp(dir.path(), body);
    let downloader = downloader(&binary);
    let job = job(dir.path(), "https://example.com");
    let ctx = TaskContext::detached(job.task_id);

    let (tx, mut rx) = mpsc::channel(16);
    let canceller = {
        let ctx = ctx.clone();
        tokio::spawn(async move {
            let first = rx.recv().await;
            ctx.token().cancel();
            first
        })
    };

    let outcome = tokio::time::timeout(Duration::from_secs(10), downloader.download(&job, &ctx, tx))
        .await
        .expect("download did not stop after cancellation")
        .unwrap();

    assert_eq!(outcome, DownloadOutcome::Cancelled);
    assert_eq!(canceller.await.unwrap().map(|s| s.percent), Some(5));
}

#[tokio::test]
async fn test_mpd_url_is_rewritten_before_spawn() {
    let dir = TempDir::new().unwrap();
    let binary = fake_ytdlp(dir.path(), &format!("{FIND_OUTPUT}\necho data > \"$out\""));
    let downloader = downloader(&binary);
    let job = job(
        dir.path(),
        "https://vod.example.net/path/mpd-cenc.ism/web.mpd?token=1",
    );
    let ctx = TaskContext::detached(job.task_id);

    let (tx, _rx) = mpsc::channel(16);
    downloader.download(&job, &ctx, tx).await.unwrap();

    let args = std::fs::read_to_string(dir.path().join("args.txt")).unwrap();
    assert!(args.contains("https://vod.example.net/path/main.ism/picky.m3u8?token=1"));
    assert!(!args.contains("mpd-cenc"));
}

#[tokio::test]
async fn test_fetch_title() {
    let dir = TempDir::new().unwrap();
    let binary = fake_ytdlp(dir.path(), "echo 'Fake Title'");
    let downloader = downloader(&binary);

    let title = downloader.fetch_title("https://example.com").await.unwrap();
    assert_eq!(title, "Fake Title");

    let args = std::fs::read_to_string(dir.path().join("args.txt")).unwrap();
    assert!(args.contains("--get-title"));
}

#[tokio::test]
async fn test_fetch_title_failure() {
    let dir = TempDir::new().unwrap();
    let binary = fake_ytdlp(dir.path(), "echo 'ERROR: private video' >&2\nexit 1");
    let downloader = downloader(&binary);

    let err = downloader.fetch_title("https://example.com").await.unwrap_err();
    assert!(matches!(err, DownloaderError::TitleLookupFailed(reason) if reason.contains("private video")));
}
