//! Download driver.
//!
//! Runs the external retrieval process (yt-dlp) for one task, turns its
//! carriage-return framed progress output into [`ProgressSnapshot`]s, and
//! tears down the whole process tree on cancellation.
//!
//! [`ProgressSnapshot`]: crate::progress::ProgressSnapshot

mod config;
mod error;
mod process;
mod rewrite;
mod traits;
mod types;
mod ytdlp;

pub use config::{DownloaderConfig, UrlRewriteRule};
pub use error::DownloaderError;
pub use process::{terminate_tree, ProcessTree};
pub use rewrite::UrlRewriter;
pub use traits::Downloader;
pub use types::{DownloadJob, DownloadOutcome, Quality};
pub use ytdlp::{YtDlpDownloader, STDERR_TAIL_CHARS};
