//! Types for the downloader module.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::task::TaskId;

use super::error::DownloaderError;

/// Requested video quality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Quality {
    /// Best available video and audio.
    Best,
    /// Best video not taller than the given height.
    MaxHeight(u32),
}

impl Quality {
    /// Tiers offered to the operator, in display order.
    pub const OFFERED: [Quality; 4] = [
        Quality::Best,
        Quality::MaxHeight(1080),
        Quality::MaxHeight(720),
        Quality::MaxHeight(480),
    ];

    /// The yt-dlp format selector for this quality.
    pub fn selector(&self) -> String {
        match self {
            Self::Best => "bestvideo+bestaudio/best".to_string(),
            Self::MaxHeight(h) => {
                format!("bestvideo[height<={h}]+bestaudio/best[height<={h}]")
            }
        }
    }

    /// Human-facing label for quality pickers.
    pub fn label(&self) -> String {
        match self {
            Self::Best => "🏆 Best quality".to_string(),
            Self::MaxHeight(h) => format!("{h}p"),
        }
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Best => f.write_str("best"),
            Self::MaxHeight(h) => write!(f, "{h}"),
        }
    }
}

impl FromStr for Quality {
    type Err = DownloaderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "best" => Ok(Self::Best),
            other => other
                .trim_end_matches('p')
                .parse::<u32>()
                .ok()
                .filter(|h| *h > 0)
                .map(Self::MaxHeight)
                .ok_or_else(|| DownloaderError::InvalidQuality(s.to_string())),
        }
    }
}

impl TryFrom<String> for Quality {
    type Error = DownloaderError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Quality> for String {
    fn from(value: Quality) -> Self {
        value.to_string()
    }
}

/// Everything a downloader needs to retrieve one video.
#[derive(Debug, Clone)]
pub struct DownloadJob {
    pub task_id: TaskId,
    pub url: String,
    pub quality: Quality,
    pub output_path: PathBuf,
}

/// How a download phase ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    /// The artifact exists at the given path.
    Success(PathBuf),
    /// The process failed; carries the tail of its stderr.
    Failure(String),
    Cancelled,
}
