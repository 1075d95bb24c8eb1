//! Downloader configuration.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A regex-based URL rewrite applied before handing a URL to yt-dlp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlRewriteRule {
    /// Name used in logs.
    pub name: String,
    /// Regex matched against the source URL.
    pub pattern: String,
    /// Replacement, may reference capture groups (`$1`).
    pub replacement: String,
}

/// Configuration for the yt-dlp downloader.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloaderConfig {
    /// Path to the yt-dlp binary.
    #[serde(default = "default_binary_path")]
    pub binary_path: String,

    /// Container passed to `--remux-video`. Also the artifact extension.
    #[serde(default = "default_remux_video")]
    pub remux_video: String,

    /// Extra HTTP headers passed with `--add-header`.
    #[serde(default = "default_headers")]
    pub headers: BTreeMap<String, String>,

    /// URL rewrites, applied in order. The first matching rule wins.
    #[serde(default = "default_rewrite_rules")]
    pub rewrite_rules: Vec<UrlRewriteRule>,

    /// Bytes read from stdout per read cycle.
    #[serde(default = "default_read_chunk_bytes")]
    pub read_chunk_bytes: usize,

    /// Additional raw arguments placed before the output flag.
    #[serde(default)]
    pub extra_args: Vec<String>,
}

fn default_binary_path() -> String {
    "yt-dlp".to_string()
}

fn default_remux_video() -> String {
    "mp4".to_string()
}

fn default_headers() -> BTreeMap<String, String> {
    let site = "https://www.mediasetinfinity.es".to_string();
    BTreeMap::from([
        ("Origin".to_string(), site.clone()),
        ("Referer".to_string(), site),
    ])
}

fn default_rewrite_rules() -> Vec<UrlRewriteRule> {
    vec![UrlRewriteRule {
        name: "mediaset-dash-to-hls".to_string(),
        pattern: r"(/mpd-cenc\.ism)/(web|ctv)?(\.mpd)".to_string(),
        replacement: "/main.ism/picky.m3u8".to_string(),
    }]
}

fn default_read_chunk_bytes() -> usize {
    1024
}

impl Default for DownloaderConfig {
    fn default() -> Self {
        Self {
            binary_path: default_binary_path(),
            remux_video: default_remux_video(),
            headers: default_headers(),
            rewrite_rules: default_rewrite_rules(),
            read_chunk_bytes: default_read_chunk_bytes(),
            extra_args: Vec::new(),
        }
    }
}
