//! Parsers turning raw progress readings into snapshots.

use once_cell::sync::Lazy;
use regex_lite::Regex;

use super::types::{Phase, ProgressSnapshot};

/// Matches the retrieval tool's in-place progress frame, e.g.
/// `[download]  42.0% of ~100.0MiB at 5.0MiB/s ETA 00:10`.
static DOWNLOAD_FRAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\[download\]\s+([0-9.]+)%\s+of\s+~?\s*([0-9.]+\s*[A-Za-z]+)\s+at\s+([0-9.]+\s*[A-Za-z]+)/s\s+ETA\s+([0-9:]+|Unknown)",
    )
    .expect("download progress pattern is valid")
});

/// Parses one progress frame from the retrieval process.
///
/// Returns `None` for anything that is not a complete progress frame, which
/// includes informational lines, partial frames and frames with unknown units.
pub fn parse_download_line(line: &str) -> Option<ProgressSnapshot> {
    let caps = DOWNLOAD_FRAME.captures(line)?;

    let raw_percent: f64 = caps.get(1)?.as_str().parse().ok()?;
    if !raw_percent.is_finite() || raw_percent < 0.0 {
        return None;
    }
    let percent = raw_percent.floor().min(100.0) as u8;

    let size_text = caps.get(2)?.as_str();
    let rate_text = caps.get(3)?.as_str();
    let bytes_total = parse_size(size_text)?;
    let rate = parse_size(rate_text)?;
    let eta_secs = parse_eta(caps.get(4)?.as_str());

    let bytes_done = (bytes_total as f64 * raw_percent.min(100.0) / 100.0) as u64;

    Some(ProgressSnapshot {
        phase: Phase::Download,
        percent,
        bytes_done,
        bytes_total,
        rate_bytes_per_sec: rate as f64,
        eta_secs,
        size_text: Some(size_text.to_string()),
        rate_text: Some(format!("{}/s", rate_text)),
    })
}

/// Builds an upload snapshot from chunk counters.
///
/// The rate is the instantaneous throughput since the previous reading and is
/// zero when no time has elapsed. The percentage is floored.
pub fn parse_upload_status(
    bytes_done: u64,
    bytes_total: u64,
    previous_bytes_done: u64,
    elapsed_secs: f64,
) -> ProgressSnapshot {
    let percent = if bytes_total == 0 {
        0
    } else {
        ((bytes_done as u128 * 100) / bytes_total as u128).min(100) as u8
    };

    let rate_bytes_per_sec = if elapsed_secs > 0.0 {
        bytes_done.saturating_sub(previous_bytes_done) as f64 / elapsed_secs
    } else {
        0.0
    };

    let eta_secs = if rate_bytes_per_sec > 0.0 {
        let remaining = bytes_total.saturating_sub(bytes_done);
        Some((remaining as f64 / rate_bytes_per_sec).ceil() as u64)
    } else {
        None
    };

    ProgressSnapshot {
        phase: Phase::Upload,
        percent,
        bytes_done,
        bytes_total,
        rate_bytes_per_sec,
        eta_secs,
        size_text: None,
        rate_text: None,
    }
}

/// Parses a human-readable size such as `123.4MB`, `5.0MiB` or `512B`.
pub fn parse_size(text: &str) -> Option<u64> {
    let text = text.trim();
    let split = text
        .find(|c: char| c.is_ascii_alphabetic())
        .unwrap_or(text.len());
    let (number, unit) = text.split_at(split);

    let value: f64 = number.trim().parse().ok()?;
    if !value.is_finite() || value < 0.0 {
        return None;
    }

    let multiplier: f64 = match unit.trim() {
        "" | "B" => 1.0,
        "KiB" => 1024.0,
        "MiB" => 1024.0 * 1024.0,
        "GiB" => 1024.0 * 1024.0 * 1024.0,
        "TiB" => 1024.0 * 1024.0 * 1024.0 * 1024.0,
        "KB" | "kB" => 1e3,
        "MB" => 1e6,
        "GB" => 1e9,
        "TB" => 1e12,
        _ => return None,
    };

    Some((value * multiplier).round() as u64)
}

/// Parses an ETA in `H:MM:SS` or `MM:SS` form into seconds.
pub fn parse_eta(text: &str) -> Option<u64> {
    let parts: Vec<&str> = text.trim().split(':').collect();
    if !(2..=3).contains(&parts.len()) {
        return None;
    }

    let mut total = 0u64;
    for part in parts {
        if part.is_empty() {
            return None;
        }
        total = total * 60 + part.parse::<u64>().ok()?;
    }
    Some(total)
}
