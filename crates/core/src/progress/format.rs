//! Human-readable rendering helpers.

/// Number of segments in a rendered progress bar.
pub const PROGRESS_BAR_SEGMENTS: usize = 20;

const FILLED: char = '█';
const EMPTY: char = '░';

/// Renders a fixed-width bar with one filled segment per 5%.
pub fn progress_bar(percent: u8) -> String {
    let filled = (percent.min(100) as usize * PROGRESS_BAR_SEGMENTS) / 100;
    (0..PROGRESS_BAR_SEGMENTS)
        .map(|i| if i < filled { FILLED } else { EMPTY })
        .collect()
}

/// Formats a byte count with 1024-based units.
pub fn human_readable_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];

    if bytes == 0 {
        return "0 B".to_string();
    }

    let mut exp = 0;
    let mut scaled = bytes;
    while scaled >= 1024 && exp < UNITS.len() - 1 {
        scaled /= 1024;
        exp += 1;
    }

    if exp == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.2} {}", bytes as f64 / 1024f64.powi(exp as i32), UNITS[exp])
    }
}

/// Formats seconds as `MM:SS`, or `H:MM:SS` past the hour.
pub fn format_eta(secs: u64) -> String {
    let hours = secs / 3600;
    let minutes = (secs % 3600) / 60;
    let seconds = secs % 60;
    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{:02}:{:02}", minutes, seconds)
    }
}
