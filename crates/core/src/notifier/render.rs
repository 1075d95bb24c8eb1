use crate::progress::{format_eta, human_readable_size, progress_bar, Phase, ProgressSnapshot};

/// Renders the progress display for one snapshot.
pub fn render_progress(title: &str, snapshot: &ProgressSnapshot) -> String {
    let bar = progress_bar(snapshot.percent);
    let rate = format!(
        "{}/s",
        human_readable_size(snapshot.rate_bytes_per_sec.max(0.0) as u64)
    );
    let eta = snapshot
        .eta_secs
        .map(format_eta)
        .unwrap_or_else(|| "--:--".to_string());

    match snapshot.phase {
        Phase::Download => format!(
            "📥 Downloading: {}\n\n{} {}%\n\nSize: {} | Speed: {}\nETA: {}",
            title,
            bar,
            snapshot.percent,
            snapshot
                .size_text
                .clone()
                .unwrap_or_else(|| human_readable_size(snapshot.bytes_total)),
            snapshot.rate_text.as_deref().unwrap_or(&rate),
            eta
        ),
        Phase::Upload => format!(
            "📤 Uploading: {}\n\n{} {}%\n\nUploaded: {} / {}\nSpeed: {}\nETA: {}",
            title,
            bar,
            snapshot.percent,
            human_readable_size(snapshot.bytes_done),
            human_readable_size(snapshot.bytes_total),
            rate,
            eta
        ),
    }
}
