//! Prometheus metrics for observability.
//!
//! This module provides metrics for monitoring the relay server:
//! - HTTP request metrics (latency, counts)
//! - Telegram update and API error counts
//! - Task counts by state (collected dynamically)

use once_cell::sync::Lazy;
use prometheus::{
    self, Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, IntGaugeVec, Opts,
    Registry, TextEncoder,
};

use mediarelay_core::TaskState;

/// Global metrics registry.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

// =============================================================================
// HTTP Request Metrics
// =============================================================================

/// HTTP request duration in seconds.
pub static HTTP_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "mediarelay_http_request_duration_seconds",
            "HTTP request duration in seconds",
        )
        .buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0]),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests total count.
pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("mediarelay_http_requests_total", "Total HTTP requests"),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests currently in flight.
pub static HTTP_REQUESTS_IN_FLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "mediarelay_http_requests_in_flight",
        "Number of HTTP requests currently being processed",
    )
    .unwrap()
});

// =============================================================================
// Telegram Metrics
// =============================================================================

/// Updates received from Telegram by kind.
pub static TELEGRAM_UPDATES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "mediarelay_telegram_updates_total",
            "Telegram updates received",
        ),
        &["kind"],
    )
    .unwrap()
});

/// Failed Bot API calls by method.
pub static TELEGRAM_API_ERRORS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "mediarelay_telegram_api_errors_total",
            "Failed Telegram Bot API calls",
        ),
        &["method"],
    )
    .unwrap()
});

// =============================================================================
// Task Metrics (collected dynamically)
// =============================================================================

/// Tasks by current state.
pub static TASKS_BY_STATE: Lazy<IntGaugeVec> = Lazy::new(|| {
    IntGaugeVec::new(
        Opts::new("mediarelay_tasks_by_state", "Current task count by state"),
        &["state"],
    )
    .unwrap()
});

/// Whether new tasks are accepted (1) or the relay is shutting down (0).
pub static ACCEPTING_TASKS: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "mediarelay_accepting_tasks",
        "Whether new tasks are accepted (1) or not (0)",
    )
    .unwrap()
});

// =============================================================================
// Registration
// =============================================================================

fn register_metrics(registry: &Registry) {
    // HTTP
    registry
        .register(Box::new(HTTP_REQUEST_DURATION.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_TOTAL.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_IN_FLIGHT.clone()))
        .unwrap();

    // Telegram
    registry
        .register(Box::new(TELEGRAM_UPDATES_TOTAL.clone()))
        .unwrap();
    registry
        .register(Box::new(TELEGRAM_API_ERRORS_TOTAL.clone()))
        .unwrap();

    // Tasks
    registry
        .register(Box::new(TASKS_BY_STATE.clone()))
        .unwrap();
    registry
        .register(Box::new(ACCEPTING_TASKS.clone()))
        .unwrap();

    // Core metrics (task lifecycle, phases, notifications)
    for metric in mediarelay_core::metrics::all_metrics() {
        registry.register(metric).unwrap();
    }
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer).unwrap();
    String::from_utf8(buffer).unwrap()
}

/// Collect dynamic metrics from current application state.
pub fn collect_dynamic_metrics(state: &crate::state::AppState) {
    let orchestrator = state.orchestrator();
    ACCEPTING_TASKS.set(if orchestrator.status().accepting { 1 } else { 0 });

    let tasks = orchestrator.list_tasks();
    for task_state in [
        TaskState::Created,
        TaskState::Downloading,
        TaskState::Uploading,
        TaskState::Completed,
        TaskState::Failed,
        TaskState::Cancelled,
    ] {
        let count = tasks.iter().filter(|t| t.state == task_state).count();
        TASKS_BY_STATE
            .with_label_values(&[task_state.as_str()])
            .set(count as i64);
    }
}

/// Normalize a path for metric labels (replace IDs with placeholders).
pub fn normalize_path(path: &str) -> String {
    let uuid_regex = regex_lite::Regex::new(
        r"[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}",
    )
    .unwrap();
    let numeric_regex = regex_lite::Regex::new(r"/\d+(/|$)").unwrap();

    let result = uuid_regex.replace_all(path, "{id}");
    let result = numeric_regex.replace_all(&result, "/{id}$1");
    result.to_string()
}
