//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Task lifecycle (started, finished by outcome, active)
//! - Phase durations (download, upload)
//! - Upload throughput
//! - Notification delivery

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts};

// =============================================================================
// Task Metrics
// =============================================================================

/// Tasks started.
pub static TASKS_STARTED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("mediarelay_tasks_started_total", "Total tasks started").unwrap()
});

/// Tasks finished by outcome.
pub static TASKS_FINISHED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("mediarelay_tasks_finished_total", "Total tasks finished"),
        &["outcome"], // "completed", "failed", "cancelled"
    )
    .unwrap()
});

/// Tasks currently registered.
pub static ACTIVE_TASKS: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new("mediarelay_active_tasks", "Number of tasks currently running").unwrap()
});

/// Phase duration in seconds.
pub static PHASE_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "mediarelay_phase_duration_seconds",
            "Duration of download and upload phases",
        )
        .buckets(vec![
            1.0, 5.0, 15.0, 30.0, 60.0, 120.0, 300.0, 600.0, 1800.0, 3600.0,
        ]),
        &["phase", "result"],
    )
    .unwrap()
});

// =============================================================================
// Transfer Metrics
// =============================================================================

/// Bytes confirmed by the storage service.
pub static BYTES_UPLOADED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "mediarelay_bytes_uploaded_total",
        "Total bytes confirmed by the storage service",
    )
    .unwrap()
});

/// Process trees terminated on cancellation.
pub static PROCESS_TREES_TERMINATED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "mediarelay_process_trees_terminated_total",
        "Retrieval process trees terminated on cancellation",
    )
    .unwrap()
});

// =============================================================================
// Notification Metrics
// =============================================================================

/// Notification deliveries by result.
pub static NOTIFICATIONS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "mediarelay_notifications_total",
            "Notification render attempts",
        ),
        &["result"], // "delivered", "unchanged", "failed"
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Tasks
        Box::new(TASKS_STARTED.clone()),
        Box::new(TASKS_FINISHED.clone()),
        Box::new(ACTIVE_TASKS.clone()),
        Box::new(PHASE_DURATION.clone()),
        // Transfers
        Box::new(BYTES_UPLOADED.clone()),
        Box::new(PROCESS_TREES_TERMINATED.clone()),
        // Notifications
        Box::new(NOTIFICATIONS_TOTAL.clone()),
    ]
}
