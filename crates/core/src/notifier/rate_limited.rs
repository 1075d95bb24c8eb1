//! Rate-limited progress rendering.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::metrics;
use crate::progress::{Phase, ProgressSnapshot};

use super::render::render_progress;
use super::traits::{Action, MessageRef, NotificationSink, NotificationTarget};

/// Per-message bookkeeping.
#[derive(Debug, Default)]
struct TargetState {
    phase: Option<Phase>,
    last_sent_at: Option<Instant>,
    last_percent: Option<u8>,
    /// Latest snapshot that was suppressed by the interval.
    pending: Option<ProgressSnapshot>,
}

impl TargetState {
    fn reset_for(&mut self, phase: Phase) {
        self.phase = Some(phase);
        self.last_sent_at = None;
        self.last_percent = None;
        self.pending = None;
    }
}

/// Collapses progress bursts into at most one render per interval per message.
///
/// A snapshot is rendered only when the minimum interval has elapsed since
/// the previous render of the same message and its percent differs from the
/// last rendered one. Suppressed snapshots are remembered and can be pushed
/// out with [`RateLimitedNotifier::flush`]. Sink failures never propagate.
pub struct RateLimitedNotifier {
    sink: Arc<dyn NotificationSink>,
    min_interval: Duration,
    state: Mutex<HashMap<MessageRef, TargetState>>,
}

impl RateLimitedNotifier {
    pub fn new(sink: Arc<dyn NotificationSink>, min_interval: Duration) -> Self {
        Self {
            sink,
            min_interval,
            state: Mutex::new(HashMap::new()),
        }
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    fn lock_state(&self) -> MutexGuard<'_, HashMap<MessageRef, TargetState>> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Offers a progress snapshot for rendering.
    ///
    /// Returns true when the snapshot was handed to the sink.
    pub async fn notify(&self, target: &NotificationTarget, snapshot: ProgressSnapshot) -> bool {
        let should_send = {
            let mut state = self.lock_state();
            let entry = state.entry(target.message).or_default();

            if entry.phase != Some(snapshot.phase) {
                entry.reset_for(snapshot.phase);
            }

            let interval_elapsed = entry
                .last_sent_at
                .map(|at| at.elapsed() >= self.min_interval)
                .unwrap_or(true);
            let percent_changed = entry.last_percent != Some(snapshot.percent);

            if interval_elapsed && percent_changed {
                entry.last_sent_at = Some(Instant::now());
                entry.last_percent = Some(snapshot.percent);
                entry.pending = None;
                true
            } else {
                if percent_changed {
                    entry.pending = Some(snapshot.clone());
                }
                false
            }
        };

        if !should_send {
            debug!(
                message_id = target.message.message_id,
                percent = snapshot.percent,
                "Progress render suppressed"
            );
            return false;
        }

        let text = render_progress(&target.title, &snapshot);
        self.deliver(&target.message, &text, &target.actions).await;
        true
    }

    /// Renders the last suppressed snapshot, if any.
    ///
    /// Used when a phase ends so the final observed value is shown.
    pub async fn flush(&self, target: &NotificationTarget) -> bool {
        let pending = {
            let mut state = self.lock_state();
            match state.get_mut(&target.message) {
                Some(entry) => {
                    let pending = entry.pending.take();
                    if let Some(snapshot) = &pending {
                        entry.last_sent_at = Some(Instant::now());
                        entry.last_percent = Some(snapshot.percent);
                    }
                    pending
                }
                None => None,
            }
        };

        match pending {
            Some(snapshot) => {
                let text = render_progress(&target.title, &snapshot);
                self.deliver(&target.message, &text, &target.actions)
                    .await;
                true
            }
            None => false,
        }
    }

    /// Renders arbitrary text, bypassing rate limiting.
    ///
    /// Used for phase transitions and terminal messages.
    pub async fn render_text(&self, message: &MessageRef, text: &str, actions: &[Action]) {
        self.deliver(message, text, actions).await;
    }

    /// Drops all state kept for a message.
    pub fn forget(&self, message: &MessageRef) {
        self.lock_state().remove(message);
    }

    /// Number of messages currently tracked.
    pub fn tracked(&self) -> usize {
        self.lock_state().len()
    }

    async fn deliver(&self, message: &MessageRef, text: &str, actions: &[Action]) {
        match self.sink.render(message, text, actions).await {
            Ok(()) => {
                metrics::NOTIFICATIONS_TOTAL
                    .with_label_values(&["delivered"])
                    .inc();
            }
            Err(e) if e.is_benign() => {
                metrics::NOTIFICATIONS_TOTAL
                    .with_label_values(&["unchanged"])
                    .inc();
            }
            Err(e) => {
                metrics::NOTIFICATIONS_TOTAL
                    .with_label_values(&["failed"])
                    .inc();
                warn!(
                    sink = self.sink.name(),
                    chat_id = message.chat_id,
                    message_id = message.message_id,
                    error = %e,
                    "Failed to render notification"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifier::NotifyError;
    use crate::testing::{fixtures, MockNotificationSink};

    fn target() -> NotificationTarget {
        fixtures::target(1, 10, "Movie")
    }

    fn download(percent: u8) -> ProgressSnapshot {
        ProgressSnapshot {
            phase: Phase::Download,
            percent,
            bytes_done: percent as u64,
            bytes_total: 100,
            rate_bytes_per_sec: 1.0,
            eta_secs: None,
            size_text: None,
            rate_text: None,
        }
    }

    #[tokio::test]
    async fn test_first_snapshot_is_sent() {
        let sink = Arc::new(MockNotificationSink::new());
        let notifier = RateLimitedNotifier::new(sink.clone(), Duration::from_secs(60));

        assert!(notifier.notify(&target(), download(1)).await);
        assert_eq!(sink.render_count().await, 1);
        assert!(sink.last_text().await.unwrap().contains("1%"));
    }

    #[tokio::test]
    async fn test_burst_within_interval_is_collapsed() {
        let sink = Arc::new(MockNotificationSink::new());
        let notifier = RateLimitedNotifier::new(sink.clone(), Duration::from_secs(60));
        let target = target();

        for percent in 1..=10 {
            notifier.notify(&target, download(percent)).await;
        }
        assert_eq!(sink.render_count().await, 1);

        assert!(notifier.flush(&target).await);
        assert_eq!(sink.render_count().await, 2);
        assert!(sink.last_text().await.unwrap().contains("10%"));

        // Nothing left to flush
        assert!(!notifier.flush(&target).await);
    }

    #[tokio::test]
    async fn test_unchanged_percent_is_not_resent() {
        let sink = Arc::new(MockNotificationSink::new());
        let notifier = RateLimitedNotifier::new(sink.clone(), Duration::ZERO);
        let target = target();

        assert!(notifier.notify(&target, download(5)).await);
        assert!(!notifier.notify(&target, download(5)).await);
        assert!(notifier.notify(&target, download(6)).await);
        assert_eq!(sink.render_count().await, 2);
    }

    #[tokio::test]
    async fn test_phase_change_resets_state() {
        let sink = Arc::new(MockNotificationSink::new());
        let notifier = RateLimitedNotifier::new(sink.clone(), Duration::from_secs(60));
        let target = target();

        assert!(notifier.notify(&target, download(100)).await);

        let upload = ProgressSnapshot::starting(Phase::Upload, 100);
        assert!(notifier.notify(&target, upload).await);
        assert_eq!(sink.render_count().await, 2);
        assert!(sink.last_text().await.unwrap().starts_with("📤"));
    }

    #[tokio::test]
    async fn test_sink_failure_is_swallowed() {
        let sink = Arc::new(MockNotificationSink::new());
        sink.set_failure(NotifyError::MessageNotFound("gone".into()))
            .await;
        let notifier = RateLimitedNotifier::new(sink.clone(), Duration::ZERO);

        assert!(notifier.notify(&target(), download(1)).await);
        notifier
            .render_text(&target().message, "done", &[])
            .await;
        assert_eq!(sink.render_count().await, 0);
        assert_eq!(sink.attempt_count().await, 2);
    }

    #[tokio::test]
    async fn test_forget_drops_state() {
        let sink = Arc::new(MockNotificationSink::new());
        let notifier = RateLimitedNotifier::new(sink.clone(), Duration::from_secs(60));
        let target = target();

        notifier.notify(&target, download(1)).await;
        assert_eq!(notifier.tracked(), 1);

        notifier.forget(&target.message);
        assert_eq!(notifier.tracked(), 0);

        // Fresh state: next snapshot goes through immediately
        assert!(notifier.notify(&target, download(2)).await);
    }
}
