//! Task orchestrator implementation.
//!
//! Drives each task through its phases on its own tokio task:
//! - **Download**: the retrieval process writes the artifact into the task's
//!   working directory
//! - **Upload**: the artifact is pushed to remote storage chunk by chunk
//!
//! Phases are strictly sequential within a task; tasks run concurrently.
//! Whatever happens, the task's registry entry and working directory are
//! removed when its pipeline ends.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use chrono::Utc;
use tokio::sync::mpsc;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

use crate::downloader::{terminate_tree, DownloadJob, DownloadOutcome, Downloader};
use crate::metrics;
use crate::notifier::{Action, MessageRef, NotificationTarget, RateLimitedNotifier};
use crate::progress::{Phase, ProgressSnapshot};
use crate::task::{
    sanitize_display_name, validate_source_url, Task, TaskContext, TaskFailure, TaskId,
    TaskRegistry, TaskState,
};
use crate::uploader::{RemoteArtifact, UploadDriver, UploadFailure, UploadJob, UploadOutcome};

use super::config::OrchestratorConfig;
use super::messages;
use super::types::{
    CancelledTask, OrchestratorError, OrchestratorStatus, StartTaskRequest, TaskHandle,
    TaskOutcome,
};

/// Prefix of the callback token bound to a task's cancel action.
pub const CANCEL_TOKEN_PREFIX: &str = "cancel_";

/// The cancel action shown on every progress render of a task.
pub fn cancel_action(id: TaskId) -> Action {
    Action::callback("❌ Cancel", format!("{CANCEL_TOKEN_PREFIX}{id}"))
}

fn log_dir_removal(dir: &Path, result: std::io::Result<()>) {
    match result {
        Ok(()) => debug!(dir = %dir.display(), "Removed task directory"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(dir = %dir.display(), error = %e, "Failed to remove task directory"),
    }
}

/// Removes a task's working directory, ignoring a missing one.
fn remove_task_dir(dir: &Path) {
    log_dir_removal(dir, std::fs::remove_dir_all(dir));
}

async fn discard_task_dir(dir: &Path) {
    log_dir_removal(dir, tokio::fs::remove_dir_all(dir).await);
}

/// Finalizes a task when dropped, on every exit path including panics.
///
/// The working directory is normally removed by the pipeline itself; the
/// guard only falls back to a blocking removal when it is still set.
struct FinalizeGuard {
    id: TaskId,
    message: MessageRef,
    task_dir: Option<PathBuf>,
    registry: TaskRegistry,
    notifier: Arc<RateLimitedNotifier>,
}

impl Drop for FinalizeGuard {
    fn drop(&mut self) {
        self.registry.finalize(&self.id);
        self.notifier.forget(&self.message);
        if let Some(dir) = self.task_dir.take() {
            remove_task_dir(&dir);
        }
        metrics::ACTIVE_TASKS.dec();
        debug!(task_id = %self.id, "Task finalized");
    }
}

/// The task orchestrator.
///
/// Cheap to clone; clones share the registry and the spawned pipelines.
#[derive(Clone)]
pub struct TaskOrchestrator {
    config: Arc<OrchestratorConfig>,
    registry: TaskRegistry,
    downloader: Arc<dyn Downloader>,
    uploader: Arc<UploadDriver>,
    notifier: Arc<RateLimitedNotifier>,
    tracker: TaskTracker,
    shutting_down: Arc<AtomicBool>,
    /// Held while a task is admitted and while shutdown closes admission.
    admission: Arc<Mutex<()>>,
}

impl TaskOrchestrator {
    /// Create a new orchestrator.
    pub fn new(
        config: OrchestratorConfig,
        downloader: Arc<dyn Downloader>,
        uploader: Arc<UploadDriver>,
        notifier: Arc<RateLimitedNotifier>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            registry: TaskRegistry::new(),
            downloader,
            uploader,
            notifier,
            tracker: TaskTracker::new(),
            shutting_down: Arc::new(AtomicBool::new(false)),
            admission: Arc::new(Mutex::new(())),
        }
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub fn registry(&self) -> &TaskRegistry {
        &self.registry
    }

    fn lock_admission(&self) -> MutexGuard<'_, ()> {
        self.admission.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn task_dir(&self, id: &TaskId) -> PathBuf {
        self.config.work_dir.join(id.to_string())
    }

    /// Looks up the title for a URL through the downloader.
    pub async fn fetch_title(&self, url: &str) -> Result<String, OrchestratorError> {
        validate_source_url(url)?;
        Ok(self.downloader.fetch_title(url).await?)
    }

    /// Validates the request, registers a task and spawns its pipeline.
    pub async fn start_task(&self, req: StartTaskRequest) -> Result<TaskHandle, OrchestratorError> {
        if self.shutting_down.load(Ordering::SeqCst) {
            return Err(OrchestratorError::ShuttingDown);
        }

        validate_source_url(&req.source_url)?;
        let name = sanitize_display_name(&req.display_name)?;

        let id = TaskId::new();
        let task_dir = self.task_dir(&id);
        tokio::fs::create_dir_all(&task_dir).await?;

        let artifact_path =
            task_dir.join(format!("{}.{}", name, self.downloader.artifact_extension()));
        let task = Task {
            id,
            source_url: req.source_url.trim().to_string(),
            display_name: name.clone(),
            quality: req.quality,
            state: TaskState::Created,
            process_id: None,
            artifact_path,
            target: NotificationTarget {
                message: req.message,
                title: name,
                actions: vec![cancel_action(id)],
            },
            created_at: Utc::now(),
        };

        // Registration and spawn happen under the admission lock so a
        // concurrent shutdown either sees this task or rejects it.
        let admitted = {
            let _admission = self.lock_admission();
            if self.shutting_down.load(Ordering::SeqCst) {
                Err(OrchestratorError::ShuttingDown)
            } else {
                match self.registry.register(task.clone()) {
                    Ok(ctx) => {
                        metrics::TASKS_STARTED.inc();
                        metrics::ACTIVE_TASKS.inc();
                        let this = self.clone();
                        let pipeline = task.clone();
                        Ok(self
                            .tracker
                            .spawn(async move { this.run_task(pipeline, ctx).await }))
                    }
                    Err(e) => Err(e.into()),
                }
            }
        };

        let join = match admitted {
            Ok(join) => join,
            Err(e) => {
                discard_task_dir(&task_dir).await;
                return Err(e);
            }
        };

        info!(
            task_id = %id,
            url = %task.source_url,
            quality = %task.quality,
            name = %task.display_name,
            "Task started"
        );
        Ok(TaskHandle { id, join })
    }

    /// Runs a task to completion and renders its terminal message.
    async fn run_task(self, task: Task, ctx: TaskContext) -> TaskOutcome {
        let task_dir = self.task_dir(&task.id);
        let mut guard = FinalizeGuard {
            id: task.id,
            message: task.target.message,
            task_dir: Some(task_dir.clone()),
            registry: self.registry.clone(),
            notifier: Arc::clone(&self.notifier),
        };

        let outcome = self.execute(&task, &ctx).await;
        let outcome = match outcome {
            TaskOutcome::Failed(_) if ctx.is_cancelled() => TaskOutcome::Cancelled,
            other => other,
        };

        let title = &task.display_name;
        let message = &task.target.message;
        match &outcome {
            TaskOutcome::Completed(artifact) => {
                info!(task_id = %task.id, remote_id = %artifact.remote_id, "Task completed");
                self.notifier
                    .render_text(
                        message,
                        &messages::completed(title),
                        &self.completion_actions(artifact),
                    )
                    .await;
            }
            TaskOutcome::Failed(failure) => {
                error!(task_id = %task.id, error = %failure, "Task failed");
                self.notifier
                    .render_text(
                        message,
                        &messages::failed(title, failure, self.config.max_failure_chars),
                        &[],
                    )
                    .await;
            }
            TaskOutcome::Cancelled => {
                info!(task_id = %task.id, "Task cancelled");
                self.notifier
                    .render_text(message, &messages::cancelled(title), &[])
                    .await;
            }
        }

        discard_task_dir(&task_dir).await;
        guard.task_dir = None;
        drop(guard);

        metrics::TASKS_FINISHED
            .with_label_values(&[outcome.label()])
            .inc();
        outcome
    }

    async fn execute(&self, task: &Task, ctx: &TaskContext) -> TaskOutcome {
        let target = &task.target;

        // Download phase
        self.registry.set_state(&task.id, TaskState::Downloading);
        self.notifier
            .render_text(
                &target.message,
                &messages::download_starting(&task.display_name),
                &target.actions,
            )
            .await;

        let job = DownloadJob {
            task_id: task.id,
            url: task.source_url.clone(),
            quality: task.quality,
            output_path: task.artifact_path.clone(),
        };
        let started = Instant::now();
        let (tx, rx) = mpsc::channel(self.config.progress_channel_size.max(1));
        let (result, ()) = tokio::join!(
            self.downloader.download(&job, ctx, tx),
            self.forward_progress(target, ctx, rx)
        );
        ctx.detach_process();

        let artifact = match result {
            Ok(DownloadOutcome::Success(path)) => path,
            Ok(DownloadOutcome::Failure(stderr_tail)) => {
                observe_phase(Phase::Download, "failed", started);
                return TaskOutcome::Failed(TaskFailure::Retrieval(stderr_tail));
            }
            Ok(DownloadOutcome::Cancelled) => {
                observe_phase(Phase::Download, "cancelled", started);
                return TaskOutcome::Cancelled;
            }
            Err(e) => {
                observe_phase(Phase::Download, "failed", started);
                return TaskOutcome::Failed(TaskFailure::Retrieval(e.to_string()));
            }
        };
        observe_phase(Phase::Download, "completed", started);

        if ctx.is_cancelled() {
            return TaskOutcome::Cancelled;
        }

        // Upload phase
        self.registry.set_state(&task.id, TaskState::Uploading);
        self.notifier
            .render_text(
                &target.message,
                &messages::download_complete(&task.display_name),
                &target.actions,
            )
            .await;

        let remote_name = artifact
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| task.display_name.clone());
        let job = UploadJob {
            task_id: task.id,
            file_path: artifact,
            remote_name,
        };
        let started = Instant::now();
        let (tx, rx) = mpsc::channel(self.config.progress_channel_size.max(1));
        let (result, ()) = tokio::join!(
            self.uploader.upload(&job, ctx, tx),
            self.forward_progress(target, ctx, rx)
        );

        match result {
            UploadOutcome::Completed(artifact) => {
                observe_phase(Phase::Upload, "completed", started);
                TaskOutcome::Completed(artifact)
            }
            UploadOutcome::Failed(failure) => {
                observe_phase(Phase::Upload, "failed", started);
                TaskOutcome::Failed(match failure {
                    UploadFailure::Auth(reason) => TaskFailure::Auth(reason),
                    UploadFailure::Transfer(reason) => TaskFailure::Transfer(reason),
                })
            }
            UploadOutcome::Cancelled => {
                observe_phase(Phase::Upload, "cancelled", started);
                TaskOutcome::Cancelled
            }
        }
    }

    /// Relays snapshots to the notifier until the phase drops its sender.
    ///
    /// The last suppressed snapshot is flushed at the end of the phase unless
    /// the task was cancelled.
    async fn forward_progress(
        &self,
        target: &NotificationTarget,
        ctx: &TaskContext,
        mut rx: mpsc::Receiver<ProgressSnapshot>,
    ) {
        while let Some(snapshot) = rx.recv().await {
            if ctx.is_cancelled() {
                continue;
            }
            self.notifier.notify(target, snapshot).await;
        }
        if !ctx.is_cancelled() {
            self.notifier.flush(target).await;
        }
    }

    fn completion_actions(&self, artifact: &RemoteArtifact) -> Vec<Action> {
        let mut actions = Vec::new();
        if let Some(link) = &artifact.view_link {
            actions.push(Action::url("🔗 Google Drive", link.clone()));
        }
        if let Some(mirror) = self.config.mirror_link(&artifact.remote_id) {
            actions.push(Action::url("🔗 Mirror Link", mirror));
        }
        actions
    }

    /// Cancels an active task.
    ///
    /// Removes the task from the registry, signals its drivers, terminates
    /// the retrieval process tree if one is attached and deletes the partial
    /// artifact. Cancelling a task that is no longer active reports
    /// [`OrchestratorError::TaskNotFound`].
    pub async fn cancel(&self, id: &TaskId) -> Result<CancelledTask, OrchestratorError> {
        let task = self
            .registry
            .cancel(id)
            .ok_or(OrchestratorError::TaskNotFound(*id))?;

        let process_terminated = match task.process_id {
            Some(pid) => {
                let count = tokio::task::spawn_blocking(move || terminate_tree(pid))
                    .await
                    .unwrap_or(0);
                if count > 0 {
                    metrics::PROCESS_TREES_TERMINATED.inc();
                }
                count > 0
            }
            None => false,
        };

        let task_dir = self.task_dir(id);
        match tokio::fs::remove_dir_all(&task_dir).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(task_id = %id, error = %e, "Failed to remove partial artifact"),
        }

        info!(task_id = %id, state = %task.state, process_terminated, "Task cancellation requested");
        Ok(CancelledTask {
            task,
            process_terminated,
        })
    }

    /// Removes a task's registry entry and working directory.
    ///
    /// Idempotent; returns whether an entry was removed.
    pub fn finalize(&self, id: &TaskId) -> bool {
        let removed = self.registry.finalize(id).is_some();
        remove_task_dir(&self.task_dir(id));
        removed
    }

    pub fn get_task(&self, id: &TaskId) -> Option<Task> {
        self.registry.get(id)
    }

    pub fn list_tasks(&self) -> Vec<Task> {
        self.registry.list()
    }

    pub fn status(&self) -> OrchestratorStatus {
        let tasks = self.registry.list();
        OrchestratorStatus {
            accepting: !self.shutting_down.load(Ordering::SeqCst),
            active_tasks: tasks.len(),
            downloading_count: tasks
                .iter()
                .filter(|t| t.state == TaskState::Downloading)
                .count(),
            uploading_count: tasks
                .iter()
                .filter(|t| t.state == TaskState::Uploading)
                .count(),
        }
    }

    /// Stops accepting tasks, cancels every in-flight task and waits for
    /// their pipelines to finish.
    pub async fn shutdown(&self) {
        {
            let _admission = self.lock_admission();
            if self.shutting_down.swap(true, Ordering::SeqCst) {
                warn!("Orchestrator already shutting down");
            }
            self.tracker.close();
        }

        let cancelled = self.registry.cancel_all();
        info!(count = cancelled.len(), "Cancelling in-flight tasks");
        for task in cancelled {
            if let Some(pid) = task.process_id {
                let _ = tokio::task::spawn_blocking(move || terminate_tree(pid)).await;
            }
        }

        self.tracker.wait().await;
        info!("Orchestrator stopped");
    }
}

fn observe_phase(phase: Phase, result: &str, started: Instant) {
    metrics::PHASE_DURATION
        .with_label_values(&[phase.as_str(), result])
        .observe(started.elapsed().as_secs_f64());
}
