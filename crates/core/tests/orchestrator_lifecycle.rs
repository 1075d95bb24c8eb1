//! Orchestrator lifecycle integration tests.
//!
//! These tests drive complete tasks through the orchestrator with mocked
//! retrieval, storage and chat seams:
//! created -> downloading -> uploading -> completed | failed | cancelled

use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;

use mediarelay_core::{
    downloader::Quality,
    notifier::{ActionKind, MessageRef, NotifyError, RateLimitedNotifier},
    orchestrator::{OrchestratorConfig, OrchestratorError},
    task::{TaskError, TaskFailure},
    testing::{
        MockCredentialProvider, MockDownloadBehavior, MockDownloader, MockNotificationSink,
        MockStorageService,
    },
    uploader::{CredentialProvider, UploadDriver, UploaderError},
    StartTaskRequest, TaskId, TaskOrchestrator, TaskOutcome, TaskState,
};

/// Test helper holding the mocks behind an orchestrator.
struct TestHarness {
    downloader: Arc<MockDownloader>,
    storage: Arc<MockStorageService>,
    sink: Arc<MockNotificationSink>,
    temp_dir: TempDir,
}

impl TestHarness {
    async fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let downloader = Arc::new(MockDownloader::new());
        downloader.set_step_delay(Duration::from_millis(2)).await;

        Self {
            downloader,
            storage: Arc::new(MockStorageService::new(1000, 250)),
            sink: Arc::new(MockNotificationSink::new()),
            temp_dir,
        }
    }

    fn config(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            work_dir: self.temp_dir.path().join("work"),
            ..Default::default()
        }
    }

    fn orchestrator(&self) -> TaskOrchestrator {
        self.orchestrator_with(self.config(), Arc::new(MockCredentialProvider::valid()))
    }

    fn orchestrator_with(
        &self,
        config: OrchestratorConfig,
        credentials: Arc<dyn CredentialProvider>,
    ) -> TaskOrchestrator {
        let uploader = UploadDriver::new(
            credentials,
            self.storage.clone(),
            Some("folder-1".to_string()),
            "video/mp4",
        );
        let notifier = RateLimitedNotifier::new(self.sink.clone(), Duration::ZERO);
        TaskOrchestrator::new(
            config,
            self.downloader.clone(),
            Arc::new(uploader),
            Arc::new(notifier),
        )
    }
}

fn request(message_id: i64) -> StartTaskRequest {
    StartTaskRequest {
        source_url: "https://example.com/video/42".to_string(),
        display_name: "My: Video?".to_string(),
        quality: Quality::MaxHeight(720),
        message: MessageRef::new(100, message_id),
    }
}

/// Waits until the task reaches `state`.
async fn wait_for_state(orchestrator: &TaskOrchestrator, id: &TaskId, state: TaskState) {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if orchestrator.get_task(id).map(|t| t.state) == Some(state) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap_or_else(|_| panic!("task never reached {state}"));
}

#[tokio::test]
async fn test_successful_task_lifecycle() {
    let harness = TestHarness::new().await;
    let orchestrator = harness.orchestrator();

    let handle = orchestrator.start_task(request(1)).await.unwrap();
    let id = handle.id;
    let outcome = handle.outcome().await;

    let TaskOutcome::Completed(artifact) = outcome else {
        panic!("expected completion, got {outcome:?}");
    };
    assert_eq!(artifact.remote_id, "mock-file-1");

    // The sanitized name drives both the artifact and the remote file name
    let jobs = harness.downloader.recorded_jobs().await;
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].quality, Quality::MaxHeight(720));
    assert!(jobs[0].output_path.ends_with("My Video.mp4"));

    let sessions = harness.storage.sessions().await;
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].name, "My Video.mp4");
    assert_eq!(sessions[0].parent_folder_id.as_deref(), Some("folder-1"));

    // Terminal message with the view link
    let last = harness.sink.last_render().await.unwrap();
    assert!(last.text.starts_with("✅ Completed!"));
    assert!(last.text.contains("My Video"));
    assert_eq!(last.actions.len(), 1);
    assert_eq!(
        last.actions[0].kind,
        ActionKind::Url("https://drive.example/file/d/mock-file-1/view".to_string())
    );

    // Nothing is left behind
    assert!(orchestrator.get_task(&id).is_none());
    assert!(orchestrator.registry().is_empty());
    assert!(!harness.temp_dir.path().join("work").join(id.to_string()).exists());
}

#[tokio::test]
async fn test_progress_renders_carry_cancel_action() {
    let harness = TestHarness::new().await;
    let orchestrator = harness.orchestrator();

    let handle = orchestrator.start_task(request(2)).await.unwrap();
    let id = handle.id;
    handle.outcome().await;

    let renders = harness.sink.renders_for(&MessageRef::new(100, 2)).await;
    let texts: Vec<&str> = renders.iter().map(|r| r.text.as_str()).collect();

    assert!(texts[0].starts_with("⏳ Starting download"));
    assert!(texts.iter().any(|t| t.starts_with("📥 Downloading: My Video")));
    assert!(texts.iter().any(|t| t.starts_with("✅ Download complete")));
    assert!(texts.iter().any(|t| t.starts_with("📤 Uploading: My Video")));

    let cancel = ActionKind::Callback(format!("cancel_{id}"));
    for render in renders.iter().filter(|r| !r.text.starts_with("✅ Completed")) {
        assert_eq!(render.actions.len(), 1, "render without cancel: {}", render.text);
        assert_eq!(render.actions[0].kind, cancel);
    }
}

#[tokio::test]
async fn test_mirror_link_added_on_completion() {
    let harness = TestHarness::new().await;
    let config = OrchestratorConfig {
        mirror_link_template: Some("https://mirror.example/0:findpath?id={id}".to_string()),
        ..harness.config()
    };
    let orchestrator =
        harness.orchestrator_with(config, Arc::new(MockCredentialProvider::valid()));

    let outcome = orchestrator.start_task(request(3)).await.unwrap().outcome().await;
    assert!(matches!(outcome, TaskOutcome::Completed(_)));

    let last = harness.sink.last_render().await.unwrap();
    assert_eq!(last.actions.len(), 2);
    assert_eq!(last.actions[1].label, "🔗 Mirror Link");
    assert_eq!(
        last.actions[1].kind,
        ActionKind::Url("https://mirror.example/0:findpath?id=mock-file-1".to_string())
    );
}

#[tokio::test]
async fn test_cancel_during_download() {
    let harness = TestHarness::new().await;
    harness.downloader.set_behavior(MockDownloadBehavior::Hang).await;
    let orchestrator = harness.orchestrator();

    let handle = orchestrator.start_task(request(4)).await.unwrap();
    let id = handle.id;
    wait_for_state(&orchestrator, &id, TaskState::Downloading).await;

    let cancelled = orchestrator.cancel(&id).await.unwrap();
    assert_eq!(cancelled.task.id, id);
    assert!(!cancelled.process_terminated);

    let outcome = tokio::time::timeout(Duration::from_secs(5), handle.outcome())
        .await
        .unwrap();
    assert_eq!(outcome, TaskOutcome::Cancelled);

    // Upload never starts and the partial artifact is gone
    assert!(harness.storage.sessions().await.is_empty());
    assert!(!harness.temp_dir.path().join("work").join(id.to_string()).exists());
    assert_eq!(
        harness.sink.last_text().await.unwrap(),
        "❌ Download cancelled: My Video"
    );
}

#[tokio::test]
async fn test_cancel_during_upload() {
    let harness = TestHarness::new().await;
    harness.storage.set_chunk_delay(Duration::from_millis(100)).await;
    let orchestrator = harness.orchestrator();

    let handle = orchestrator.start_task(request(5)).await.unwrap();
    let id = handle.id;
    wait_for_state(&orchestrator, &id, TaskState::Uploading).await;

    orchestrator.cancel(&id).await.unwrap();
    let outcome = tokio::time::timeout(Duration::from_secs(5), handle.outcome())
        .await
        .unwrap();

    assert_eq!(outcome, TaskOutcome::Cancelled);
    assert!(harness.storage.chunk_calls().await < 4);
    assert!(harness
        .sink
        .last_text()
        .await
        .unwrap()
        .starts_with("❌ Download cancelled"));
}

#[tokio::test]
async fn test_download_failure_skips_upload() {
    let harness = TestHarness::new().await;
    harness
        .downloader
        .set_behavior(MockDownloadBehavior::Fail("ERROR: Unsupported URL".to_string()))
        .await;
    let orchestrator = harness.orchestrator();

    let handle = orchestrator.start_task(request(6)).await.unwrap();
    let id = handle.id;
    let outcome = handle.outcome().await;

    assert_eq!(
        outcome,
        TaskOutcome::Failed(TaskFailure::Retrieval("ERROR: Unsupported URL".to_string()))
    );
    assert!(harness.storage.sessions().await.is_empty());

    let text = harness.sink.last_text().await.unwrap();
    assert!(text.starts_with("❌ Download failed: My Video"));
    assert!(text.contains("ERROR: Unsupported URL"));
    assert!(orchestrator.get_task(&id).is_none());
}

#[tokio::test]
async fn test_missing_credential_fails_without_contacting_storage() {
    let harness = TestHarness::new().await;
    let orchestrator =
        harness.orchestrator_with(harness.config(), Arc::new(MockCredentialProvider::none()));

    let outcome = orchestrator.start_task(request(7)).await.unwrap().outcome().await;

    assert!(matches!(outcome, TaskOutcome::Failed(TaskFailure::Auth(_))));
    assert!(harness.storage.sessions().await.is_empty());
    assert_eq!(harness.storage.chunk_calls().await, 0);
    assert!(harness
        .sink
        .last_text()
        .await
        .unwrap()
        .contains("Could not authenticate"));
}

#[tokio::test]
async fn test_transfer_failure() {
    let harness = TestHarness::new().await;
    harness
        .storage
        .fail_at_chunk(2, UploaderError::api(500, "backend error"))
        .await;
    let orchestrator = harness.orchestrator();

    let outcome = orchestrator.start_task(request(8)).await.unwrap().outcome().await;

    let TaskOutcome::Failed(TaskFailure::Transfer(reason)) = outcome else {
        panic!("expected transfer failure, got {outcome:?}");
    };
    assert!(reason.contains("backend error"));
    assert!(harness
        .sink
        .last_text()
        .await
        .unwrap()
        .starts_with("❌ Upload failed: My Video"));
}

#[tokio::test]
async fn test_rejected_session_credential_is_auth_failure() {
    let harness = TestHarness::new().await;
    harness
        .storage
        .fail_session(UploaderError::Unauthorized("token revoked".to_string()))
        .await;
    let orchestrator = harness.orchestrator();

    let outcome = orchestrator.start_task(request(9)).await.unwrap().outcome().await;
    assert!(matches!(outcome, TaskOutcome::Failed(TaskFailure::Auth(_))));
}

#[tokio::test]
async fn test_cancel_unknown_and_repeated() {
    let harness = TestHarness::new().await;
    harness.downloader.set_behavior(MockDownloadBehavior::Hang).await;
    let orchestrator = harness.orchestrator();

    let unknown = TaskId::new();
    assert!(matches!(
        orchestrator.cancel(&unknown).await,
        Err(OrchestratorError::TaskNotFound(id)) if id == unknown
    ));

    let handle = orchestrator.start_task(request(10)).await.unwrap();
    let id = handle.id;
    wait_for_state(&orchestrator, &id, TaskState::Downloading).await;

    assert!(orchestrator.cancel(&id).await.is_ok());
    assert!(matches!(
        orchestrator.cancel(&id).await,
        Err(OrchestratorError::TaskNotFound(_))
    ));
    assert_eq!(handle.outcome().await, TaskOutcome::Cancelled);
}

#[tokio::test]
async fn test_finalize_is_idempotent() {
    let harness = TestHarness::new().await;
    let orchestrator = harness.orchestrator();

    let handle = orchestrator.start_task(request(11)).await.unwrap();
    let id = handle.id;
    handle.outcome().await;

    assert!(!orchestrator.finalize(&id));
    assert!(!orchestrator.finalize(&id));
    assert!(!orchestrator.finalize(&TaskId::new()));
}

#[tokio::test]
async fn test_notifier_failures_do_not_affect_outcome() {
    let harness = TestHarness::new().await;
    harness
        .sink
        .set_failure(NotifyError::delivery_failed("chat unreachable"))
        .await;
    let orchestrator = harness.orchestrator();

    let outcome = orchestrator.start_task(request(12)).await.unwrap().outcome().await;

    assert!(matches!(outcome, TaskOutcome::Completed(_)));
    assert!(harness.sink.attempt_count().await > 0);
    assert_eq!(harness.sink.render_count().await, 0);
}

#[tokio::test]
async fn test_invalid_input_rejected_before_registration() {
    let harness = TestHarness::new().await;
    let orchestrator = harness.orchestrator();

    let mut bad_url = request(13);
    bad_url.source_url = "ftp://example.com/file".to_string();
    assert!(matches!(
        orchestrator.start_task(bad_url).await,
        Err(OrchestratorError::InvalidInput(TaskError::InvalidUrl(_)))
    ));

    let mut bad_name = request(14);
    bad_name.display_name = "???".to_string();
    assert!(matches!(
        orchestrator.start_task(bad_name).await,
        Err(OrchestratorError::InvalidInput(TaskError::EmptyName))
    ));

    assert!(orchestrator.registry().is_empty());
    assert!(harness.downloader.recorded_jobs().await.is_empty());
    assert_eq!(harness.sink.attempt_count().await, 0);
}

#[tokio::test]
async fn test_concurrent_tasks_are_independent() {
    let harness = TestHarness::new().await;
    let orchestrator = harness.orchestrator();

    let mut handles = Vec::new();
    for n in 0..3 {
        handles.push(orchestrator.start_task(request(20 + n)).await.unwrap());
    }

    for handle in handles {
        assert!(matches!(handle.outcome().await, TaskOutcome::Completed(_)));
    }

    assert_eq!(harness.storage.sessions().await.len(), 3);
    for n in 0..3 {
        let last = harness.sink.renders_for(&MessageRef::new(100, 20 + n)).await;
        assert!(last.last().unwrap().text.starts_with("✅ Completed!"));
    }
    assert!(orchestrator.registry().is_empty());
}

#[tokio::test]
async fn test_shutdown_cancels_in_flight_tasks() {
    let harness = TestHarness::new().await;
    harness.downloader.set_behavior(MockDownloadBehavior::Hang).await;
    let orchestrator = harness.orchestrator();

    let handle = orchestrator.start_task(request(30)).await.unwrap();
    wait_for_state(&orchestrator, &handle.id, TaskState::Downloading).await;
    assert!(orchestrator.status().accepting);

    tokio::time::timeout(Duration::from_secs(5), orchestrator.shutdown())
        .await
        .unwrap();

    assert_eq!(handle.outcome().await, TaskOutcome::Cancelled);
    assert!(!orchestrator.status().accepting);
    assert!(matches!(
        orchestrator.start_task(request(31)).await,
        Err(OrchestratorError::ShuttingDown)
    ));
}

#[tokio::test]
async fn test_start_racing_shutdown_leaves_nothing_running() {
    for round in 0..20 {
        let harness = TestHarness::new().await;
        harness.downloader.set_behavior(MockDownloadBehavior::Hang).await;
        let orchestrator = harness.orchestrator();

        let (started, ()) = tokio::time::timeout(Duration::from_secs(5), async {
            tokio::join!(orchestrator.start_task(request(round)), orchestrator.shutdown())
        })
        .await
        .unwrap();

        // Once shutdown returns, an admitted task has already been cancelled
        assert!(orchestrator.registry().is_empty(), "round {round}");
        match started {
            Ok(handle) => assert_eq!(handle.outcome().await, TaskOutcome::Cancelled),
            Err(e) => assert!(matches!(e, OrchestratorError::ShuttingDown), "round {round}: {e}"),
        }

        let work_dir = harness.temp_dir.path().join("work");
        if work_dir.exists() {
            assert_eq!(std::fs::read_dir(&work_dir).unwrap().count(), 0, "round {round}");
        }
    }
}

#[tokio::test]
async fn test_registry_never_exposes_terminal_states() {
    let harness = TestHarness::new().await;
    let orchestrator = harness.orchestrator();

    let handle = orchestrator.start_task(request(40)).await.unwrap();
    let id = handle.id;

    let watcher = {
        let orchestrator = orchestrator.clone();
        tokio::spawn(async move {
            let mut seen = Vec::new();
            while let Some(task) = orchestrator.get_task(&id) {
                seen.push(task.state);
                tokio::task::yield_now().await;
            }
            seen
        })
    };

    assert!(matches!(handle.outcome().await, TaskOutcome::Completed(_)));
    let seen = tokio::time::timeout(Duration::from_secs(5), watcher)
        .await
        .unwrap()
        .unwrap();
    assert!(!seen.is_empty());
    assert!(seen.iter().all(|state| !state.is_terminal()), "{seen:?}");
    assert!(orchestrator.get_task(&id).is_none());
}

#[tokio::test]
async fn test_fetch_title() {
    let harness = TestHarness::new().await;
    let orchestrator = harness.orchestrator();

    assert_eq!(
        orchestrator
            .fetch_title("https://example.com/watch")
            .await
            .unwrap(),
        "Mock Title"
    );
    assert!(matches!(
        orchestrator.fetch_title("not a url").await,
        Err(OrchestratorError::InvalidInput(_))
    ));

    harness.downloader.set_title(None).await;
    assert!(matches!(
        orchestrator.fetch_title("https://example.com/watch").await,
        Err(OrchestratorError::Downloader(_))
    ));
}
