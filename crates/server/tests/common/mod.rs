//! Common test utilities for in-process server tests with mocks.
//!
//! The fixture wires a real orchestrator, router and Telegram bot to mock
//! retrieval, storage and progress-sink seams, so tests run without yt-dlp,
//! Google Drive or a Telegram account.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use mediarelay_core::{
    downloader::Quality,
    notifier::{MessageRef, RateLimitedNotifier},
    orchestrator::OrchestratorConfig,
    testing::{MockCredentialProvider, MockDownloader, MockNotificationSink, MockStorageService},
    uploader::UploadDriver,
    Config, StartTaskRequest, TaskHandle, TaskId, TaskOrchestrator, TaskState, TelegramConfig,
};
use mediarelay_server::api::create_router;
use mediarelay_server::state::AppState;
use mediarelay_server::telegram::{TelegramBot, TelegramClient};

/// Bot token used by every fixture; Telegram paths are `/bot{TEST_BOT_TOKEN}/...`.
pub const TEST_BOT_TOKEN: &str = "123:abc";

/// Chat used by the fixture's tasks.
pub const TEST_CHAT_ID: i64 = 4242;

/// Test fixture for in-process server testing with mock dependencies.
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    pub orchestrator: TaskOrchestrator,
    pub bot: TelegramBot,
    /// Mock downloader - control progress and outcome
    pub downloader: Arc<MockDownloader>,
    /// Mock storage - control upload sessions and chunks
    pub storage: Arc<MockStorageService>,
    /// Mock progress sink - inspect rendered messages
    pub sink: Arc<MockNotificationSink>,
    /// Temporary work directory
    pub temp_dir: TempDir,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl TestFixture {
    /// Create a fixture whose Telegram client points at an unreachable address.
    pub async fn new() -> Self {
        Self::with_telegram_base("http://127.0.0.1:9").await
    }

    /// Create a fixture whose Telegram client talks to `api_base`.
    pub async fn with_telegram_base(api_base: &str) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");

        let downloader = Arc::new(MockDownloader::new());
        downloader.set_step_delay(Duration::from_millis(2)).await;
        let storage = Arc::new(MockStorageService::new(1000, 250));
        let sink = Arc::new(MockNotificationSink::new());

        let uploader = UploadDriver::new(
            Arc::new(MockCredentialProvider::valid()),
            storage.clone(),
            Some("folder-1".to_string()),
            "video/mp4",
        );
        let notifier = RateLimitedNotifier::new(sink.clone(), Duration::ZERO);

        let orchestrator_config = OrchestratorConfig {
            work_dir: temp_dir.path().join("work"),
            ..Default::default()
        };
        let orchestrator = TaskOrchestrator::new(
            orchestrator_config.clone(),
            downloader.clone(),
            Arc::new(uploader),
            Arc::new(notifier),
        );

        let mut telegram = TelegramConfig::new(TEST_BOT_TOKEN);
        telegram.api_base = api_base.to_string();
        telegram.poll_timeout_secs = 1;

        let client = Arc::new(TelegramClient::new(&telegram).expect("Failed to create client"));
        let bot = TelegramBot::new(client, orchestrator.clone(), telegram.clone());

        let config = Config {
            server: Default::default(),
            telegram,
            downloader: Default::default(),
            uploader: Default::default(),
            notifier: Default::default(),
            orchestrator: orchestrator_config,
        };
        let state = Arc::new(AppState::new(config, orchestrator.clone(), bot.selections()));

        Self {
            router: create_router(state),
            orchestrator,
            bot,
            downloader,
            storage,
            sink,
            temp_dir,
        }
    }

    /// Start a task directly on the orchestrator.
    pub async fn start_task(&self, message_id: i64) -> TaskHandle {
        self.orchestrator
            .start_task(StartTaskRequest {
                source_url: "https://example.com/video/1".to_string(),
                display_name: "Fixture Video".to_string(),
                quality: Quality::MaxHeight(720),
                message: MessageRef::new(TEST_CHAT_ID, message_id),
            })
            .await
            .expect("Failed to start task")
    }

    /// Wait until the task reaches `state`.
    pub async fn wait_for_state(&self, id: &TaskId, state: TaskState) {
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                if self.orchestrator.get_task(id).map(|t| t.state) == Some(state) {
                    return;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap_or_else(|_| panic!("task {id} never reached {state}"));
    }

    /// Send a GET request.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path).await
    }

    /// Send a DELETE request.
    pub async fn delete(&self, path: &str) -> TestResponse {
        self.request("DELETE", path).await
    }

    async fn request(&self, method: &str, path: &str) -> TestResponse {
        let request = Request::builder()
            .method(method)
            .uri(path)
            .body(Body::empty())
            .unwrap();

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&body_bytes).to_string())
            })
        };

        TestResponse { status, body }
    }
}
