use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mediarelay_core::config::CONFIG_PATH_VAR;
use mediarelay_core::downloader::{Downloader, YtDlpDownloader};
use mediarelay_core::notifier::{NotificationSink, RateLimitedNotifier};
use mediarelay_core::uploader::{DriveStorage, TokenFileCredentialProvider, UploadDriver};
use mediarelay_core::{load_config, validate_config, TaskOrchestrator};

use mediarelay_server::api::create_router;
use mediarelay_server::state::AppState;
use mediarelay_server::telegram::{TelegramBot, TelegramClient, TelegramSink};

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Determine config path
    let config_path = std::env::var(CONFIG_PATH_VAR)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    // Load configuration
    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    // Validate configuration
    validate_config(&config).context("Configuration validation failed")?;

    info!(version = VERSION, "Configuration loaded successfully");
    info!("Work directory: {:?}", config.orchestrator.work_dir);

    // Downloader
    let downloader = YtDlpDownloader::new(config.downloader.clone())
        .context("Failed to create downloader")?;
    if let Err(e) = downloader.validate().await {
        warn!("Downloader binary not usable yet: {}", e);
    }
    let downloader: Arc<dyn Downloader> = Arc::new(downloader);

    // Uploader
    let credentials = TokenFileCredentialProvider::new(
        &config.uploader.token_file,
        config.uploader.token_endpoint.clone(),
        Duration::from_secs(config.uploader.timeout_secs),
    )
    .context("Failed to create credential provider")?;
    let storage =
        DriveStorage::from_config(&config.uploader).context("Failed to create storage client")?;
    let uploader = Arc::new(UploadDriver::from_config(
        &config.uploader,
        Arc::new(credentials),
        Arc::new(storage),
    ));
    info!("Uploading to {}", uploader.storage_name());

    // Telegram
    let client = Arc::new(
        TelegramClient::new(&config.telegram).context("Failed to create Telegram client")?,
    );
    let sink: Arc<dyn NotificationSink> = Arc::new(TelegramSink::new(Arc::clone(&client)));
    let notifier = Arc::new(RateLimitedNotifier::new(
        sink,
        config.notifier.min_interval(),
    ));

    let orchestrator = TaskOrchestrator::new(
        config.orchestrator.clone(),
        downloader,
        uploader,
        notifier,
    );

    let bot = TelegramBot::new(client, orchestrator.clone(), config.telegram.clone());
    let selections = bot.selections();
    let bot_shutdown = CancellationToken::new();
    let bot_handle = tokio::spawn(bot.run(bot_shutdown.clone()));
    info!("Telegram bot started");

    // Create app state
    let state = Arc::new(AppState::new(
        config.clone(),
        orchestrator.clone(),
        selections,
    ));

    // Create router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::new(config.server.host, config.server.port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutting down...");

    // Stop taking commands, then cancel and drain running tasks
    bot_shutdown.cancel();
    orchestrator.shutdown().await;

    if let Err(e) = bot_handle.await {
        error!("Telegram bot task failed: {}", e);
    }

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
