//! Yandex Disk backup add-on - Main entry point

use anyhow::Result;
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use yabackup::api::{self, AppState, OperationTracker};
use yabackup::config::{Config, DEFAULT_OPTIONS_PATH};
use yabackup::daemon::ShutdownCoordinator;
use yabackup::services::{BackupScheduler, RestoreService, UploadTask};
use yabackup::status::{RetryPolicy, StatusStore};
use yabackup::supervisor::{SupervisorApi, SupervisorClient};
use yabackup::sync::StoragePolicy;
use yabackup::utils;
use yabackup::yadisk::{CloudProvider, TokenManager};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the add-on options file
    #[arg(short, long, value_name = "FILE", default_value = DEFAULT_OPTIONS_PATH)]
    config: PathBuf,

    /// Port to listen on (overrides config)
    #[arg(short, long)]
    port: Option<u16>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = Config::from_file(&args.config)?;

    let log_level = args.log_level.as_deref().unwrap_or(&config.log_level);
    utils::logger::init(log_level)?;
    api::health::init_start_time();

    tracing::info!("Starting yabackup v{}", env!("CARGO_PKG_VERSION"));

    let shutdown = ShutdownCoordinator::new();

    let supervisor: Arc<dyn SupervisorApi> = Arc::new(SupervisorClient::new(
        &config.supervisor_url,
        &config.supervisor_token,
        &config.sensor_entity_id(),
    )?);

    let tokens = Arc::new(TokenManager::new(
        &config.client_id,
        &config.client_secret,
        &config.oauth_url,
        &config.yadisk_api_url,
        &config.remote_path,
        config.token_path(),
    )?);
    match tokens.load().await {
        Ok(true) => tracing::info!("Access token loaded"),
        Ok(false) => tracing::warn!("No access token yet, open the add-on page to authorize"),
        Err(e) => tracing::warn!("Cannot read access token: {}", e),
    }
    let cloud: Arc<dyn CloudProvider> = tokens.clone();

    let status = Arc::new(StatusStore::new(supervisor.clone(), config.entity_copy_path()));
    let policy = StoragePolicy::new(
        config.enable_upload_from_network_storage,
        config.allowed_storages(),
    );
    let upload_task = Arc::new(
        UploadTask::new(
            supervisor.clone(),
            cloud.clone(),
            status.clone(),
            policy,
            config.remote_maximum_files_quantity,
            &config.backup_dir,
        )
        .with_cancel(shutdown.token()),
    );
    let restore = Arc::new(
        RestoreService::new(supervisor.clone(), cloud.clone(), config.download_dir())?
            .with_cancel(shutdown.token()),
    );

    // The host may still be starting; keep trying to publish the entity
    let restore_status = status.clone();
    let first_boot = RetryPolicy::first_boot().spawn(shutdown.token(), move || {
        let status = restore_status.clone();
        async move {
            match status.ensure_entity_state().await {
                Ok(done) => done,
                Err(e) => {
                    tracing::debug!("Entity not restored yet: {}", e);
                    false
                }
            }
        }
    });

    let scheduler = BackupScheduler::new(upload_task.clone(), status.clone()).await?;
    scheduler.schedule_upload(&config.upload_cron()).await?;
    scheduler.schedule_entity_restore().await?;
    scheduler.start().await?;

    let state = AppState {
        supervisor,
        cloud,
        tokens,
        upload_task,
        restore,
        status,
        operations: OperationTracker::new(),
        backup_dir: config.backup_dir.clone(),
    };
    let app = api::create_router(state);

    let port = args.port.unwrap_or(config.port);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let server_token = shutdown.token();
    let server_handle = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move { server_token.cancelled().await })
            .await
    });

    shutdown.wait_for_signal().await;

    if let Err(e) = scheduler.shutdown().await {
        tracing::warn!("Scheduler shutdown failed: {}", e);
    }
    shutdown.shutdown().await;
    first_boot.abort();

    match tokio::time::timeout(std::time::Duration::from_secs(5), server_handle).await {
        Ok(Ok(Ok(()))) => tracing::info!("Server shutdown complete"),
        Ok(Ok(Err(e))) => tracing::error!("Server error during shutdown: {}", e),
        Ok(Err(e)) => tracing::error!("Server task panicked: {}", e),
        Err(_) => tracing::warn!("Server shutdown timeout, forcing exit"),
    }

    Ok(())
}
