//! Cron jobs for the upload pass and the entity restore.

use crate::services::upload_task::{RunOutcome, UploadTask};
use crate::status::StatusStore;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_cron_scheduler::{Job, JobScheduler};

/// Cron of the job that recreates the sensor entity after host restarts
pub const ENTITY_RESTORE_CRON: &str = "*/30 * * * * *";

pub struct BackupScheduler {
    scheduler: Mutex<JobScheduler>,
    upload_task: Arc<UploadTask>,
    status: Arc<StatusStore>,
}

impl BackupScheduler {
    pub async fn new(upload_task: Arc<UploadTask>, status: Arc<StatusStore>) -> anyhow::Result<Self> {
        let scheduler = JobScheduler::new().await?;
        Ok(Self {
            scheduler: Mutex::new(scheduler),
            upload_task,
            status,
        })
    }

    pub async fn schedule_upload(&self, cron_expression: &str) -> anyhow::Result<()> {
        let task = self.upload_task.clone();

        let job = Job::new_async(cron_expression, move |_uuid, _lock| {
            let task = task.clone();
            Box::pin(async move {
                if task.is_running() {
                    tracing::warn!("Skipping scheduled upload: pass already running");
                    return;
                }

                tracing::info!("Starting scheduled upload");
                match task.run().await {
                    Ok(RunOutcome::Completed(_)) | Ok(RunOutcome::Skipped) => {}
                    Err(e) => tracing::error!(error = %e, "Scheduled upload failed"),
                }
            })
        })?;

        self.scheduler.lock().await.add(job).await?;
        tracing::info!(cron = %cron_expression, "Upload scheduled");
        Ok(())
    }

    pub async fn schedule_entity_restore(&self) -> anyhow::Result<()> {
        let status = self.status.clone();

        let job = Job::new_async(ENTITY_RESTORE_CRON, move |_uuid, _lock| {
            let status = status.clone();
            Box::pin(async move {
                if let Err(e) = status.ensure_entity_state().await {
                    tracing::debug!(error = %e, "Entity restore attempt failed");
                }
            })
        })?;

        self.scheduler.lock().await.add(job).await?;
        Ok(())
    }

    pub async fn start(&self) -> anyhow::Result<()> {
        self.scheduler.lock().await.start().await?;
        Ok(())
    }

    pub async fn shutdown(&self) -> anyhow::Result<()> {
        self.scheduler.lock().await.shutdown().await?;
        Ok(())
    }
}
