//! One reconciliation pass: inventory, upload, retention, status.

use crate::executor::TransferExecutor;
use crate::inventory::InventoryBuilder;
use crate::models::TransferResult;
use crate::status::{InventorySummary, Status, StatusStore};
use crate::supervisor::SupervisorApi;
use crate::sync::{select_deletions, select_uploads, StoragePolicy};
use crate::utils::Result;
use crate::yadisk::{CloudProvider, CloudStorage};
use chrono::Utc;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Counters of one finished pass
#[derive(Debug, Clone, Serialize)]
pub struct UploadReport {
    pub upload: TransferResult,
    pub delete: TransferResult,
    pub summary: Option<InventorySummary>,
    pub remote_free_space: Option<u64>,
    pub state: Status,
    /// Aggregate failures reported by the upload and delete batches
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub transfer_errors: Vec<String>,
}

#[derive(Debug, Clone)]
pub enum RunOutcome {
    Completed(UploadReport),
    /// Another pass was already running
    Skipped,
}

pub struct UploadTask {
    supervisor: Arc<dyn SupervisorApi>,
    cloud: Arc<dyn CloudProvider>,
    status: Arc<StatusStore>,
    policy: StoragePolicy,
    max_files: usize,
    backup_dir: PathBuf,
    cancel_token: CancellationToken,
    running: Mutex<()>,
}

impl UploadTask {
    pub fn new(
        supervisor: Arc<dyn SupervisorApi>,
        cloud: Arc<dyn CloudProvider>,
        status: Arc<StatusStore>,
        policy: StoragePolicy,
        max_files: usize,
        backup_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            supervisor,
            cloud,
            status,
            policy,
            max_files,
            backup_dir: backup_dir.into(),
            cancel_token: CancellationToken::new(),
            running: Mutex::new(()),
        }
    }

    pub fn with_cancel(mut self, cancel_token: CancellationToken) -> Self {
        self.cancel_token = cancel_token;
        self
    }

    pub fn is_running(&self) -> bool {
        self.running.try_lock().is_err()
    }

    /// Run a pass unless one is already in flight.
    ///
    /// # Errors
    /// Token, inventory and listing failures abort the pass; the entity is
    /// flagged as failed before the error is returned.
    pub async fn run(&self) -> Result<RunOutcome> {
        let Ok(_guard) = self.running.try_lock() else {
            warn!("Upload pass already running, skipping");
            return Ok(RunOutcome::Skipped);
        };

        info!("Upload pass started");
        let outcome = match self.cloud.connect().await {
            Ok(cloud) => self.run_pass(cloud.as_ref()).await,
            Err(e) => Err(e),
        };

        match outcome {
            Ok(report) => {
                info!(
                    uploaded = report.upload.ok_count,
                    upload_errors = report.upload.error_count,
                    deleted = report.delete.ok_count,
                    delete_errors = report.delete.error_count,
                    "Upload pass finished"
                );
                Ok(RunOutcome::Completed(report))
            }
            Err(e) => {
                error!("Upload pass aborted: {}", e);
                if let Err(status_err) = self.status.update(|s| s.state = Status::Error).await {
                    warn!("Cannot flag entity state: {}", status_err);
                }
                Err(e)
            }
        }
    }

    async fn run_pass(&self, cloud: &dyn CloudStorage) -> Result<UploadReport> {
        let inventory = InventoryBuilder::new(self.supervisor.as_ref(), &self.backup_dir);
        let records = inventory.reconciled(cloud).await?;

        let executor = TransferExecutor::new(cloud, self.supervisor.as_ref(), &self.backup_dir)
            .with_cancel(self.cancel_token.clone());

        let uploads = select_uploads(&records, &self.policy);
        let mut transfer_errors = Vec::new();
        let (upload, upload_error) = executor.upload(uploads).await;
        if let Some(e) = upload_error {
            warn!("Upload batch incomplete: {}", e);
            transfer_errors.push(e.to_string());
        }

        let deletions = select_deletions(&records, upload.ok_count, self.max_files);
        let (delete, delete_error) = executor.delete(&deletions).await;
        if let Some(e) = delete_error {
            warn!("Delete batch incomplete: {}", e);
            transfer_errors.push(e.to_string());
        }

        let summary = match inventory.reconciled(cloud).await {
            Ok(records) => Some(InventorySummary::from_records(&records)),
            Err(e) => {
                warn!("Cannot rebuild inventory after transfers: {}", e);
                None
            }
        };
        let remote_free_space = match cloud.disk_info().await {
            Ok(disk) => Some(disk.free_space()),
            Err(e) => {
                warn!("Cannot read cloud disk usage: {}", e);
                None
            }
        };

        let finished_at = Utc::now();
        let state = self
            .status
            .update(|state| {
                state.record_pass(&upload, &delete, finished_at);
                if let Some(summary) = &summary {
                    let free = remote_free_space.unwrap_or(state.attributes.remote_free_space);
                    state.apply_summary(summary, free);
                }
            })
            .await;

        let state = match state {
            Ok(state) => state.state,
            Err(e) => {
                warn!("Cannot publish entity state: {}", e);
                if upload.error_count > 0 || delete.error_count > 0 {
                    Status::Error
                } else {
                    Status::Ok
                }
            }
        };

        Ok(UploadReport {
            upload,
            delete,
            summary,
            remote_free_space,
            state,
            transfer_errors,
        })
    }
}
