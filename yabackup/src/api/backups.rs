//! Backup listing and manual upload trigger.

use super::error::ApiError;
use super::AppState;
use crate::inventory::InventoryBuilder;
use crate::models::BackupFileInfo;
use crate::services::{RunOutcome, UploadReport};
use crate::status::InventorySummary;
use axum::extract::State;
use axum::Json;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct BackupsResponse {
    pub backups: Vec<BackupFileInfo>,
    pub summary: InventorySummary,
    pub alerts: Vec<String>,
}

/// GET /api/backups - Reconciled view of local and cloud backups
pub async fn list_backups(State(state): State<AppState>) -> Json<BackupsResponse> {
    let mut response = BackupsResponse {
        backups: Vec::new(),
        summary: InventorySummary::default(),
        alerts: Vec::new(),
    };

    if !state.tokens.is_valid().await {
        response
            .alerts
            .push("Yandex Disk is not authorized, request a confirmation code".to_string());
        return Json(response);
    }

    let cloud = match state.cloud.connect().await {
        Ok(cloud) => cloud,
        Err(e) => {
            response.alerts.push(format!("Cannot connect to Yandex Disk: {}", e));
            return Json(response);
        }
    };

    let inventory = InventoryBuilder::new(state.supervisor.as_ref(), &state.backup_dir);
    match inventory.reconciled(cloud.as_ref()).await {
        Ok(records) => {
            let summary = InventorySummary::from_records(&records);
            if let Err(e) = state
                .status
                .update(|s| {
                    let free = s.attributes.remote_free_space;
                    s.apply_summary(&summary, free);
                })
                .await
            {
                tracing::warn!("Cannot refresh entity counters: {}", e);
            }
            response.summary = summary;
            response.backups = records;
        }
        Err(e) => {
            tracing::warn!("Inventory failed: {}", e);
            response.alerts.push(format!("Cannot read backups: {}", e));
        }
    }

    Json(response)
}

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum UploadResponse {
    Completed { report: UploadReport },
    Skipped,
}

/// POST /api/upload - Run an upload pass now
pub async fn trigger_upload(State(state): State<AppState>) -> Result<Json<UploadResponse>, ApiError> {
    tracing::info!("Manual upload requested");
    let response = match state.upload_task.run().await? {
        RunOutcome::Completed(report) => UploadResponse::Completed { report },
        RunOutcome::Skipped => UploadResponse::Skipped,
    };
    Ok(Json(response))
}
