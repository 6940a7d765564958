//! Single-file actions on local and cloud backups.

use super::error::ApiError;
use super::operations::operation_id;
use super::AppState;
use crate::yadisk::check_remote_name;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde_json::{json, Value};

/// POST /api/remote/{name}/restore - Copy a cloud backup back into the supervisor
pub async fn restore_remote(
    State(state): State<AppState>,
    Path(name): Path<String>,
    headers: HeaderMap,
) -> (StatusCode, Json<Value>) {
    let id = operation_id(&headers);
    state.operations.start(&id);
    tracing::info!(operation_id = %id, remote_name = %name, "Restore requested");

    let tracker = state.operations.clone();
    let restore = state.restore.clone();
    let op_id = id.clone();
    tokio::spawn(async move {
        let progress = tracker.clone();
        let progress_id = op_id.clone();
        match restore
            .restore(&name, move |p| progress.progress(&progress_id, p))
            .await
        {
            Ok(()) => tracker.success(&op_id),
            Err(e) => {
                tracing::error!(operation_id = %op_id, remote_name = %name, "Restore failed: {}", e);
                tracker.fail(&op_id, e.to_string());
            }
        }
    });

    (StatusCode::ACCEPTED, Json(json!({ "operation_id": id })))
}

/// DELETE /api/remote/{name} - Move a cloud backup to the trash
pub async fn delete_remote(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<Value>, ApiError> {
    check_remote_name(&name)?;
    if state.upload_task.is_running() {
        return Err(ApiError::Conflict("an upload pass is running".to_string()));
    }

    let cloud = state.cloud.connect().await?;
    cloud.delete(&name, "", false).await?;
    Ok(Json(json!({ "status": "ok" })))
}

/// DELETE /api/local/{slug} - Delete a backup from the supervisor
pub async fn delete_local(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<Value>, ApiError> {
    if state.upload_task.is_running() {
        return Err(ApiError::Conflict("an upload pass is running".to_string()));
    }

    state.supervisor.delete_backup(&slug).await?;
    Ok(Json(json!({ "status": "ok" })))
}
