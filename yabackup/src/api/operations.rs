//! Tracking of long-running operations started from the API.

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

/// Request header carrying the caller's operation id
pub const OPERATION_ID_HEADER: &str = "yba-operation-id";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationStatus {
    Running,
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct Operation {
    pub id: String,
    pub progress: u8,
    pub status: OperationStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub last_updated: DateTime<Utc>,
}

impl Operation {
    pub fn is_done(&self) -> bool {
        self.status != OperationStatus::Running
    }
}

/// Shared table of operations keyed by id
#[derive(Clone, Default)]
pub struct OperationTracker {
    operations: Arc<RwLock<HashMap<String, Operation>>>,
}

impl OperationTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or restart) an operation at 0%
    pub fn start(&self, id: &str) {
        let operation = Operation {
            id: id.to_string(),
            progress: 0,
            status: OperationStatus::Running,
            message: None,
            last_updated: Utc::now(),
        };
        self.write().insert(id.to_string(), operation);
    }

    pub fn progress(&self, id: &str, progress: u8) {
        self.modify(id, |op| op.progress = progress.min(100));
    }

    pub fn success(&self, id: &str) {
        self.modify(id, |op| {
            op.progress = 100;
            op.status = OperationStatus::Succeeded;
        });
    }

    pub fn fail(&self, id: &str, message: impl Into<String>) {
        let message = message.into();
        self.modify(id, |op| {
            op.status = OperationStatus::Failed;
            op.message = Some(message);
        });
    }

    /// Forget finished operations not updated for `hours`
    pub fn clear_older_than(&self, hours: i64) -> usize {
        let cutoff = Utc::now() - Duration::hours(hours);
        let mut operations = self.write();
        let before = operations.len();
        operations.retain(|_, op| !(op.is_done() && op.last_updated < cutoff));
        before - operations.len()
    }

    pub fn get(&self, id: &str) -> Option<Operation> {
        self.operations
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }

    /// Every tracked operation, most recently updated first
    pub fn all(&self) -> Vec<Operation> {
        let mut all: Vec<Operation> = self
            .operations
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();
        all.sort_by(|a, b| b.last_updated.cmp(&a.last_updated).then_with(|| a.id.cmp(&b.id)));
        all
    }

    fn modify<F: FnOnce(&mut Operation)>(&self, id: &str, apply: F) {
        if let Some(op) = self.write().get_mut(id) {
            apply(op);
            op.last_updated = Utc::now();
        }
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<String, Operation>> {
        self.operations.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Operation id from the request, or a fresh one
pub fn operation_id(headers: &HeaderMap) -> String {
    headers
        .get(OPERATION_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string())
}

/// GET /api/operations
pub async fn list_operations(State(state): State<super::AppState>) -> Json<Vec<Operation>> {
    state.operations.clear_older_than(24);
    Json(state.operations.all())
}

/// GET /api/operations/{id}
pub async fn get_operation(
    State(state): State<super::AppState>,
    Path(id): Path<String>,
) -> Result<Json<Operation>, super::ApiError> {
    state
        .operations
        .get(&id)
        .map(Json)
        .ok_or_else(|| super::ApiError::NotFound(format!("operation {} not found", id)))
}
