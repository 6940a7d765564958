//! HTTP API of the add-on.

pub mod backups;
pub mod error;
pub mod files;
pub mod health;
pub mod operations;
pub mod token;

use crate::services::{RestoreService, UploadTask};
use crate::status::StatusStore;
use crate::supervisor::SupervisorApi;
use crate::yadisk::{CloudProvider, TokenManager};
use axum::{
    routing::{delete, get, post},
    Router,
};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub use error::ApiError;
pub use operations::OperationTracker;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub supervisor: Arc<dyn SupervisorApi>,
    pub cloud: Arc<dyn CloudProvider>,
    pub tokens: Arc<TokenManager>,
    pub upload_task: Arc<UploadTask>,
    pub restore: Arc<RestoreService>,
    pub status: Arc<StatusStore>,
    pub operations: OperationTracker,
    pub backup_dir: PathBuf,
}

/// Create the API router with all endpoints
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health))
        // Backups
        .route("/api/backups", get(backups::list_backups))
        .route("/api/upload", post(backups::trigger_upload))
        // Authorization
        .route("/api/token/url", get(token::token_url))
        .route("/api/token", post(token::set_token))
        // Long operations
        .route("/api/operations", get(operations::list_operations))
        .route("/api/operations/{id}", get(operations::get_operation))
        .route("/api/remote/{name}/restore", post(files::restore_remote))
        .route("/api/remote/{name}", delete(files::delete_remote))
        .route("/api/local/{slug}", delete(files::delete_local))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::supervisor::SupervisorBackupInfo;
    use crate::sync::StoragePolicy;
    use crate::testing::{write_archive, FakeCloud, FakeProvider, FakeSupervisor};
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use serde_json::Value;
    use tower::ServiceExt;

    struct TestApp {
        dir: tempfile::TempDir,
        supervisor: Arc<FakeSupervisor>,
        cloud: Arc<FakeCloud>,
        state: AppState,
    }

    fn app() -> TestApp {
        let dir = tempfile::tempdir().unwrap();
        let supervisor = Arc::new(FakeSupervisor::default());
        let cloud = Arc::new(FakeCloud::default());
        let provider = Arc::new(FakeProvider::new(cloud.clone()));
        let status = Arc::new(StatusStore::new(
            supervisor.clone(),
            dir.path().join("entity-copy.json"),
        ));
        let tokens = Arc::new(
            TokenManager::new(
                "client",
                "secret",
                "http://127.0.0.1:9",
                "http://127.0.0.1:9",
                "app:/",
                dir.path().join("tokenInfo.json"),
            )
            .unwrap(),
        );
        let upload_task = Arc::new(UploadTask::new(
            supervisor.clone(),
            provider.clone(),
            status.clone(),
            StoragePolicy::default(),
            10,
            dir.path(),
        ));
        let restore = Arc::new(
            RestoreService::new(supervisor.clone(), provider.clone(), dir.path().join("bfiles")).unwrap(),
        );

        let state = AppState {
            supervisor: supervisor.clone(),
            cloud: provider,
            tokens,
            upload_task,
            restore,
            status,
            operations: OperationTracker::new(),
            backup_dir: dir.path().to_path_buf(),
        };

        TestApp {
            dir,
            supervisor,
            cloud,
            state,
        }
    }

    async fn authorize(app: &TestApp) {
        std::fs::write(
            app.dir.path().join("tokenInfo.json"),
            r#"{"access_token":"abc","refresh_token":"def","expiry":"2099-01-01T00:00:00Z"}"#,
        )
        .unwrap();
        app.state.tokens.load().await.unwrap();
    }

    async fn call(state: AppState, method: &str, uri: &str, body: Option<&str>) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                request = request.header("content-type", "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        let response = create_router(state)
            .oneshot(request.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    #[tokio::test]
    async fn test_health() {
        let app = app();
        let (status, body) = call(app.state.clone(), "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["upload_running"], false);
    }

    #[tokio::test]
    async fn test_backups_without_token_alerts() {
        let app = app();
        let (status, body) = call(app.state.clone(), "GET", "/api/backups", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["alerts"].as_array().unwrap().len(), 1);
        assert!(body["backups"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_backups_listing() {
        let app = app();
        authorize(&app).await;
        write_archive(app.dir.path(), "aaaa.tar", "aaaa", "One");
        app.supervisor.add_backup(SupervisorBackupInfo {
            slug: "aaaa".to_string(),
            name: "One".to_string(),
            ..SupervisorBackupInfo::default()
        });
        app.cloud.add_file("orphan", 3);

        let (status, body) = call(app.state.clone(), "GET", "/api/backups", None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["alerts"].as_array().unwrap().is_empty());
        assert_eq!(body["backups"].as_array().unwrap().len(), 2);
        assert_eq!(body["summary"]["local_files"], 1);
        assert_eq!(body["summary"]["remote_files"], 1);
    }

    #[tokio::test]
    async fn test_manual_upload() {
        let app = app();
        write_archive(app.dir.path(), "aaaa.tar", "aaaa", "One");
        app.supervisor.add_backup(SupervisorBackupInfo {
            slug: "aaaa".to_string(),
            name: "One".to_string(),
            ..SupervisorBackupInfo::default()
        });

        let (status, body) = call(app.state.clone(), "POST", "/api/upload", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "completed");
        assert_eq!(body["report"]["upload"]["ok_count"], 1);
        assert_eq!(app.cloud.names(), vec!["One_aaaa"]);
    }

    #[tokio::test]
    async fn test_token_url() {
        let app = app();
        let (status, body) = call(app.state.clone(), "GET", "/api/token/url", None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["url"].as_str().unwrap().contains("client_id=client"));
        assert_eq!(body["authorized"], false);
    }

    #[tokio::test]
    async fn test_empty_code_rejected() {
        let app = app();
        let (status, body) = call(app.state.clone(), "POST", "/api/token", Some(r#"{"code":" "}"#)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "code is required");
    }

    #[tokio::test]
    async fn test_delete_remote_is_recoverable() {
        let app = app();
        app.cloud.add_file("old_1", 1);

        let (status, _) = call(app.state.clone(), "DELETE", "/api/remote/old_1", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            app.cloud.deletes.lock().unwrap().clone(),
            vec![("old_1".to_string(), false)]
        );
    }

    #[tokio::test]
    async fn test_delete_remote_rejects_path_names() {
        let app = app();
        let (status, body) = call(app.state.clone(), "DELETE", "/api/remote/..%2Fsecret", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("invalid remote file name"));
        assert!(app.cloud.deletes.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_operation_is_not_found() {
        let app = app();
        app.state.operations.start("op-7");

        let (status, body) = call(app.state.clone(), "GET", "/api/operations/op-7", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["id"], "op-7");

        let (status, body) = call(app.state.clone(), "GET", "/api/operations/missing", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "operation missing not found");
    }

    #[tokio::test]
    async fn test_delete_local() {
        let app = app();
        let (status, _) = call(app.state.clone(), "DELETE", "/api/local/aaaa", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(app.supervisor.deleted.lock().unwrap().clone(), vec!["aaaa"]);
    }

    #[tokio::test]
    async fn test_restore_is_tracked() {
        let app = app();
        let request = Request::builder()
            .method("POST")
            .uri("/api/remote/..%2Fetc/restore")
            .header(operations::OPERATION_ID_HEADER, "op-42")
            .body(Body::empty())
            .unwrap();

        let response = create_router(app.state.clone()).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);

        let mut failed = false;
        for _ in 0..50 {
            if let Some(op) = app.state.operations.get("op-42") {
                if op.status == operations::OperationStatus::Failed {
                    failed = true;
                    break;
                }
            }
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        }
        assert!(failed);

        let (_, body) = call(app.state.clone(), "GET", "/api/operations", None).await;
        assert_eq!(body[0]["id"], "op-42");
    }
}
