//! Transfer executor - runs upload and delete batches against the cloud.
//!
//! Batches tolerate partial failure: every item is attempted, failures are
//! counted and logged, and the aggregate error is reported alongside the
//! counters once the batch is done.

use crate::models::{DeleteCandidate, TransferResult, UploadCandidate};
use crate::supervisor::SupervisorApi;
use crate::transfer::progress::{format_bytes, format_duration};
use crate::transfer::{run_monitored, ByteStream, MonitorOptions, ProgressStream};
use crate::utils::{Result, YabackupError};
use crate::yadisk::CloudStorage;
use std::path::PathBuf;
use std::sync::atomic::AtomicU64;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::io::ReaderStream;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

pub struct TransferExecutor<'a> {
    cloud: &'a dyn CloudStorage,
    supervisor: &'a dyn SupervisorApi,
    backup_dir: PathBuf,
    monitor: MonitorOptions,
    cancel_token: CancellationToken,
}

impl<'a> TransferExecutor<'a> {
    pub fn new(
        cloud: &'a dyn CloudStorage,
        supervisor: &'a dyn SupervisorApi,
        backup_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            cloud,
            supervisor,
            backup_dir: backup_dir.into(),
            monitor: MonitorOptions::without_timeout(),
            cancel_token: CancellationToken::new(),
        }
    }

    /// Stop between (and during) transfers when the token fires
    pub fn with_cancel(mut self, cancel_token: CancellationToken) -> Self {
        self.cancel_token = cancel_token;
        self
    }

    /// Upload every candidate, oldest first.
    pub async fn upload(
        &self,
        mut candidates: Vec<UploadCandidate>,
    ) -> (TransferResult, Option<YabackupError>) {
        candidates.sort_by(|a, b| {
            a.local_info
                .modified
                .cmp(&b.local_info.modified)
                .then_with(|| a.remote_name.cmp(&b.remote_name))
        });

        let started = Instant::now();
        let mut result = TransferResult::default();
        info!("Uploading {} file(s)", candidates.len());

        for candidate in &candidates {
            if self.cancel_token.is_cancelled() {
                warn!(remote_name = %candidate.remote_name, "Upload skipped, executor cancelled");
                result.record_failure();
                continue;
            }

            match self.upload_one(candidate).await {
                Ok(bytes) => {
                    info!(
                        remote_name = %candidate.remote_name,
                        "Uploaded {}",
                        format_bytes(bytes)
                    );
                    result.record_success(bytes);
                }
                Err(e) => {
                    error!(remote_name = %candidate.remote_name, "Upload failed: {}", e);
                    result.record_failure();
                }
            }
        }

        info!(
            ok = result.ok_count,
            failed = result.error_count,
            "Upload batch finished: {} in {}",
            format_bytes(result.processed_bytes),
            format_duration(started.elapsed().as_secs())
        );
        let error = aggregate_error(&result);
        (result, error)
    }

    async fn upload_one(&self, candidate: &UploadCandidate) -> Result<u64> {
        let (length, body) = self.open_source(candidate).await?;

        let counter = Arc::new(AtomicU64::new(0));
        let body: ByteStream = Box::pin(ProgressStream::new(body, counter.clone()));
        let task = self.cloud.upload(&candidate.remote_name, length, body);

        run_monitored(
            task,
            counter,
            length,
            &self.monitor,
            &self.cancel_token,
            |_| {},
        )
        .await?;
        Ok(length)
    }

    async fn open_source(&self, candidate: &UploadCandidate) -> Result<(u64, ByteStream)> {
        if candidate.is_local {
            let path = self.backup_dir.join(&candidate.local_info.name);
            let file = tokio::fs::File::open(&path).await?;
            let length = file.metadata().await?.len();
            let stream: ByteStream = Box::pin(ReaderStream::new(file));
            return Ok((length, stream));
        }

        match &candidate.network_info {
            Some(network) if candidate.is_network => {
                self.supervisor.download_backup(&network.slug).await
            }
            _ => Err(YabackupError::Transfer(format!(
                "{} has no readable source",
                candidate.remote_name
            ))),
        }
    }

    /// Delete every candidate permanently.
    pub async fn delete(
        &self,
        candidates: &[DeleteCandidate],
    ) -> (TransferResult, Option<YabackupError>) {
        let mut result = TransferResult::default();

        for candidate in candidates {
            if self.cancel_token.is_cancelled() {
                warn!(remote_name = %candidate.remote_name, "Delete skipped, executor cancelled");
                result.record_failure();
                continue;
            }

            match self
                .cloud
                .delete(&candidate.remote_name, &candidate.content_hash, true)
                .await
            {
                Ok(()) => result.record_success(candidate.file_info.size),
                Err(e) => {
                    error!(remote_name = %candidate.remote_name, "Delete failed: {}", e);
                    result.record_failure();
                }
            }
        }

        if result.total() > 0 {
            info!(
                ok = result.ok_count,
                failed = result.error_count,
                "Delete batch finished"
            );
        }
        let error = aggregate_error(&result);
        (result, error)
    }
}

fn aggregate_error(result: &TransferResult) -> Option<YabackupError> {
    (result.error_count > 0).then(|| YabackupError::AggregateTransfer {
        failed: result.error_count,
        total: result.total(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{GeneralFileInfo, NetworkFileInfo};
    use crate::testing::{FakeCloud, FakeSupervisor};
    use chrono::{TimeZone, Utc};

    fn local_candidate(dir: &std::path::Path, name: &str, body: &[u8], hour: u32) -> UploadCandidate {
        std::fs::write(dir.join(name), body).unwrap();
        let ts = Utc.with_ymd_and_hms(2024, 1, 1, hour, 0, 0).unwrap();
        UploadCandidate {
            local_info: GeneralFileInfo {
                name: name.to_string(),
                size: body.len() as u64,
                created: ts,
                modified: ts,
            },
            remote_name: format!("remote-{}", name),
            is_local: true,
            is_network: false,
            network_info: None,
        }
    }

    fn delete_candidate(name: &str, size: u64) -> DeleteCandidate {
        let ts = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        DeleteCandidate {
            remote_name: name.to_string(),
            file_info: GeneralFileInfo {
                name: name.to_string(),
                size,
                created: ts,
                modified: ts,
            },
            content_hash: String::new(),
        }
    }

    #[tokio::test]
    async fn test_upload_oldest_first() {
        let dir = tempfile::tempdir().unwrap();
        let candidates = vec![
            local_candidate(dir.path(), "new.tar", b"new", 9),
            local_candidate(dir.path(), "old.tar", b"old-data", 1),
        ];

        let cloud = FakeCloud::default();
        let supervisor = FakeSupervisor::default();
        let executor = TransferExecutor::new(&cloud, &supervisor, dir.path());

        let (result, error) = executor.upload(candidates).await;
        assert!(error.is_none());
        assert_eq!(result.ok_count, 2);
        assert_eq!(result.processed_bytes, 11);

        let order: Vec<String> = cloud.uploads.lock().unwrap().iter().map(|(n, _)| n.clone()).collect();
        assert_eq!(order, vec!["remote-old.tar", "remote-new.tar"]);
    }

    #[tokio::test]
    async fn test_upload_continues_after_failure() {
        let dir = tempfile::tempdir().unwrap();
        let candidates = vec![
            local_candidate(dir.path(), "a.tar", b"aaaa", 1),
            local_candidate(dir.path(), "b.tar", b"bbbbbbbb", 2),
            local_candidate(dir.path(), "c.tar", b"cc", 3),
        ];

        let cloud = FakeCloud::default();
        cloud.fail_upload_of("remote-b.tar");
        let supervisor = FakeSupervisor::default();
        let executor = TransferExecutor::new(&cloud, &supervisor, dir.path());

        let (result, error) = executor.upload(candidates).await;
        assert_eq!(result.ok_count, 2);
        assert_eq!(result.error_count, 1);
        assert_eq!(result.processed_bytes, 6);
        assert!(matches!(
            error,
            Some(YabackupError::AggregateTransfer { failed: 1, total: 3 })
        ));
        assert!(cloud.names().contains(&"remote-c.tar".to_string()));
    }

    #[tokio::test]
    async fn test_missing_local_file_counts_as_error() {
        let dir = tempfile::tempdir().unwrap();
        let candidate = local_candidate(dir.path(), "gone.tar", b"x", 1);
        std::fs::remove_file(dir.path().join("gone.tar")).unwrap();

        let cloud = FakeCloud::default();
        let supervisor = FakeSupervisor::default();
        let executor = TransferExecutor::new(&cloud, &supervisor, dir.path());

        let (result, error) = executor.upload(vec![candidate]).await;
        assert_eq!(result.error_count, 1);
        assert!(error.is_some());
    }

    #[tokio::test]
    async fn test_network_upload_streams_from_supervisor() {
        let ts = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let candidate = UploadCandidate {
            local_info: GeneralFileInfo {
                name: "On NAS".to_string(),
                size: 5,
                created: ts,
                modified: ts,
            },
            remote_name: "On-NAS_nas1".to_string(),
            is_local: false,
            is_network: true,
            network_info: Some(NetworkFileInfo {
                slug: "nas1".to_string(),
                location: "nas".to_string(),
            }),
        };

        let cloud = FakeCloud::default();
        let supervisor = FakeSupervisor::default();
        supervisor.add_download("nas1", b"hello");
        let executor = TransferExecutor::new(&cloud, &supervisor, "/nonexistent");

        let (result, error) = executor.upload(vec![candidate]).await;
        assert!(error.is_none());
        assert_eq!(result.processed_bytes, 5);
        assert_eq!(cloud.uploads.lock().unwrap()[0], ("On-NAS_nas1".to_string(), 5));
    }

    #[tokio::test]
    async fn test_empty_network_download_is_error() {
        let ts = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let candidate = UploadCandidate {
            local_info: GeneralFileInfo {
                name: "empty".to_string(),
                size: 0,
                created: ts,
                modified: ts,
            },
            remote_name: "empty_e1".to_string(),
            is_local: false,
            is_network: true,
            network_info: Some(NetworkFileInfo {
                slug: "e1".to_string(),
                location: "nas".to_string(),
            }),
        };

        let cloud = FakeCloud::default();
        let supervisor = FakeSupervisor::default();
        supervisor.add_download("e1", b"");
        let executor = TransferExecutor::new(&cloud, &supervisor, "/nonexistent");

        let (result, _) = executor.upload(vec![candidate]).await;
        assert_eq!(result.error_count, 1);
        assert!(cloud.uploads.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_permanently_and_continue() {
        let cloud = FakeCloud::default();
        cloud.add_file("a", 1);
        cloud.add_file("b", 2);
        cloud.add_file("c", 3);
        cloud.fail_delete_of("b");
        let supervisor = FakeSupervisor::default();
        let executor = TransferExecutor::new(&cloud, &supervisor, "/backup");

        let candidates = vec![
            delete_candidate("a", 10),
            delete_candidate("b", 20),
            delete_candidate("c", 30),
        ];
        let (result, error) = executor.delete(&candidates).await;

        assert_eq!(result.ok_count, 2);
        assert_eq!(result.error_count, 1);
        assert_eq!(result.processed_bytes, 40);
        assert!(error.is_some());

        let deletes = cloud.deletes.lock().unwrap().clone();
        assert_eq!(deletes, vec![("a".to_string(), true), ("c".to_string(), true)]);
        assert_eq!(cloud.names(), vec!["b".to_string()]);
    }

    #[tokio::test]
    async fn test_cancelled_executor_skips_work() {
        let cloud = FakeCloud::default();
        let supervisor = FakeSupervisor::default();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let executor = TransferExecutor::new(&cloud, &supervisor, "/backup").with_cancel(cancel);

        let (result, error) = executor.delete(&[delete_candidate("a", 1)]).await;
        assert_eq!(result.error_count, 1);
        assert!(error.is_some());
        assert!(cloud.deletes.lock().unwrap().is_empty());
    }
}
