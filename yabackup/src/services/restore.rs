//! Bring a cloud copy back into the supervisor.

use crate::supervisor::SupervisorApi;
use crate::transfer::download::{download_to_file, probe_length};
use crate::transfer::{format_bytes, run_monitored, MonitorOptions};
use crate::utils::{Result, YabackupError};
use crate::yadisk::{check_remote_name, CloudProvider};
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicU64;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Leftover downloads older than this are removed before a new restore
const STALE_DOWNLOAD_AGE: Duration = Duration::from_secs(24 * 60 * 60);

pub struct RestoreService {
    supervisor: Arc<dyn SupervisorApi>,
    cloud: Arc<dyn CloudProvider>,
    http: reqwest::Client,
    download_dir: PathBuf,
    monitor: MonitorOptions,
    cancel_token: CancellationToken,
}

impl RestoreService {
    pub fn new(
        supervisor: Arc<dyn SupervisorApi>,
        cloud: Arc<dyn CloudProvider>,
        download_dir: impl Into<PathBuf>,
    ) -> Result<Self> {
        Ok(Self {
            supervisor,
            cloud,
            http: reqwest::Client::builder().build()?,
            download_dir: download_dir.into(),
            monitor: MonitorOptions::default(),
            cancel_token: CancellationToken::new(),
        })
    }

    pub fn with_cancel(mut self, cancel_token: CancellationToken) -> Self {
        self.cancel_token = cancel_token;
        self
    }

    /// Download `remote_name` and hand it to the supervisor.
    ///
    /// `on_progress` gets 0-90 while downloading, then 100 when the
    /// supervisor has accepted the archive.
    pub async fn restore<P>(&self, remote_name: &str, mut on_progress: P) -> Result<()>
    where
        P: FnMut(u8) + Send,
    {
        check_remote_name(remote_name)?;

        let cloud = self.cloud.connect().await?;
        let link = cloud.download_link(remote_name).await?;

        tokio::fs::create_dir_all(&self.download_dir).await?;
        remove_stale_downloads(&self.download_dir).await;

        let dest = self.download_dir.join(format!("{}.tar", remote_name));
        let result = self.fetch_and_hand_over(&link, &dest, &mut on_progress).await;

        if let Err(e) = tokio::fs::remove_file(&dest).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %dest.display(), "Cannot remove downloaded archive: {}", e);
            }
        }

        result?;
        on_progress(100);
        info!(remote_name = %remote_name, "Backup restored to supervisor");
        Ok(())
    }

    async fn fetch_and_hand_over<P>(&self, link: &str, dest: &Path, on_progress: &mut P) -> Result<()>
    where
        P: FnMut(u8) + Send,
    {
        let total = probe_length(&self.http, link).await.unwrap_or(0);
        let counter = Arc::new(AtomicU64::new(0));

        let written = run_monitored(
            download_to_file(&self.http, link, dest, counter.clone()),
            counter,
            total,
            &self.monitor,
            &self.cancel_token,
            |percent| on_progress((u16::from(percent.min(100)) * 9 / 10) as u8),
        )
        .await?;
        info!(path = %dest.display(), "Downloaded {}", format_bytes(written));

        on_progress(90);
        self.supervisor.upload_backup(dest).await
    }
}

async fn remove_stale_downloads(dir: &Path) {
    let Ok(mut entries) = tokio::fs::read_dir(dir).await else {
        return;
    };
    let now = SystemTime::now();

    while let Ok(Some(entry)) = entries.next_entry().await {
        let Ok(metadata) = entry.metadata().await else {
            continue;
        };
        let age = metadata
            .modified()
            .ok()
            .and_then(|m| now.duration_since(m).ok())
            .unwrap_or_default();
        if metadata.is_file() && age > STALE_DOWNLOAD_AGE {
            debug!(path = %entry.path().display(), "Removing stale download");
            if let Err(e) = tokio::fs::remove_file(entry.path()).await {
                warn!(path = %entry.path().display(), "Cannot remove stale download: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeCloud, FakeProvider, FakeSupervisor};

    #[tokio::test]
    async fn test_rejects_path_like_names() {
        let dir = tempfile::tempdir().unwrap();
        let supervisor = Arc::new(FakeSupervisor::default());
        let provider = Arc::new(FakeProvider::new(Arc::new(FakeCloud::default())));
        let service = RestoreService::new(supervisor, provider, dir.path()).unwrap();

        for name in ["", "../etc", "a/b", "a\\b"] {
            let err = service.restore(name, |_| {}).await.unwrap_err();
            assert!(matches!(err, YabackupError::Transfer(_)), "{}", name);
        }
    }

    #[tokio::test]
    async fn test_restore_downloads_and_uploads() {
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/files/full_abcd"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"archive-bytes".to_vec()))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let cloud = Arc::new(FakeCloud::default());
        cloud.set_link_base(&format!("{}/files", server.uri()));
        let supervisor = Arc::new(FakeSupervisor::default());
        let provider = Arc::new(FakeProvider::new(cloud));
        let service = RestoreService::new(supervisor.clone(), provider, dir.path().join("bfiles")).unwrap();

        let mut progress = Vec::new();
        service.restore("full_abcd", |p| progress.push(p)).await.unwrap();

        let uploaded = supervisor.uploaded.lock().unwrap().clone();
        assert_eq!(uploaded, vec![dir.path().join("bfiles").join("full_abcd.tar")]);
        assert!(!uploaded[0].exists());
        assert_eq!(progress.last(), Some(&100));
        assert!(progress.contains(&90));
    }

    #[tokio::test]
    async fn test_failed_download_leaves_nothing() {
        use wiremock::MockServer;

        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        let cloud = Arc::new(FakeCloud::default());
        cloud.set_link_base(&server.uri());
        let supervisor = Arc::new(FakeSupervisor::default());
        let provider = Arc::new(FakeProvider::new(cloud));
        let service = RestoreService::new(supervisor.clone(), provider, dir.path()).unwrap();

        assert!(service.restore("missing", |_| {}).await.is_err());
        assert!(supervisor.uploaded.lock().unwrap().is_empty());
        assert!(!dir.path().join("missing.tar").exists());
    }

    #[tokio::test]
    async fn test_stale_downloads_removed() {
        let dir = tempfile::tempdir().unwrap();
        let fresh = dir.path().join("fresh.tar");
        std::fs::write(&fresh, b"x").unwrap();

        remove_stale_downloads(dir.path()).await;
        assert!(fresh.exists());
    }
}
