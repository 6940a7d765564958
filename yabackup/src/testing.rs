//! In-memory collaborators for unit tests.

use crate::models::{DiskInfo, RemoteFileInfo};
use crate::status::EntityState;
use crate::supervisor::{SupervisorApi, SupervisorBackupInfo};
use crate::transfer::ByteStream;
use crate::utils::{Result, YabackupError};
use crate::yadisk::{CloudProvider, CloudStorage};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{Duration, TimeZone, Utc};
use futures_util::{stream, StreamExt};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Write a tar archive holding a minimal `backup.json`
pub fn write_archive(dir: &Path, file_name: &str, slug: &str, name: &str) -> PathBuf {
    let path = dir.join(file_name);
    let descriptor = serde_json::json!({
        "slug": slug,
        "name": name,
        "type": "full",
        "date": "2024-05-01T03:00:00Z",
        "folders": ["share"],
    })
    .to_string();

    let file = std::fs::File::create(&path).unwrap();
    let mut builder = tar::Builder::new(file);
    let mut header = tar::Header::new_gnu();
    header.set_size(descriptor.len() as u64);
    header.set_mode(0o644);
    header.set_cksum();
    builder
        .append_data(&mut header, "backup.json", descriptor.as_bytes())
        .unwrap();
    builder.finish().unwrap();
    path
}

#[derive(Default)]
pub struct FakeSupervisor {
    backups: Mutex<Vec<(String, Option<SupervisorBackupInfo>)>>,
    downloads: Mutex<HashMap<String, Vec<u8>>>,
    list_fails: AtomicBool,
    entity_fails: AtomicBool,
    pub entity: Mutex<Option<EntityState>>,
    pub deleted: Mutex<Vec<String>>,
    pub uploaded: Mutex<Vec<PathBuf>>,
}

impl FakeSupervisor {
    pub fn add_backup(&self, info: SupervisorBackupInfo) {
        self.backups
            .lock()
            .unwrap()
            .push((info.slug.clone(), Some(info)));
    }

    pub fn add_slug_without_info(&self, slug: &str) {
        self.backups.lock().unwrap().push((slug.to_string(), None));
    }

    pub fn add_download(&self, slug: &str, body: &[u8]) {
        self.downloads
            .lock()
            .unwrap()
            .insert(slug.to_string(), body.to_vec());
    }

    pub fn fail_listing(&self) {
        self.list_fails.store(true, Ordering::SeqCst);
    }

    pub fn fail_entity(&self, fail: bool) {
        self.entity_fails.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl SupervisorApi for FakeSupervisor {
    async fn list_backups(&self) -> Result<Vec<String>> {
        if self.list_fails.load(Ordering::SeqCst) {
            return Err(YabackupError::Supervisor("listing unavailable".to_string()));
        }
        Ok(self
            .backups
            .lock()
            .unwrap()
            .iter()
            .map(|(slug, _)| slug.clone())
            .collect())
    }

    async fn backup_info(&self, slug: &str) -> Result<SupervisorBackupInfo> {
        self.backups
            .lock()
            .unwrap()
            .iter()
            .find(|(s, _)| s == slug)
            .and_then(|(_, info)| info.clone())
            .ok_or_else(|| YabackupError::Supervisor(format!("no info for {}", slug)))
    }

    async fn download_backup(&self, slug: &str) -> Result<(u64, ByteStream)> {
        let body = self
            .downloads
            .lock()
            .unwrap()
            .get(slug)
            .cloned()
            .ok_or_else(|| YabackupError::Supervisor(format!("no download for {}", slug)))?;
        if body.is_empty() {
            return Err(YabackupError::Supervisor("no content length".to_string()));
        }
        let length = body.len() as u64;
        let stream: ByteStream = Box::pin(stream::iter(vec![Ok(Bytes::from(body))]));
        Ok((length, stream))
    }

    async fn delete_backup(&self, slug: &str) -> Result<()> {
        self.deleted.lock().unwrap().push(slug.to_string());
        Ok(())
    }

    async fn upload_backup(&self, path: &Path) -> Result<()> {
        self.uploaded.lock().unwrap().push(path.to_path_buf());
        Ok(())
    }

    async fn get_entity_state(&self) -> Result<Option<EntityState>> {
        if self.entity_fails.load(Ordering::SeqCst) {
            return Err(YabackupError::Supervisor("core unavailable".to_string()));
        }
        Ok(self.entity.lock().unwrap().clone())
    }

    async fn set_entity_state(&self, state: &EntityState) -> Result<()> {
        if self.entity_fails.load(Ordering::SeqCst) {
            return Err(YabackupError::Supervisor("core unavailable".to_string()));
        }
        *self.entity.lock().unwrap() = Some(state.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeCloud {
    files: Mutex<BTreeMap<String, RemoteFileInfo>>,
    fail_uploads: Mutex<HashSet<String>>,
    fail_deletes: Mutex<HashSet<String>>,
    list_fails: AtomicBool,
    link_base: Mutex<Option<String>>,
    pub uploads: Mutex<Vec<(String, u64)>>,
    pub deletes: Mutex<Vec<(String, bool)>>,
}

impl FakeCloud {
    /// Add a file dated `size` hours after a fixed origin
    pub fn add_file(&self, name: &str, size: u64) {
        let origin = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        self.add_file_at(name, size, origin + Duration::hours(size as i64));
    }

    pub fn add_file_at(&self, name: &str, size: u64, at: chrono::DateTime<Utc>) {
        self.files.lock().unwrap().insert(
            name.to_string(),
            RemoteFileInfo {
                name: name.to_string(),
                size,
                created: at,
                modified: at,
            },
        );
    }

    pub fn fail_upload_of(&self, name: &str) {
        self.fail_uploads.lock().unwrap().insert(name.to_string());
    }

    pub fn fail_delete_of(&self, name: &str) {
        self.fail_deletes.lock().unwrap().insert(name.to_string());
    }

    pub fn fail_listing(&self) {
        self.list_fails.store(true, Ordering::SeqCst);
    }

    /// Serve download links from `base`
    pub fn set_link_base(&self, base: &str) {
        *self.link_base.lock().unwrap() = Some(base.to_string());
    }

    pub fn names(&self) -> Vec<String> {
        self.files.lock().unwrap().keys().cloned().collect()
    }
}

#[async_trait]
impl CloudStorage for FakeCloud {
    async fn list_files(&self) -> Result<Vec<RemoteFileInfo>> {
        if self.list_fails.load(Ordering::SeqCst) {
            return Err(YabackupError::CloudStorage("listing unavailable".to_string()));
        }
        Ok(self.files.lock().unwrap().values().cloned().collect())
    }

    async fn upload(&self, remote_name: &str, length: u64, mut body: ByteStream) -> Result<()> {
        if self.fail_uploads.lock().unwrap().contains(remote_name) {
            return Err(YabackupError::CloudStorage(format!("upload of {} refused", remote_name)));
        }

        let mut received = 0u64;
        while let Some(chunk) = body.next().await {
            received += chunk?.len() as u64;
        }
        if received != length {
            return Err(YabackupError::Transfer(format!(
                "expected {} bytes, got {}",
                length, received
            )));
        }

        self.uploads
            .lock()
            .unwrap()
            .push((remote_name.to_string(), received));
        self.add_file_at(remote_name, received, Utc::now());
        Ok(())
    }

    async fn download_link(&self, remote_name: &str) -> Result<String> {
        let base = self
            .link_base
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| "http://127.0.0.1:9".to_string());
        Ok(format!("{}/{}", base, remote_name))
    }

    async fn delete(&self, remote_name: &str, _md5: &str, permanently: bool) -> Result<()> {
        if self.fail_deletes.lock().unwrap().contains(remote_name) {
            return Err(YabackupError::CloudStorage(format!("delete of {} refused", remote_name)));
        }
        self.files.lock().unwrap().remove(remote_name);
        self.deletes
            .lock()
            .unwrap()
            .push((remote_name.to_string(), permanently));
        Ok(())
    }

    async fn disk_info(&self) -> Result<DiskInfo> {
        Ok(DiskInfo {
            total_space: 10_000,
            used_space: 4_000,
        })
    }
}

/// Provider handing out one shared fake cloud
pub struct FakeProvider {
    pub cloud: Arc<FakeCloud>,
    pub fails: AtomicBool,
}

impl FakeProvider {
    pub fn new(cloud: Arc<FakeCloud>) -> Self {
        Self {
            cloud,
            fails: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl CloudProvider for FakeProvider {
    async fn connect(&self) -> Result<Arc<dyn CloudStorage>> {
        if self.fails.load(Ordering::SeqCst) {
            return Err(YabackupError::Token("no token, authorization required".to_string()));
        }
        Ok(self.cloud.clone())
    }
}
