//! Local and remote inventories.
//!
//! The local inventory is driven by the supervisor catalogue: every slug it
//! reports becomes one record, enriched from the archive file when the
//! backup lives in the local backup directory.

use crate::archive::extract_archive_info;
use crate::fs::{find_by_slug, list_backup_dir, ArchiveFile};
use crate::models::{BackupFileInfo, GeneralFileInfo, LocalBackupRecord, RemoteFileInfo};
use crate::supervisor::{SupervisorApi, SupervisorBackupInfo};
use crate::sync::reconcile;
use crate::utils::{Result, YabackupError};
use crate::yadisk::client::fallback_modified;
use crate::yadisk::CloudStorage;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub struct InventoryBuilder<'a> {
    supervisor: &'a dyn SupervisorApi,
    backup_dir: &'a Path,
}

impl<'a> InventoryBuilder<'a> {
    pub fn new(supervisor: &'a dyn SupervisorApi, backup_dir: &'a Path) -> Self {
        Self {
            supervisor,
            backup_dir,
        }
    }

    /// Records of every backup the supervisor knows, keyed by slug.
    ///
    /// # Errors
    /// Fails when the backup directory or the supervisor catalogue cannot be
    /// read. Problems with a single backup only drop that backup.
    pub async fn local(&self) -> Result<BTreeMap<String, LocalBackupRecord>> {
        let dir = self.backup_dir.to_path_buf();
        let files = tokio::task::spawn_blocking(move || list_backup_dir(&dir))
            .await
            .map_err(|e| YabackupError::InventoryRead(e.to_string()))?
            .map_err(|e| {
                YabackupError::InventoryRead(format!(
                    "cannot list {}: {}",
                    self.backup_dir.display(),
                    e
                ))
            })?;

        let slugs = self
            .supervisor
            .list_backups()
            .await
            .map_err(|e| YabackupError::InventoryRead(format!("cannot list backups: {}", e)))?;

        let mut records = BTreeMap::new();
        for slug in slugs {
            let info = match self.supervisor.backup_info(&slug).await {
                Ok(info) => info,
                Err(e) => {
                    warn!(slug = %slug, "Skipping backup, info unavailable: {}", e);
                    continue;
                }
            };

            if let Some(record) = self.build_record(&slug, info, &files).await {
                records.insert(slug, record);
            }
        }

        info!(count = records.len(), "Local inventory built");
        Ok(records)
    }

    async fn build_record(
        &self,
        slug: &str,
        info: SupervisorBackupInfo,
        files: &[ArchiveFile],
    ) -> Option<LocalBackupRecord> {
        let is_local = info.is_local();
        let is_network = info.is_network();
        let mut archive_info = info.archive_info();

        let (general, path) = if is_local {
            let Some(file) = find_by_slug(files, slug) else {
                warn!(slug = %slug, "Skipping backup, archive file not found");
                return None;
            };

            let extracted = inspect_archive(file.path.clone()).await;
            let mut extracted = match extracted {
                Ok(extracted) => extracted,
                Err(e) => {
                    warn!(slug = %slug, file = %file.name, "Skipping backup: {}", e);
                    return None;
                }
            };
            if extracted.slug != slug {
                warn!(
                    slug = %slug,
                    archive_slug = %extracted.slug,
                    "Skipping backup, archive belongs to another slug"
                );
                return None;
            }
            extracted.enrich_from(&archive_info);
            archive_info = extracted;

            // The supervisor's backup date wins over the file's mtime
            let date = info.date.unwrap_or(file.modified);
            let size = if info.size_bytes > 0 { info.size_bytes } else { file.size };
            let general = GeneralFileInfo {
                name: file.name.clone(),
                size,
                created: date,
                modified: date,
            };
            (general, file.path.to_string_lossy().into_owned())
        } else {
            let date = info.date.unwrap_or_else(fallback_modified);
            let general = GeneralFileInfo {
                name: info.name.clone(),
                size: info.size_bytes,
                created: date,
                modified: date,
            };
            (general, String::new())
        };

        debug!(slug = %slug, is_local, is_network, "Backup inventoried");
        Some(LocalBackupRecord {
            general,
            archive_info,
            slug: slug.to_string(),
            name: info.name.clone(),
            path,
            is_local,
            is_network,
            is_protected: info.protected,
            location: info.location().to_string(),
        })
    }

    /// Both inventories merged into the canonical list
    pub async fn reconciled(&self, cloud: &dyn CloudStorage) -> Result<Vec<BackupFileInfo>> {
        let remote = remote_inventory(cloud).await?;
        let local = self.local().await?;
        Ok(reconcile(&local, &remote))
    }
}

/// Files currently stored in the cloud
pub async fn remote_inventory(cloud: &dyn CloudStorage) -> Result<Vec<RemoteFileInfo>> {
    let files = cloud.list_files().await?;
    info!(count = files.len(), "Remote inventory built");
    Ok(files)
}

async fn inspect_archive(path: PathBuf) -> Result<crate::models::BackupArchiveInfo> {
    let info = tokio::task::spawn_blocking(move || extract_archive_info(&path))
        .await
        .map_err(|e| YabackupError::InventoryRead(e.to_string()))??;
    Ok(info)
}
