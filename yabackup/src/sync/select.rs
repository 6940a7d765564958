//! Upload and retention selection over the reconciled list.

use crate::models::{BackupFileInfo, DeleteCandidate, NetworkFileInfo, UploadCandidate};
use std::collections::HashSet;

/// Which network storages may feed uploads.
#[derive(Debug, Clone, Default)]
pub struct StoragePolicy {
    network_upload_enabled: bool,
    allowed_storages: HashSet<String>,
}

impl StoragePolicy {
    pub fn new<I, S>(network_upload_enabled: bool, allowed_storages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let allowed_storages = allowed_storages
            .into_iter()
            .map(|s| s.as_ref().trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Self {
            network_upload_enabled,
            allowed_storages,
        }
    }

    pub fn network_upload_enabled(&self) -> bool {
        self.network_upload_enabled
    }

    /// An empty allow-list admits every storage
    pub fn is_storage_allowed(&self, location: &str) -> bool {
        self.allowed_storages.is_empty() || self.allowed_storages.contains(location.trim())
    }

    fn admits(&self, record: &BackupFileInfo) -> bool {
        if record.is_remote {
            return false;
        }
        if record.is_local {
            return true;
        }
        record.is_network && self.network_upload_enabled && self.is_storage_allowed(&record.location)
    }
}

/// Records that are not yet in the cloud and may be uploaded.
pub fn select_uploads(records: &[BackupFileInfo], policy: &StoragePolicy) -> Vec<UploadCandidate> {
    records
        .iter()
        .filter(|record| policy.admits(record))
        .map(|record| UploadCandidate {
            local_info: record.general.clone(),
            remote_name: record.remote_name.clone(),
            is_local: record.is_local,
            is_network: record.is_network,
            network_info: record.is_network.then(|| NetworkFileInfo {
                slug: record.slug.clone(),
                location: record.location.clone(),
            }),
        })
        .collect()
}

/// Oldest remote files to evict so that `pending_uploads` new files fit
/// under `max_files`.
pub fn select_deletions(
    records: &[BackupFileInfo],
    pending_uploads: usize,
    max_files: usize,
) -> Vec<DeleteCandidate> {
    let mut remote: Vec<&BackupFileInfo> = records.iter().filter(|r| r.is_remote).collect();
    let total = pending_uploads + remote.len();
    if total <= max_files {
        return Vec::new();
    }

    let evict = total - max_files;
    remote.sort_by(|a, b| {
        a.age()
            .cmp(&b.age())
            .then_with(|| a.remote_name.cmp(&b.remote_name))
    });

    remote
        .into_iter()
        .take(evict)
        .map(|record| DeleteCandidate {
            remote_name: record.remote_name.clone(),
            file_info: record.general.clone(),
            content_hash: String::new(),
        })
        .collect()
}
