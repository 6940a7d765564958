//! Merge of local and remote inventories into one list keyed by remote name.

use crate::models::{BackupArchiveInfo, BackupFileInfo, LocalBackupRecord, RemoteFileInfo};
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, warn};

/// Cloud object name for a backup.
///
/// Spaces become dashes and colons become underscores so the name is safe
/// for the cloud path syntax.
pub fn remote_file_name(name: &str, slug: &str) -> String {
    format!("{}_{}", name, slug)
        .replace(' ', "-")
        .replace(':', "_")
}

/// Merge both inventories into one record per remote name.
///
/// Local records are visited in slug order. When two slugs normalise to the
/// same remote name the first one is kept and the other is dropped with a
/// warning. Output is ordered newest first by [`BackupFileInfo::age`], ties
/// broken by remote name ascending.
pub fn reconcile(
    local: &BTreeMap<String, LocalBackupRecord>,
    remote: &[RemoteFileInfo],
) -> Vec<BackupFileInfo> {
    let mut remote_by_name: BTreeMap<&str, &RemoteFileInfo> = BTreeMap::new();
    for file in remote {
        remote_by_name.entry(file.name.as_str()).or_insert(file);
    }

    let mut processed: HashSet<String> = HashSet::new();
    let mut records = Vec::with_capacity(local.len() + remote_by_name.len());

    for record in local.values() {
        let remote_name = remote_file_name(&record.name, &record.slug);
        if processed.contains(&remote_name) {
            warn!(
                slug = %record.slug,
                remote_name = %remote_name,
                "Remote name already taken by another backup, skipping"
            );
            continue;
        }

        let remote_file = remote_by_name.get(remote_name.as_str());
        records.push(BackupFileInfo {
            general: record.general.clone(),
            archive_info: record.archive_info.clone(),
            slug: record.slug.clone(),
            name: record.name.clone(),
            remote_name: remote_name.clone(),
            downloaded: remote_file.map(|f| f.created),
            is_local: record.is_local,
            is_remote: remote_file.is_some(),
            is_network: record.is_network,
            is_protected: record.is_protected,
            location: record.location.clone(),
        });
        processed.insert(remote_name);
    }

    for (name, file) in &remote_by_name {
        if processed.contains(*name) {
            continue;
        }
        debug!(remote_name = %name, "Remote file has no local counterpart");
        records.push(BackupFileInfo {
            general: (*file).clone(),
            archive_info: BackupArchiveInfo::unknown(),
            slug: String::new(),
            name: file.name.clone(),
            remote_name: file.name.clone(),
            downloaded: Some(file.created),
            is_local: false,
            is_remote: true,
            is_network: false,
            is_protected: false,
            location: String::new(),
        });
    }

    records.sort_by(|a, b| {
        b.age()
            .cmp(&a.age())
            .then_with(|| a.remote_name.cmp(&b.remote_name))
    });
    records
}
