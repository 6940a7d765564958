//! Backup inventory records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Marker stored as the platform version of archives known only remotely
pub const UNKNOWN_VERSION: &str = "???";

/// Vital statistics of a local or remote file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneralFileInfo {
    pub name: String,
    pub size: u64,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
}

/// One object in the cloud folder, keyed by its name
pub type RemoteFileInfo = GeneralFileInfo;

/// Component bundled into a backup
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddonInfo {
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub version: String,
}

/// Identity of a backup as described by its `backup.json` descriptor
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupArchiveInfo {
    pub slug: String,
    pub name: String,
    pub backup_type: String,
    pub platform_version: String,
    pub core_version: String,
    pub created: Option<DateTime<Utc>>,
    pub folders: Vec<String>,
    pub addons: Vec<AddonInfo>,
}

impl BackupArchiveInfo {
    /// Placeholder for archives that exist only in the cloud
    pub fn unknown() -> Self {
        Self {
            platform_version: UNKNOWN_VERSION.to_string(),
            ..Self::default()
        }
    }

    /// Fill blank fields from another description of the same backup
    pub fn enrich_from(&mut self, other: &BackupArchiveInfo) {
        fn fill(target: &mut String, source: &str) {
            if target.is_empty() {
                *target = source.to_string();
            }
        }

        fill(&mut self.backup_type, &other.backup_type);
        fill(&mut self.platform_version, &other.platform_version);
        fill(&mut self.core_version, &other.core_version);
        if self.created.is_none() {
            self.created = other.created;
        }
        if self.folders.is_empty() {
            self.folders = other.folders.clone();
        }
        if self.addons.is_empty() {
            self.addons = other.addons.clone();
        }
    }
}

/// A backup known to the supervisor, locally resident or on network storage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalBackupRecord {
    pub general: GeneralFileInfo,
    pub archive_info: BackupArchiveInfo,
    pub slug: String,
    pub name: String,
    /// Empty when the archive is not in the local backup directory
    pub path: String,
    pub is_local: bool,
    pub is_network: bool,
    pub is_protected: bool,
    pub location: String,
}

/// Canonical merged view of one backup across local and remote inventories
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupFileInfo {
    pub general: GeneralFileInfo,
    pub archive_info: BackupArchiveInfo,
    pub slug: String,
    pub name: String,
    pub remote_name: String,
    pub downloaded: Option<DateTime<Utc>>,
    pub is_local: bool,
    pub is_remote: bool,
    pub is_network: bool,
    pub is_protected: bool,
    pub location: String,
}

impl BackupFileInfo {
    /// Age used for both list ordering and retention eviction.
    ///
    /// Remote copies are aged by their cloud timestamp, everything else by
    /// the backup's own modification time.
    pub fn age(&self) -> DateTime<Utc> {
        match (self.is_remote, self.downloaded) {
            (true, Some(downloaded)) => downloaded,
            _ => self.general.modified,
        }
    }
}
