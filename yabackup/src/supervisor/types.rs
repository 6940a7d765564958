//! Wire types of the supervisor API.

use crate::models::{AddonInfo, BackupArchiveInfo};
use chrono::{DateTime, Utc};
use serde::Deserialize;

/// Every supervisor response wraps its payload in `data`
#[derive(Debug, Deserialize)]
pub(crate) struct Envelope<T> {
    pub data: T,
}

#[derive(Debug, Deserialize)]
pub(crate) struct BackupList {
    #[serde(default)]
    pub backups: Vec<BackupSlug>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct BackupSlug {
    pub slug: String,
}

/// Detailed description of one backup
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SupervisorBackupInfo {
    pub slug: String,
    pub name: String,
    #[serde(rename = "type")]
    pub backup_type: String,
    pub supervisor_version: Option<String>,
    pub homeassistant: Option<String>,
    pub date: Option<DateTime<Utc>>,
    pub folders: Vec<String>,
    pub addons: Vec<AddonInfo>,
    pub protected: bool,
    pub size_bytes: u64,
    pub location: Option<String>,
    pub locations: Vec<Option<String>>,
}

impl SupervisorBackupInfo {
    /// Stored in the local backup directory
    pub fn is_local(&self) -> bool {
        self.location().is_empty()
    }

    /// Not local, or mirrored to at least one network storage
    pub fn is_network(&self) -> bool {
        !self.is_local()
            || self
                .locations
                .iter()
                .any(|l| l.as_deref().is_some_and(|l| !l.is_empty()))
    }

    pub fn location(&self) -> &str {
        self.location.as_deref().unwrap_or_default()
    }

    pub fn archive_info(&self) -> BackupArchiveInfo {
        BackupArchiveInfo {
            slug: self.slug.clone(),
            name: self.name.clone(),
            backup_type: self.backup_type.clone(),
            platform_version: self.supervisor_version.clone().unwrap_or_default(),
            core_version: self.homeassistant.clone().unwrap_or_default(),
            created: self.date,
            folders: self.folders.clone(),
            addons: self.addons.clone(),
        }
    }
}
