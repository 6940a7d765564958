//! Backup archive inspection.
//!
//! Supervisor backups are plain tar files carrying a `backup.json`
//! descriptor next to the payload. Only the descriptor is read.

use crate::models::{AddonInfo, BackupArchiveInfo};
use crate::utils::ArchiveError;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tar::Archive;

/// Entry name of the descriptor inside an archive
pub const DESCRIPTOR_NAME: &str = "backup.json";

#[derive(Debug, Deserialize)]
struct BackupDescriptor {
    #[serde(default)]
    slug: String,
    #[serde(default)]
    name: String,
    #[serde(default, rename = "type")]
    backup_type: String,
    #[serde(default)]
    supervisor_version: String,
    #[serde(default)]
    homeassistant: Option<CoreInfo>,
    #[serde(default)]
    date: Option<DateTime<Utc>>,
    #[serde(default)]
    folders: Vec<String>,
    #[serde(default)]
    addons: Vec<AddonInfo>,
}

#[derive(Debug, Deserialize)]
struct CoreInfo {
    #[serde(default)]
    version: String,
}

/// Read the `backup.json` descriptor of the archive at `path`.
///
/// The first entry whose file name is exactly `backup.json` wins.
pub fn extract_archive_info(path: &Path) -> Result<BackupArchiveInfo, ArchiveError> {
    let display = path.display().to_string();
    let read_error = |source: std::io::Error| ArchiveError::ArchiveRead {
        path: display.clone(),
        source,
    };

    let file = File::open(path).map_err(read_error)?;
    let mut archive = Archive::new(file);

    for entry in archive.entries().map_err(read_error)? {
        let mut entry = entry.map_err(read_error)?;
        if !entry.header().entry_type().is_file() {
            continue;
        }

        let is_descriptor = entry
            .path()
            .map_err(read_error)?
            .file_name()
            .map(|name| name == DESCRIPTOR_NAME)
            .unwrap_or(false);
        if !is_descriptor {
            continue;
        }

        let mut content = Vec::new();
        entry.read_to_end(&mut content).map_err(read_error)?;
        return parse_descriptor(&display, &content);
    }

    Err(ArchiveError::DescriptorMissing(display))
}

fn parse_descriptor(path: &str, content: &[u8]) -> Result<BackupArchiveInfo, ArchiveError> {
    let descriptor: BackupDescriptor =
        serde_json::from_slice(content).map_err(|e| ArchiveError::DescriptorInvalid {
            path: path.to_string(),
            reason: e.to_string(),
        })?;

    if descriptor.slug.is_empty() || descriptor.name.is_empty() {
        return Err(ArchiveError::DescriptorInvalid {
            path: path.to_string(),
            reason: "necessary field not found (slug, name)".to_string(),
        });
    }

    Ok(BackupArchiveInfo {
        slug: descriptor.slug,
        name: descriptor.name,
        backup_type: descriptor.backup_type,
        platform_version: descriptor.supervisor_version,
        core_version: descriptor
            .homeassistant
            .map(|core| core.version)
            .unwrap_or_default(),
        created: descriptor.date,
        folders: descriptor.folders,
        addons: descriptor.addons,
    })
}
