//! Backup directory listing.
//!
//! The supervisor keeps every local archive directly in the backup
//! directory, so the walk is a single level deep.

use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// An archive file found in the backup directory
#[derive(Debug, Clone)]
pub struct ArchiveFile {
    /// File name inside the backup directory
    pub name: String,

    /// Full path to the file
    pub path: PathBuf,

    /// File size in bytes
    pub size: u64,

    /// Last modification time
    pub modified: DateTime<Utc>,
}

impl ArchiveFile {
    fn from_entry(entry: &DirEntry) -> std::io::Result<Self> {
        let metadata = entry.metadata()?;
        let modified = metadata
            .modified()
            .map(DateTime::<Utc>::from)
            .unwrap_or_else(|_| DateTime::<Utc>::from(std::time::UNIX_EPOCH));

        Ok(Self {
            name: entry.file_name().to_string_lossy().to_string(),
            path: entry.path().to_path_buf(),
            size: metadata.len(),
            modified,
        })
    }
}

/// List the regular files of the backup directory, sorted by name.
///
/// # Errors
/// Fails if the directory itself cannot be read.
pub fn list_backup_dir(root: &Path) -> std::io::Result<Vec<ArchiveFile>> {
    let mut files = Vec::new();

    for entry in WalkDir::new(root).min_depth(1).max_depth(1).follow_links(true) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        files.push(ArchiveFile::from_entry(&entry)?);
    }

    files.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(files)
}

/// First archive whose file name contains the slug.
pub fn find_by_slug<'a>(files: &'a [ArchiveFile], slug: &str) -> Option<&'a ArchiveFile> {
    if slug.is_empty() {
        return None;
    }
    files.iter().find(|f| f.name.contains(slug))
}
