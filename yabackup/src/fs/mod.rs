//! Local backup directory access.

pub mod walker;

pub use walker::{find_by_slug, list_backup_dir, ArchiveFile};
