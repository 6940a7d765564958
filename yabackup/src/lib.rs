//! Yandex Disk backup add-on library.
//!
//! Mirrors supervisor backups to Yandex Disk, keeps the cloud folder under a
//! file-count cap and reports progress through a sensor entity.

pub mod api;
pub mod archive;
pub mod config;
pub mod daemon;
pub mod executor;
pub mod fs;
pub mod inventory;
pub mod models;
pub mod services;
pub mod status;
pub mod supervisor;
pub mod sync;
pub mod transfer;
pub mod utils;
pub mod yadisk;

#[cfg(test)]
pub(crate) mod testing;

// Re-export commonly used types
pub use config::Config;
pub use utils::errors::{ArchiveError, YabackupError};
pub type Result<T> = std::result::Result<T, YabackupError>;
