//! Utility modules for the backup add-on.

pub mod errors;
pub mod logger;

pub use errors::{ArchiveError, Result, YabackupError};
