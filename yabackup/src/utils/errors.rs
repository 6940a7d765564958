//! Custom error types for the backup add-on.

use thiserror::Error;

/// Failures of the archive metadata extractor.
#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("cannot read archive {path}: {source}")]
    ArchiveRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("backup info not found in {0}")]
    DescriptorMissing(String),

    #[error("cannot parse backup info in {path}: {reason}")]
    DescriptorInvalid { path: String, reason: String },
}

#[derive(Error, Debug)]
pub enum YabackupError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Archive(#[from] ArchiveError),

    #[error("Inventory read error: {0}")]
    InventoryRead(String),

    #[error("Supervisor error: {0}")]
    Supervisor(String),

    #[error("Cloud storage error: {0}")]
    CloudStorage(String),

    #[error("Token error: {0}")]
    Token(String),

    #[error("Transfer error: {0}")]
    Transfer(String),

    #[error("Operation timed out after {0} seconds")]
    Timeout(u64),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("{failed} of {total} transfers failed")]
    AggregateTransfer { failed: usize, total: usize },
}

pub type Result<T> = std::result::Result<T, YabackupError>;
