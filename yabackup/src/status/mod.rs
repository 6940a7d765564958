//! Sensor entity published to the host platform.

pub mod retry;
pub mod store;

use crate::models::{BackupFileInfo, TransferResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use retry::RetryPolicy;
pub use store::StatusStore;

/// Overall state of the sensor entity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    #[default]
    Ok,
    Error,
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Status::Ok => f.write_str("ok"),
            Status::Error => f.write_str("error"),
        }
    }
}

/// Cumulative counters shown on the sensor entity
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EntityAttributes {
    pub success_upload_files: u64,
    pub error_upload_files: u64,
    pub success_delete_files: u64,
    pub error_delete_files: u64,
    pub remote_files: u64,
    pub local_files: u64,
    pub remote_file_size: u64,
    pub local_file_size: u64,
    pub remote_free_space: u64,
    pub last_upload_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityState {
    pub state: Status,
    #[serde(default)]
    pub attributes: EntityAttributes,
}

impl EntityState {
    /// Fold one upload pass into the cumulative counters.
    ///
    /// The upload timestamp only moves when at least one file reached the
    /// cloud.
    pub fn record_pass(
        &mut self,
        upload: &TransferResult,
        delete: &TransferResult,
        finished_at: DateTime<Utc>,
    ) {
        let attrs = &mut self.attributes;
        attrs.success_upload_files += upload.ok_count as u64;
        attrs.error_upload_files += upload.error_count as u64;
        attrs.success_delete_files += delete.ok_count as u64;
        attrs.error_delete_files += delete.error_count as u64;
        if upload.ok_count > 0 {
            attrs.last_upload_time = Some(finished_at);
        }

        self.state = if upload.error_count > 0 || delete.error_count > 0 {
            Status::Error
        } else {
            Status::Ok
        };
    }

    /// Replace the inventory counters
    pub fn apply_summary(&mut self, summary: &InventorySummary, remote_free_space: u64) {
        let attrs = &mut self.attributes;
        attrs.local_files = summary.local_files;
        attrs.remote_files = summary.remote_files;
        attrs.local_file_size = summary.local_size;
        attrs.remote_file_size = summary.remote_size;
        attrs.remote_free_space = remote_free_space;
    }
}

/// File counts and byte totals over a reconciled list
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventorySummary {
    pub local_files: u64,
    pub remote_files: u64,
    pub local_size: u64,
    pub remote_size: u64,
}

impl InventorySummary {
    pub fn from_records(records: &[BackupFileInfo]) -> Self {
        records.iter().fold(Self::default(), |mut acc, record| {
            if record.is_local {
                acc.local_files += 1;
                acc.local_size += record.general.size;
            }
            if record.is_remote {
                acc.remote_files += 1;
                acc.remote_size += record.general.size;
            }
            acc
        })
    }
}
