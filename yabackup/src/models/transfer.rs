//! Transfer plans and their outcomes.

use super::GeneralFileInfo;
use serde::{Deserialize, Serialize};

/// Where a network-only backup can be fetched from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkFileInfo {
    pub slug: String,
    pub location: String,
}

/// A backup that still has to reach the cloud
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadCandidate {
    pub local_info: GeneralFileInfo,
    pub remote_name: String,
    pub is_local: bool,
    pub is_network: bool,
    pub network_info: Option<NetworkFileInfo>,
}

/// A cloud object evicted by the retention cap
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteCandidate {
    pub remote_name: String,
    pub file_info: GeneralFileInfo,
    /// Never computed; the cloud API treats an empty hash as "any"
    pub content_hash: String,
}

/// Outcome of one upload or delete batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferResult {
    pub ok_count: usize,
    pub error_count: usize,
    pub processed_bytes: u64,
}

impl TransferResult {
    pub fn record_success(&mut self, bytes: u64) {
        self.ok_count += 1;
        self.processed_bytes += bytes;
    }

    pub fn record_failure(&mut self) {
        self.error_count += 1;
    }

    pub fn total(&self) -> usize {
        self.ok_count + self.error_count
    }
}

/// Cloud disk capacity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiskInfo {
    pub total_space: u64,
    pub used_space: u64,
}

impl DiskInfo {
    pub fn free_space(&self) -> u64 {
        self.total_space.saturating_sub(self.used_space)
    }
}
