//! Yandex Disk collaborator: object storage and OAuth tokens.

pub mod client;
pub mod token;
pub mod types;

use crate::models::{DiskInfo, RemoteFileInfo};
use crate::transfer::ByteStream;
use crate::utils::Result;
use async_trait::async_trait;
use std::sync::Arc;

pub use client::{check_remote_name, YaDiskClient};
pub use token::{TokenInfo, TokenManager};

/// Object store holding the uploaded archives
#[async_trait]
pub trait CloudStorage: Send + Sync {
    /// Files (not directories) under the configured remote folder
    async fn list_files(&self) -> Result<Vec<RemoteFileInfo>>;

    async fn upload(&self, remote_name: &str, length: u64, body: ByteStream) -> Result<()>;

    /// Short-lived direct link for downloading a remote file
    async fn download_link(&self, remote_name: &str) -> Result<String>;

    /// An empty `md5` matches any content
    async fn delete(&self, remote_name: &str, md5: &str, permanently: bool) -> Result<()>;

    async fn disk_info(&self) -> Result<DiskInfo>;
}

/// Hands out a storage client bound to the current credentials
#[async_trait]
pub trait CloudProvider: Send + Sync {
    async fn connect(&self) -> Result<Arc<dyn CloudStorage>>;
}
