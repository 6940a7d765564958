//! Supervisor REST collaborator: backup catalogue and sensor entities.

pub mod client;
pub mod types;

use crate::status::EntityState;
use crate::transfer::ByteStream;
use crate::utils::Result;
use async_trait::async_trait;
use std::path::Path;

pub use client::SupervisorClient;
pub use types::SupervisorBackupInfo;

#[async_trait]
pub trait SupervisorApi: Send + Sync {
    /// Slugs of every backup the supervisor knows
    async fn list_backups(&self) -> Result<Vec<String>>;

    async fn backup_info(&self, slug: &str) -> Result<SupervisorBackupInfo>;

    /// Content length and body of a backup archive
    async fn download_backup(&self, slug: &str) -> Result<(u64, ByteStream)>;

    async fn delete_backup(&self, slug: &str) -> Result<()>;

    /// Hand an archive file to the supervisor as a new backup
    async fn upload_backup(&self, path: &Path) -> Result<()>;

    /// `None` when the host has no such entity yet
    async fn get_entity_state(&self) -> Result<Option<EntityState>>;

    async fn set_entity_state(&self, state: &EntityState) -> Result<()>;
}
