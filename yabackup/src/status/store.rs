//! Persistence of the sensor entity on the host and in a local copy.
//!
//! The host forgets sensor entities when it restarts, so every published
//! state is mirrored to a JSON file and pushed back when the entity is gone.

use super::EntityState;
use crate::supervisor::SupervisorApi;
use crate::utils::Result;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct StatusStore {
    supervisor: Arc<dyn SupervisorApi>,
    copy_path: PathBuf,
}

impl StatusStore {
    pub fn new(supervisor: Arc<dyn SupervisorApi>, copy_path: impl Into<PathBuf>) -> Self {
        Self {
            supervisor,
            copy_path: copy_path.into(),
        }
    }

    pub fn copy_path(&self) -> &Path {
        &self.copy_path
    }

    /// Current state: host entity, then the local copy, then a fresh state
    pub async fn current(&self) -> Result<EntityState> {
        if let Some(state) = self.supervisor.get_entity_state().await? {
            return Ok(state);
        }
        Ok(self.read_local_copy().await?.unwrap_or_default())
    }

    /// Push a state to the host and mirror it locally
    pub async fn publish(&self, state: &EntityState) -> Result<()> {
        self.supervisor.set_entity_state(state).await?;
        self.write_local_copy(state).await?;
        debug!(state = %state.state, "Entity state published");
        Ok(())
    }

    /// Read-modify-write of the published state
    pub async fn update<F>(&self, apply: F) -> Result<EntityState>
    where
        F: FnOnce(&mut EntityState),
    {
        let mut state = self.current().await?;
        apply(&mut state);
        self.publish(&state).await?;
        Ok(state)
    }

    /// Recreate the host entity if it is missing.
    ///
    /// Returns `Ok(true)` once the entity exists on the host.
    pub async fn ensure_entity_state(&self) -> Result<bool> {
        if self.supervisor.get_entity_state().await?.is_some() {
            return Ok(true);
        }

        let state = match self.read_local_copy().await? {
            Some(state) => {
                info!("Restoring entity state from local copy");
                state
            }
            None => {
                info!("No local entity copy, creating a fresh entity");
                EntityState::default()
            }
        };
        self.publish(&state).await?;
        Ok(true)
    }

    pub async fn read_local_copy(&self) -> Result<Option<EntityState>> {
        let raw = match tokio::fs::read(&self.copy_path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        match serde_json::from_slice(&raw) {
            Ok(state) => Ok(Some(state)),
            Err(e) => {
                warn!(path = %self.copy_path.display(), "Ignoring unreadable entity copy: {}", e);
                Ok(None)
            }
        }
    }

    pub async fn write_local_copy(&self, state: &EntityState) -> Result<()> {
        if let Some(parent) = self.copy_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let raw = serde_json::to_vec_pretty(state)?;
        tokio::fs::write(&self.copy_path, raw).await?;
        Ok(())
    }
}
