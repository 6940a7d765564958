//! HTTP implementation of [`SupervisorApi`].

use super::types::{BackupList, Envelope, SupervisorBackupInfo};
use super::SupervisorApi;
use crate::status::EntityState;
use crate::transfer::ByteStream;
use crate::utils::{Result, YabackupError};
use async_trait::async_trait;
use futures_util::TryStreamExt;
use reqwest::{multipart, Body, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::path::Path;
use tokio_util::io::ReaderStream;
use tracing::{debug, info};

pub struct SupervisorClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
    entity_id: String,
}

impl SupervisorClient {
    /// `entity_id` is the full sensor id, e.g. `sensor.yandex_backup_state`
    pub fn new(base_url: &str, token: &str, entity_id: &str) -> Result<Self> {
        if token.is_empty() {
            return Err(YabackupError::Config(
                "SUPERVISOR_TOKEN is not set".to_string(),
            ));
        }

        let http = reqwest::Client::builder()
            .user_agent(concat!("yabackup/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
            entity_id: entity_id.to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn entity_url(&self) -> String {
        self.url(&format!("/core/api/states/{}", self.entity_id))
    }

    async fn send(&self, request: reqwest::RequestBuilder, what: &str) -> Result<Response> {
        let response = request.bearer_auth(&self.token).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(YabackupError::Supervisor(format!(
                "{} failed with status {}: {}",
                what,
                status,
                body.trim()
            )));
        }
        Ok(response)
    }

    async fn get_data<T: DeserializeOwned>(&self, path: &str, what: &str) -> Result<T> {
        let response = self.send(self.http.get(self.url(path)), what).await?;
        let envelope: Envelope<T> = response.json().await?;
        Ok(envelope.data)
    }
}

#[async_trait]
impl SupervisorApi for SupervisorClient {
    async fn list_backups(&self) -> Result<Vec<String>> {
        let list: BackupList = self.get_data("/backups", "list backups").await?;
        Ok(list.backups.into_iter().map(|b| b.slug).collect())
    }

    async fn backup_info(&self, slug: &str) -> Result<SupervisorBackupInfo> {
        self.get_data(&format!("/backups/{}/info", slug), "backup info")
            .await
    }

    async fn download_backup(&self, slug: &str) -> Result<(u64, ByteStream)> {
        let request = self.http.get(self.url(&format!("/backups/{}/download", slug)));
        let response = self.send(request, "download backup").await?;

        let length = response.content_length().unwrap_or(0);
        if length == 0 {
            return Err(YabackupError::Supervisor(format!(
                "backup {} has no content length",
                slug
            )));
        }

        let stream: ByteStream = Box::pin(response.bytes_stream().map_err(std::io::Error::other));
        Ok((length, stream))
    }

    async fn delete_backup(&self, slug: &str) -> Result<()> {
        let request = self.http.delete(self.url(&format!("/backups/{}", slug)));
        self.send(request, "delete backup").await?;
        info!(slug = %slug, "Backup deleted from supervisor");
        Ok(())
    }

    async fn upload_backup(&self, path: &Path) -> Result<()> {
        let file = tokio::fs::File::open(path).await?;
        let length = file.metadata().await?.len();
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "backup.tar".to_string());

        let body = Body::wrap_stream(ReaderStream::new(file));
        let part = multipart::Part::stream_with_length(body, length).file_name(file_name);
        let form = multipart::Form::new().part("file", part);

        let request = self
            .http
            .post(self.url("/backups/new/upload"))
            .multipart(form);
        self.send(request, "upload backup").await?;
        info!(path = %path.display(), "Backup uploaded to supervisor");
        Ok(())
    }

    async fn get_entity_state(&self) -> Result<Option<EntityState>> {
        let response = self
            .http
            .get(self.entity_url())
            .bearer_auth(&self.token)
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            debug!(entity = %self.entity_id, "Entity not present on host");
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(YabackupError::Supervisor(format!(
                "get entity state failed with status {}",
                response.status()
            )));
        }
        Ok(Some(response.json().await?))
    }

    async fn set_entity_state(&self, state: &EntityState) -> Result<()> {
        let request = self.http.post(self.entity_url()).json(state);
        self.send(request, "set entity state").await?;
        Ok(())
    }
}
