//! REST client for Yandex Disk.

use super::types::{ApiErrorBody, Disk, Link, OperationStatus, Resource, ResourceItem};
use super::CloudStorage;
use crate::models::{DiskInfo, RemoteFileInfo};
use crate::transfer::ByteStream;
use crate::utils::{Result, YabackupError};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use reqwest::{header, Body, RequestBuilder, Response};
use tracing::{debug, info, warn};

const LIST_LIMIT: &str = "10000";

/// Timestamp given to remote files whose modification time cannot be parsed
pub fn fallback_modified() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(1990, 1, 1, 12, 0, 0)
        .single()
        .unwrap_or_default()
}

/// Reject names that would escape the remote folder
pub fn check_remote_name(remote_name: &str) -> Result<()> {
    if remote_name.is_empty() || remote_name.contains(['/', '\\']) || remote_name.contains("..") {
        return Err(YabackupError::Transfer(format!(
            "invalid remote file name {:?}",
            remote_name
        )));
    }
    Ok(())
}

/// Keep plain files and convert them to [`RemoteFileInfo`]
pub(crate) fn remote_files_from_items(items: Vec<ResourceItem>) -> Vec<RemoteFileInfo> {
    items
        .into_iter()
        .filter(|item| item.kind == "file")
        .map(|item| {
            let modified = DateTime::parse_from_rfc3339(&item.modified)
                .map(|ts| ts.with_timezone(&Utc))
                .unwrap_or_else(|e| {
                    warn!(name = %item.name, "Unparseable modification time {:?}: {}", item.modified, e);
                    fallback_modified()
                });
            RemoteFileInfo {
                name: item.name,
                size: item.size,
                created: modified,
                modified,
            }
        })
        .collect()
}

/// Client bound to one access token. Build a new one when the token rotates.
#[derive(Clone)]
pub struct YaDiskClient {
    http: reqwest::Client,
    api_url: String,
    token: String,
    remote_path: String,
}

impl YaDiskClient {
    pub fn new(api_url: &str, token: &str, remote_path: &str) -> Result<Self> {
        if token.is_empty() {
            return Err(YabackupError::Token("access token is empty".to_string()));
        }

        let http = reqwest::Client::builder()
            .user_agent(concat!("yabackup/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            api_url: api_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
            remote_path: remote_path.to_string(),
        })
    }

    /// Full cloud path of a file in the backup folder
    pub fn remote_path_for(&self, remote_name: &str) -> String {
        format!("{}/{}", self.remote_path.trim_end_matches('/'), remote_name)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request.header(header::AUTHORIZATION, format!("OAuth {}", self.token))
    }

    async fn send(&self, request: RequestBuilder, what: &str) -> Result<Response> {
        let response = self.authorized(request).send().await?;
        check(response, what).await
    }

    /// Status of an asynchronous disk operation
    pub async fn operation_status(&self, operation_id: &str) -> Result<String> {
        let url = format!("{}/operations/{}", self.api_url, operation_id);
        let response = self.send(self.http.get(url), "operation status").await?;
        let status: OperationStatus = response.json().await?;
        Ok(status.status)
    }
}

async fn check(response: Response, what: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let detail = match response.json::<ApiErrorBody>().await {
        Ok(body) if !body.description.is_empty() => format!("{}: {}", body.error, body.description),
        Ok(body) => body.error,
        Err(_) => String::new(),
    };
    Err(YabackupError::CloudStorage(format!(
        "{} failed with status {} {}",
        what, status, detail
    )))
}

#[async_trait]
impl CloudStorage for YaDiskClient {
    async fn list_files(&self) -> Result<Vec<RemoteFileInfo>> {
        let request = self.http.get(format!("{}/resources", self.api_url)).query(&[
            ("path", self.remote_path.as_str()),
            ("limit", LIST_LIMIT),
            ("sort", "name"),
        ]);
        let resource: Resource = self.send(request, "list files").await?.json().await?;
        let items = resource.embedded.map(|e| e.items).unwrap_or_default();
        Ok(remote_files_from_items(items))
    }

    async fn upload(&self, remote_name: &str, length: u64, body: ByteStream) -> Result<()> {
        let path = self.remote_path_for(remote_name);
        let request = self
            .http
            .get(format!("{}/resources/upload", self.api_url))
            .query(&[("path", path.as_str()), ("overwrite", "true")]);
        let link: Link = self.send(request, "get upload link").await?.json().await?;

        let put = self
            .http
            .put(&link.href)
            .header(header::CONTENT_LENGTH, length)
            .body(Body::wrap_stream(body));
        check(put.send().await?, "upload").await?;

        if let Some(operation_id) = link.operation_id.as_deref() {
            match self.operation_status(operation_id).await {
                Ok(status) => debug!(remote_name = %remote_name, status = %status, "Upload operation"),
                Err(e) => debug!(remote_name = %remote_name, "Upload operation status unavailable: {}", e),
            }
        }

        info!(remote_name = %remote_name, "Uploaded to cloud");
        Ok(())
    }

    async fn download_link(&self, remote_name: &str) -> Result<String> {
        let path = self.remote_path_for(remote_name);
        let request = self
            .http
            .get(format!("{}/resources/download", self.api_url))
            .query(&[("path", path.as_str())]);
        let link: Link = self.send(request, "get download link").await?.json().await?;
        Ok(link.href)
    }

    async fn delete(&self, remote_name: &str, md5: &str, permanently: bool) -> Result<()> {
        let path = self.remote_path_for(remote_name);
        let permanently = if permanently { "true" } else { "false" };
        let mut query = vec![("path", path.as_str()), ("permanently", permanently)];
        if !md5.is_empty() {
            query.push(("md5", md5));
        }

        let request = self
            .http
            .delete(format!("{}/resources", self.api_url))
            .query(&query);
        self.send(request, "delete").await?;
        info!(remote_name = %remote_name, permanently, "Deleted from cloud");
        Ok(())
    }

    async fn disk_info(&self) -> Result<DiskInfo> {
        let request = self
            .http
            .get(format!("{}/", self.api_url))
            .query(&[("fields", "total_space,used_space")]);
        let disk: Disk = self.send(request, "disk info").await?.json().await?;
        Ok(DiskInfo {
            total_space: disk.total_space,
            used_space: disk.used_space,
        })
    }
}
