//! OAuth token lifecycle for Yandex Disk.

use super::client::YaDiskClient;
use super::types::TokenResponse;
use super::{CloudProvider, CloudStorage};
use crate::utils::{Result, YabackupError};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Tokens are refreshed once they are this close to expiring
const REFRESH_WINDOW_HOURS: i64 = 240;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenInfo {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: String,
    #[serde(default)]
    pub expiry: Option<DateTime<Utc>>,
}

impl TokenInfo {
    /// A token without expiry never expires
    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        !self.access_token.is_empty() && self.expiry.map_or(true, |e| e > now)
    }

    pub fn needs_refresh(&self, now: DateTime<Utc>) -> bool {
        match self.expiry {
            Some(expiry) => expiry - now < Duration::hours(REFRESH_WINDOW_HOURS),
            None => false,
        }
    }

    fn from_response(response: TokenResponse, now: DateTime<Utc>) -> Self {
        Self {
            access_token: response.access_token,
            refresh_token: response.refresh_token,
            expiry: response
                .expires_in
                .filter(|secs| *secs > 0)
                .map(|secs| now + Duration::seconds(secs)),
        }
    }
}

/// Owns the persisted token and hands out clients bound to it
pub struct TokenManager {
    http: reqwest::Client,
    client_id: String,
    client_secret: String,
    oauth_url: String,
    api_url: String,
    remote_path: String,
    path: PathBuf,
    token: RwLock<Option<TokenInfo>>,
}

impl TokenManager {
    pub fn new(
        client_id: &str,
        client_secret: &str,
        oauth_url: &str,
        api_url: &str,
        remote_path: &str,
        path: impl Into<PathBuf>,
    ) -> Result<Self> {
        Ok(Self {
            http: reqwest::Client::builder().build()?,
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            oauth_url: oauth_url.trim_end_matches('/').to_string(),
            api_url: api_url.to_string(),
            remote_path: remote_path.to_string(),
            path: path.into(),
            token: RwLock::new(None),
        })
    }

    /// Read the persisted token; a missing file leaves the manager empty
    pub async fn load(&self) -> Result<bool> {
        let raw = match tokio::fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(e.into()),
        };
        let token: TokenInfo = serde_json::from_slice(&raw)?;
        *self.token.write().await = Some(token);
        Ok(true)
    }

    pub async fn current(&self) -> Option<TokenInfo> {
        self.token.read().await.clone()
    }

    pub async fn is_valid(&self) -> bool {
        self.current()
            .await
            .is_some_and(|t| t.is_valid(Utc::now()))
    }

    /// Page where the user obtains a confirmation code
    pub fn check_code_url(&self) -> String {
        format!(
            "{}/authorize?response_type=code&client_id={}",
            self.oauth_url, self.client_id
        )
    }

    pub async fn exchange_code(&self, code: &str) -> Result<TokenInfo> {
        let code = code.trim();
        if code.is_empty() {
            return Err(YabackupError::Token("confirmation code is empty".to_string()));
        }

        let token = self
            .request_token(&[("grant_type", "authorization_code"), ("code", code)])
            .await?;
        self.store(token.clone()).await?;
        info!("Access token obtained");
        Ok(token)
    }

    /// Refresh the token when it is close to expiry. Returns whether a
    /// refresh happened.
    pub async fn refresh_if_needed(&self) -> Result<bool> {
        let current = self
            .current()
            .await
            .ok_or_else(|| YabackupError::Token("no token, authorization required".to_string()))?;

        if !current.needs_refresh(Utc::now()) {
            debug!("Token does not need refresh yet");
            return Ok(false);
        }
        if current.refresh_token.is_empty() {
            return Err(YabackupError::Token("no refresh token".to_string()));
        }

        let refreshed = self
            .request_token(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", current.refresh_token.as_str()),
            ])
            .await?;

        if refreshed.access_token == current.access_token
            && refreshed.refresh_token == current.refresh_token
        {
            return Err(YabackupError::Token(
                "refresh returned the same token".to_string(),
            ));
        }

        self.store(refreshed).await?;
        info!("Access token refreshed");
        Ok(true)
    }

    /// Fresh client for the current access token
    pub async fn client(&self) -> Result<YaDiskClient> {
        let token = self
            .current()
            .await
            .ok_or_else(|| YabackupError::Token("no token, authorization required".to_string()))?;
        YaDiskClient::new(&self.api_url, &token.access_token, &self.remote_path)
    }

    async fn request_token(&self, grant: &[(&str, &str)]) -> Result<TokenInfo> {
        let mut form: Vec<(&str, &str)> = grant.to_vec();
        form.push(("client_id", self.client_id.as_str()));
        form.push(("client_secret", self.client_secret.as_str()));

        let response = self
            .http
            .post(format!("{}/token", self.oauth_url))
            .form(&form)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(YabackupError::Token(format!(
                "token endpoint returned {}: {}",
                status,
                body.trim()
            )));
        }

        let payload: TokenResponse = response.json().await?;
        Ok(TokenInfo::from_response(payload, Utc::now()))
    }

    async fn store(&self, token: TokenInfo) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&self.path, serde_json::to_vec_pretty(&token)?).await?;
        *self.token.write().await = Some(token);
        Ok(())
    }
}

#[async_trait]
impl CloudProvider for TokenManager {
    async fn connect(&self) -> Result<Arc<dyn CloudStorage>> {
        self.refresh_if_needed().await?;
        Ok(Arc::new(self.client().await?))
    }
}
