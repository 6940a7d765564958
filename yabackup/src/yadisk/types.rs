//! Wire types of the Yandex Disk REST and OAuth APIs.

use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
pub(crate) struct Resource {
    #[serde(default, rename = "_embedded")]
    pub embedded: Option<ResourceList>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ResourceList {
    #[serde(default)]
    pub items: Vec<ResourceItem>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub(crate) struct ResourceItem {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub size: u64,
    pub modified: String,
    pub md5: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Link {
    pub href: String,
    #[serde(default)]
    pub operation_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Disk {
    #[serde(default)]
    pub total_space: u64,
    #[serde(default)]
    pub used_space: u64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct OperationStatus {
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiErrorBody {
    #[serde(default)]
    pub error: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: String,
    #[serde(default)]
    pub expires_in: Option<i64>,
}
