//! Configuration management for the backup add-on.
//!
//! Loads the add-on options file (`/data/options.json` under Home Assistant)
//! with `YABACKUP__*` environment variable overrides.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Default location of the options file written by the supervisor
pub const DEFAULT_OPTIONS_PATH: &str = "/data/options.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// OAuth application id registered at Yandex
    pub client_id: String,

    /// OAuth application secret
    pub client_secret: String,

    /// Cloud folder holding the archives
    pub remote_path: String,

    /// Retention cap for the cloud folder
    pub remote_maximum_files_quantity: usize,

    /// Cron expression for the upload task (5 or 6 fields)
    pub schedule: String,

    /// Log level (DEBUG, INFO, WARNING, ERROR or a tracing directive)
    pub log_level: String,

    /// Sensor entity id without the `sensor.` prefix
    pub entity_id: String,

    /// Upload backups that live only on network storage
    pub enable_upload_from_network_storage: bool,

    /// Network storages allowed for upload (empty = any)
    pub enabled_network_storages: Vec<String>,

    /// HTTP API port
    pub port: u16,

    /// Directory the supervisor keeps local backup archives in
    pub backup_dir: PathBuf,

    /// Persistent add-on data (token, entity copy, temporary downloads)
    pub data_dir: PathBuf,

    /// Supervisor API base URL
    pub supervisor_url: String,

    /// Yandex Disk REST API base URL
    pub yadisk_api_url: String,

    /// Yandex OAuth base URL
    pub oauth_url: String,

    /// Supervisor API token, taken from `SUPERVISOR_TOKEN`
    #[serde(skip)]
    pub supervisor_token: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            client_id: String::new(),
            client_secret: String::new(),
            remote_path: "app:/".to_string(),
            remote_maximum_files_quantity: 10,
            schedule: "0 3 * * *".to_string(),
            log_level: "info".to_string(),
            entity_id: "yandex_backup_state".to_string(),
            enable_upload_from_network_storage: false,
            enabled_network_storages: Vec::new(),
            port: 8099,
            backup_dir: PathBuf::from("/backup"),
            data_dir: PathBuf::from("/data"),
            supervisor_url: "http://supervisor".to_string(),
            yadisk_api_url: "https://cloud-api.yandex.net/v1/disk".to_string(),
            oauth_url: "https://oauth.yandex.ru".to_string(),
            supervisor_token: String::new(),
        }
    }
}

impl Config {
    /// Load configuration from an options file plus environment overrides.
    ///
    /// A missing file is not an error; defaults and the environment still apply.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let _ = dotenvy::dotenv();

        let settings = config::Config::builder()
            .add_source(config::File::from(path).required(false))
            .add_source(
                config::Environment::with_prefix("YABACKUP")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("enabled_network_storages"),
            )
            .build()?;

        let mut config: Config = settings.try_deserialize()?;
        config.supervisor_token = std::env::var("SUPERVISOR_TOKEN").unwrap_or_default();
        Ok(config)
    }

    /// Allow-list of network storages, trimmed at insertion time
    pub fn allowed_storages(&self) -> HashSet<String> {
        self.enabled_network_storages
            .iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }

    /// Upload schedule in the seconds-first form the scheduler expects
    pub fn upload_cron(&self) -> String {
        normalize_cron(&self.schedule)
    }

    /// Full sensor entity id
    pub fn sensor_entity_id(&self) -> String {
        let id = self.entity_id.trim();
        let id = id.strip_prefix("sensor.").unwrap_or(id);
        if id.is_empty() {
            "sensor.yandex_backup_state".to_string()
        } else {
            format!("sensor.{}", id)
        }
    }

    pub fn token_path(&self) -> PathBuf {
        self.data_dir.join("tokenInfo.json")
    }

    pub fn entity_copy_path(&self) -> PathBuf {
        self.data_dir.join("entity-copy.json")
    }

    /// Scratch directory for archives downloaded from the cloud
    pub fn download_dir(&self) -> PathBuf {
        self.data_dir.join("bfiles")
    }
}

/// Prefix a classic five-field cron expression with a seconds field.
pub fn normalize_cron(expression: &str) -> String {
    let expression = expression.trim();
    if expression.split_whitespace().count() == 5 {
        format!("0 {}", expression)
    } else {
        expression.to_string()
    }
}
