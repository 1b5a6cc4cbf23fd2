//! Settings file management

use std::path::{Path, PathBuf};

use secrecy::SecretString;
use serde::Deserialize;

use crate::errors::DeployError;
use crate::logs::LogLevel;

/// Engine settings
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,

    /// Emit logs as JSON
    #[serde(default)]
    pub log_json: bool,

    /// Directory for rolling log files
    #[serde(default)]
    pub log_dir: Option<PathBuf>,

    /// Tenant every backend call is made for
    #[serde(default = "default_tenant")]
    pub tenant_id: String,

    /// Backend configuration
    #[serde(default)]
    pub backend: BackendSettings,

    /// Completion polling configuration
    #[serde(default)]
    pub poller: PollerSettings,

    /// Lifetime of temp URL signals in seconds
    #[serde(default = "default_temp_url_ttl")]
    pub temp_url_ttl_secs: u64,
}

fn default_tenant() -> String {
    "default".to_string()
}

fn default_temp_url_ttl() -> u64 {
    86400
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            log_json: false,
            log_dir: None,
            tenant_id: default_tenant(),
            backend: BackendSettings::default(),
            poller: PollerSettings::default(),
            temp_url_ttl_secs: default_temp_url_ttl(),
        }
    }
}

impl Settings {
    /// Read settings from a JSON file
    pub async fn load(path: &Path) -> Result<Self, DeployError> {
        let raw = tokio::fs::read_to_string(path).await?;
        serde_json::from_str(&raw).map_err(|e| {
            DeployError::Config(format!("Invalid settings file {}: {}", path.display(), e))
        })
    }
}

/// Backend API settings
#[derive(Debug, Clone, Deserialize)]
pub struct BackendSettings {
    /// Base URL for the backend API
    #[serde(default = "default_backend_url")]
    pub base_url: String,

    /// Bearer token
    #[serde(default)]
    pub token: Option<SecretString>,

    /// Request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_backend_url() -> String {
    "http://localhost:8004/v1".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            base_url: default_backend_url(),
            token: None,
            request_timeout_secs: default_request_timeout(),
        }
    }
}

/// Completion polling settings
#[derive(Debug, Clone, Deserialize)]
pub struct PollerSettings {
    /// Seconds between completion checks
    #[serde(default = "default_poll_interval")]
    pub interval_secs: u64,

    /// Seconds before giving up
    #[serde(default = "default_poll_timeout")]
    pub timeout_secs: u64,
}

fn default_poll_interval() -> u64 {
    5
}

fn default_poll_timeout() -> u64 {
    3600
}

impl Default for PollerSettings {
    fn default() -> Self {
        Self {
            interval_secs: default_poll_interval(),
            timeout_secs: default_poll_timeout(),
        }
    }
}
