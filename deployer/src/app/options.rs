//! Application configuration options

use std::time::Duration;

use secrecy::SecretString;

use crate::app::settings::Settings;
use crate::errors::DeployError;
use crate::signal::TempUrlOptions;
use crate::workers::poller;

/// Where deployment records live
#[derive(Debug, Clone)]
pub enum BackendMode {
    /// In-process backend and capability providers
    Memory,

    /// REST backend
    Http {
        base_url: String,
        token: SecretString,
        timeout: Duration,
    },
}

/// Main application options
#[derive(Debug, Clone)]
pub struct AppOptions {
    /// Backend selection
    pub backend: BackendMode,

    /// Tenant backend calls are made for
    pub tenant_id: String,

    /// Completion polling options
    pub poller: poller::Options,

    /// Temp URL signal options
    pub temp_url: TempUrlOptions,
}

impl Default for AppOptions {
    fn default() -> Self {
        Self {
            backend: BackendMode::Memory,
            tenant_id: "default".to_string(),
            poller: poller::Options::default(),
            temp_url: TempUrlOptions::default(),
        }
    }
}

impl AppOptions {
    /// Build options from the settings file
    pub fn from_settings(settings: &Settings, use_memory: bool) -> Result<Self, DeployError> {
        let backend = if use_memory {
            BackendMode::Memory
        } else {
            let token = settings.backend.token.clone().ok_or_else(|| {
                DeployError::Config("backend.token is required unless --memory is set".to_string())
            })?;
            BackendMode::Http {
                base_url: settings.backend.base_url.clone(),
                token,
                timeout: Duration::from_secs(settings.backend.request_timeout_secs),
            }
        };

        Ok(Self {
            backend,
            tenant_id: settings.tenant_id.clone(),
            poller: poller::Options {
                interval: Duration::from_secs(settings.poller.interval_secs),
                timeout: Duration::from_secs(settings.poller.timeout_secs),
                backoff: None,
            },
            temp_url: TempUrlOptions {
                ttl: Duration::from_secs(settings.temp_url_ttl_secs),
            },
        })
    }
}
