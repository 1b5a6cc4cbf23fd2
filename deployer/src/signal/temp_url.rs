//! TEMP_URL_SIGNAL transport
//!
//! The server signals by PUTting its outputs to a pre-signed object storage
//! URL. The container is named after the physical resource and holds one
//! zero-byte object per resource.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use hmac::{Hmac, Mac};
use rpc_models::ConfigInput;
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use tracing::{debug, info, warn};
use url::Url;

use super::{SignalChannel, SignalTransport, SIGNAL_ID_INPUT, SIGNAL_VERB_INPUT};
use crate::clients::object_store::{Headers, ObjectStore, OBJECT_COUNT_HEADER, TEMP_URL_KEY_HEADER};
use crate::deploy::data::ResourceData;
use crate::errors::{ignore_not_found, DeployError};
use crate::utils::generate_uuid;

type HmacSha256 = Hmac<Sha256>;

/// Data key holding the signal object name
pub const OBJECT_NAME_KEY: &str = "signal_object_name";

/// Data key holding the signed URL
pub const TEMP_URL_KEY: &str = "signal_temp_url";

/// Temp URL signing options
#[derive(Debug, Clone)]
pub struct TempUrlOptions {
    /// How long an issued URL stays valid
    pub ttl: Duration,
}

impl Default for TempUrlOptions {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(86400),
        }
    }
}

/// Sign a PUT URL for `container/object` under `storage_url`
pub fn sign_temp_url(
    storage_url: &str,
    container: &str,
    object: &str,
    key: &SecretString,
    expires: i64,
) -> Result<String, DeployError> {
    let base = Url::parse(storage_url)
        .map_err(|e| DeployError::Config(format!("Invalid storage URL {}: {}", storage_url, e)))?;
    let host = base
        .host_str()
        .ok_or_else(|| DeployError::Config(format!("Storage URL has no host: {}", storage_url)))?;
    let authority = match base.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    };
    let path = format!(
        "{}/{}/{}",
        base.path().trim_end_matches('/'),
        container,
        object
    );

    let mut mac = HmacSha256::new_from_slice(key.expose_secret().as_bytes())
        .map_err(|e| DeployError::Internal(format!("Invalid temp URL key: {}", e)))?;
    mac.update(format!("PUT\n{}\n{}", expires, path).as_bytes());
    let signature = hex::encode(mac.finalize().into_bytes());

    Ok(format!(
        "{}://{}{}?temp_url_sig={}&temp_url_expires={}",
        base.scheme(),
        authority,
        path,
        signature,
        expires
    ))
}

/// Signals through an object storage temporary URL
pub struct TempUrlSignal {
    store: Arc<dyn ObjectStore>,
    options: TempUrlOptions,
}

impl TempUrlSignal {
    pub fn new(store: Arc<dyn ObjectStore>, options: TempUrlOptions) -> Self {
        Self { store, options }
    }

    async fn account_key(&self) -> Result<SecretString, DeployError> {
        let headers = self.store.head_account().await?;
        if let Some(key) = headers.get(TEMP_URL_KEY_HEADER) {
            return Ok(SecretString::from(key.clone()));
        }

        info!("Object storage account has no temp URL key, generating one");
        let mut update = Headers::new();
        update.insert(TEMP_URL_KEY_HEADER.to_string(), generate_uuid().replace('-', ""));
        self.store.post_account(update).await?;

        let headers = self.store.head_account().await?;
        headers
            .get(TEMP_URL_KEY_HEADER)
            .map(|key| SecretString::from(key.clone()))
            .ok_or_else(|| DeployError::ObjectStore("Temp URL key was not stored".to_string()))
    }

    async fn delete_container_if_empty(&self, container: &str) -> Result<(), DeployError> {
        let headers = match ignore_not_found(self.store.head_container(container).await)? {
            Some(headers) => headers,
            None => return Ok(()),
        };
        let count = headers
            .get(OBJECT_COUNT_HEADER)
            .and_then(|count| count.parse::<u64>().ok())
            .unwrap_or(0);
        if count == 0 {
            ignore_not_found(self.store.delete_container(container).await)?;
        }
        Ok(())
    }
}

#[async_trait]
impl SignalChannel for TempUrlSignal {
    fn transport(&self) -> SignalTransport {
        SignalTransport::TempUrlSignal
    }

    async fn provision(
        &self,
        physical_name: &str,
        data: &ResourceData,
    ) -> Result<Option<String>, DeployError> {
        if let Some(url) = data.get(TEMP_URL_KEY).await {
            return Ok(Some(url));
        }

        let container = physical_name;
        let object = generate_uuid();
        self.store.put_container(container).await?;
        self.store.put_object(container, &object, b"").await?;
        data.set(OBJECT_NAME_KEY, object.clone(), false).await;

        let key = self.account_key().await?;
        let expires = Utc::now().timestamp() + self.options.ttl.as_secs() as i64;
        let url = sign_temp_url(self.store.storage_url(), container, &object, &key, expires)?;
        data.set(TEMP_URL_KEY, url.clone(), true).await;

        debug!("Provisioned temp URL signal object {}/{}", container, object);
        Ok(Some(url))
    }

    async fn identifier(&self, data: &ResourceData) -> Option<String> {
        data.get(TEMP_URL_KEY).await
    }

    fn signal_inputs(&self, identifier: &str) -> Vec<ConfigInput> {
        vec![
            ConfigInput::with_value(SIGNAL_ID_INPUT, identifier.into())
                .described("ID of signal to use for signaling output values"),
            ConfigInput::with_value(SIGNAL_VERB_INPUT, "PUT".into())
                .described("HTTP verb to use for signaling output values"),
        ]
    }

    async fn release(&self, physical_name: &str, data: &ResourceData) -> Result<(), DeployError> {
        let object = match data.get(OBJECT_NAME_KEY).await {
            Some(object) => object,
            None => return Ok(()),
        };

        let container = physical_name;
        let mut result = ignore_not_found(self.store.delete_object(container, &object).await).map(|_| ());
        if result.is_ok() {
            result = self.delete_container_if_empty(container).await;
        }

        data.delete(OBJECT_NAME_KEY).await;
        data.delete(TEMP_URL_KEY).await;

        if let Err(e) = &result {
            warn!("Failed to release temp URL signal {}/{}: {}", container, object, e);
        }
        result
    }
}
