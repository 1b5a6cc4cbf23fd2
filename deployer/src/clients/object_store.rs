//! Object storage capability

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::errors::DeployError;

/// Account header holding the temporary URL signing key
pub const TEMP_URL_KEY_HEADER: &str = "x-account-meta-temp-url-key";

/// Container header holding the number of stored objects
pub const OBJECT_COUNT_HEADER: &str = "x-container-object-count";

pub type Headers = BTreeMap<String, String>;

/// Object storage client
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Account endpoint, e.g. `http://192.0.2.1/v1/AUTH_tenant`
    fn storage_url(&self) -> &str;

    async fn head_account(&self) -> Result<Headers, DeployError>;

    async fn post_account(&self, headers: Headers) -> Result<(), DeployError>;

    async fn put_container(&self, container: &str) -> Result<(), DeployError>;

    async fn head_container(&self, container: &str) -> Result<Headers, DeployError>;

    async fn delete_container(&self, container: &str) -> Result<(), DeployError>;

    async fn put_object(
        &self,
        container: &str,
        object: &str,
        contents: &[u8],
    ) -> Result<(), DeployError>;

    async fn delete_object(&self, container: &str, object: &str) -> Result<(), DeployError>;
}
