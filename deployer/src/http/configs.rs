//! Software config API client

use rpc_models::{ConfigRef, CreateConfigRequest, SoftwareConfig};

use crate::clients::RequestContext;
use crate::errors::DeployError;
use crate::http::client::HttpClient;

impl HttpClient {
    /// Create a software config
    pub async fn post_software_config(
        &self,
        ctx: &RequestContext,
        request: &CreateConfigRequest,
    ) -> Result<ConfigRef, DeployError> {
        self.post(ctx, "/software_configs", request).await
    }

    /// Fetch a software config by id
    pub async fn get_software_config(
        &self,
        ctx: &RequestContext,
        config_id: &str,
    ) -> Result<SoftwareConfig, DeployError> {
        let path = format!("/software_configs/{}", config_id);
        self.get(ctx, &path).await
    }

    pub async fn remove_software_config(
        &self,
        ctx: &RequestContext,
        config_id: &str,
    ) -> Result<(), DeployError> {
        let path = format!("/software_configs/{}", config_id);
        self.delete(ctx, &path).await
    }
}
