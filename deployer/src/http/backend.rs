//! [`RpcBackend`] over the REST API

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rpc_models::{
    ConfigRef, CreateConfigRequest, CreateDeploymentRequest, DeploymentRecord, SignalRequest,
    SoftwareConfig, UpdateDeploymentRequest,
};
use serde_json::{Map, Value};

use crate::clients::{RequestContext, RpcBackend};
use crate::errors::DeployError;
use crate::http::client::HttpClient;

#[async_trait]
impl RpcBackend for HttpClient {
    async fn create_software_config(
        &self,
        ctx: &RequestContext,
        request: CreateConfigRequest,
    ) -> Result<ConfigRef, DeployError> {
        self.post_software_config(ctx, &request).await
    }

    async fn show_software_config(
        &self,
        ctx: &RequestContext,
        config_id: &str,
    ) -> Result<SoftwareConfig, DeployError> {
        self.get_software_config(ctx, config_id).await
    }

    async fn delete_software_config(
        &self,
        ctx: &RequestContext,
        config_id: &str,
    ) -> Result<(), DeployError> {
        self.remove_software_config(ctx, config_id).await
    }

    async fn create_software_deployment(
        &self,
        ctx: &RequestContext,
        request: CreateDeploymentRequest,
    ) -> Result<DeploymentRecord, DeployError> {
        self.post_software_deployment(ctx, &request).await
    }

    async fn update_software_deployment(
        &self,
        ctx: &RequestContext,
        request: UpdateDeploymentRequest,
    ) -> Result<DeploymentRecord, DeployError> {
        self.put_software_deployment(ctx, &request).await
    }

    async fn show_software_deployment(
        &self,
        ctx: &RequestContext,
        deployment_id: &str,
    ) -> Result<DeploymentRecord, DeployError> {
        self.get_software_deployment(ctx, deployment_id).await
    }

    async fn delete_software_deployment(
        &self,
        ctx: &RequestContext,
        deployment_id: &str,
    ) -> Result<(), DeployError> {
        self.remove_software_deployment(ctx, deployment_id).await
    }

    async fn signal_software_deployment(
        &self,
        ctx: &RequestContext,
        deployment_id: &str,
        details: Option<Map<String, Value>>,
        updated_at: DateTime<Utc>,
    ) -> Result<Option<String>, DeployError> {
        let request = SignalRequest {
            details,
            updated_at,
        };
        let response = self
            .post_deployment_signal(ctx, deployment_id, &request)
            .await?;
        Ok(response.result)
    }
}
