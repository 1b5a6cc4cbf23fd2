//! Software deployment API client

use rpc_models::{
    CreateDeploymentRequest, DeploymentRecord, SignalRequest, SignalResponse,
    UpdateDeploymentRequest,
};

use crate::clients::RequestContext;
use crate::errors::DeployError;
use crate::http::client::HttpClient;

impl HttpClient {
    /// Create a deployment record
    pub async fn post_software_deployment(
        &self,
        ctx: &RequestContext,
        request: &CreateDeploymentRequest,
    ) -> Result<DeploymentRecord, DeployError> {
        self.post(ctx, "/software_deployments", request).await
    }

    /// Replace the config, action and status of a deployment
    pub async fn put_software_deployment(
        &self,
        ctx: &RequestContext,
        request: &UpdateDeploymentRequest,
    ) -> Result<DeploymentRecord, DeployError> {
        let path = format!("/software_deployments/{}", request.deployment_id);
        self.put(ctx, &path, request).await
    }

    pub async fn get_software_deployment(
        &self,
        ctx: &RequestContext,
        deployment_id: &str,
    ) -> Result<DeploymentRecord, DeployError> {
        let path = format!("/software_deployments/{}", deployment_id);
        self.get(ctx, &path).await
    }

    pub async fn remove_software_deployment(
        &self,
        ctx: &RequestContext,
        deployment_id: &str,
    ) -> Result<(), DeployError> {
        let path = format!("/software_deployments/{}", deployment_id);
        self.delete(ctx, &path).await
    }

    /// Deliver signal details for a deployment
    pub async fn post_deployment_signal(
        &self,
        ctx: &RequestContext,
        deployment_id: &str,
        request: &SignalRequest,
    ) -> Result<SignalResponse, DeployError> {
        let path = format!("/software_deployments/{}/signal", deployment_id);
        self.post(ctx, &path, request).await
    }
}
