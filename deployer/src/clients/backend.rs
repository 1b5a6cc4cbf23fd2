//! Backend RPC surface

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rpc_models::{
    ConfigRef, CreateConfigRequest, CreateDeploymentRequest, DeploymentRecord, SoftwareConfig,
    UpdateDeploymentRequest,
};
use serde_json::{Map, Value};

use crate::errors::DeployError;

/// Caller identity threaded through every backend call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    pub request_id: String,
    pub tenant_id: String,
    pub user_id: Option<String>,
}

impl RequestContext {
    pub fn new(tenant_id: impl Into<String>) -> Self {
        Self {
            request_id: format!("req-{}", uuid::Uuid::new_v4()),
            tenant_id: tenant_id.into(),
            user_id: None,
        }
    }

    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }
}

/// Software config and deployment backend
///
/// Delete and show calls return [`DeployError::NotFound`] when the record
/// does not exist.
#[async_trait]
pub trait RpcBackend: Send + Sync {
    async fn create_software_config(
        &self,
        ctx: &RequestContext,
        request: CreateConfigRequest,
    ) -> Result<ConfigRef, DeployError>;

    async fn show_software_config(
        &self,
        ctx: &RequestContext,
        config_id: &str,
    ) -> Result<SoftwareConfig, DeployError>;

    async fn delete_software_config(
        &self,
        ctx: &RequestContext,
        config_id: &str,
    ) -> Result<(), DeployError>;

    async fn create_software_deployment(
        &self,
        ctx: &RequestContext,
        request: CreateDeploymentRequest,
    ) -> Result<DeploymentRecord, DeployError>;

    async fn update_software_deployment(
        &self,
        ctx: &RequestContext,
        request: UpdateDeploymentRequest,
    ) -> Result<DeploymentRecord, DeployError>;

    async fn show_software_deployment(
        &self,
        ctx: &RequestContext,
        deployment_id: &str,
    ) -> Result<DeploymentRecord, DeployError>;

    async fn delete_software_deployment(
        &self,
        ctx: &RequestContext,
        deployment_id: &str,
    ) -> Result<(), DeployError>;

    /// Deliver signal details; `None` means the deployment was not waiting
    async fn signal_software_deployment(
        &self,
        ctx: &RequestContext,
        deployment_id: &str,
        details: Option<Map<String, Value>>,
        updated_at: DateTime<Utc>,
    ) -> Result<Option<String>, DeployError>;
}
