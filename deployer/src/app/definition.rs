//! Deployment definition file

use std::path::Path;

use rpc_models::SoftwareConfig;
use serde::Deserialize;
use serde_json::Value;

use crate::deploy::properties::{DeploymentProperties, GroupProperties};
use crate::deploy::resource::StackInfo;
use crate::errors::DeployError;

/// Kind of resource a definition describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Deployment,
    Group,
}

/// A deployment or deployment group to run, with the configs it uses
#[derive(Debug, Clone, Deserialize)]
pub struct Definition {
    pub stack: StackInfo,

    pub resource_name: String,

    #[serde(rename = "type")]
    pub kind: ResourceKind,

    /// Resource properties, parsed according to `type`
    pub properties: Value,

    /// Configs loaded into the in-memory backend
    #[serde(default)]
    pub configs: Vec<SoftwareConfig>,
}

impl Definition {
    pub async fn load(path: &Path) -> Result<Self, DeployError> {
        let raw = tokio::fs::read_to_string(path).await?;
        serde_json::from_str(&raw).map_err(|e| {
            DeployError::Config(format!("Invalid definition {}: {}", path.display(), e))
        })
    }

    pub fn deployment_properties(&self) -> Result<DeploymentProperties, DeployError> {
        serde_json::from_value(self.properties.clone()).map_err(|e| {
            DeployError::Validation(format!("{}: {}", self.resource_name, e))
        })
    }

    pub fn group_properties(&self) -> Result<GroupProperties, DeployError> {
        serde_json::from_value(self.properties.clone()).map_err(|e| {
            DeployError::Validation(format!("{}: {}", self.resource_name, e))
        })
    }
}
