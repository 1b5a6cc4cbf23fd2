//! Deployment resource properties

use std::collections::BTreeMap;

use rpc_models::Action;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::DeployError;
use crate::signal::SignalTransport;

/// `user_data_format` a server must use to run software deployments
pub const SOFTWARE_CONFIG_FORMAT: &str = "SOFTWARE_CONFIG";

fn default_actions() -> Vec<Action> {
    vec![Action::Create, Action::Update]
}

/// Properties of a single software deployment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeploymentProperties {
    /// Target server id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server: Option<String>,

    /// Source software config id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<String>,

    #[serde(default)]
    pub input_values: Map<String, Value>,

    /// Name of the derived config
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Actions this deployment is applied for
    #[serde(default = "default_actions")]
    pub actions: Vec<Action>,

    #[serde(default)]
    pub signal_transport: SignalTransport,
}

impl Default for DeploymentProperties {
    fn default() -> Self {
        Self {
            server: None,
            config: None,
            input_values: Map::new(),
            name: None,
            actions: default_actions(),
            signal_transport: SignalTransport::default(),
        }
    }
}

impl DeploymentProperties {
    pub fn for_server(server: impl Into<String>) -> Self {
        Self {
            server: Some(server.into()),
            ..Self::default()
        }
    }
}

/// Properties of a deployment group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupProperties {
    /// Target name to server id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub servers: Option<BTreeMap<String, String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<String>,

    #[serde(default)]
    pub input_values: Map<String, Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default = "default_actions")]
    pub actions: Vec<Action>,

    #[serde(default)]
    pub signal_transport: SignalTransport,
}

impl GroupProperties {
    /// Exactly one of `servers` and `server` must be set
    pub fn validate(&self) -> Result<(), DeployError> {
        match (&self.servers, &self.server) {
            (Some(_), Some(_)) => Err(DeployError::Validation(
                "Only one of the properties \"servers\" and \"server\" may be set".to_string(),
            )),
            (None, None) => Err(DeployError::Validation(
                "One of the properties \"servers\" or \"server\" must be set".to_string(),
            )),
            _ => Ok(()),
        }
    }

    /// Target name to server id; a lone `server` is keyed by its own id
    pub fn targets(&self) -> BTreeMap<String, String> {
        match (&self.servers, &self.server) {
            (Some(servers), _) => servers.clone(),
            (None, Some(server)) => BTreeMap::from([(server.clone(), server.clone())]),
            (None, None) => BTreeMap::new(),
        }
    }

    /// Shared member properties, without a server
    pub fn member_template(&self) -> DeploymentProperties {
        DeploymentProperties {
            server: None,
            config: self.config.clone(),
            input_values: self.input_values.clone(),
            name: self.name.clone(),
            actions: self.actions.clone(),
            signal_transport: self.signal_transport,
        }
    }
}

/// The parts of a target server resource that validation looks at
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerResource {
    pub name: String,

    #[serde(default)]
    pub user_data_format: Option<String>,
}
