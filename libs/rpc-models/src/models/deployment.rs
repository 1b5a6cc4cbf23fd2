//! Software deployment models

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::config::ConfigOutput;

/// Lifecycle action a deployment is applied for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Action {
    Create,
    Update,
    Suspend,
    Resume,
    Delete,
}

impl Action {
    /// Every action a deployment can be triggered for
    pub const ALL: [Action; 5] = [
        Action::Create,
        Action::Update,
        Action::Suspend,
        Action::Resume,
        Action::Delete,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Create => "CREATE",
            Action::Update => "UPDATE",
            Action::Suspend => "SUSPEND",
            Action::Resume => "RESUME",
            Action::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "CREATE" => Ok(Action::Create),
            "UPDATE" => Ok(Action::Update),
            "SUSPEND" => Ok(Action::Suspend),
            "RESUME" => Ok(Action::Resume),
            "DELETE" => Ok(Action::Delete),
            _ => Err(format!("Invalid action: {}", s)),
        }
    }
}

/// Status of a single deployment record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeploymentStatus {
    InProgress,
    Complete,
    Failed,
}

impl DeploymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeploymentStatus::InProgress => "IN_PROGRESS",
            DeploymentStatus::Complete => "COMPLETE",
            DeploymentStatus::Failed => "FAILED",
        }
    }
}

impl fmt::Display for DeploymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A deployment record as returned by the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeploymentRecord {
    pub id: String,

    pub config_id: String,

    #[serde(default)]
    pub server_id: Option<String>,

    #[serde(default)]
    pub action: Option<Action>,

    #[serde(default)]
    pub status: Option<DeploymentStatus>,

    #[serde(default)]
    pub status_reason: Option<String>,

    /// Values delivered by the completion signal
    #[serde(default)]
    pub output_values: Map<String, Value>,

    #[serde(default)]
    pub stack_user_project_id: Option<String>,

    /// Output schema of the derived config, when the backend includes it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outputs: Option<Vec<ConfigOutput>>,
}

/// Body of a deployment creation call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateDeploymentRequest {
    pub server_id: String,
    pub config_id: String,
    pub action: Action,
    pub status: DeploymentStatus,
    pub status_reason: String,
    pub stack_user_project_id: Option<String>,
}

/// Body of a deployment update call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateDeploymentRequest {
    #[serde(skip)]
    pub deployment_id: String,
    pub config_id: String,
    pub action: Action,
    pub status: DeploymentStatus,
    pub status_reason: String,
}

/// Body of a deployment signal call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalRequest {
    pub details: Option<Map<String, Value>>,
    pub updated_at: DateTime<Utc>,
}

/// Result of a deployment signal call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalResponse {
    #[serde(default)]
    pub result: Option<String>,
}
