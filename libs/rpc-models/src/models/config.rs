//! Software config models

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Group used for configs that carry per-action blocks
pub const COMPONENT_GROUP: &str = "component";

/// Group used when a deployment has no source config
pub const UNGROUPED: &str = "Heat::Ungrouped";

fn default_input_type() -> String {
    "String".to_string()
}

/// A declared config input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigInput {
    pub name: String,

    #[serde(rename = "type", default = "default_input_type")]
    pub input_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Resolved value, only present on derived configs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

impl ConfigInput {
    /// A String input carrying a value and no default
    pub fn with_value(name: impl Into<String>, value: Value) -> Self {
        Self {
            name: name.into(),
            input_type: default_input_type(),
            default: None,
            description: None,
            value: Some(value),
        }
    }

    /// Attach a description
    pub fn described(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// A declared config output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigOutput {
    pub name: String,

    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub output_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// A truthy value for this output marks the deployment as failed
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub error_output: bool,
}

impl ConfigOutput {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            output_type: None,
            description: None,
            error_output: false,
        }
    }
}

/// A software config as stored by the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoftwareConfig {
    pub id: String,

    pub group: String,

    pub name: String,

    /// Either a script body or a structured map of per-action blocks
    #[serde(default)]
    pub config: Value,

    #[serde(default)]
    pub options: Map<String, Value>,

    #[serde(default)]
    pub inputs: Vec<ConfigInput>,

    #[serde(default)]
    pub outputs: Vec<ConfigOutput>,
}

impl SoftwareConfig {
    /// Whether this config encodes per-action component blocks
    pub fn is_component(&self) -> bool {
        self.group == COMPONENT_GROUP
            && self
                .config
                .get("configs")
                .map(Value::is_array)
                .unwrap_or(false)
    }
}

/// Body of a software config creation call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateConfigRequest {
    pub config: Value,

    pub group: String,

    pub name: String,

    pub inputs: Vec<ConfigInput>,

    /// `None` when the deployment had no source config
    pub outputs: Option<Vec<ConfigOutput>>,

    /// `None` when the deployment had no source config
    pub options: Option<Map<String, Value>>,
}

/// Identifier returned by config creation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigRef {
    pub id: String,
}
