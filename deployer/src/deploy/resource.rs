//! Identity of a deployment resource within its stack

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::properties::ServerResource;
use crate::utils::physical_name;

/// The stack a deployment belongs to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StackInfo {
    pub name: String,

    pub id: String,

    /// Project of the stack's signaling user
    #[serde(default)]
    pub stack_user_project_id: Option<String>,

    /// Server resources defined in the same stack, keyed by server id
    #[serde(default)]
    pub servers: BTreeMap<String, ServerResource>,
}

impl StackInfo {
    pub fn new(name: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: id.into(),
            stack_user_project_id: None,
            servers: BTreeMap::new(),
        }
    }

    /// `{stack_name}/{stack_id}`
    pub fn identifier(&self) -> String {
        format!("{}/{}", self.name, self.id)
    }
}

/// A named resource in a stack
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceInfo {
    pub stack: StackInfo,
    pub name: String,
    pub uuid: Uuid,
}

impl ResourceInfo {
    pub fn new(stack: StackInfo, name: impl Into<String>) -> Self {
        Self {
            stack,
            name: name.into(),
            uuid: Uuid::new_v4(),
        }
    }

    /// Resource named `name` in the same stack
    pub fn sibling(&self, name: impl Into<String>) -> Self {
        Self::new(self.stack.clone(), name)
    }

    pub fn physical_resource_name(&self) -> String {
        physical_name(&self.stack.name, &self.name, &self.uuid)
    }
}
