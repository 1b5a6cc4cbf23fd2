//! Derived config construction
//!
//! Builds the config submitted for each triggered action: the source
//! config's inputs with resolved values, any extra `input_values`, the
//! transport's signal inputs and the built-in deployment metadata inputs.

use rpc_models::{Action, ConfigInput, CreateConfigRequest, SoftwareConfig, UNGROUPED};
use serde_json::{Map, Value};

use crate::signal::SignalTransport;

pub const SERVER_ID_INPUT: &str = "deploy_server_id";
pub const ACTION_INPUT: &str = "deploy_action";
pub const STACK_ID_INPUT: &str = "deploy_stack_id";
pub const RESOURCE_NAME_INPUT: &str = "deploy_resource_name";
pub const SIGNAL_TRANSPORT_INPUT: &str = "deploy_signal_transport";

/// Everything about the deployment the derived config depends on
#[derive(Debug, Clone)]
pub struct DerivationContext {
    pub server_id: String,
    pub action: Action,
    /// `{stack_name}/{stack_id}`
    pub stack_id: String,
    pub resource_name: String,
    pub signal_transport: SignalTransport,
    pub physical_name: String,
    /// The deployment's own `name` property
    pub deployment_name: Option<String>,
    /// Inputs contributed by the provisioned signal channel
    pub signal_inputs: Vec<ConfigInput>,
}

impl DerivationContext {
    fn builtin_inputs(&self) -> Vec<ConfigInput> {
        vec![
            ConfigInput::with_value(SERVER_ID_INPUT, Value::from(self.server_id.as_str()))
                .described("ID of the server being deployed to"),
            ConfigInput::with_value(ACTION_INPUT, Value::from(self.action.as_str()))
                .described("Name of the current action being deployed"),
            ConfigInput::with_value(STACK_ID_INPUT, Value::from(self.stack_id.as_str()))
                .described("ID of the stack this deployment belongs to"),
            ConfigInput::with_value(RESOURCE_NAME_INPUT, Value::from(self.resource_name.as_str()))
                .described("Name of this deployment resource in the stack"),
            ConfigInput::with_value(
                SIGNAL_TRANSPORT_INPUT,
                Value::from(self.signal_transport.as_str()),
            )
            .described("How the server should signal to heat with the deployment output values."),
        ]
    }
}

/// Resolve the full ordered input list
pub fn derive_inputs(
    config: Option<&SoftwareConfig>,
    input_values: &Map<String, Value>,
    ctx: &DerivationContext,
) -> Vec<ConfigInput> {
    let declared = config.map(|c| c.inputs.as_slice()).unwrap_or_default();

    let mut inputs: Vec<ConfigInput> = declared
        .iter()
        .map(|input| {
            let mut input = input.clone();
            if let Some(value) = input_values.get(&input.name) {
                input.value = Some(value.clone());
            }
            input
        })
        .collect();

    for (name, value) in input_values {
        if !declared.iter().any(|input| &input.name == name) {
            inputs.push(ConfigInput::with_value(name.clone(), value.clone()));
        }
    }

    inputs.extend(ctx.signal_inputs.iter().cloned());
    inputs.extend(ctx.builtin_inputs());
    inputs
}

/// Build the config creation request for one action
pub fn derive_config(
    config: Option<&SoftwareConfig>,
    input_values: &Map<String, Value>,
    ctx: &DerivationContext,
) -> CreateConfigRequest {
    let inputs = derive_inputs(config, input_values, ctx);

    match config {
        Some(source) => CreateConfigRequest {
            config: source.config.clone(),
            group: source.group.clone(),
            name: ctx
                .deployment_name
                .clone()
                .or_else(|| (!source.name.is_empty()).then(|| source.name.clone()))
                .unwrap_or_else(|| ctx.physical_name.clone()),
            inputs,
            outputs: Some(source.outputs.clone()),
            options: Some(source.options.clone()),
        },
        None => CreateConfigRequest {
            config: Value::from(""),
            group: UNGROUPED.to_string(),
            name: ctx
                .deployment_name
                .clone()
                .unwrap_or_else(|| ctx.physical_name.clone()),
            inputs,
            outputs: None,
            options: None,
        },
    }
}
