//! Software deployment lifecycle
//!
//! Each handler submits its backend request and returns straight away. The
//! caller re-invokes the matching `check_*_complete` until it reports true or
//! fails.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use rpc_models::{
    Action, CreateDeploymentRequest, DeploymentRecord, DeploymentStatus, SoftwareConfig,
    UpdateDeploymentRequest,
};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use super::actions::should_trigger;
use super::data::ResourceData;
use super::derivation::{derive_config, DerivationContext};
use super::fsm::{ResourceEvent, ResourceFsm, ResourceState};
use super::properties::{DeploymentProperties, SOFTWARE_CONFIG_FORMAT};
use super::resource::ResourceInfo;
use crate::clients::{Clients, RequestContext};
use crate::errors::{ignore_not_found, DeployError};
use crate::signal::{select_channel, SignalChannel, SignalTransport, TempUrlOptions};
use crate::workers::poller::CompletionCheck;

/// Output written by the deployment tool to stdout
pub const STDOUT: &str = "deploy_stdout";

/// Output written by the deployment tool to stderr
pub const STDERR: &str = "deploy_stderr";

/// Exit status of the deployment tool
pub const STATUS_CODE: &str = "deploy_status_code";

const BUILTIN_OUTPUTS: [&str; 3] = [STDOUT, STDERR, STATUS_CODE];

const REASON_NOT_WAITING: &str = "Not waiting for outputs signal";
const REASON_DEPLOY_DATA: &str = "Deploy data available";

/// One software config applied to one server
pub struct SoftwareDeployment {
    resource: ResourceInfo,
    properties: DeploymentProperties,
    clients: Clients,
    temp_url: TempUrlOptions,
    channel: Arc<dyn SignalChannel>,
    data: ResourceData,
    resource_id: Option<String>,
    fsm: ResourceFsm,
}

impl SoftwareDeployment {
    pub fn new(
        resource: ResourceInfo,
        properties: DeploymentProperties,
        clients: Clients,
        temp_url: TempUrlOptions,
    ) -> Result<Self, DeployError> {
        let channel = select_channel(properties.signal_transport, &clients, &temp_url)?;
        Ok(Self {
            resource,
            properties,
            clients,
            temp_url,
            channel,
            data: ResourceData::new(),
            resource_id: None,
            fsm: ResourceFsm::new(),
        })
    }

    /// Use previously persisted resource data
    pub fn with_data(mut self, data: ResourceData) -> Self {
        self.data = data;
        self
    }

    pub fn name(&self) -> &str {
        &self.resource.name
    }

    pub fn properties(&self) -> &DeploymentProperties {
        &self.properties
    }

    pub fn data(&self) -> &ResourceData {
        &self.data
    }

    /// Persistent id of the deployment record
    pub fn resource_id(&self) -> Option<&str> {
        self.resource_id.as_deref()
    }

    pub fn set_resource_id(&mut self, resource_id: Option<String>) {
        self.resource_id = resource_id;
    }

    pub fn state(&self) -> ResourceState {
        self.fsm.state()
    }

    /// Restore the resource state
    pub fn state_set(&mut self, action: Action, status: DeploymentStatus) {
        self.fsm.state_set(action, status);
    }

    pub fn signal_transport(&self) -> SignalTransport {
        self.channel.transport()
    }

    pub fn physical_resource_name(&self) -> String {
        self.resource.physical_resource_name()
    }

    /// Check the properties against the target server
    pub fn validate(&self) -> Result<(), DeployError> {
        let server = self.properties.server.as_deref().ok_or_else(|| {
            DeployError::Validation(format!(
                "Property server not assigned on resource {}",
                self.resource.name
            ))
        })?;

        if self.properties.signal_transport != SignalTransport::CfnSignal {
            return Ok(());
        }
        if let Some(target) = self.resource.stack.servers.get(server) {
            if target.user_data_format.as_deref() != Some(SOFTWARE_CONFIG_FORMAT) {
                return Err(DeployError::Validation(format!(
                    "Resource {}'s property user_data_format should be set to SOFTWARE_CONFIG since there are software deployments on it.",
                    target.name
                )));
            }
        }
        Ok(())
    }

    // ---- Handlers ----

    pub async fn handle_create(
        &mut self,
        ctx: &RequestContext,
    ) -> Result<Option<DeploymentRecord>, DeployError> {
        self.begin(Action::Create)?;
        let record = self.run_action(ctx, Action::Create).await?;
        if let Some(record) = &record {
            info!("Created software deployment {} for {}", record.id, self.resource.name);
            self.resource_id = Some(record.id.clone());
        }
        Ok(record)
    }

    /// Apply new properties and redeploy
    pub async fn handle_update(
        &mut self,
        ctx: &RequestContext,
        properties: DeploymentProperties,
    ) -> Result<Option<DeploymentRecord>, DeployError> {
        self.begin(Action::Update)?;
        if properties.signal_transport != self.channel.transport() {
            if let Err(e) = self.switch_channel(properties.signal_transport).await {
                self.settle(ResourceEvent::Fail(e.to_string()));
                return Err(e);
            }
        }
        self.properties = properties;
        self.run_action(ctx, Action::Update).await
    }

    pub async fn handle_suspend(
        &mut self,
        ctx: &RequestContext,
    ) -> Result<Option<DeploymentRecord>, DeployError> {
        self.begin(Action::Suspend)?;
        self.run_action(ctx, Action::Suspend).await
    }

    pub async fn handle_resume(
        &mut self,
        ctx: &RequestContext,
    ) -> Result<Option<DeploymentRecord>, DeployError> {
        self.begin(Action::Resume)?;
        self.run_action(ctx, Action::Resume).await
    }

    /// Run DELETE on the server when triggered, otherwise remove everything now
    pub async fn handle_delete(
        &mut self,
        ctx: &RequestContext,
    ) -> Result<Option<DeploymentRecord>, DeployError> {
        self.begin(Action::Delete)?;
        if self.resource_id.is_none() {
            return Ok(None);
        }

        if let Some(record) = self.run_action(ctx, Action::Delete).await? {
            return Ok(Some(record));
        }

        self.delete_resource(ctx).await?;
        Ok(None)
    }

    /// Dispatch to the handler for `action` using the current properties
    pub async fn handle(
        &mut self,
        ctx: &RequestContext,
        action: Action,
    ) -> Result<Option<DeploymentRecord>, DeployError> {
        match action {
            Action::Create => self.handle_create(ctx).await,
            Action::Update => {
                let properties = self.properties.clone();
                self.handle_update(ctx, properties).await
            }
            Action::Suspend => self.handle_suspend(ctx).await,
            Action::Resume => self.handle_resume(ctx).await,
            Action::Delete => self.handle_delete(ctx).await,
        }
    }

    // ---- Completion checks ----

    pub async fn check_create_complete(
        &mut self,
        ctx: &RequestContext,
        handle: Option<&DeploymentRecord>,
    ) -> Result<bool, DeployError> {
        self.check_action_complete(ctx, handle).await
    }

    pub async fn check_update_complete(
        &mut self,
        ctx: &RequestContext,
        handle: Option<&DeploymentRecord>,
    ) -> Result<bool, DeployError> {
        self.check_action_complete(ctx, handle).await
    }

    pub async fn check_suspend_complete(
        &mut self,
        ctx: &RequestContext,
        handle: Option<&DeploymentRecord>,
    ) -> Result<bool, DeployError> {
        self.check_action_complete(ctx, handle).await
    }

    pub async fn check_resume_complete(
        &mut self,
        ctx: &RequestContext,
        handle: Option<&DeploymentRecord>,
    ) -> Result<bool, DeployError> {
        self.check_action_complete(ctx, handle).await
    }

    pub async fn check_delete_complete(
        &mut self,
        ctx: &RequestContext,
        handle: Option<&DeploymentRecord>,
    ) -> Result<bool, DeployError> {
        let handle = match handle {
            Some(handle) => handle,
            // Nothing is running on the server, tear down whatever is left
            None => {
                self.delete_resource(ctx).await?;
                self.settle(ResourceEvent::Complete);
                return Ok(true);
            }
        };

        let record = match ignore_not_found(
            self.clients
                .backend
                .show_software_deployment(ctx, &handle.id)
                .await,
        )? {
            Some(record) => record,
            None => {
                self.delete_resource(ctx).await?;
                self.settle(ResourceEvent::Complete);
                return Ok(true);
            }
        };

        match record.status {
            Some(DeploymentStatus::Complete) => {
                self.delete_resource(ctx).await?;
                self.settle(ResourceEvent::Complete);
                Ok(true)
            }
            Some(DeploymentStatus::Failed) => Err(self.failed(&record)),
            _ => Ok(false),
        }
    }

    /// Dispatch to the completion check for `action`
    pub async fn check_complete(
        &mut self,
        ctx: &RequestContext,
        action: Action,
        handle: Option<&DeploymentRecord>,
    ) -> Result<bool, DeployError> {
        match action {
            Action::Create => self.check_create_complete(ctx, handle).await,
            Action::Update => self.check_update_complete(ctx, handle).await,
            Action::Suspend => self.check_suspend_complete(ctx, handle).await,
            Action::Resume => self.check_resume_complete(ctx, handle).await,
            Action::Delete => self.check_delete_complete(ctx, handle).await,
        }
    }

    // ---- Attributes and signals ----

    /// Value of an output attribute, null until signalled
    pub async fn attribute(&self, ctx: &RequestContext, name: &str) -> Result<Value, DeployError> {
        let deployment_id = match &self.resource_id {
            Some(id) => id,
            None => return Ok(Value::Null),
        };
        let record = self
            .clients
            .backend
            .show_software_deployment(ctx, deployment_id)
            .await?;

        let outputs = match &record.outputs {
            Some(outputs) => outputs.clone(),
            None => {
                self.clients
                    .backend
                    .show_software_config(ctx, &record.config_id)
                    .await?
                    .outputs
            }
        };

        let known = BUILTIN_OUTPUTS.contains(&name) || outputs.iter().any(|output| output.name == name);
        if !known {
            return Err(DeployError::InvalidAttribute {
                resource: self.resource.name.clone(),
                name: name.to_string(),
            });
        }
        Ok(record.output_values.get(name).cloned().unwrap_or(Value::Null))
    }

    /// Forward signal details to the backend
    pub async fn handle_signal(
        &self,
        ctx: &RequestContext,
        details: Option<Map<String, Value>>,
    ) -> Result<Option<String>, DeployError> {
        let deployment_id = match &self.resource_id {
            Some(id) => id,
            None => {
                warn!("Signal for {} ignored, no deployment yet", self.resource.name);
                return Ok(None);
            }
        };
        let result = self
            .clients
            .backend
            .signal_software_deployment(ctx, deployment_id, details, Utc::now())
            .await?;
        debug!("Signal for {} returned {:?}", deployment_id, result);
        Ok(result)
    }

    /// Resource-level signal entry point, forwards during CREATE and UPDATE only
    pub async fn signal(
        &self,
        ctx: &RequestContext,
        details: Option<Map<String, Value>>,
    ) -> Result<Option<String>, DeployError> {
        match self.fsm.action() {
            Some(Action::Create | Action::Update) => self.handle_signal(ctx, details).await,
            action => {
                debug!(
                    "Signal for {} accepted without forwarding during {:?}",
                    self.resource.name, action
                );
                Ok(None)
            }
        }
    }

    // ---- Internals ----

    fn begin(&mut self, action: Action) -> Result<(), DeployError> {
        self.fsm
            .process(ResourceEvent::Begin(action))
            .map_err(DeployError::InvalidTransition)
    }

    fn settle(&mut self, event: ResourceEvent) {
        if let Err(e) = self.fsm.process(event) {
            warn!("{}: {}", self.resource.name, e);
        }
    }

    fn failed(&mut self, record: &DeploymentRecord) -> DeployError {
        let reason = record.status_reason.clone().unwrap_or_default();
        self.settle(ResourceEvent::Fail(reason.clone()));
        DeployError::DeploymentFailed(reason)
    }

    async fn check_action_complete(
        &mut self,
        ctx: &RequestContext,
        handle: Option<&DeploymentRecord>,
    ) -> Result<bool, DeployError> {
        let handle = match handle {
            Some(handle) => handle,
            None => {
                self.settle(ResourceEvent::Complete);
                return Ok(true);
            }
        };

        let record = self
            .clients
            .backend
            .show_software_deployment(ctx, &handle.id)
            .await?;
        match record.status {
            Some(DeploymentStatus::Complete) => {
                self.settle(ResourceEvent::Complete);
                Ok(true)
            }
            Some(DeploymentStatus::Failed) => Err(self.failed(&record)),
            _ => Ok(false),
        }
    }

    /// Release the current signal channel and move to `transport`
    async fn switch_channel(&mut self, transport: SignalTransport) -> Result<(), DeployError> {
        let channel = select_channel(transport, &self.clients, &self.temp_url)?;
        self.channel
            .release(&self.physical_resource_name(), &self.data)
            .await?;
        debug!(
            "{} switched signal transport from {:?} to {:?}",
            self.resource.name,
            self.channel.transport(),
            transport
        );
        self.channel = channel;
        Ok(())
    }

    async fn load_config(&self, ctx: &RequestContext) -> Result<Option<SoftwareConfig>, DeployError> {
        match &self.properties.config {
            Some(config_id) => Ok(Some(
                self.clients
                    .backend
                    .show_software_config(ctx, config_id)
                    .await?,
            )),
            None => Ok(None),
        }
    }

    async fn run_action(
        &mut self,
        ctx: &RequestContext,
        action: Action,
    ) -> Result<Option<DeploymentRecord>, DeployError> {
        match self.submit_action(ctx, action).await {
            Ok(record) => Ok(record),
            Err(e) => {
                self.settle(ResourceEvent::Fail(e.to_string()));
                Err(e)
            }
        }
    }

    async fn submit_action(
        &mut self,
        ctx: &RequestContext,
        action: Action,
    ) -> Result<Option<DeploymentRecord>, DeployError> {
        let source = self.load_config(ctx).await?;
        if !should_trigger(action, source.as_ref(), &self.properties.actions) {
            debug!("{} not triggered for {}", self.resource.name, action);
            return Ok(None);
        }

        let server_id = self.properties.server.clone().ok_or_else(|| {
            DeployError::Validation(format!(
                "Property server not assigned on resource {}",
                self.resource.name
            ))
        })?;
        let physical_name = self.physical_resource_name();

        let signal_inputs = match self.channel.provision(&physical_name, &self.data).await? {
            Some(identifier) => self.channel.signal_inputs(&identifier),
            None => Vec::new(),
        };

        let derivation = DerivationContext {
            server_id: server_id.clone(),
            action,
            stack_id: self.resource.stack.identifier(),
            resource_name: self.resource.name.clone(),
            signal_transport: self.channel.transport(),
            physical_name,
            deployment_name: self.properties.name.clone(),
            signal_inputs,
        };
        let request = derive_config(source.as_ref(), &self.properties.input_values, &derivation);
        let derived = self
            .clients
            .backend
            .create_software_config(ctx, request)
            .await?;

        let (status, status_reason) = if self.channel.waits_for_signal() {
            (DeploymentStatus::InProgress, REASON_DEPLOY_DATA)
        } else {
            (DeploymentStatus::Complete, REASON_NOT_WAITING)
        };

        let record = match self.resource_id.clone() {
            None => {
                self.clients
                    .backend
                    .create_software_deployment(
                        ctx,
                        CreateDeploymentRequest {
                            server_id,
                            config_id: derived.id,
                            action,
                            status,
                            status_reason: status_reason.to_string(),
                            stack_user_project_id: self.resource.stack.stack_user_project_id.clone(),
                        },
                    )
                    .await?
            }
            Some(deployment_id) => {
                let previous = ignore_not_found(
                    self.clients
                        .backend
                        .show_software_deployment(ctx, &deployment_id)
                        .await,
                )?;
                let record = self
                    .clients
                    .backend
                    .update_software_deployment(
                        ctx,
                        UpdateDeploymentRequest {
                            deployment_id,
                            config_id: derived.id.clone(),
                            action,
                            status,
                            status_reason: status_reason.to_string(),
                        },
                    )
                    .await?;
                if let Some(previous) = previous.filter(|p| p.config_id != derived.id) {
                    ignore_not_found(
                        self.clients
                            .backend
                            .delete_software_config(ctx, &previous.config_id)
                            .await,
                    )?;
                }
                record
            }
        };

        debug!(
            "Deployment {} submitted for {} with status {}",
            record.id, action, status
        );
        Ok(Some(record))
    }

    /// Remove the signal channel, the deployment record and its derived config
    async fn delete_resource(&mut self, ctx: &RequestContext) -> Result<(), DeployError> {
        self.channel
            .release(&self.physical_resource_name(), &self.data)
            .await?;

        let deployment_id = match self.resource_id.clone() {
            Some(id) => id,
            None => return Ok(()),
        };
        let record = ignore_not_found(
            self.clients
                .backend
                .show_software_deployment(ctx, &deployment_id)
                .await,
        )?;
        ignore_not_found(
            self.clients
                .backend
                .delete_software_deployment(ctx, &deployment_id)
                .await,
        )?;
        if let Some(record) = record {
            ignore_not_found(
                self.clients
                    .backend
                    .delete_software_config(ctx, &record.config_id)
                    .await,
            )?;
        }

        info!("Deleted software deployment {} for {}", deployment_id, self.resource.name);
        self.resource_id = None;
        Ok(())
    }
}

#[async_trait]
impl CompletionCheck for SoftwareDeployment {
    type Handle = DeploymentRecord;

    async fn check_complete(
        &mut self,
        ctx: &RequestContext,
        action: Action,
        handle: Option<&DeploymentRecord>,
    ) -> Result<bool, DeployError> {
        SoftwareDeployment::check_complete(self, ctx, action, handle).await
    }
}

impl std::fmt::Debug for SoftwareDeployment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SoftwareDeployment")
            .field("resource", &self.resource.name)
            .field("resource_id", &self.resource_id)
            .field("transport", &self.channel.transport())
            .field("state", &self.fsm.state())
            .field("data", &self.data)
            .finish()
    }
}
