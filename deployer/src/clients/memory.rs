//! In-memory collaborators
//!
//! Used by the CLI's `--memory` mode and by tests. Every client records the
//! calls it receives so callers can assert on the exact arguments.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rpc_models::{
    ConfigRef, CreateConfigRequest, CreateDeploymentRequest, DeploymentRecord, DeploymentStatus,
    SoftwareConfig, UpdateDeploymentRequest,
};
use serde_json::{Map, Value};
use tracing::debug;

use crate::clients::backend::{RequestContext, RpcBackend};
use crate::clients::object_store::{Headers, ObjectStore, OBJECT_COUNT_HEADER};
use crate::clients::queue::MessageQueue;
use crate::clients::signed_url::SignedUrlIssuer;
use crate::errors::DeployError;
use crate::utils::generate_uuid;

/// A call received by [`MemoryBackend`]
#[derive(Debug, Clone, PartialEq)]
pub enum BackendCall {
    CreateConfig(CreateConfigRequest),
    ShowConfig(String),
    DeleteConfig(String),
    CreateDeployment(CreateDeploymentRequest),
    UpdateDeployment(UpdateDeploymentRequest),
    ShowDeployment(String),
    DeleteDeployment(String),
    Signal {
        deployment_id: String,
        details: Option<Map<String, Value>>,
        updated_at: DateTime<Utc>,
    },
}

#[derive(Debug, Default)]
struct BackendState {
    configs: HashMap<String, SoftwareConfig>,
    deployments: HashMap<String, DeploymentRecord>,
}

/// In-memory software config and deployment backend
#[derive(Debug, Default)]
pub struct MemoryBackend {
    state: RwLock<BackendState>,
    calls: RwLock<Vec<BackendCall>>,
    deletes_not_found: AtomicBool,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer every delete with not-found while leaving the entry in place
    pub fn set_deletes_not_found(&self, not_found: bool) {
        self.deletes_not_found.store(not_found, Ordering::SeqCst);
    }

    /// Store a config under its own id
    pub fn insert_config(&self, config: SoftwareConfig) {
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        state.configs.insert(config.id.clone(), config);
    }

    /// Store a deployment record under its own id
    pub fn insert_deployment(&self, record: DeploymentRecord) {
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        state.deployments.insert(record.id.clone(), record);
    }

    pub fn config(&self, config_id: &str) -> Option<SoftwareConfig> {
        let state = self.state.read().unwrap_or_else(|e| e.into_inner());
        state.configs.get(config_id).cloned()
    }

    pub fn deployment(&self, deployment_id: &str) -> Option<DeploymentRecord> {
        let state = self.state.read().unwrap_or_else(|e| e.into_inner());
        state.deployments.get(deployment_id).cloned()
    }

    /// Force the status of a stored deployment
    pub fn set_status(&self, deployment_id: &str, status: DeploymentStatus, reason: &str) {
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        if let Some(record) = state.deployments.get_mut(deployment_id) {
            record.status = Some(status);
            record.status_reason = Some(reason.to_string());
        }
    }

    pub fn calls(&self) -> Vec<BackendCall> {
        self.calls.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn clear_calls(&self) {
        self.calls.write().unwrap_or_else(|e| e.into_inner()).clear();
    }

    pub fn last_config_request(&self) -> Option<CreateConfigRequest> {
        self.calls().into_iter().rev().find_map(|call| match call {
            BackendCall::CreateConfig(request) => Some(request),
            _ => None,
        })
    }

    pub fn last_create_request(&self) -> Option<CreateDeploymentRequest> {
        self.calls().into_iter().rev().find_map(|call| match call {
            BackendCall::CreateDeployment(request) => Some(request),
            _ => None,
        })
    }

    pub fn last_update_request(&self) -> Option<UpdateDeploymentRequest> {
        self.calls().into_iter().rev().find_map(|call| match call {
            BackendCall::UpdateDeployment(request) => Some(request),
            _ => None,
        })
    }

    /// Ids passed to `delete_software_config`, in call order
    pub fn deleted_configs(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                BackendCall::DeleteConfig(id) => Some(id),
                _ => None,
            })
            .collect()
    }

    /// Ids passed to `delete_software_deployment`, in call order
    pub fn deleted_deployments(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                BackendCall::DeleteDeployment(id) => Some(id),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: BackendCall) {
        self.calls
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(call);
    }

    fn with_outputs(&self, state: &BackendState, mut record: DeploymentRecord) -> DeploymentRecord {
        if record.outputs.is_none() {
            record.outputs = state
                .configs
                .get(&record.config_id)
                .map(|config| config.outputs.clone());
        }
        record
    }
}

/// Decide the outcome of a signal from its details and the output schema
fn signal_outcome(
    details: &Map<String, Value>,
    outputs: &[rpc_models::ConfigOutput],
) -> (DeploymentStatus, String) {
    if let Some(code) = details.get("deploy_status_code") {
        let code = match code {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        if code != "0" {
            return (
                DeploymentStatus::Failed,
                format!("deploy_status_code : Deployment exited with non-zero status code: {}", code),
            );
        }
    }

    let failures: Vec<String> = outputs
        .iter()
        .filter(|output| output.error_output)
        .filter_map(|output| {
            details
                .get(&output.name)
                .filter(|value| is_truthy(value))
                .map(|value| format!("{} : {}", output.name, display_value(value)))
        })
        .collect();
    if !failures.is_empty() {
        return (DeploymentStatus::Failed, failures.join(", "));
    }

    (DeploymentStatus::Complete, "Outputs received".to_string())
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::String(s) => !s.is_empty(),
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[async_trait]
impl RpcBackend for MemoryBackend {
    async fn create_software_config(
        &self,
        _ctx: &RequestContext,
        request: CreateConfigRequest,
    ) -> Result<ConfigRef, DeployError> {
        self.record(BackendCall::CreateConfig(request.clone()));

        let id = generate_uuid();
        let config = SoftwareConfig {
            id: id.clone(),
            group: request.group,
            name: request.name,
            config: request.config,
            options: request.options.unwrap_or_default(),
            inputs: request.inputs,
            outputs: request.outputs.unwrap_or_default(),
        };
        self.insert_config(config);
        debug!("Created software config {}", id);
        Ok(ConfigRef { id })
    }

    async fn show_software_config(
        &self,
        _ctx: &RequestContext,
        config_id: &str,
    ) -> Result<SoftwareConfig, DeployError> {
        self.record(BackendCall::ShowConfig(config_id.to_string()));
        self.config(config_id)
            .ok_or_else(|| DeployError::NotFound(format!("software config {}", config_id)))
    }

    async fn delete_software_config(
        &self,
        _ctx: &RequestContext,
        config_id: &str,
    ) -> Result<(), DeployError> {
        self.record(BackendCall::DeleteConfig(config_id.to_string()));
        if self.deletes_not_found.load(Ordering::SeqCst) {
            return Err(DeployError::NotFound(format!("software config {}", config_id)));
        }
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        state
            .configs
            .remove(config_id)
            .map(|_| ())
            .ok_or_else(|| DeployError::NotFound(format!("software config {}", config_id)))
    }

    async fn create_software_deployment(
        &self,
        _ctx: &RequestContext,
        request: CreateDeploymentRequest,
    ) -> Result<DeploymentRecord, DeployError> {
        self.record(BackendCall::CreateDeployment(request.clone()));

        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        let record = DeploymentRecord {
            id: generate_uuid(),
            config_id: request.config_id,
            server_id: Some(request.server_id),
            action: Some(request.action),
            status: Some(request.status),
            status_reason: Some(request.status_reason),
            output_values: Map::new(),
            stack_user_project_id: request.stack_user_project_id,
            outputs: None,
        };
        let record = self.with_outputs(&state, record);
        state.deployments.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    async fn update_software_deployment(
        &self,
        _ctx: &RequestContext,
        request: UpdateDeploymentRequest,
    ) -> Result<DeploymentRecord, DeployError> {
        self.record(BackendCall::UpdateDeployment(request.clone()));

        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        let mut record = state
            .deployments
            .get(&request.deployment_id)
            .cloned()
            .ok_or_else(|| {
                DeployError::NotFound(format!("software deployment {}", request.deployment_id))
            })?;
        record.config_id = request.config_id;
        record.action = Some(request.action);
        record.status = Some(request.status);
        record.status_reason = Some(request.status_reason);
        record.outputs = None;
        let record = self.with_outputs(&state, record);
        state.deployments.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    async fn show_software_deployment(
        &self,
        _ctx: &RequestContext,
        deployment_id: &str,
    ) -> Result<DeploymentRecord, DeployError> {
        self.record(BackendCall::ShowDeployment(deployment_id.to_string()));
        let state = self.state.read().unwrap_or_else(|e| e.into_inner());
        let record = state.deployments.get(deployment_id).cloned().ok_or_else(|| {
            DeployError::NotFound(format!("software deployment {}", deployment_id))
        })?;
        Ok(self.with_outputs(&state, record))
    }

    async fn delete_software_deployment(
        &self,
        _ctx: &RequestContext,
        deployment_id: &str,
    ) -> Result<(), DeployError> {
        self.record(BackendCall::DeleteDeployment(deployment_id.to_string()));
        if self.deletes_not_found.load(Ordering::SeqCst) {
            return Err(DeployError::NotFound(format!("software deployment {}", deployment_id)));
        }
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        state
            .deployments
            .remove(deployment_id)
            .map(|_| ())
            .ok_or_else(|| DeployError::NotFound(format!("software deployment {}", deployment_id)))
    }

    async fn signal_software_deployment(
        &self,
        _ctx: &RequestContext,
        deployment_id: &str,
        details: Option<Map<String, Value>>,
        updated_at: DateTime<Utc>,
    ) -> Result<Option<String>, DeployError> {
        self.record(BackendCall::Signal {
            deployment_id: deployment_id.to_string(),
            details: details.clone(),
            updated_at,
        });

        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        let record = state.deployments.get(deployment_id).cloned().ok_or_else(|| {
            DeployError::NotFound(format!("software deployment {}", deployment_id))
        })?;
        if record.status != Some(DeploymentStatus::InProgress) {
            return Ok(None);
        }

        let details = details.unwrap_or_default();
        let outputs = state
            .configs
            .get(&record.config_id)
            .map(|config| config.outputs.clone())
            .unwrap_or_default();
        let (status, reason) = signal_outcome(&details, &outputs);

        let mut record = record;
        record.status = Some(status);
        record.status_reason = Some(reason);
        record.output_values = details;
        state.deployments.insert(record.id.clone(), record);

        let result = match status {
            DeploymentStatus::Failed => "deployment failed",
            _ => "deployment succeeded",
        };
        Ok(Some(result.to_string()))
    }
}

/// In-memory object storage account
#[derive(Debug)]
pub struct MemoryObjectStore {
    storage_url: String,
    account: RwLock<Headers>,
    containers: RwLock<BTreeMap<String, BTreeMap<String, Vec<u8>>>>,
    calls: RwLock<Vec<String>>,
    broken: AtomicBool,
}

impl MemoryObjectStore {
    pub fn new(storage_url: impl Into<String>) -> Self {
        Self {
            storage_url: storage_url.into(),
            account: RwLock::new(Headers::new()),
            containers: RwLock::new(BTreeMap::new()),
            calls: RwLock::new(Vec::new()),
            broken: AtomicBool::new(false),
        }
    }

    /// Preset an account header such as the temp URL key
    pub fn set_account_header(&self, name: &str, value: &str) {
        self.account
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(name.to_string(), value.to_string());
    }

    /// Make every delete call fail with a non-not-found error
    pub fn set_broken(&self, broken: bool) {
        self.broken.store(broken, Ordering::SeqCst);
    }

    pub fn has_container(&self, container: &str) -> bool {
        let containers = self.containers.read().unwrap_or_else(|e| e.into_inner());
        containers.contains_key(container)
    }

    pub fn has_object(&self, container: &str, object: &str) -> bool {
        let containers = self.containers.read().unwrap_or_else(|e| e.into_inner());
        containers
            .get(container)
            .map(|objects| objects.contains_key(object))
            .unwrap_or(false)
    }

    /// Calls received, formatted as `op:arg[/arg]`
    pub fn calls(&self) -> Vec<String> {
        self.calls.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Number of calls whose op matches `op`
    pub fn count(&self, op: &str) -> usize {
        let prefix = format!("{}:", op);
        self.calls()
            .iter()
            .filter(|call| call.starts_with(&prefix) || call.as_str() == op)
            .count()
    }

    fn record(&self, call: String) {
        self.calls
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(call);
    }

    fn check_broken(&self) -> Result<(), DeployError> {
        if self.broken.load(Ordering::SeqCst) {
            return Err(DeployError::ObjectStore("service unavailable".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    fn storage_url(&self) -> &str {
        &self.storage_url
    }

    async fn head_account(&self) -> Result<Headers, DeployError> {
        self.record("head_account".to_string());
        Ok(self.account.read().unwrap_or_else(|e| e.into_inner()).clone())
    }

    async fn post_account(&self, headers: Headers) -> Result<(), DeployError> {
        self.record("post_account".to_string());
        self.account
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .extend(headers);
        Ok(())
    }

    async fn put_container(&self, container: &str) -> Result<(), DeployError> {
        self.record(format!("put_container:{}", container));
        self.containers
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .entry(container.to_string())
            .or_default();
        Ok(())
    }

    async fn head_container(&self, container: &str) -> Result<Headers, DeployError> {
        self.record(format!("head_container:{}", container));
        let containers = self.containers.read().unwrap_or_else(|e| e.into_inner());
        let objects = containers
            .get(container)
            .ok_or_else(|| DeployError::NotFound(format!("container {}", container)))?;
        let mut headers = Headers::new();
        headers.insert(OBJECT_COUNT_HEADER.to_string(), objects.len().to_string());
        Ok(headers)
    }

    async fn delete_container(&self, container: &str) -> Result<(), DeployError> {
        self.record(format!("delete_container:{}", container));
        self.check_broken()?;
        self.containers
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(container)
            .map(|_| ())
            .ok_or_else(|| DeployError::NotFound(format!("container {}", container)))
    }

    async fn put_object(
        &self,
        container: &str,
        object: &str,
        contents: &[u8],
    ) -> Result<(), DeployError> {
        self.record(format!("put_object:{}/{}", container, object));
        let mut containers = self.containers.write().unwrap_or_else(|e| e.into_inner());
        let objects = containers
            .get_mut(container)
            .ok_or_else(|| DeployError::NotFound(format!("container {}", container)))?;
        objects.insert(object.to_string(), contents.to_vec());
        Ok(())
    }

    async fn delete_object(&self, container: &str, object: &str) -> Result<(), DeployError> {
        self.record(format!("delete_object:{}/{}", container, object));
        self.check_broken()?;
        let mut containers = self.containers.write().unwrap_or_else(|e| e.into_inner());
        containers
            .get_mut(container)
            .and_then(|objects| objects.remove(object))
            .map(|_| ())
            .ok_or_else(|| DeployError::NotFound(format!("object {}/{}", container, object)))
    }
}

/// Queue state tracked by [`MemoryQueue`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueueState {
    pub signaling: bool,
    pub signed_methods: Vec<String>,
}

/// In-memory message queue service
#[derive(Debug, Default)]
pub struct MemoryQueue {
    queues: RwLock<BTreeMap<String, QueueState>>,
    calls: RwLock<Vec<String>>,
}

impl MemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queue(&self, queue_id: &str) -> Option<QueueState> {
        let queues = self.queues.read().unwrap_or_else(|e| e.into_inner());
        queues.get(queue_id).cloned()
    }

    /// Calls received, formatted as `op:queue_id`
    pub fn calls(&self) -> Vec<String> {
        self.calls.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn record(&self, op: &str, queue_id: &str) {
        self.calls
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(format!("{}:{}", op, queue_id));
    }

    fn update<F>(&self, queue_id: &str, f: F) -> Result<(), DeployError>
    where
        F: FnOnce(&mut QueueState),
    {
        let mut queues = self.queues.write().unwrap_or_else(|e| e.into_inner());
        let state = queues
            .get_mut(queue_id)
            .ok_or_else(|| DeployError::NotFound(format!("queue {}", queue_id)))?;
        f(state);
        Ok(())
    }
}

#[async_trait]
impl MessageQueue for MemoryQueue {
    async fn create_queue(&self, queue_id: &str) -> Result<(), DeployError> {
        self.record("create_queue", queue_id);
        self.queues
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .entry(queue_id.to_string())
            .or_default();
        Ok(())
    }

    async fn register_signaling(&self, queue_id: &str) -> Result<(), DeployError> {
        self.record("register_signaling", queue_id);
        self.update(queue_id, |state| state.signaling = true)
    }

    async fn grant_signed_access(
        &self,
        queue_id: &str,
        _paths: &[&str],
        methods: &[&str],
    ) -> Result<(), DeployError> {
        self.record("grant_signed_access", queue_id);
        self.update(queue_id, |state| {
            state.signed_methods = methods.iter().map(|m| m.to_string()).collect();
        })
    }

    async fn delete_queue(&self, queue_id: &str) -> Result<(), DeployError> {
        self.record("delete_queue", queue_id);
        self.queues
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(queue_id)
            .map(|_| ())
            .ok_or_else(|| DeployError::NotFound(format!("queue {}", queue_id)))
    }
}

/// In-memory signed URL issuer
#[derive(Debug)]
pub struct MemorySignedUrls {
    base_url: String,
    issued: RwLock<BTreeMap<String, String>>,
}

impl MemorySignedUrls {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            issued: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn issued(&self) -> BTreeMap<String, String> {
        self.issued.read().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl SignedUrlIssuer for MemorySignedUrls {
    async fn issue(&self, physical_name: &str) -> Result<String, DeployError> {
        let url = format!(
            "{}/signal/{}?signature={}",
            self.base_url.trim_end_matches('/'),
            physical_name,
            generate_uuid()
        );
        self.issued
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(physical_name.to_string(), url.clone());
        Ok(url)
    }

    async fn revoke(&self, physical_name: &str) -> Result<(), DeployError> {
        self.issued
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(physical_name)
            .map(|_| ())
            .ok_or_else(|| DeployError::NotFound(format!("signed url for {}", physical_name)))
    }
}
