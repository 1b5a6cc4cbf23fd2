//! One-shot deployment run
//!
//! Creates the resource described by a definition, optionally delivers a
//! signal, polls until the create completes and collects its attributes.

use std::sync::Arc;

use rpc_models::{Action, DeploymentStatus};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::info;

use crate::app::definition::{Definition, ResourceKind};
use crate::app::options::{AppOptions, BackendMode};
use crate::clients::memory::{MemoryBackend, MemoryObjectStore, MemoryQueue, MemorySignedUrls};
use crate::clients::{Clients, RequestContext};
use crate::deploy::group::{SoftwareDeploymentGroup, STATUS_CODES, STDERRS, STDOUTS};
use crate::deploy::lifecycle::{SoftwareDeployment, STATUS_CODE, STDERR, STDOUT};
use crate::deploy::resource::ResourceInfo;
use crate::errors::DeployError;
use crate::http::HttpClient;
use crate::workers::poller::poll_until_complete;

/// Outcome of a run
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub resource_name: String,
    pub status: DeploymentStatus,
    pub checks: u32,
    pub signal_result: Option<String>,
    pub attributes: Map<String, Value>,
}

/// Build the clients for the configured backend
pub fn build_clients(options: &AppOptions, definition: &Definition) -> Result<Clients, DeployError> {
    match &options.backend {
        BackendMode::Memory => {
            let backend = MemoryBackend::new();
            for config in &definition.configs {
                backend.insert_config(config.clone());
            }
            let storage_url = format!("http://localhost:8080/v1/AUTH_{}", options.tenant_id);
            Ok(Clients::new(Arc::new(backend))
                .with_object_store(Arc::new(MemoryObjectStore::new(storage_url)))
                .with_queue(Arc::new(MemoryQueue::new()))
                .with_signed_urls(Arc::new(MemorySignedUrls::new("http://localhost:8000/v1"))))
        }
        BackendMode::Http {
            base_url,
            token,
            timeout,
        } => {
            let client = HttpClient::new(base_url, token.clone(), *timeout)?;
            Ok(Clients::new(Arc::new(client)))
        }
    }
}

/// Create the defined resource and wait for it
pub async fn run(
    options: &AppOptions,
    definition: &Definition,
    signal: Option<Map<String, Value>>,
) -> Result<RunReport, DeployError> {
    let clients = build_clients(options, definition)?;
    let ctx = RequestContext::new(options.tenant_id.clone());
    let resource = ResourceInfo::new(definition.stack.clone(), definition.resource_name.clone());

    info!(
        "Running {:?} {} in stack {}",
        definition.kind,
        definition.resource_name,
        definition.stack.identifier()
    );

    match definition.kind {
        ResourceKind::Deployment => {
            let properties = definition.deployment_properties()?;
            let mut deployment =
                SoftwareDeployment::new(resource, properties, clients, options.temp_url.clone())?;
            deployment.validate()?;

            let handle = deployment.handle_create(&ctx).await?;
            let signal_result = match signal {
                Some(details) => deployment.signal(&ctx, Some(details)).await?,
                None => None,
            };
            let checks = poll_until_complete(
                &options.poller,
                &mut deployment,
                &ctx,
                Action::Create,
                handle.as_ref(),
                tokio::time::sleep,
            )
            .await?;

            let mut attributes = Map::new();
            for name in [STDOUT, STDERR, STATUS_CODE] {
                attributes.insert(name.to_string(), deployment.attribute(&ctx, name).await?);
            }
            Ok(RunReport {
                resource_name: definition.resource_name.clone(),
                status: DeploymentStatus::Complete,
                checks,
                signal_result,
                attributes,
            })
        }
        ResourceKind::Group => {
            let properties = definition.group_properties()?;
            let mut group =
                SoftwareDeploymentGroup::new(resource, properties, clients, options.temp_url.clone())?;
            group.validate()?;

            let handle = group.handle_create(&ctx).await?;
            let mut signal_result = None;
            if let Some(details) = signal {
                for target in group.resource_names() {
                    signal_result = group.signal(&ctx, &target, Some(details.clone())).await?;
                }
            }
            let checks = poll_until_complete(
                &options.poller,
                &mut group,
                &ctx,
                Action::Create,
                Some(&handle),
                tokio::time::sleep,
            )
            .await?;

            let mut attributes = Map::new();
            for name in [STDOUTS, STDERRS, STATUS_CODES] {
                attributes.insert(name.to_string(), group.attribute(&ctx, name).await?);
            }
            Ok(RunReport {
                resource_name: definition.resource_name.clone(),
                status: DeploymentStatus::Complete,
                checks,
                signal_result,
                attributes,
            })
        }
    }
}
