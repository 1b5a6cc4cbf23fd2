//! Deployment group
//!
//! One deployment definition fanned out over a set of servers. Each target
//! gets its own [`SoftwareDeployment`] and its own deployment record.

use std::collections::BTreeMap;

use async_trait::async_trait;
use futures::future::{try_join_all, BoxFuture};
use futures::FutureExt;
use rpc_models::{Action, DeploymentRecord};
use serde_json::{Map, Value};
use tracing::{debug, info};

use super::lifecycle::{SoftwareDeployment, STATUS_CODE, STDERR, STDOUT};
use super::properties::{DeploymentProperties, GroupProperties};
use super::resource::ResourceInfo;
use crate::clients::{Clients, RequestContext};
use crate::errors::DeployError;
use crate::signal::TempUrlOptions;
use crate::workers::poller::CompletionCheck;

pub const STDOUTS: &str = "deploy_stdouts";
pub const STDERRS: &str = "deploy_stderrs";
pub const STATUS_CODES: &str = "deploy_status_codes";

/// What a member was asked to do and the record it returned
#[derive(Debug, Clone, PartialEq)]
pub struct MemberHandle {
    pub action: Action,
    pub record: Option<DeploymentRecord>,
}

/// Target name to member handle
pub type GroupHandle = BTreeMap<String, MemberHandle>;

type MemberFuture<'a> = BoxFuture<'a, Result<(String, MemberHandle), DeployError>>;

pub struct SoftwareDeploymentGroup {
    resource: ResourceInfo,
    properties: GroupProperties,
    clients: Clients,
    temp_url: TempUrlOptions,
    members: BTreeMap<String, SoftwareDeployment>,
    retiring: BTreeMap<String, SoftwareDeployment>,
}

impl SoftwareDeploymentGroup {
    pub fn new(
        resource: ResourceInfo,
        properties: GroupProperties,
        clients: Clients,
        temp_url: TempUrlOptions,
    ) -> Result<Self, DeployError> {
        properties.validate()?;
        let mut group = Self {
            resource,
            properties,
            clients,
            temp_url,
            members: BTreeMap::new(),
            retiring: BTreeMap::new(),
        };
        let definitions = group.assemble_nested(&group.resource_names());
        for (name, properties) in definitions {
            let member = group.build_member(&name, properties)?;
            group.members.insert(name, member);
        }
        Ok(group)
    }

    pub fn name(&self) -> &str {
        &self.resource.name
    }

    /// Shared member definition, without a server
    pub fn build_resource_definition(&self) -> DeploymentProperties {
        self.properties.member_template()
    }

    /// Target names, in order
    pub fn resource_names(&self) -> Vec<String> {
        self.properties.targets().into_keys().collect()
    }

    /// Member definitions for `names`, each with its own server
    pub fn assemble_nested(&self, names: &[String]) -> BTreeMap<String, DeploymentProperties> {
        let targets = self.properties.targets();
        let template = self.build_resource_definition();
        names
            .iter()
            .filter_map(|name| {
                targets.get(name).map(|server| {
                    let mut properties = template.clone();
                    properties.server = Some(server.clone());
                    (name.clone(), properties)
                })
            })
            .collect()
    }

    pub fn member(&self, name: &str) -> Option<&SoftwareDeployment> {
        self.members.get(name)
    }

    pub fn members(&self) -> impl Iterator<Item = (&String, &SoftwareDeployment)> {
        self.members.iter()
    }

    pub fn validate(&self) -> Result<(), DeployError> {
        self.properties.validate()?;
        for member in self.members.values() {
            member.validate()?;
        }
        Ok(())
    }

    pub async fn handle_create(&mut self, ctx: &RequestContext) -> Result<GroupHandle, DeployError> {
        self.fan_out(ctx, Action::Create).await
    }

    /// Reconcile members with the new server set
    pub async fn handle_update(
        &mut self,
        ctx: &RequestContext,
        properties: GroupProperties,
    ) -> Result<GroupHandle, DeployError> {
        properties.validate()?;
        self.properties = properties;

        let names = self.resource_names();
        let definitions = self.assemble_nested(&names);

        let removed: Vec<String> = self
            .members
            .keys()
            .filter(|name| !definitions.contains_key(*name))
            .cloned()
            .collect();
        for name in removed {
            if let Some(member) = self.members.remove(&name) {
                self.retiring.insert(name, member);
            }
        }

        let mut added = Vec::new();
        for (name, properties) in &definitions {
            if !self.members.contains_key(name) {
                let member = self.build_member(name, properties.clone())?;
                self.members.insert(name.clone(), member);
                added.push(name.clone());
            }
        }
        info!(
            "Updating group {}: {} members, {} added, {} removed",
            self.resource.name,
            self.members.len(),
            added.len(),
            self.retiring.len()
        );

        let mut futures: Vec<MemberFuture<'_>> = Vec::new();
        for (name, member) in self.members.iter_mut() {
            if added.contains(name) {
                futures.push(run_member(ctx, name, member, Action::Create, None));
            } else {
                let properties = definitions.get(name).cloned();
                futures.push(run_member(ctx, name, member, Action::Update, properties));
            }
        }
        for (name, member) in self.retiring.iter_mut() {
            futures.push(run_member(ctx, name, member, Action::Delete, None));
        }

        Ok(try_join_all(futures).await?.into_iter().collect())
    }

    pub async fn handle_suspend(&mut self, ctx: &RequestContext) -> Result<GroupHandle, DeployError> {
        self.fan_out(ctx, Action::Suspend).await
    }

    pub async fn handle_resume(&mut self, ctx: &RequestContext) -> Result<GroupHandle, DeployError> {
        self.fan_out(ctx, Action::Resume).await
    }

    pub async fn handle_delete(&mut self, ctx: &RequestContext) -> Result<GroupHandle, DeployError> {
        self.fan_out(ctx, Action::Delete).await
    }

    /// True once every member in `handle` reports complete
    pub async fn check_complete(
        &mut self,
        ctx: &RequestContext,
        handle: &GroupHandle,
    ) -> Result<bool, DeployError> {
        let checks = self
            .members
            .iter_mut()
            .chain(self.retiring.iter_mut())
            .filter_map(|(name, member)| {
                handle.get(name).map(|member_handle| async move {
                    let done = member
                        .check_complete(ctx, member_handle.action, member_handle.record.as_ref())
                        .await?;
                    Ok::<_, DeployError>((name.clone(), done))
                })
            });
        let results = try_join_all(checks).await?;

        for (name, done) in &results {
            if *done && self.retiring.remove(name).is_some() {
                debug!("Group {} retired member {}", self.resource.name, name);
            }
        }
        Ok(results.iter().all(|(_, done)| *done))
    }

    pub async fn check_create_complete(
        &mut self,
        ctx: &RequestContext,
        handle: &GroupHandle,
    ) -> Result<bool, DeployError> {
        self.check_complete(ctx, handle).await
    }

    pub async fn check_update_complete(
        &mut self,
        ctx: &RequestContext,
        handle: &GroupHandle,
    ) -> Result<bool, DeployError> {
        self.check_complete(ctx, handle).await
    }

    pub async fn check_suspend_complete(
        &mut self,
        ctx: &RequestContext,
        handle: &GroupHandle,
    ) -> Result<bool, DeployError> {
        self.check_complete(ctx, handle).await
    }

    pub async fn check_resume_complete(
        &mut self,
        ctx: &RequestContext,
        handle: &GroupHandle,
    ) -> Result<bool, DeployError> {
        self.check_complete(ctx, handle).await
    }

    pub async fn check_delete_complete(
        &mut self,
        ctx: &RequestContext,
        handle: &GroupHandle,
    ) -> Result<bool, DeployError> {
        self.check_complete(ctx, handle).await
    }

    /// Aggregated attribute, keyed by target name
    pub async fn attribute(&self, ctx: &RequestContext, name: &str) -> Result<Value, DeployError> {
        let member_attribute = match name {
            STDOUTS => STDOUT,
            STDERRS => STDERR,
            STATUS_CODES => STATUS_CODE,
            _ => {
                return Err(DeployError::InvalidAttribute {
                    resource: self.resource.name.clone(),
                    name: name.to_string(),
                })
            }
        };

        let values = try_join_all(self.members.iter().map(|(target, member)| async move {
            let value = member.attribute(ctx, member_attribute).await?;
            Ok::<_, DeployError>((target.clone(), value))
        }))
        .await?;
        Ok(Value::Object(values.into_iter().collect()))
    }

    /// Deliver a signal to the member for `target`
    pub async fn signal(
        &self,
        ctx: &RequestContext,
        target: &str,
        details: Option<Map<String, Value>>,
    ) -> Result<Option<String>, DeployError> {
        let member = self
            .members
            .get(target)
            .ok_or_else(|| DeployError::NotFound(format!("group member {}", target)))?;
        member.signal(ctx, details).await
    }

    async fn fan_out(&mut self, ctx: &RequestContext, action: Action) -> Result<GroupHandle, DeployError> {
        debug!(
            "Group {} running {} on {} members",
            self.resource.name,
            action,
            self.members.len()
        );
        let futures: Vec<MemberFuture<'_>> = self
            .members
            .iter_mut()
            .map(|(name, member)| run_member(ctx, name, member, action, None))
            .collect();
        Ok(try_join_all(futures).await?.into_iter().collect())
    }

    fn build_member(
        &self,
        name: &str,
        properties: DeploymentProperties,
    ) -> Result<SoftwareDeployment, DeployError> {
        SoftwareDeployment::new(
            self.resource.sibling(name),
            properties,
            self.clients.clone(),
            self.temp_url.clone(),
        )
    }
}

fn run_member<'a>(
    ctx: &'a RequestContext,
    name: &'a str,
    member: &'a mut SoftwareDeployment,
    action: Action,
    properties: Option<DeploymentProperties>,
) -> MemberFuture<'a> {
    async move {
        let record = match (action, properties) {
            (Action::Update, Some(properties)) => member.handle_update(ctx, properties).await?,
            _ => member.handle(ctx, action).await?,
        };
        Ok((name.to_string(), MemberHandle { action, record }))
    }
    .boxed()
}

#[async_trait]
impl CompletionCheck for SoftwareDeploymentGroup {
    type Handle = GroupHandle;

    async fn check_complete(
        &mut self,
        ctx: &RequestContext,
        _action: Action,
        handle: Option<&GroupHandle>,
    ) -> Result<bool, DeployError> {
        match handle {
            Some(handle) => SoftwareDeploymentGroup::check_complete(self, ctx, handle).await,
            None => Ok(true),
        }
    }
}
