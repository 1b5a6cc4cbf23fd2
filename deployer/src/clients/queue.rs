//! Message queue capability

use async_trait::async_trait;

use crate::errors::DeployError;

/// Message queue client
#[async_trait]
pub trait MessageQueue: Send + Sync {
    async fn create_queue(&self, queue_id: &str) -> Result<(), DeployError>;

    /// Mark the queue as a deployment signal sink
    async fn register_signaling(&self, queue_id: &str) -> Result<(), DeployError>;

    /// Allow pre-signed access to `paths` with `methods`
    async fn grant_signed_access(
        &self,
        queue_id: &str,
        paths: &[&str],
        methods: &[&str],
    ) -> Result<(), DeployError>;

    async fn delete_queue(&self, queue_id: &str) -> Result<(), DeployError>;
}
