//! Signed URL issuer used by CFN style signaling

use async_trait::async_trait;

use crate::errors::DeployError;

/// Issues and revokes per-resource signed callback URLs
#[async_trait]
pub trait SignedUrlIssuer: Send + Sync {
    async fn issue(&self, physical_name: &str) -> Result<String, DeployError>;

    async fn revoke(&self, physical_name: &str) -> Result<(), DeployError>;
}
