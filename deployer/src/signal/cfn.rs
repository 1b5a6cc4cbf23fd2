//! CFN_SIGNAL transport, backed by the resource's signed URL issuer

use std::sync::Arc;

use async_trait::async_trait;
use rpc_models::ConfigInput;
use tracing::warn;

use super::{SignalChannel, SignalTransport, SIGNAL_ID_INPUT};
use crate::clients::SignedUrlIssuer;
use crate::deploy::data::ResourceData;
use crate::errors::{ignore_not_found, DeployError};

/// Data key holding the signed URL
pub const SIGNED_URL_KEY: &str = "signal_signed_url";

pub struct CfnSignal {
    issuer: Arc<dyn SignedUrlIssuer>,
}

impl CfnSignal {
    pub fn new(issuer: Arc<dyn SignedUrlIssuer>) -> Self {
        Self { issuer }
    }
}

#[async_trait]
impl SignalChannel for CfnSignal {
    fn transport(&self) -> SignalTransport {
        SignalTransport::CfnSignal
    }

    async fn provision(
        &self,
        physical_name: &str,
        data: &ResourceData,
    ) -> Result<Option<String>, DeployError> {
        if let Some(url) = data.get(SIGNED_URL_KEY).await {
            return Ok(Some(url));
        }
        let url = self.issuer.issue(physical_name).await?;
        data.set(SIGNED_URL_KEY, url.clone(), true).await;
        Ok(Some(url))
    }

    async fn identifier(&self, data: &ResourceData) -> Option<String> {
        data.get(SIGNED_URL_KEY).await
    }

    fn signal_inputs(&self, identifier: &str) -> Vec<ConfigInput> {
        vec![ConfigInput::with_value(SIGNAL_ID_INPUT, identifier.into())
            .described("ID of signal to use for signaling output values")]
    }

    async fn release(&self, physical_name: &str, data: &ResourceData) -> Result<(), DeployError> {
        if !data.contains(SIGNED_URL_KEY).await {
            return Ok(());
        }
        let result = ignore_not_found(self.issuer.revoke(physical_name).await).map(|_| ());
        data.delete(SIGNED_URL_KEY).await;

        if let Err(e) = &result {
            warn!("Failed to revoke signed URL for {}: {}", physical_name, e);
        }
        result
    }
}
