//! NO_SIGNAL transport

use async_trait::async_trait;
use rpc_models::ConfigInput;

use super::{SignalChannel, SignalTransport};
use crate::deploy::data::ResourceData;
use crate::errors::DeployError;

/// Deployments complete as soon as their data is available
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSignal;

#[async_trait]
impl SignalChannel for NoSignal {
    fn transport(&self) -> SignalTransport {
        SignalTransport::NoSignal
    }

    fn waits_for_signal(&self) -> bool {
        false
    }

    async fn provision(
        &self,
        _physical_name: &str,
        _data: &ResourceData,
    ) -> Result<Option<String>, DeployError> {
        Ok(None)
    }

    async fn identifier(&self, _data: &ResourceData) -> Option<String> {
        None
    }

    fn signal_inputs(&self, _identifier: &str) -> Vec<ConfigInput> {
        Vec::new()
    }

    async fn release(&self, _physical_name: &str, _data: &ResourceData) -> Result<(), DeployError> {
        Ok(())
    }
}
