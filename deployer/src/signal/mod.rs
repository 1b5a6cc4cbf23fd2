//! Signal transports
//!
//! A transport decides whether a deployment waits for an out-of-band
//! completion signal and, when it does, provisions the channel the server
//! uses to deliver it. The channel is chosen once per resource from the
//! `signal_transport` property.

pub mod cfn;
pub mod none;
pub mod queue;
pub mod temp_url;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use rpc_models::ConfigInput;
use serde::{Deserialize, Serialize};

use crate::clients::Clients;
use crate::deploy::data::ResourceData;
use crate::errors::DeployError;

pub use cfn::CfnSignal;
pub use none::NoSignal;
pub use queue::QueueSignal;
pub use temp_url::{TempUrlOptions, TempUrlSignal};

/// Input carrying the signal URL or id
pub const SIGNAL_ID_INPUT: &str = "deploy_signal_id";

/// Input carrying the HTTP verb for the signal URL
pub const SIGNAL_VERB_INPUT: &str = "deploy_signal_verb";

/// Input carrying the signal queue id
pub const QUEUE_ID_INPUT: &str = "deploy_queue_id";

/// How the server reports deployment outputs back
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SignalTransport {
    #[default]
    CfnSignal,
    TempUrlSignal,
    ZaqarSignal,
    NoSignal,
}

impl SignalTransport {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalTransport::CfnSignal => "CFN_SIGNAL",
            SignalTransport::TempUrlSignal => "TEMP_URL_SIGNAL",
            SignalTransport::ZaqarSignal => "ZAQAR_SIGNAL",
            SignalTransport::NoSignal => "NO_SIGNAL",
        }
    }
}

impl fmt::Display for SignalTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SignalTransport {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "CFN_SIGNAL" => Ok(SignalTransport::CfnSignal),
            "TEMP_URL_SIGNAL" => Ok(SignalTransport::TempUrlSignal),
            "ZAQAR_SIGNAL" => Ok(SignalTransport::ZaqarSignal),
            "NO_SIGNAL" => Ok(SignalTransport::NoSignal),
            _ => Err(format!("Invalid signal transport: {}", s)),
        }
    }
}

/// A provisioned or provisionable completion channel
#[async_trait]
pub trait SignalChannel: Send + Sync {
    fn transport(&self) -> SignalTransport;

    /// Whether deployments wait for the server to signal
    fn waits_for_signal(&self) -> bool {
        true
    }

    /// Return the cached channel identifier, creating the channel on first use
    async fn provision(
        &self,
        physical_name: &str,
        data: &ResourceData,
    ) -> Result<Option<String>, DeployError>;

    /// The cached channel identifier, without provisioning
    async fn identifier(&self, data: &ResourceData) -> Option<String>;

    /// Extra derived config inputs for a provisioned identifier
    fn signal_inputs(&self, identifier: &str) -> Vec<ConfigInput>;

    /// Tear the channel down; a missing channel is not an error
    async fn release(&self, physical_name: &str, data: &ResourceData) -> Result<(), DeployError>;
}

/// Build the channel for `transport` from the available clients
pub fn select_channel(
    transport: SignalTransport,
    clients: &Clients,
    temp_url: &TempUrlOptions,
) -> Result<Arc<dyn SignalChannel>, DeployError> {
    let missing = |client: &str| {
        DeployError::Config(format!(
            "{} requires a {} client",
            transport.as_str(),
            client
        ))
    };

    let channel: Arc<dyn SignalChannel> = match transport {
        SignalTransport::NoSignal => Arc::new(NoSignal),
        SignalTransport::TempUrlSignal => {
            let store = clients
                .object_store
                .clone()
                .ok_or_else(|| missing("object storage"))?;
            Arc::new(TempUrlSignal::new(store, temp_url.clone()))
        }
        SignalTransport::ZaqarSignal => {
            let queue = clients.queue.clone().ok_or_else(|| missing("message queue"))?;
            Arc::new(QueueSignal::new(queue))
        }
        SignalTransport::CfnSignal => {
            let issuer = clients
                .signed_urls
                .clone()
                .ok_or_else(|| missing("signed URL"))?;
            Arc::new(CfnSignal::new(issuer))
        }
    };
    Ok(channel)
}
