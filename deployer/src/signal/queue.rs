//! ZAQAR_SIGNAL transport

use std::sync::Arc;

use async_trait::async_trait;
use rpc_models::ConfigInput;
use tracing::{debug, warn};

use super::{SignalChannel, SignalTransport, QUEUE_ID_INPUT};
use crate::clients::MessageQueue;
use crate::deploy::data::ResourceData;
use crate::errors::{ignore_not_found, DeployError};

/// Data key holding the signal queue id
pub const QUEUE_ID_KEY: &str = "signal_queue_id";

/// Signals by posting a message to a per-resource queue
pub struct QueueSignal {
    queue: Arc<dyn MessageQueue>,
}

impl QueueSignal {
    pub fn new(queue: Arc<dyn MessageQueue>) -> Self {
        Self { queue }
    }
}

#[async_trait]
impl SignalChannel for QueueSignal {
    fn transport(&self) -> SignalTransport {
        SignalTransport::ZaqarSignal
    }

    async fn provision(
        &self,
        physical_name: &str,
        data: &ResourceData,
    ) -> Result<Option<String>, DeployError> {
        if let Some(queue_id) = data.get(QUEUE_ID_KEY).await {
            return Ok(Some(queue_id));
        }

        let queue_id = physical_name.to_string();
        self.queue.create_queue(&queue_id).await?;
        self.queue.register_signaling(&queue_id).await?;
        self.queue
            .grant_signed_access(&queue_id, &["messages"], &["POST"])
            .await?;
        data.set(QUEUE_ID_KEY, queue_id.clone(), false).await;

        debug!("Provisioned signal queue {}", queue_id);
        Ok(Some(queue_id))
    }

    async fn identifier(&self, data: &ResourceData) -> Option<String> {
        data.get(QUEUE_ID_KEY).await
    }

    fn signal_inputs(&self, identifier: &str) -> Vec<ConfigInput> {
        vec![ConfigInput::with_value(QUEUE_ID_INPUT, identifier.into())
            .described("ID of queue to use for signaling output values")]
    }

    async fn release(&self, _physical_name: &str, data: &ResourceData) -> Result<(), DeployError> {
        let queue_id = match data.get(QUEUE_ID_KEY).await {
            Some(queue_id) => queue_id,
            None => return Ok(()),
        };

        let result = ignore_not_found(self.queue.delete_queue(&queue_id).await).map(|_| ());
        data.delete(QUEUE_ID_KEY).await;

        if let Err(e) = &result {
            warn!("Failed to delete signal queue {}: {}", queue_id, e);
        }
        result
    }
}
