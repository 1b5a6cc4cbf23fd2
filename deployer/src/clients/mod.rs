//! External collaborators
//!
//! The backend RPC surface and the capability providers used by signal
//! transports are consumed through the traits in this module. Concrete
//! implementations live elsewhere (`crate::http`) or in [`memory`].

pub mod backend;
pub mod memory;
pub mod object_store;
pub mod queue;
pub mod signed_url;

use std::sync::Arc;

pub use backend::{RequestContext, RpcBackend};
pub use object_store::ObjectStore;
pub use queue::MessageQueue;
pub use signed_url::SignedUrlIssuer;

/// Clients available to a deployment resource
#[derive(Clone)]
pub struct Clients {
    /// Backend holding configs and deployment records
    pub backend: Arc<dyn RpcBackend>,

    /// Object storage, required by TEMP_URL_SIGNAL
    pub object_store: Option<Arc<dyn ObjectStore>>,

    /// Message queue, required by ZAQAR_SIGNAL
    pub queue: Option<Arc<dyn MessageQueue>>,

    /// Signed URL issuer, required by CFN_SIGNAL
    pub signed_urls: Option<Arc<dyn SignedUrlIssuer>>,
}

impl Clients {
    pub fn new(backend: Arc<dyn RpcBackend>) -> Self {
        Self {
            backend,
            object_store: None,
            queue: None,
            signed_urls: None,
        }
    }

    pub fn with_object_store(mut self, store: Arc<dyn ObjectStore>) -> Self {
        self.object_store = Some(store);
        self
    }

    pub fn with_queue(mut self, queue: Arc<dyn MessageQueue>) -> Self {
        self.queue = Some(queue);
        self
    }

    pub fn with_signed_urls(mut self, issuer: Arc<dyn SignedUrlIssuer>) -> Self {
        self.signed_urls = Some(issuer);
        self
    }
}
