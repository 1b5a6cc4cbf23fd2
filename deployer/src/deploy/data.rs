//! Resource-owned key/value data
//!
//! Signal transports cache their channel state here so provisioning happens
//! at most once per resource.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

/// A stored value and whether it must be kept out of logs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataEntry {
    pub value: String,

    #[serde(default)]
    pub redacted: bool,
}

/// Key/value data owned by one deployment resource
#[derive(Clone, Default)]
pub struct ResourceData {
    entries: Arc<RwLock<BTreeMap<String, DataEntry>>>,
}

impl ResourceData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restore data persisted from an earlier run
    pub fn from_snapshot(entries: BTreeMap<String, DataEntry>) -> Self {
        Self {
            entries: Arc::new(RwLock::new(entries)),
        }
    }

    pub async fn get(&self, key: &str) -> Option<String> {
        let entries = self.entries.read().await;
        entries.get(key).map(|entry| entry.value.clone())
    }

    /// Store a value, flagging it as redacted when it is a secret
    pub async fn set(&self, key: &str, value: impl Into<String>, redacted: bool) {
        let mut entries = self.entries.write().await;
        entries.insert(
            key.to_string(),
            DataEntry {
                value: value.into(),
                redacted,
            },
        );
    }

    /// Remove a key, returning whether it was present
    pub async fn delete(&self, key: &str) -> bool {
        let mut entries = self.entries.write().await;
        entries.remove(key).is_some()
    }

    pub async fn contains(&self, key: &str) -> bool {
        self.entries.read().await.contains_key(key)
    }

    pub async fn is_redacted(&self, key: &str) -> bool {
        let entries = self.entries.read().await;
        entries.get(key).map(|entry| entry.redacted).unwrap_or(false)
    }

    pub async fn snapshot(&self) -> BTreeMap<String, DataEntry> {
        self.entries.read().await.clone()
    }
}

// Only keys are printed, values may be signed URLs.
impl fmt::Debug for ResourceData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.entries.try_read() {
            Ok(entries) => f.debug_set().entries(entries.keys()).finish(),
            Err(_) => f.write_str("ResourceData { <locked> }"),
        }
    }
}
