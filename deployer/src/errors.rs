//! Error types for the deployment engine

use thiserror::Error;

/// Main error type for the deployment engine
#[derive(Error, Debug)]
pub enum DeployError {
    /// Declared configuration is structurally invalid
    #[error("Validation failed: {0}")]
    Validation(String),

    /// The backend or a capability provider has no such record
    #[error("Not found: {0}")]
    NotFound(String),

    /// The deployment record reached FAILED
    #[error("Deployment to server failed: {0}")]
    DeploymentFailed(String),

    #[error("The Referenced Attribute ({resource} {name}) is incorrect.")]
    InvalidAttribute { resource: String, name: String },

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Object storage error: {0}")]
    ObjectStore(String),

    #[error("Queue error: {0}")]
    Queue(String),

    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl DeployError {
    /// Whether this error means the target is already gone
    pub fn is_not_found(&self) -> bool {
        matches!(self, DeployError::NotFound(_))
    }
}

/// Swallow a not-found error, keep everything else
pub fn ignore_not_found<T>(result: Result<T, DeployError>) -> Result<Option<T>, DeployError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.is_not_found() => Ok(None),
        Err(e) => Err(e),
    }
}
