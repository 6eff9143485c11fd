//! Lifecycle-specific error types

use thiserror::Error;

/// Errors a module may return from one of its lifecycle callbacks
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// The module cannot reach something it needs outside the container
    #[error("Missing external dependency: {0}")]
    MissingDependency(String),

    /// The module failed while preparing, enabling or tearing down resources
    #[error("Loading failed: {0}")]
    LoadingFailed(String),

    /// Any other failure raised by module code
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl LifecycleError {
    /// Create a missing external dependency error
    pub fn missing_dependency(msg: impl Into<String>) -> Self {
        Self::MissingDependency(msg.into())
    }

    /// Create a loading failure error
    pub fn loading_failed(msg: impl Into<String>) -> Self {
        Self::LoadingFailed(msg.into())
    }
}

/// A specialized Result type for lifecycle callbacks
pub type Result<T> = std::result::Result<T, LifecycleError>;
