use thiserror::Error;

/// Failure of a discovery source to enumerate modules
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// The scan itself could not run
    #[error("Module scan failed: {message}")]
    ScanFailed {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },
}

impl DiscoveryError {
    pub fn scan_failed(message: impl Into<String>) -> Self {
        Self::ScanFailed {
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(message: impl Into<String>, source: impl Into<anyhow::Error>) -> Self {
        Self::ScanFailed {
            message: message.into(),
            source: Some(source.into()),
        }
    }
}
