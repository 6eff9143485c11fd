use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the config layer
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A config adapter is already attached under this module id
    #[error("Module '{id}' is already attached")]
    AlreadyAttached { id: String },

    /// The module id collides with the status section key
    #[error("Module '{id}' cannot use config section '{key}', it holds the module status")]
    ReservedKey { id: String, key: String },

    #[error("Failed to access config file {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The config document root is not a JSON object
    #[error("Config root must be an object")]
    NotAnObject,

    /// A config node could not be mapped to or from its type
    #[error("Config mapping failed for {target}")]
    Mapping {
        target: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid status {value} for module '{id}'")]
    InvalidStatus { id: String, value: String },
}

/// A specialized Result type for config operations
pub type Result<T> = std::result::Result<T, ConfigError>;
