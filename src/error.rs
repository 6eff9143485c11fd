use crate::config::ConfigError;
use crate::discovery::DiscoveryError;
use crate::lifecycle::{ConstructionPhase, LifecycleError, LifecyclePhase};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ModuleError>;

#[derive(Debug, Error)]
pub enum ModuleError {
    #[error("Module discovery failed")]
    Discovery(#[from] DiscoveryError),

    #[error("Unable to register {type_name}, module id '{id}' is already registered")]
    ModuleAlreadyRegistered { id: String, type_name: String },

    #[error("Dependency '{dependency}' of module '{module}' ({type_name}) does not exist")]
    DependencyNotFound {
        module: String,
        type_name: String,
        dependency: String,
    },

    #[error("Module '{module}' ({type_name}) caused a circular dependency: {}", cycle.join(" -> "))]
    CircularDependency {
        module: String,
        type_name: String,
        cycle: Vec<String>,
    },

    #[error("Attempted to disable required module '{id}'")]
    IllegalRequiredDisable { id: String },

    #[error("Failed to construct module '{id}' ({type_name})")]
    Construction {
        id: String,
        type_name: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Config error")]
    Config(#[from] ConfigError),

    #[error("Module '{id}' failed during {phase}")]
    Lifecycle {
        id: String,
        phase: LifecyclePhase,
        #[source]
        source: LifecycleError,
    },

    #[error("Container hook '{hook}' failed during {phase}")]
    HookFailed {
        hook: String,
        phase: LifecyclePhase,
        #[source]
        source: anyhow::Error,
    },

    #[error("No modules to load after the construction phase")]
    NoModulesConstructed,

    #[error("No modules are enabled after the enable phase")]
    NoModulesReady,

    #[error("Phase check failed: expected {expected}, actual {actual}")]
    PhaseMismatch {
        expected: ConstructionPhase,
        actual: ConstructionPhase,
    },

    #[error("Invalid container configuration: {message}")]
    InvalidConfiguration { message: String },
}

impl ModuleError {
    pub fn invalid_configuration(message: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            message: message.into(),
        }
    }

    /// Errors that describe an inconsistent dependency graph. These are never
    /// isolated to a single module.
    pub fn is_resolution_error(&self) -> bool {
        matches!(
            self,
            ModuleError::ModuleAlreadyRegistered { .. }
                | ModuleError::DependencyNotFound { .. }
                | ModuleError::CircularDependency { .. }
                | ModuleError::IllegalRequiredDisable { .. }
        )
    }

    /// The module the error is attributed to, if any.
    pub fn module_id(&self) -> Option<&str> {
        match self {
            ModuleError::ModuleAlreadyRegistered { id, .. }
            | ModuleError::IllegalRequiredDisable { id }
            | ModuleError::Construction { id, .. }
            | ModuleError::Lifecycle { id, .. } => Some(id),
            ModuleError::DependencyNotFound { module, .. }
            | ModuleError::CircularDependency { module, .. } => Some(module),
            ModuleError::Config(
                ConfigError::AlreadyAttached { id } | ConfigError::ReservedKey { id, .. },
            ) => Some(id),
            _ => None,
        }
    }

    /// The error message followed by every source, joined by `": "`
    pub fn chain(&self) -> String {
        let mut message = self.to_string();
        let mut source = std::error::Error::source(self);
        while let Some(cause) = source {
            message.push_str(": ");
            message.push_str(&cause.to_string());
            source = cause.source();
        }
        message
    }
}
