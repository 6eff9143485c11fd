use crate::error::{ModuleError, Result};
use crate::resolve::SoftDependencyPolicy;
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;

/// Header written above the status section when none is configured
pub const DEFAULT_STATUS_HEADER: &str = "ENABLED; DISABLED; FORCE_LOAD";

const DEFAULT_CONFIG_KEY: &str = "modules";

/// Settings of one container run
///
/// Validated by [`ContainerBuilder::build`](super::ContainerBuilder::build)
/// before anything is discovered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerConfig {
    /// Key of the status section in the config document
    pub module_config_key: String,
    /// Comment written at the top of the status section
    #[serde(default)]
    pub module_config_header: Option<String>,
    #[serde(default)]
    pub soft_dependency_policy: SoftDependencyPolicy,
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self::new(DEFAULT_CONFIG_KEY)
    }
}

impl ContainerConfig {
    pub fn new(module_config_key: impl Into<String>) -> Self {
        Self {
            module_config_key: module_config_key.into(),
            module_config_header: None,
            soft_dependency_policy: SoftDependencyPolicy::default(),
        }
    }

    pub fn with_header(mut self, header: impl Into<String>) -> Self {
        self.module_config_header = Some(header.into());
        self
    }

    pub fn with_soft_dependency_policy(mut self, policy: SoftDependencyPolicy) -> Self {
        self.soft_dependency_policy = policy;
        self
    }

    /// Build settings from `MODULUS_CONFIG_KEY`, `MODULUS_CONFIG_HEADER` and
    /// `MODULUS_SOFT_DEPENDENCIES`. Unset variables keep their defaults.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();
        if let Some(key) = lookup("MODULUS_CONFIG_KEY") {
            config.module_config_key = key;
        }
        if let Some(header) = lookup("MODULUS_CONFIG_HEADER") {
            config.module_config_header = Some(header);
        }
        if let Some(policy) = lookup("MODULUS_SOFT_DEPENDENCIES") {
            config.soft_dependency_policy =
                SoftDependencyPolicy::from_str(policy.trim()).map_err(|_| {
                    ModuleError::invalid_configuration(format!(
                        "Unknown soft dependency policy '{policy}', expected 'ignore' or 'fail'"
                    ))
                })?;
        }
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.module_config_key.trim().is_empty() {
            return Err(ModuleError::invalid_configuration(
                "Module config key must not be empty",
            ));
        }
        if self.module_config_key.starts_with('#') {
            return Err(ModuleError::invalid_configuration(format!(
                "Module config key '{}' would be read as a comment",
                self.module_config_key
            )));
        }
        Ok(())
    }

    /// The configured status header, or [`DEFAULT_STATUS_HEADER`]
    pub fn header(&self) -> &str {
        self.module_config_header
            .as_deref()
            .unwrap_or(DEFAULT_STATUS_HEADER)
    }
}
