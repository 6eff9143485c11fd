//! Module metadata and status enums

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString};

/// Metadata a module declares about itself
///
/// This is the plain record a discovery source hands to the container. It is
/// usually generated by `#[derive(RegisterModule)]`, but can be built by hand:
///
/// ```
/// use modulus::ModuleMeta;
///
/// let meta = ModuleMeta::new("web", "Web Server")
///     .description("Serves the HTTP API")
///     .dependency("database")
///     .soft_dependency("metrics");
/// assert_eq!(meta.dependencies, vec!["database".to_string()]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleMeta {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(default)]
    pub soft_dependencies: Vec<String>,
    #[serde(default)]
    pub required: bool,
}

impl ModuleMeta {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            dependencies: Vec::new(),
            soft_dependencies: Vec::new(),
            required: false,
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Add a hard dependency. The dependency must exist and is enabled first.
    pub fn dependency(mut self, id: impl Into<String>) -> Self {
        self.dependencies.push(id.into());
        self
    }

    /// Add an ordering-only dependency
    pub fn soft_dependency(mut self, id: impl Into<String>) -> Self {
        self.soft_dependencies.push(id.into());
        self
    }

    /// Mark the module as required; it can never be disabled
    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }
}

/// Config-driven loading status of a module
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumString,
    EnumIter,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LoadingStatus {
    /// The module is enabled and should be loaded
    #[default]
    Enabled,
    /// The module is not constructed, and neither are its dependents
    Disabled,
    /// The module should be loaded regardless of disable requests
    ForceLoad,
}

/// Run-driven phase of a single module
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display, EnumString, EnumIter, Serialize,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ModulePhase {
    /// Found by discovery
    #[default]
    Discovered,
    /// Instantiated by the constructor
    Constructed,
    /// `on_enable` completed
    Enabled,
    /// Shut down after being enabled
    Disabled,
    /// Failed in some phase and was discarded
    Errored,
}

impl ModulePhase {
    /// Phases only move forward; `Disabled` and `Errored` may override any
    /// non-errored phase, and `Errored` is final.
    pub fn can_advance_to(self, next: ModulePhase) -> bool {
        match (self, next) {
            (ModulePhase::Errored, _) => false,
            (_, ModulePhase::Errored) => true,
            (ModulePhase::Disabled, _) => false,
            (_, ModulePhase::Disabled) => true,
            (current, next) => next.rank() > current.rank(),
        }
    }

    fn rank(self) -> u8 {
        match self {
            ModulePhase::Discovered => 0,
            ModulePhase::Constructed => 1,
            ModulePhase::Enabled => 2,
            ModulePhase::Disabled => 3,
            ModulePhase::Errored => 4,
        }
    }
}
