//! Container and callback phases

use crate::module::Module;
use serde::Serialize;
use strum_macros::{Display, EnumIter, EnumString};

/// Phase of one orchestration run
///
/// Only advances forward, one step per transition. `Errored` is reachable from
/// any phase and is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, Serialize)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConstructionPhase {
    /// The container has been built and is ready to discover modules
    Initialized,
    /// Discovery, resolution and status loading are in progress
    Discovering,
    /// All modules are known and ordered, nothing has been constructed yet
    Discovered,
    /// Modules are being constructed and driven through their callbacks
    Enabling,
    /// Every surviving module has been enabled
    Enabled,
    /// The run hit an unrecoverable error and was abandoned
    Errored,
}

impl ConstructionPhase {
    /// The phase that follows this one, or `None` for terminal phases
    pub fn next(self) -> Option<Self> {
        match self {
            ConstructionPhase::Initialized => Some(ConstructionPhase::Discovering),
            ConstructionPhase::Discovering => Some(ConstructionPhase::Discovered),
            ConstructionPhase::Discovered => Some(ConstructionPhase::Enabling),
            ConstructionPhase::Enabling => Some(ConstructionPhase::Enabled),
            ConstructionPhase::Enabled | ConstructionPhase::Errored => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        self.next().is_none()
    }
}

/// A per-module callback the container drives in resolution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, Serialize)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LifecyclePhase {
    PreEnable,
    CheckExternalDependencies,
    Enable,
    PostEnable,
    Disable,
}

impl LifecyclePhase {
    /// Run this phase's callback on `module`
    pub fn invoke(self, module: &mut dyn Module) -> super::Result<()> {
        match self {
            LifecyclePhase::PreEnable => module.pre_enable(),
            LifecyclePhase::CheckExternalDependencies => module.check_external_dependencies(),
            LifecyclePhase::Enable => module.on_enable(),
            LifecyclePhase::PostEnable => module.post_enable(),
            LifecyclePhase::Disable => module.on_disable(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use strum::IntoEnumIterator;

    #[test]
    fn test_construction_phase_walks_forward() {
        let mut phase = ConstructionPhase::Initialized;
        let mut walked = vec![phase];
        while let Some(next) = phase.next() {
            walked.push(next);
            phase = next;
        }
        assert_eq!(
            walked,
            vec![
                ConstructionPhase::Initialized,
                ConstructionPhase::Discovering,
                ConstructionPhase::Discovered,
                ConstructionPhase::Enabling,
                ConstructionPhase::Enabled,
            ]
        );
    }

    #[test]
    fn test_errored_is_terminal() {
        assert!(ConstructionPhase::Errored.is_terminal());
        assert!(ConstructionPhase::Enabled.is_terminal());
        assert!(!ConstructionPhase::Discovered.is_terminal());
    }

    #[test]
    fn test_phase_names() {
        assert_eq!(ConstructionPhase::Discovering.to_string(), "DISCOVERING");
        assert_eq!(
            LifecyclePhase::CheckExternalDependencies.to_string(),
            "CHECK_EXTERNAL_DEPENDENCIES"
        );
        assert_eq!(
            LifecyclePhase::from_str("POST_ENABLE").unwrap(),
            LifecyclePhase::PostEnable
        );
        assert_eq!(LifecyclePhase::iter().count(), 5);
    }
}
