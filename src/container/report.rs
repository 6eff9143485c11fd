use crate::lifecycle::ConstructionPhase;
use crate::module::ModuleDescriptor;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// One step of the container state machine
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhaseTransition {
    pub from: ConstructionPhase,
    pub to: ConstructionPhase,
    pub at: DateTime<Utc>,
}

impl PhaseTransition {
    pub fn now(from: ConstructionPhase, to: ConstructionPhase) -> Self {
        Self {
            from,
            to,
            at: Utc::now(),
        }
    }
}

/// Snapshot of a container run
///
/// Descriptors are listed in resolution order.
#[derive(Debug, Clone, Serialize)]
pub struct ContainerReport {
    pub run_id: Uuid,
    pub phase: ConstructionPhase,
    pub transitions: Vec<PhaseTransition>,
    pub modules: Vec<ModuleDescriptor>,
}

impl ContainerReport {
    /// Ids of the modules that reached the given phase
    pub fn modules_in(&self, phase: crate::module::ModulePhase) -> Vec<&str> {
        self.modules
            .iter()
            .filter(|d| d.phase() == phase)
            .map(|d| d.id())
            .collect()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
