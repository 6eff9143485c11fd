use super::meta::{LoadingStatus, ModuleMeta, ModulePhase};
use crate::discovery::DiscoveredModule;
use serde::Serialize;

/// One discovered module as tracked by the container for the whole run
///
/// Identity and dependency edges are fixed at discovery. `status` and `phase`
/// are only written by the container.
#[derive(Debug, Clone, Serialize)]
pub struct ModuleDescriptor {
    id: String,
    name: String,
    description: String,
    type_name: String,
    dependencies: Vec<String>,
    soft_dependencies: Vec<String>,
    parents: Vec<String>,
    required: bool,
    status: LoadingStatus,
    phase: ModulePhase,
}

impl ModuleDescriptor {
    pub fn new(type_name: impl Into<String>, meta: ModuleMeta) -> Self {
        Self {
            id: meta.id,
            name: meta.name,
            description: meta.description,
            type_name: type_name.into(),
            dependencies: dedup_ordered(meta.dependencies),
            soft_dependencies: dedup_ordered(meta.soft_dependencies),
            parents: Vec::new(),
            required: meta.required,
            status: LoadingStatus::Enabled,
            phase: ModulePhase::Discovered,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Name of the type that discovery reported for this module
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn dependencies(&self) -> &[String] {
        &self.dependencies
    }

    pub fn soft_dependencies(&self) -> &[String] {
        &self.soft_dependencies
    }

    /// Modules that hard-depend on this one
    pub fn parents(&self) -> &[String] {
        &self.parents
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn status(&self) -> LoadingStatus {
        self.status
    }

    pub fn phase(&self) -> ModulePhase {
        self.phase
    }

    pub fn is_disabled(&self) -> bool {
        self.status == LoadingStatus::Disabled
    }

    pub fn is_errored(&self) -> bool {
        self.phase == ModulePhase::Errored
    }

    /// Whether the module still takes part in upcoming phases
    pub fn is_active(&self) -> bool {
        !self.is_disabled() && !self.is_errored()
    }

    pub(crate) fn add_parent(&mut self, id: &str) {
        if !self.parents.iter().any(|p| p == id) {
            self.parents.push(id.to_string());
        }
    }

    pub(crate) fn set_status(&mut self, status: LoadingStatus) {
        self.status = status;
    }

    pub(crate) fn set_phase(&mut self, phase: ModulePhase) {
        if self.phase.can_advance_to(phase) {
            self.phase = phase;
        } else {
            tracing::warn!(
                "Ignoring phase change of '{}' from {} to {}",
                self.id,
                self.phase,
                phase
            );
        }
    }
}

impl From<DiscoveredModule> for ModuleDescriptor {
    fn from(discovered: DiscoveredModule) -> Self {
        Self::new(discovered.type_name, discovered.meta)
    }
}

fn dedup_ordered(ids: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(ids.len());
    for id in ids {
        if !out.contains(&id) {
            out.push(id);
        }
    }
    out
}
