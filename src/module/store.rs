use super::ModuleDescriptor;
use crate::error::{ModuleError, Result};
use std::collections::HashMap;

/// Index-addressed storage for the descriptors of one run
///
/// Descriptors keep their discovery order and are addressed by index; ids map
/// to indices through a side table. The container owns the store and lends it
/// to the resolver and the cascade pass.
#[derive(Debug, Default)]
pub struct DescriptorStore {
    descriptors: Vec<ModuleDescriptor>,
    index: HashMap<String, usize>,
}

impl DescriptorStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a descriptor, rejecting duplicate ids
    pub fn insert(&mut self, descriptor: ModuleDescriptor) -> Result<usize> {
        if self.index.contains_key(descriptor.id()) {
            return Err(ModuleError::ModuleAlreadyRegistered {
                id: descriptor.id().to_string(),
                type_name: descriptor.type_name().to_string(),
            });
        }
        let idx = self.descriptors.len();
        self.index.insert(descriptor.id().to_string(), idx);
        self.descriptors.push(descriptor);
        Ok(idx)
    }

    /// Populate every descriptor's `parents` from the hard dependency edges
    ///
    /// Fails on the first hard dependency that names an unknown module.
    pub fn link_parents(&mut self) -> Result<()> {
        let mut edges = Vec::new();
        for descriptor in &self.descriptors {
            for dependency in descriptor.dependencies() {
                let child = self.index_of(dependency).ok_or_else(|| {
                    ModuleError::DependencyNotFound {
                        module: descriptor.id().to_string(),
                        type_name: descriptor.type_name().to_string(),
                        dependency: dependency.clone(),
                    }
                })?;
                edges.push((child, descriptor.id().to_string()));
            }
        }

        for (child, parent) in edges {
            self.descriptors[child].add_parent(&parent);
        }
        Ok(())
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub fn get(&self, idx: usize) -> Option<&ModuleDescriptor> {
        self.descriptors.get(idx)
    }

    pub(crate) fn get_mut(&mut self, idx: usize) -> Option<&mut ModuleDescriptor> {
        self.descriptors.get_mut(idx)
    }

    pub fn by_id(&self, id: &str) -> Option<&ModuleDescriptor> {
        self.index_of(id).and_then(|idx| self.get(idx))
    }

    /// Descriptors in discovery order
    pub fn iter(&self) -> impl Iterator<Item = &ModuleDescriptor> {
        self.descriptors.iter()
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

impl std::ops::Index<usize> for DescriptorStore {
    type Output = ModuleDescriptor;

    fn index(&self, idx: usize) -> &Self::Output {
        &self.descriptors[idx]
    }
}
