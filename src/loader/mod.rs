//! Module construction

use crate::module::{Module, ModuleDescriptor};

/// Creates module instances from their descriptors
///
/// The returned error is wrapped into `ModuleError::Construction` by the
/// container.
pub trait ModuleConstructor: Send {
    fn construct(&mut self, descriptor: &ModuleDescriptor) -> anyhow::Result<Box<dyn Module>>;
}

impl<F> ModuleConstructor for F
where
    F: FnMut(&ModuleDescriptor) -> anyhow::Result<Box<dyn Module>> + Send,
{
    fn construct(&mut self, descriptor: &ModuleDescriptor) -> anyhow::Result<Box<dyn Module>> {
        self(descriptor)
    }
}
