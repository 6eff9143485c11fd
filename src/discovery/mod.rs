//! Module discovery
//!
//! A discovery source enumerates the modules available to a container. The
//! container only sees plain metadata records; how they are found (a static
//! registry, a plugin directory, generated code) is up to the source.

mod error;
mod registry;

pub use error::DiscoveryError;
pub use registry::ModuleRegistry;

use crate::module::{ModuleMeta, RegisterModule};
use std::any::type_name;

/// A module reported by a discovery source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredModule {
    /// Name of the implementing type, used in diagnostics
    pub type_name: String,
    pub meta: ModuleMeta,
}

impl DiscoveredModule {
    pub fn new(type_name: impl Into<String>, meta: ModuleMeta) -> Self {
        Self {
            type_name: type_name.into(),
            meta,
        }
    }

    /// Discovered record for a type carrying its own metadata
    pub fn of<T: RegisterModule>() -> Self {
        Self::new(type_name::<T>(), T::module_meta())
    }
}

/// Source of the modules a container runs
///
/// Returning an empty list is valid; the container will later fail with
/// `NoModulesConstructed`.
pub trait ModuleDiscovery: Send {
    fn discover(&mut self) -> Result<Vec<DiscoveredModule>, DiscoveryError>;
}

impl<F> ModuleDiscovery for F
where
    F: FnMut() -> Result<Vec<DiscoveredModule>, DiscoveryError> + Send,
{
    fn discover(&mut self) -> Result<Vec<DiscoveredModule>, DiscoveryError> {
        self()
    }
}
