use super::{DiscoveredModule, DiscoveryError, ModuleDiscovery};
use crate::loader::ModuleConstructor;
use crate::module::{Module, ModuleDescriptor, ModuleMeta, RegisterModule};
use std::any::type_name;
use std::sync::Arc;

/// Type alias for a factory producing a fresh module instance.
type FactoryFn = Arc<dyn Fn() -> anyhow::Result<Box<dyn Module>> + Send + Sync>;

#[derive(Clone)]
struct RegistryEntry {
    discovered: DiscoveredModule,
    factory: FactoryFn,
}

/// Statically populated module registry
///
/// Acts as both the discovery source and the constructor of a container.
/// Modules are discovered in registration order. Cloning is cheap and shares
/// the registered factories.
///
/// # Example
/// ```rust,ignore
/// let mut registry = ModuleRegistry::new();
/// registry
///     .register::<DatabaseModule>()
///     .register_with(|| Ok(WebModule::bind("0.0.0.0:8080")?));
/// ```
#[derive(Clone, Default)]
pub struct ModuleRegistry {
    entries: Vec<RegistryEntry>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a module type constructed through `Default`
    pub fn register<T>(&mut self) -> &mut Self
    where
        T: RegisterModule + Module + Default + 'static,
    {
        self.register_with(|| Ok(T::default()))
    }

    /// Register a module type with a custom factory
    pub fn register_with<T, F>(&mut self, factory: F) -> &mut Self
    where
        T: RegisterModule + Module + 'static,
        F: Fn() -> anyhow::Result<T> + Send + Sync + 'static,
    {
        let factory: FactoryFn = Arc::new(move || {
            let instance = factory()?;
            Ok(Box::new(instance) as Box<dyn Module>)
        });
        self.entries.push(RegistryEntry {
            discovered: DiscoveredModule::of::<T>(),
            factory,
        });
        self
    }

    /// Register a module from hand-written metadata
    pub fn register_meta<T, F>(&mut self, meta: ModuleMeta, factory: F) -> &mut Self
    where
        T: Module + 'static,
        F: Fn() -> anyhow::Result<T> + Send + Sync + 'static,
    {
        let factory: FactoryFn = Arc::new(move || {
            let instance = factory()?;
            Ok(Box::new(instance) as Box<dyn Module>)
        });
        self.entries.push(RegistryEntry {
            discovered: DiscoveredModule::new(type_name::<T>(), meta),
            factory,
        });
        self
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.iter().any(|e| e.discovered.meta.id == id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl ModuleDiscovery for ModuleRegistry {
    fn discover(&mut self) -> Result<Vec<DiscoveredModule>, DiscoveryError> {
        Ok(self.entries.iter().map(|e| e.discovered.clone()).collect())
    }
}

impl ModuleConstructor for ModuleRegistry {
    fn construct(&mut self, descriptor: &ModuleDescriptor) -> anyhow::Result<Box<dyn Module>> {
        let entry = self
            .entries
            .iter()
            .find(|e| e.discovered.meta.id == descriptor.id())
            .ok_or_else(|| anyhow::anyhow!("No factory registered for module '{}'", descriptor.id()))?;
        (entry.factory)()
    }
}
