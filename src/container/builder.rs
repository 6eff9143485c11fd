use super::{ContainerConfig, ModuleContainer};
use crate::config::{ConfigProvider, MemoryStore, SystemConfigProvider};
use crate::discovery::{ModuleDiscovery, ModuleRegistry};
use crate::error::{ModuleError, Result};
use crate::lifecycle::{ContainerHooks, LifecyclePhase};
use crate::loader::ModuleConstructor;
use crate::resolve::{RecursiveResolver, ResolveStrategy};

/// Builder for a [`ModuleContainer`]
///
/// Collects the collaborators of a run. Everything is checked in
/// [`build`](Self::build), so a misconfigured container never starts
/// discovering.
///
/// # Example
/// ```rust,ignore
/// let mut registry = ModuleRegistry::new();
/// registry.register::<DatabaseModule>().register::<WebModule>();
///
/// let mut container = ContainerBuilder::new()
///     .registry(registry)
///     .config_provider(SystemConfigProvider::new(JsonFileStore::new("modules.json"))?)
///     .on_enable("banner", || {
///         println!("starting modules");
///         Ok(())
///     })
///     .build()?;
/// ```
pub struct ContainerBuilder {
    discovery: Option<Box<dyn ModuleDiscovery>>,
    constructor: Option<Box<dyn ModuleConstructor>>,
    config_provider: Option<Box<dyn ConfigProvider>>,
    resolve_strategy: Option<Box<dyn ResolveStrategy>>,
    hooks: ContainerHooks,
    config: ContainerConfig,
}

impl ContainerBuilder {
    pub fn new() -> Self {
        Self {
            discovery: None,
            constructor: None,
            config_provider: None,
            resolve_strategy: None,
            hooks: ContainerHooks::new(),
            config: ContainerConfig::default(),
        }
    }

    pub fn discovery(mut self, discovery: impl ModuleDiscovery + 'static) -> Self {
        self.discovery = Some(Box::new(discovery));
        self
    }

    pub fn constructor(mut self, constructor: impl ModuleConstructor + 'static) -> Self {
        self.constructor = Some(Box::new(constructor));
        self
    }

    /// Use `registry` both to discover and to construct modules
    pub fn registry(self, registry: ModuleRegistry) -> Self {
        self.discovery(registry.clone()).constructor(registry)
    }

    /// Defaults to a provider over an in-memory document
    pub fn config_provider(mut self, provider: impl ConfigProvider + 'static) -> Self {
        self.config_provider = Some(Box::new(provider));
        self
    }

    /// Defaults to [`RecursiveResolver`] with the configured soft dependency policy
    pub fn resolve_strategy(mut self, strategy: impl ResolveStrategy + 'static) -> Self {
        self.resolve_strategy = Some(Box::new(strategy));
        self
    }

    pub fn config(mut self, config: ContainerConfig) -> Self {
        self.config = config;
        self
    }

    /// Run `hook` once before modules are pre-enabled
    pub fn on_pre_enable<F>(mut self, name: impl Into<String>, hook: F) -> Self
    where
        F: FnMut() -> anyhow::Result<()> + Send + 'static,
    {
        self.hooks.register(LifecyclePhase::PreEnable, name, hook);
        self
    }

    /// Run `hook` once before modules are enabled
    pub fn on_enable<F>(mut self, name: impl Into<String>, hook: F) -> Self
    where
        F: FnMut() -> anyhow::Result<()> + Send + 'static,
    {
        self.hooks.register(LifecyclePhase::Enable, name, hook);
        self
    }

    /// Run `hook` once before modules are post-enabled
    pub fn on_post_enable<F>(mut self, name: impl Into<String>, hook: F) -> Self
    where
        F: FnMut() -> anyhow::Result<()> + Send + 'static,
    {
        self.hooks.register(LifecyclePhase::PostEnable, name, hook);
        self
    }

    /// Validate the collected settings and create the container
    pub fn build(self) -> Result<ModuleContainer> {
        self.config.validate()?;

        let discovery = self
            .discovery
            .ok_or_else(|| ModuleError::invalid_configuration("No module discovery configured"))?;
        let constructor = self.constructor.ok_or_else(|| {
            ModuleError::invalid_configuration("No module constructor configured")
        })?;
        let config_provider = match self.config_provider {
            Some(provider) => provider,
            None => Box::new(SystemConfigProvider::new(MemoryStore::new())?),
        };
        let resolve_strategy = self.resolve_strategy.unwrap_or_else(|| {
            Box::new(RecursiveResolver::with_soft_policy(
                self.config.soft_dependency_policy,
            ))
        });

        Ok(ModuleContainer::new(
            self.config,
            discovery,
            constructor,
            config_provider,
            resolve_strategy,
            self.hooks,
        ))
    }
}

impl Default for ContainerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
