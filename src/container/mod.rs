//! Module container
//!
//! The container owns every descriptor and module instance of one run and
//! drives them through discovery, construction and the lifecycle callbacks.
//!
//! ```text
//! INITIALIZED -> DISCOVERING -> DISCOVERED -> ENABLING -> ENABLED
//!      \              \              \            \
//!       +--------------+--------------+------------+--> ERRORED
//! ```
//!
//! [`ModuleContainer::discover`] walks the first half,
//! [`ModuleContainer::load_modules`] the second. A module that fails is
//! isolated: it is marked errored, disabled, and its dependents are disabled
//! with it. Any other failure moves the run to `ERRORED`, after which every
//! entry point refuses to run.

mod builder;
mod report;
mod settings;

pub use builder::ContainerBuilder;
pub use report::{ContainerReport, PhaseTransition};
pub use settings::{ContainerConfig, DEFAULT_STATUS_HEADER};

use crate::config::{ConfigAdapter, ConfigProvider};
use crate::discovery::ModuleDiscovery;
use crate::error::{ModuleError, Result};
use crate::lifecycle::{ConstructionPhase, ContainerHooks, LifecyclePhase};
use crate::loader::ModuleConstructor;
use crate::module::{DescriptorStore, LoadingStatus, Module, ModuleDescriptor, ModulePhase};
use crate::resolve::{ResolveStrategy, propagate_disable};
use std::collections::BTreeMap;
use std::sync::Arc;
use uuid::Uuid;

/// A constructed module and the config adapter it exposed at construction
struct LoadedModule {
    instance: Box<dyn Module>,
    config_adapter: Option<Arc<dyn ConfigAdapter>>,
}

/// Orchestrates one run over a set of modules
///
/// # Example
/// ```rust,ignore
/// let mut container = ContainerBuilder::new().registry(registry).build()?;
///
/// container.discover()?;
/// container.load_modules(false)?;
///
/// // ... application runs ...
/// container.shutdown()?;
/// ```
pub struct ModuleContainer {
    run_id: Uuid,
    phase: ConstructionPhase,
    transitions: Vec<PhaseTransition>,
    config: ContainerConfig,
    discovery: Box<dyn ModuleDiscovery>,
    constructor: Box<dyn ModuleConstructor>,
    config_provider: Box<dyn ConfigProvider>,
    resolver: Box<dyn ResolveStrategy>,
    hooks: ContainerHooks,
    store: DescriptorStore,
    /// Store indices in resolution order
    order: Vec<usize>,
    /// Instances addressed by store index
    modules: Vec<Option<LoadedModule>>,
}

impl ModuleContainer {
    pub(crate) fn new(
        config: ContainerConfig,
        discovery: Box<dyn ModuleDiscovery>,
        constructor: Box<dyn ModuleConstructor>,
        config_provider: Box<dyn ConfigProvider>,
        resolver: Box<dyn ResolveStrategy>,
        hooks: ContainerHooks,
    ) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            phase: ConstructionPhase::Initialized,
            transitions: Vec::new(),
            config,
            discovery,
            constructor,
            config_provider,
            resolver,
            hooks,
            store: DescriptorStore::new(),
            order: Vec::new(),
            modules: Vec::new(),
        }
    }

    pub fn builder() -> ContainerBuilder {
        ContainerBuilder::new()
    }

    /// Discover, order and apply the configured loading status to every module
    ///
    /// Duplicate ids, missing dependencies, cycles and attempts to disable a
    /// required module are fatal.
    pub fn discover(&mut self) -> Result<()> {
        let span = tracing::info_span!("discover", run_id = %self.run_id);
        let _enter = span.enter();

        self.check_phase(ConstructionPhase::Initialized)?;
        self.transition(ConstructionPhase::Discovering);

        match self.discover_modules() {
            Ok(()) => {
                self.transition(ConstructionPhase::Discovered);
                Ok(())
            }
            Err(e) => self.exit_with_error(e),
        }
    }

    /// Construct every enabled module and run the lifecycle callbacks
    ///
    /// With `fail_on_error` the first module failure aborts the run. Without
    /// it the failing module and its dependents are disabled and the run
    /// carries on with the rest. A failing required module always aborts.
    pub fn load_modules(&mut self, fail_on_error: bool) -> Result<()> {
        let span = tracing::info_span!("load_modules", run_id = %self.run_id, fail_on_error);
        let _enter = span.enter();

        self.check_phase(ConstructionPhase::Discovered)?;
        self.transition(ConstructionPhase::Enabling);

        match self.enable_modules(fail_on_error) {
            Ok(()) => {
                self.transition(ConstructionPhase::Enabled);
                tracing::info!(
                    "Container ready ({} modules enabled, {} disabled)",
                    self.enabled_count(),
                    self.disabled_modules().len()
                );
                Ok(())
            }
            Err(e) => self.exit_with_error(e),
        }
    }

    /// Call `on_disable` on every enabled module in reverse resolution order
    ///
    /// Failures are logged and skipped.
    pub fn shutdown(&mut self) -> Result<()> {
        let span = tracing::info_span!("shutdown", run_id = %self.run_id);
        let _enter = span.enter();

        self.check_phase(ConstructionPhase::Enabled)?;
        tracing::info!("Disabling modules...");

        let mut disabled = 0;
        for pos in (0..self.order.len()).rev() {
            let idx = self.order[pos];
            if self.store[idx].phase() == ModulePhase::Enabled {
                self.release(idx, ModulePhase::Disabled);
                disabled += 1;
            }
        }

        tracing::info!("Shutdown complete ({} modules disabled)", disabled);
        Ok(())
    }

    /// Save the in-memory configuration and push it back into the modules
    pub fn refresh_system_config(&mut self) -> Result<()> {
        Ok(self.config_provider.save(true)?)
    }

    /// Re-read the persisted configuration without touching the modules
    pub fn reload_system_config(&mut self) -> Result<()> {
        Ok(self.config_provider.reload()?)
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn phase(&self) -> ConstructionPhase {
        self.phase
    }

    pub fn config(&self) -> &ContainerConfig {
        &self.config
    }

    pub fn config_provider(&self) -> &dyn ConfigProvider {
        self.config_provider.as_ref()
    }

    pub fn transitions(&self) -> &[PhaseTransition] {
        &self.transitions
    }

    pub fn descriptor(&self, id: &str) -> Option<&ModuleDescriptor> {
        self.store.by_id(id)
    }

    /// Descriptors in resolution order; empty before discovery
    pub fn descriptors(&self) -> impl Iterator<Item = &ModuleDescriptor> {
        self.order.iter().map(move |&idx| &self.store[idx])
    }

    /// The live instance of module `id`, if it was constructed and not discarded
    pub fn module(&self, id: &str) -> Option<&dyn Module> {
        let idx = self.store.index_of(id)?;
        let loaded = self.modules.get(idx)?.as_ref()?;
        Some(loaded.instance.as_ref())
    }

    pub fn module_mut(&mut self, id: &str) -> Option<&mut dyn Module> {
        let idx = self.store.index_of(id)?;
        let loaded = self.modules.get_mut(idx)?.as_mut()?;
        Some(loaded.instance.as_mut())
    }

    pub fn is_enabled(&self, id: &str) -> bool {
        self.store
            .by_id(id)
            .is_some_and(|d| d.phase() == ModulePhase::Enabled)
    }

    /// Ids of every disabled module, in resolution order
    pub fn disabled_modules(&self) -> Vec<&str> {
        self.descriptors()
            .filter(|d| d.is_disabled())
            .map(|d| d.id())
            .collect()
    }

    pub fn report(&self) -> ContainerReport {
        ContainerReport {
            run_id: self.run_id,
            phase: self.phase,
            transitions: self.transitions.clone(),
            modules: self.descriptors().cloned().collect(),
        }
    }

    fn discover_modules(&mut self) -> Result<()> {
        tracing::info!("Discovering modules...");

        let discovered = self.discovery.discover()?;
        for module in discovered {
            let descriptor = ModuleDescriptor::from(module);
            tracing::debug!("Discovered: {} ({})", descriptor.id(), descriptor.type_name());
            self.store.insert(descriptor)?;
        }
        self.store.link_parents()?;

        self.order = self.resolver.resolve(&self.store)?;

        let optional: Vec<&ModuleDescriptor> = self
            .order
            .iter()
            .map(|&idx| &self.store[idx])
            .filter(|d| !d.is_required())
            .collect();
        self.config_provider.attach_status_config(
            &optional,
            &self.config.module_config_key,
            self.config.header(),
        )?;

        let overrides = self.config_provider.status_overrides()?;
        self.apply_status_overrides(overrides)?;
        self.cascade()?;

        tracing::info!(
            "Discovery complete ({} modules, {} disabled)",
            self.store.len(),
            self.disabled_modules().len()
        );
        Ok(())
    }

    fn apply_status_overrides(&mut self, overrides: BTreeMap<String, LoadingStatus>) -> Result<()> {
        for (id, status) in overrides {
            let Some(idx) = self.store.index_of(&id) else {
                tracing::warn!("Ignoring status {} for unknown module '{}'", status, id);
                continue;
            };

            if self.store[idx].is_required() {
                if status == LoadingStatus::Disabled {
                    return Err(ModuleError::IllegalRequiredDisable { id });
                }
                continue;
            }

            if status != LoadingStatus::Enabled {
                tracing::info!("Module '{}' set to {} by config", id, status);
            }
            if let Some(descriptor) = self.store.get_mut(idx) {
                descriptor.set_status(status);
            }
        }
        Ok(())
    }

    fn enable_modules(&mut self, fail_on_error: bool) -> Result<()> {
        self.construct_modules(fail_on_error)?;
        self.attach_configs(fail_on_error)?;

        self.hooks.call(LifecyclePhase::PreEnable)?;
        self.call_phase(LifecyclePhase::PreEnable, fail_on_error)?;

        self.cascade()?;
        self.call_phase(LifecyclePhase::CheckExternalDependencies, fail_on_error)?;

        self.cascade()?;
        self.hooks.call(LifecyclePhase::Enable)?;
        self.call_phase(LifecyclePhase::Enable, fail_on_error)?;

        self.cascade()?;
        self.hooks.call(LifecyclePhase::PostEnable)?;
        self.call_phase(LifecyclePhase::PostEnable, fail_on_error)?;

        if self.enabled_count() == 0 {
            return Err(ModuleError::NoModulesReady);
        }
        Ok(())
    }

    fn construct_modules(&mut self, fail_on_error: bool) -> Result<()> {
        tracing::info!("Constructing modules...");
        self.modules = std::iter::repeat_with(|| None)
            .take(self.store.len())
            .collect();

        for pos in 0..self.order.len() {
            let idx = self.order[pos];
            let descriptor = &self.store[idx];
            if descriptor.is_disabled() {
                tracing::debug!("Skipping disabled module: {}", descriptor.id());
                continue;
            }

            match self.constructor.construct(descriptor) {
                Ok(instance) => {
                    tracing::debug!("Constructed: {}", descriptor.id());
                    let config_adapter = instance.config_adapter();
                    self.modules[idx] = Some(LoadedModule {
                        instance,
                        config_adapter,
                    });
                    self.set_module_phase(idx, ModulePhase::Constructed);
                }
                Err(source) => {
                    let err = ModuleError::Construction {
                        id: descriptor.id().to_string(),
                        type_name: descriptor.type_name().to_string(),
                        source,
                    };
                    self.module_error(idx, fail_on_error, err)?;
                }
            }
        }

        let constructed = self.modules.iter().flatten().count();
        if constructed == 0 {
            return Err(ModuleError::NoModulesConstructed);
        }
        tracing::info!("Construction complete ({} modules constructed)", constructed);
        Ok(())
    }

    fn attach_configs(&mut self, fail_on_error: bool) -> Result<()> {
        for pos in 0..self.order.len() {
            let idx = self.order[pos];
            let Some(adapter) = self.modules[idx]
                .as_ref()
                .and_then(|loaded| loaded.config_adapter.clone())
            else {
                continue;
            };

            let descriptor = &self.store[idx];
            let header = Some(descriptor.description()).filter(|d| !d.is_empty());
            let attached =
                self.config_provider
                    .attach_component_config(descriptor.id(), adapter, header);
            if let Err(e) = attached {
                self.module_error(idx, fail_on_error, e.into())?;
            }
        }

        self.config_provider.create_default_configs()?;
        Ok(())
    }

    /// Run `phase` on every module still taking part in the run
    fn call_phase(&mut self, phase: LifecyclePhase, fail_on_error: bool) -> Result<()> {
        tracing::info!("Calling {} on modules...", phase);

        let mut called = 0;
        for pos in 0..self.order.len() {
            let idx = self.order[pos];
            if !self.store[idx].is_active() {
                continue;
            }
            let Some(loaded) = self.modules[idx].as_mut() else {
                continue;
            };

            let id = self.store[idx].id().to_string();
            tracing::debug!("{}: {}", phase, id);
            let result = phase.invoke(loaded.instance.as_mut());
            called += 1;

            match result {
                Ok(()) if phase == LifecyclePhase::Enable => {
                    self.set_module_phase(idx, ModulePhase::Enabled);
                }
                Ok(()) => {}
                Err(source) => {
                    let err = ModuleError::Lifecycle { id, phase, source };
                    self.module_error(idx, fail_on_error, err)?;
                }
            }
        }

        tracing::info!("{} complete ({} modules called)", phase, called);
        Ok(())
    }

    /// Disable the dependents of every disabled module and drop their instances
    fn cascade(&mut self) -> Result<()> {
        let disabled = propagate_disable(&mut self.store, &self.order)?;
        for id in disabled {
            if let Some(idx) = self.store.index_of(&id) {
                self.release(idx, ModulePhase::Disabled);
            }
        }
        Ok(())
    }

    /// Isolate a failed module, or hand the error back when it must abort the run
    fn module_error(&mut self, idx: usize, fail_on_error: bool, err: ModuleError) -> Result<()> {
        self.release(idx, ModulePhase::Errored);
        if !self.store[idx].is_errored() {
            self.set_module_phase(idx, ModulePhase::Errored);
        }

        let descriptor = &self.store[idx];
        if descriptor.is_required() {
            tracing::error!("Required module '{}' failed", descriptor.id());
            return Err(err);
        }

        tracing::warn!("Module '{}' disabled: {}", descriptor.id(), err.chain());
        if let Some(descriptor) = self.store.get_mut(idx) {
            descriptor.set_status(LoadingStatus::Disabled);
        }

        if fail_on_error {
            return Err(err);
        }
        self.cascade()
    }

    /// Drop the instance at `idx`, calling `on_disable` first if it was enabled
    fn release(&mut self, idx: usize, phase: ModulePhase) {
        let Some(mut loaded) = self.modules.get_mut(idx).and_then(Option::take) else {
            return;
        };

        if self.store[idx].phase() == ModulePhase::Enabled {
            let id = self.store[idx].id();
            tracing::debug!("Disabling: {}", id);
            if let Err(e) = LifecyclePhase::Disable.invoke(loaded.instance.as_mut()) {
                tracing::warn!("{} failed for {}: {}", LifecyclePhase::Disable, id, e);
            }
            self.set_module_phase(idx, phase);
        }
    }

    fn set_module_phase(&mut self, idx: usize, phase: ModulePhase) {
        if let Some(descriptor) = self.store.get_mut(idx) {
            descriptor.set_phase(phase);
        }
    }

    fn enabled_count(&self) -> usize {
        self.store
            .iter()
            .filter(|d| d.phase() == ModulePhase::Enabled)
            .count()
    }

    fn check_phase(&self, expected: ConstructionPhase) -> Result<()> {
        if self.phase != expected {
            tracing::error!(
                "Phase check failed! Expected: {}, Actual: {}",
                expected,
                self.phase
            );
            return Err(ModuleError::PhaseMismatch {
                expected,
                actual: self.phase,
            });
        }
        Ok(())
    }

    fn transition(&mut self, to: ConstructionPhase) {
        tracing::debug!("Container phase {} -> {}", self.phase, to);
        self.transitions.push(PhaseTransition::now(self.phase, to));
        self.phase = to;
    }

    /// Abandon the run: tear down enabled modules and enter `ERRORED`
    fn exit_with_error<T>(&mut self, err: ModuleError) -> Result<T> {
        tracing::error!("Container run failed: {}", err.chain());

        for pos in (0..self.order.len()).rev() {
            let idx = self.order[pos];
            if self.store[idx].phase() == ModulePhase::Enabled {
                self.release(idx, ModulePhase::Errored);
            }
        }
        self.modules.clear();

        self.transition(ConstructionPhase::Errored);
        Err(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{MemoryStore, SystemConfigProvider, TypedConfigAdapter};
    use crate::discovery::{DiscoveredModule, DiscoveryError, ModuleRegistry};
    use crate::lifecycle::LifecycleError;
    use crate::module::ModuleMeta;
    use serde::{Deserialize, Serialize};
    use serde_json::json;
    use std::sync::Mutex;

    type CallLog = Arc<Mutex<Vec<String>>>;

    /// Module that records every callback as `id:PHASE`
    struct Recorder {
        id: String,
        log: CallLog,
        fail: Option<LifecyclePhase>,
        adapter: Option<Arc<dyn ConfigAdapter>>,
    }

    impl Recorder {
        fn step(&mut self, phase: LifecyclePhase) -> crate::lifecycle::Result<()> {
            self.log.lock().unwrap().push(format!("{}:{}", self.id, phase));
            if self.fail == Some(phase) {
                return Err(LifecycleError::loading_failed(format!("{} refused", self.id)));
            }
            Ok(())
        }
    }

    impl Module for Recorder {
        fn check_external_dependencies(&mut self) -> crate::lifecycle::Result<()> {
            self.step(LifecyclePhase::CheckExternalDependencies)
        }

        fn pre_enable(&mut self) -> crate::lifecycle::Result<()> {
            self.step(LifecyclePhase::PreEnable)
        }

        fn on_enable(&mut self) -> crate::lifecycle::Result<()> {
            self.step(LifecyclePhase::Enable)
        }

        fn post_enable(&mut self) -> crate::lifecycle::Result<()> {
            self.step(LifecyclePhase::PostEnable)
        }

        fn on_disable(&mut self) -> crate::lifecycle::Result<()> {
            self.step(LifecyclePhase::Disable)
        }

        fn config_adapter(&self) -> Option<Arc<dyn ConfigAdapter>> {
            self.adapter.clone()
        }
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    #[serde(default)]
    struct WebConfig {
        port: u16,
    }

    impl Default for WebConfig {
        fn default() -> Self {
            Self { port: 8080 }
        }
    }

    #[derive(Default)]
    struct Harness {
        registry: ModuleRegistry,
        log: CallLog,
    }

    impl Harness {
        fn module(&mut self, meta: ModuleMeta) -> &mut Self {
            self.record(meta, None, None)
        }

        fn failing(&mut self, meta: ModuleMeta, phase: LifecyclePhase) -> &mut Self {
            self.record(meta, Some(phase), None)
        }

        fn configured(&mut self, meta: ModuleMeta, adapter: Arc<dyn ConfigAdapter>) -> &mut Self {
            self.record(meta, None, Some(adapter))
        }

        fn unconstructible(&mut self, meta: ModuleMeta) -> &mut Self {
            self.registry
                .register_meta::<Recorder, _>(meta, || -> anyhow::Result<Recorder> {
                    anyhow::bail!("no database driver")
                });
            self
        }

        fn record(
            &mut self,
            meta: ModuleMeta,
            fail: Option<LifecyclePhase>,
            adapter: Option<Arc<dyn ConfigAdapter>>,
        ) -> &mut Self {
            let log = self.log.clone();
            let id = meta.id.clone();
            self.registry.register_meta::<Recorder, _>(meta, move || {
                Ok(Recorder {
                    id: id.clone(),
                    log: log.clone(),
                    fail,
                    adapter: adapter.clone(),
                })
            });
            self
        }

        fn builder(&self) -> ContainerBuilder {
            ContainerBuilder::new().registry(self.registry.clone())
        }

        fn build(&self) -> ModuleContainer {
            self.builder().build().unwrap()
        }

        fn calls(&self) -> Vec<String> {
            self.log.lock().unwrap().clone()
        }

        fn calls_of(&self, id: &str) -> Vec<String> {
            let prefix = format!("{id}:");
            self.calls()
                .into_iter()
                .filter(|call| call.starts_with(&prefix))
                .collect()
        }
    }

    fn meta(id: &str) -> ModuleMeta {
        ModuleMeta::new(id, id)
    }

    fn phase_of(container: &ModuleContainer, id: &str) -> ModulePhase {
        container.descriptor(id).unwrap().phase()
    }

    fn run(container: &mut ModuleContainer, fail_on_error: bool) -> Result<()> {
        container.discover()?;
        container.load_modules(fail_on_error)
    }

    #[test]
    fn test_full_run_calls_every_phase_in_order() {
        let mut harness = Harness::default();
        harness
            .module(meta("web").dependency("db"))
            .module(meta("db"));
        let mut container = harness.build();

        run(&mut container, false).unwrap();

        assert_eq!(container.phase(), ConstructionPhase::Enabled);
        assert_eq!(
            harness.calls(),
            vec![
                "db:PRE_ENABLE",
                "web:PRE_ENABLE",
                "db:CHECK_EXTERNAL_DEPENDENCIES",
                "web:CHECK_EXTERNAL_DEPENDENCIES",
                "db:ENABLE",
                "web:ENABLE",
                "db:POST_ENABLE",
                "web:POST_ENABLE",
            ]
        );
        assert!(container.is_enabled("db"));
        assert!(container.is_enabled("web"));
        assert!(container.module("web").is_some());
        assert_eq!(
            container.descriptors().map(|d| d.id()).collect::<Vec<_>>(),
            vec!["db", "web"]
        );
    }

    #[test]
    fn test_transitions_are_recorded() {
        let mut harness = Harness::default();
        harness.module(meta("a"));
        let mut container = harness.build();

        run(&mut container, false).unwrap();

        let steps: Vec<_> = container
            .transitions()
            .iter()
            .map(|t| (t.from, t.to))
            .collect();
        assert_eq!(
            steps,
            vec![
                (ConstructionPhase::Initialized, ConstructionPhase::Discovering),
                (ConstructionPhase::Discovering, ConstructionPhase::Discovered),
                (ConstructionPhase::Discovered, ConstructionPhase::Enabling),
                (ConstructionPhase::Enabling, ConstructionPhase::Enabled),
            ]
        );
        assert!(container.transitions().windows(2).all(|w| w[0].at <= w[1].at));
    }

    #[test]
    fn test_failure_is_isolated_without_fail_on_error() {
        let mut harness = Harness::default();
        harness
            .module(meta("a"))
            .failing(meta("b"), LifecyclePhase::Enable)
            .module(meta("c"));
        let mut container = harness.build();

        run(&mut container, false).unwrap();

        assert_eq!(container.phase(), ConstructionPhase::Enabled);
        assert_eq!(phase_of(&container, "a"), ModulePhase::Enabled);
        assert_eq!(phase_of(&container, "b"), ModulePhase::Errored);
        assert_eq!(phase_of(&container, "c"), ModulePhase::Enabled);
        assert_eq!(container.disabled_modules(), vec!["b"]);
        assert!(container.module("b").is_none());
        assert!(!harness.calls().contains(&"b:POST_ENABLE".to_string()));
    }

    #[test]
    fn test_failure_aborts_with_fail_on_error() {
        let mut harness = Harness::default();
        harness
            .module(meta("a"))
            .failing(meta("b"), LifecyclePhase::Enable)
            .module(meta("c"));
        let mut container = harness.build();

        let err = run(&mut container, true).unwrap_err();

        assert!(matches!(err, ModuleError::Lifecycle { ref id, phase: LifecyclePhase::Enable, .. } if id == "b"));
        assert_eq!(container.phase(), ConstructionPhase::Errored);
        assert!(!harness.calls().contains(&"c:ENABLE".to_string()));
        // "a" was already enabled and gets torn down
        assert_eq!(harness.calls_of("a").last().unwrap(), "a:DISABLE");
        assert_eq!(phase_of(&container, "a"), ModulePhase::Errored);
    }

    #[test]
    fn test_empty_discovery_fails_before_any_callback() {
        let harness = Harness::default();
        let mut container = harness.build();

        container.discover().unwrap();
        let err = container.load_modules(false).unwrap_err();

        assert!(matches!(err, ModuleError::NoModulesConstructed));
        assert_eq!(container.phase(), ConstructionPhase::Errored);
        assert!(harness.calls().is_empty());
    }

    #[test]
    fn test_failed_dependency_skips_dependents_in_same_phase() {
        let mut harness = Harness::default();
        harness
            .failing(meta("db"), LifecyclePhase::PreEnable)
            .module(meta("web").dependency("db"))
            .module(meta("api").dependency("web"))
            .module(meta("cache"));
        let mut container = harness.build();

        run(&mut container, false).unwrap();

        assert_eq!(harness.calls_of("db"), vec!["db:PRE_ENABLE"]);
        assert!(harness.calls_of("web").is_empty());
        assert!(harness.calls_of("api").is_empty());
        assert_eq!(container.disabled_modules(), vec!["db", "web", "api"]);
        assert_eq!(phase_of(&container, "web"), ModulePhase::Constructed);
        assert!(container.is_enabled("cache"));
    }

    #[test]
    fn test_construction_failure_is_isolated() {
        let mut harness = Harness::default();
        harness
            .unconstructible(meta("db"))
            .module(meta("web").dependency("db"))
            .module(meta("cache"));
        let mut container = harness.build();

        run(&mut container, false).unwrap();

        assert_eq!(phase_of(&container, "db"), ModulePhase::Errored);
        assert!(container.descriptor("web").unwrap().is_disabled());
        assert!(harness.calls_of("web").is_empty());
        assert!(container.is_enabled("cache"));
    }

    #[test]
    fn test_construction_failure_aborts_with_fail_on_error() {
        let mut harness = Harness::default();
        harness.module(meta("cache")).unconstructible(meta("db"));
        let mut container = harness.build();

        let err = run(&mut container, true).unwrap_err();

        match &err {
            ModuleError::Construction { id, .. } => assert_eq!(id, "db"),
            other => panic!("expected construction error, got {other:?}"),
        }
        assert!(err.chain().ends_with("no database driver"));
        assert!(harness.calls().is_empty());
    }

    #[test]
    fn test_required_module_failure_is_always_fatal() {
        let mut harness = Harness::default();
        harness
            .failing(meta("core").required(true), LifecyclePhase::CheckExternalDependencies)
            .module(meta("extra"));
        let mut container = harness.build();

        let err = run(&mut container, false).unwrap_err();

        assert_eq!(err.module_id(), Some("core"));
        assert_eq!(container.phase(), ConstructionPhase::Errored);
        assert_eq!(phase_of(&container, "core"), ModulePhase::Errored);
        assert!(!container.descriptor("core").unwrap().is_disabled());
    }

    #[test]
    fn test_no_enabled_module_fails_with_no_modules_ready() {
        let mut harness = Harness::default();
        harness
            .failing(meta("a"), LifecyclePhase::Enable)
            .failing(meta("b"), LifecyclePhase::PreEnable);
        let mut container = harness.build();

        let err = run(&mut container, false).unwrap_err();

        assert!(matches!(err, ModuleError::NoModulesReady));
        assert_eq!(container.phase(), ConstructionPhase::Errored);
    }

    #[test]
    fn test_all_modules_failing_pre_enable_never_enable() {
        let mut harness = Harness::default();
        harness
            .failing(meta("a"), LifecyclePhase::PreEnable)
            .failing(meta("b").dependency("a"), LifecyclePhase::PreEnable)
            .failing(meta("c"), LifecyclePhase::PreEnable);
        let mut container = harness.build();

        let err = run(&mut container, false).unwrap_err();

        assert!(matches!(err, ModuleError::NoModulesReady));
        assert_eq!(container.phase(), ConstructionPhase::Errored);
        assert!(!harness.calls().iter().any(|call| call.ends_with(":ENABLE")));
        assert!(!harness.calls().iter().any(|call| call.ends_with(":CHECK_EXTERNAL_DEPENDENCIES")));
    }

    #[test]
    fn test_post_enable_failure_tears_down_dependents() {
        let mut harness = Harness::default();
        harness
            .failing(meta("db"), LifecyclePhase::PostEnable)
            .module(meta("web").dependency("db"))
            .module(meta("cache"));
        let mut container = harness.build();

        run(&mut container, false).unwrap();

        assert_eq!(
            harness.calls_of("db"),
            vec![
                "db:PRE_ENABLE",
                "db:CHECK_EXTERNAL_DEPENDENCIES",
                "db:ENABLE",
                "db:POST_ENABLE",
                "db:DISABLE",
            ]
        );
        assert_eq!(harness.calls_of("web").last().unwrap(), "web:DISABLE");
        assert_eq!(phase_of(&container, "db"), ModulePhase::Errored);
        assert_eq!(phase_of(&container, "web"), ModulePhase::Disabled);
        assert!(container.is_enabled("cache"));
    }

    #[test]
    fn test_config_status_disables_module_and_dependents() {
        let store = MemoryStore::new();
        store.set("modules", json!({"db": "DISABLED"}));

        let mut harness = Harness::default();
        harness
            .module(meta("db"))
            .module(meta("web").dependency("db"))
            .module(meta("cache").soft_dependency("db"));
        let mut container = harness
            .builder()
            .config_provider(SystemConfigProvider::new(store).unwrap())
            .build()
            .unwrap();

        container.discover().unwrap();
        assert_eq!(container.disabled_modules(), vec!["db", "web"]);

        container.load_modules(false).unwrap();
        assert!(harness.calls_of("db").is_empty());
        assert!(harness.calls_of("web").is_empty());
        assert!(container.is_enabled("cache"));
    }

    #[test]
    fn test_config_cannot_disable_required_module() {
        let store = MemoryStore::new();
        store.set("modules", json!({"core": "DISABLED"}));

        let mut harness = Harness::default();
        harness.module(meta("core").required(true));
        let mut container = harness
            .builder()
            .config_provider(SystemConfigProvider::new(store).unwrap())
            .build()
            .unwrap();

        let err = container.discover().unwrap_err();
        assert!(matches!(err, ModuleError::IllegalRequiredDisable { ref id } if id == "core"));
        assert_eq!(container.phase(), ConstructionPhase::Errored);
    }

    #[test]
    fn test_cascade_into_required_module_is_fatal() {
        let store = MemoryStore::new();
        store.set("modules", json!({"db": "DISABLED"}));

        let mut harness = Harness::default();
        harness
            .module(meta("db"))
            .module(meta("core").dependency("db").required(true));
        let mut container = harness
            .builder()
            .config_provider(SystemConfigProvider::new(store).unwrap())
            .build()
            .unwrap();

        let err = container.discover().unwrap_err();
        assert!(matches!(err, ModuleError::IllegalRequiredDisable { ref id } if id == "core"));
    }

    #[test]
    fn test_unknown_status_entries_are_ignored() {
        let store = MemoryStore::new();
        store.set("modules", json!({"ghost": "DISABLED"}));

        let mut harness = Harness::default();
        harness.module(meta("a"));
        let mut container = harness
            .builder()
            .config_provider(SystemConfigProvider::new(store).unwrap())
            .build()
            .unwrap();

        run(&mut container, false).unwrap();
        assert!(container.disabled_modules().is_empty());
    }

    #[test]
    fn test_status_section_lists_optional_modules_only() {
        let store = MemoryStore::new();
        let mut harness = Harness::default();
        harness
            .module(meta("core").required(true))
            .module(meta("web").description("HTTP API"));
        let mut container = harness
            .builder()
            .config_provider(SystemConfigProvider::new(store.clone()).unwrap())
            .config(ContainerConfig::new("Modules").with_header("toggle modules"))
            .build()
            .unwrap();

        run(&mut container, false).unwrap();

        assert_eq!(
            store.get("modules"),
            Some(json!({"#": "toggle modules", "#web": "HTTP API", "web": "ENABLED"}))
        );
    }

    #[test]
    fn test_module_config_is_attached_and_defaulted() {
        let store = MemoryStore::new();
        store.set("web", json!({"port": 9000}));
        let adapter = Arc::new(TypedConfigAdapter::<WebConfig>::default());

        let mut harness = Harness::default();
        harness.configured(meta("web"), adapter.clone());
        harness.configured(meta("api"), Arc::new(TypedConfigAdapter::<WebConfig>::default()));
        let mut container = harness
            .builder()
            .config_provider(SystemConfigProvider::new(store.clone()).unwrap())
            .build()
            .unwrap();

        run(&mut container, false).unwrap();

        assert_eq!(adapter.config().unwrap().port, 9000);
        assert_eq!(store.get("api"), Some(json!({"port": 8080})));
        assert!(container.config_provider().component_config("web").is_some());

        adapter.set_config(WebConfig { port: 7000 });
        container.refresh_system_config().unwrap();
        assert_eq!(store.get("web"), Some(json!({"port": 7000})));

        store.set("web", json!({"port": 6000}));
        container.reload_system_config().unwrap();
        assert_eq!(adapter.config().unwrap().port, 7000);
    }

    #[test]
    fn test_module_named_like_status_section_is_isolated() {
        let store = MemoryStore::new();
        let mut harness = Harness::default();
        harness
            .configured(meta("Modules"), Arc::new(TypedConfigAdapter::<WebConfig>::default()))
            .module(meta("web"));

        let mut first = harness
            .builder()
            .config_provider(SystemConfigProvider::new(store.clone()).unwrap())
            .build()
            .unwrap();
        run(&mut first, false).unwrap();

        assert_eq!(phase_of(&first, "Modules"), ModulePhase::Errored);
        assert!(first.is_enabled("web"));
        assert!(harness.calls_of("Modules").is_empty());
        assert_eq!(
            store.get("modules"),
            Some(json!({
                "#": DEFAULT_STATUS_HEADER,
                "Modules": "ENABLED",
                "web": "ENABLED",
            }))
        );

        let mut second = harness
            .builder()
            .config_provider(SystemConfigProvider::new(store.clone()).unwrap())
            .build()
            .unwrap();
        assert!(second.discover().is_ok());
    }

    #[test]
    fn test_container_hooks_run_before_module_phases() {
        let mut harness = Harness::default();
        harness.module(meta("a"));

        let pre = harness.log.clone();
        let enable = harness.log.clone();
        let post = harness.log.clone();
        let mut container = harness
            .builder()
            .on_pre_enable("pre", move || {
                pre.lock().unwrap().push("hook:PRE_ENABLE".to_string());
                Ok(())
            })
            .on_enable("enable", move || {
                enable.lock().unwrap().push("hook:ENABLE".to_string());
                Ok(())
            })
            .on_post_enable("post", move || {
                post.lock().unwrap().push("hook:POST_ENABLE".to_string());
                Ok(())
            })
            .build()
            .unwrap();

        run(&mut container, false).unwrap();

        assert_eq!(
            harness.calls(),
            vec![
                "hook:PRE_ENABLE",
                "a:PRE_ENABLE",
                "a:CHECK_EXTERNAL_DEPENDENCIES",
                "hook:ENABLE",
                "a:ENABLE",
                "hook:POST_ENABLE",
                "a:POST_ENABLE",
            ]
        );
    }

    #[test]
    fn test_failing_container_hook_is_fatal() {
        let mut harness = Harness::default();
        harness.module(meta("a"));
        let mut container = harness
            .builder()
            .on_enable("banner", || anyhow::bail!("terminal closed"))
            .build()
            .unwrap();

        let err = run(&mut container, false).unwrap_err();

        assert!(matches!(err, ModuleError::HookFailed { ref hook, .. } if hook == "banner"));
        assert_eq!(container.phase(), ConstructionPhase::Errored);
        assert!(!harness.calls().contains(&"a:ENABLE".to_string()));
    }

    #[test]
    fn test_wrong_phase_leaves_state_untouched() {
        let mut harness = Harness::default();
        harness.module(meta("a"));
        let mut container = harness.build();

        let err = container.load_modules(false).unwrap_err();
        assert!(matches!(
            err,
            ModuleError::PhaseMismatch {
                expected: ConstructionPhase::Discovered,
                actual: ConstructionPhase::Initialized,
            }
        ));
        assert_eq!(container.phase(), ConstructionPhase::Initialized);

        run(&mut container, false).unwrap();
        assert!(container.discover().is_err());
        assert_eq!(container.phase(), ConstructionPhase::Enabled);
    }

    #[test]
    fn test_errored_container_refuses_every_entry_point() {
        let mut harness = Harness::default();
        harness.module(meta("a").dependency("b")).module(meta("b").dependency("a"));
        let mut container = harness.build();

        let err = container.discover().unwrap_err();
        assert!(matches!(err, ModuleError::CircularDependency { .. }));
        assert_eq!(container.phase(), ConstructionPhase::Errored);

        for result in [
            container.discover(),
            container.load_modules(false),
            container.shutdown(),
        ] {
            assert!(matches!(
                result,
                Err(ModuleError::PhaseMismatch {
                    actual: ConstructionPhase::Errored,
                    ..
                })
            ));
        }
    }

    #[test]
    fn test_duplicate_ids_are_fatal() {
        let mut harness = Harness::default();
        harness.module(meta("a")).module(meta("a"));
        let mut container = harness.build();

        let err = container.discover().unwrap_err();
        assert!(matches!(err, ModuleError::ModuleAlreadyRegistered { ref id, .. } if id == "a"));
    }

    #[test]
    fn test_missing_dependency_is_fatal() {
        let mut harness = Harness::default();
        harness.module(meta("web").dependency("db"));
        let mut container = harness.build();

        let err = container.discover().unwrap_err();
        assert!(matches!(err, ModuleError::DependencyNotFound { ref dependency, .. } if dependency == "db"));
        assert_eq!(container.phase(), ConstructionPhase::Errored);
    }

    #[test]
    fn test_discovery_error_is_fatal() {
        let mut container = ContainerBuilder::new()
            .discovery(|| -> std::result::Result<Vec<DiscoveredModule>, DiscoveryError> {
                Err(DiscoveryError::scan_failed("plugin directory unreadable"))
            })
            .constructor(ModuleRegistry::new())
            .build()
            .unwrap();

        let err = container.discover().unwrap_err();
        assert!(matches!(err, ModuleError::Discovery(_)));
        assert_eq!(container.phase(), ConstructionPhase::Errored);
    }

    #[test]
    fn test_shutdown_disables_in_reverse_order() {
        let mut harness = Harness::default();
        harness
            .module(meta("web").dependency("db"))
            .module(meta("db"))
            .module(meta("cache"));
        let mut container = harness.build();
        run(&mut container, false).unwrap();

        container.shutdown().unwrap();

        let disables: Vec<_> = harness
            .calls()
            .into_iter()
            .filter(|c| c.ends_with(":DISABLE"))
            .collect();
        assert_eq!(disables, vec!["cache:DISABLE", "web:DISABLE", "db:DISABLE"]);
        assert!(container.descriptors().all(|d| d.phase() == ModulePhase::Disabled));
        assert!(container.module("db").is_none());

        container.shutdown().unwrap();
        assert_eq!(harness.calls().len(), 3 * 4 + 3);
    }

    #[test]
    fn test_failing_on_disable_is_swallowed() {
        let mut harness = Harness::default();
        harness
            .failing(meta("a"), LifecyclePhase::Disable)
            .module(meta("b"));
        let mut container = harness.build();
        run(&mut container, false).unwrap();

        container.shutdown().unwrap();

        assert_eq!(phase_of(&container, "a"), ModulePhase::Disabled);
        assert_eq!(harness.calls_of("b").last().unwrap(), "b:DISABLE");
    }

    #[test]
    fn test_module_mut_reaches_instance() {
        let mut harness = Harness::default();
        harness.module(meta("a"));
        let mut container = harness.build();
        run(&mut container, false).unwrap();

        let module = container.module_mut("a").unwrap();
        module.post_enable().unwrap();
        assert_eq!(harness.calls().last().unwrap(), "a:POST_ENABLE");
        assert!(container.module_mut("missing").is_none());
    }

    #[test]
    fn test_report_serializes_run() {
        let mut harness = Harness::default();
        harness
            .module(meta("a"))
            .failing(meta("b"), LifecyclePhase::Enable);
        let mut container = harness.build();
        run(&mut container, false).unwrap();

        let report = container.report();
        assert_eq!(report.run_id, container.run_id());
        assert_eq!(report.modules_in(ModulePhase::Enabled), vec!["a"]);
        assert_eq!(report.modules_in(ModulePhase::Errored), vec!["b"]);

        let value: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(value["phase"], "ENABLED");
        assert_eq!(value["modules"][1]["status"], "DISABLED");
        assert_eq!(value["transitions"].as_array().unwrap().len(), 4);
    }
}
