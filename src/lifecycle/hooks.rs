//! Container-level hooks
//!
//! Callbacks that run once per phase, right before the container drives the
//! matching per-module callback.

use super::LifecyclePhase;
use crate::error::{ModuleError, Result};

type HookFn = Box<dyn FnMut() -> anyhow::Result<()> + Send>;

/// A named container hook
struct ContainerHook {
    name: String,
    hook: HookFn,
}

impl ContainerHook {
    fn new(name: impl Into<String>, hook: HookFn) -> Self {
        Self {
            name: name.into(),
            hook,
        }
    }
}

/// Hooks registered for the pre-enable, enable and post-enable phases
///
/// Hooks are executed in the order they were registered. A failing hook is
/// fatal for the whole run.
///
/// # Example
///
/// ```rust,ignore
/// let mut hooks = ContainerHooks::new();
/// hooks.register(LifecyclePhase::Enable, "metrics", || {
///     metrics::install()?;
///     Ok(())
/// });
/// ```
#[derive(Default)]
pub struct ContainerHooks {
    pre_enable: Vec<ContainerHook>,
    enable: Vec<ContainerHook>,
    post_enable: Vec<ContainerHook>,
}

impl ContainerHooks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a hook for `phase`
    ///
    /// Only `PreEnable`, `Enable` and `PostEnable` carry container hooks; any
    /// other phase is ignored with a warning.
    pub fn register<F>(&mut self, phase: LifecyclePhase, name: impl Into<String>, hook: F)
    where
        F: FnMut() -> anyhow::Result<()> + Send + 'static,
    {
        let name = name.into();
        match self.hooks_mut(phase) {
            Some(hooks) => hooks.push(ContainerHook::new(name, Box::new(hook))),
            None => tracing::warn!("Ignoring container hook '{}' for phase {}", name, phase),
        }
    }

    /// Execute every hook registered for `phase`
    pub(crate) fn call(&mut self, phase: LifecyclePhase) -> Result<()> {
        let Some(hooks) = self.hooks_mut(phase) else {
            return Ok(());
        };

        for hook in hooks.iter_mut() {
            tracing::debug!("Running {} hook: {}", phase, hook.name);
            (hook.hook)().map_err(|e| {
                tracing::error!("{} hook '{}' failed: {:#}", phase, hook.name, e);
                ModuleError::HookFailed {
                    hook: hook.name.clone(),
                    phase,
                    source: e,
                }
            })?;
        }

        if !hooks.is_empty() {
            tracing::debug!("{} hooks complete ({} executed)", phase, hooks.len());
        }
        Ok(())
    }

    /// Number of hooks registered for `phase`
    pub fn count(&self, phase: LifecyclePhase) -> usize {
        match phase {
            LifecyclePhase::PreEnable => self.pre_enable.len(),
            LifecyclePhase::Enable => self.enable.len(),
            LifecyclePhase::PostEnable => self.post_enable.len(),
            _ => 0,
        }
    }

    fn hooks_mut(&mut self, phase: LifecyclePhase) -> Option<&mut Vec<ContainerHook>> {
        match phase {
            LifecyclePhase::PreEnable => Some(&mut self.pre_enable),
            LifecyclePhase::Enable => Some(&mut self.enable),
            LifecyclePhase::PostEnable => Some(&mut self.post_enable),
            LifecyclePhase::CheckExternalDependencies | LifecyclePhase::Disable => None,
        }
    }
}
