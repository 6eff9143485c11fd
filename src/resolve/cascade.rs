use crate::error::{ModuleError, Result};
use crate::module::{DescriptorStore, LoadingStatus};

/// Disable every module whose hard dependency is disabled, transitively
///
/// `order` must be a resolution order, so each module is examined after all of
/// its dependencies have settled and a single pass reaches every dependent up
/// the chain. Errored modules are already `DISABLED`, so they cascade the same
/// way.
///
/// Returns the ids disabled by this pass. Fails with
/// [`ModuleError::IllegalRequiredDisable`] if a required module would have to
/// be disabled.
pub fn propagate_disable(store: &mut DescriptorStore, order: &[usize]) -> Result<Vec<String>> {
    let mut disabled = Vec::new();

    for &idx in order {
        let descriptor = &store[idx];
        if descriptor.is_disabled() {
            continue;
        }

        let Some(dependency) = descriptor
            .dependencies()
            .iter()
            .find(|dep| store.by_id(dep).is_some_and(|d| d.is_disabled()))
        else {
            continue;
        };

        if descriptor.is_required() {
            return Err(ModuleError::IllegalRequiredDisable {
                id: descriptor.id().to_string(),
            });
        }
        if descriptor.status() == LoadingStatus::ForceLoad {
            tracing::warn!(
                "Module '{}' is set to {} but its dependency '{}' is disabled",
                descriptor.id(),
                LoadingStatus::ForceLoad,
                dependency
            );
        }
        tracing::info!(
            "Disabling module '{}' because dependency '{}' is disabled",
            descriptor.id(),
            dependency
        );

        let id = descriptor.id().to_string();
        if let Some(descriptor) = store.get_mut(idx) {
            descriptor.set_status(LoadingStatus::Disabled);
        }
        disabled.push(id);
    }

    Ok(disabled)
}
