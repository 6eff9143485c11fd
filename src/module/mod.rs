//! Module model
//!
//! A module is a unit of functionality with a declared identity and
//! dependency edges. The container discovers modules, orders them and drives
//! them through their lifecycle callbacks.

mod descriptor;
mod meta;
mod store;

pub use descriptor::ModuleDescriptor;
pub use meta::{LoadingStatus, ModuleMeta, ModulePhase};
pub use store::DescriptorStore;

use crate::config::ConfigAdapter;
use crate::lifecycle::Result;
use std::sync::Arc;

/// Lifecycle callbacks of a module
///
/// The container calls these in dependency order. Returning an error isolates
/// the module: it is marked errored, disabled, and its dependents are disabled
/// before the next phase.
///
/// # Example
/// ```
/// use modulus::{Module, lifecycle::LifecycleError};
///
/// struct CacheModule {
///     warmed: bool,
/// }
///
/// impl Module for CacheModule {
///     fn on_enable(&mut self) -> Result<(), LifecycleError> {
///         self.warmed = true;
///         Ok(())
///     }
/// }
/// ```
pub trait Module: Send {
    /// Verify that everything the module needs outside the container is reachable
    fn check_external_dependencies(&mut self) -> Result<()> {
        Ok(())
    }

    /// Called before the enable phase. Configs are attached but dependents
    /// have not been enabled yet.
    fn pre_enable(&mut self) -> Result<()> {
        Ok(())
    }

    /// Main enable phase. Acquire the resources the module needs to operate.
    fn on_enable(&mut self) -> Result<()>;

    /// Called after every module has been enabled
    fn post_enable(&mut self) -> Result<()> {
        Ok(())
    }

    /// Release resources. Errors are logged and otherwise discarded.
    fn on_disable(&mut self) -> Result<()> {
        Ok(())
    }

    /// Adapter exposing the module's persisted configuration, if it has one
    ///
    /// Queried once, right after construction.
    fn config_adapter(&self) -> Option<Arc<dyn ConfigAdapter>> {
        None
    }
}

/// Types that carry their own module metadata
///
/// Usually implemented with `#[derive(RegisterModule)]`.
pub trait RegisterModule {
    fn module_meta() -> ModuleMeta;
}
