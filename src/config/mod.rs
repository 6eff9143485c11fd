//! Configuration layer
//!
//! Two kinds of configuration live in one document: the status section, which
//! lets an operator switch optional modules on and off, and one section per
//! module that exposes a [`ConfigAdapter`]. The container only talks to the
//! [`ConfigProvider`] trait; [`SystemConfigProvider`] is the stock
//! implementation over a [`ConfigStore`].

mod adapter;
mod error;
mod provider;
mod store;

pub use adapter::{ConfigAdapter, TypedConfigAdapter};
pub use error::{ConfigError, Result};
pub use provider::SystemConfigProvider;
pub use store::{ConfigStore, JsonFileStore, MemoryStore};

use crate::module::{LoadingStatus, ModuleDescriptor};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Source of persisted module configuration
pub trait ConfigProvider: Send {
    /// Register the status section under `key` for the given modules
    fn attach_status_config(
        &mut self,
        descriptors: &[&ModuleDescriptor],
        key: &str,
        header: &str,
    ) -> Result<()>;

    /// Loading status per module id, as found in the status section
    fn status_overrides(&self) -> Result<BTreeMap<String, LoadingStatus>>;

    /// Attach the config adapter of module `id`
    ///
    /// Fails with [`ConfigError::AlreadyAttached`] if an adapter is already
    /// attached under the same id.
    fn attach_component_config(
        &mut self,
        id: &str,
        adapter: Arc<dyn ConfigAdapter>,
        header: Option<&str>,
    ) -> Result<()>;

    /// Does nothing if `id` is not attached
    fn detach_component_config(&mut self, id: &str);

    fn component_config(&self, id: &str) -> Option<Arc<dyn ConfigAdapter>>;

    /// Merge the defaults of every attached section into the document and save it
    fn create_default_configs(&mut self) -> Result<()>;

    /// Re-read the document. Adapters keep their current values.
    fn reload(&mut self) -> Result<()>;

    /// Re-read the document and push the new values into every adapter
    fn refresh(&mut self) -> Result<()>;

    /// Write the in-memory configuration out, then reload the adapters if `refresh`
    fn save(&mut self, refresh: bool) -> Result<()>;
}
