//! # Modulus
//!
//! Dependency-ordered module lifecycle orchestration for Rust.
//!
//! An application is split into modules that declare an id and the modules
//! they depend on. A [`ModuleContainer`] discovers them, orders them so every
//! dependency comes first, applies the persisted enable/disable switches and
//! drives each module through its lifecycle callbacks. A module that fails is
//! isolated together with its dependents while the rest keep running.
//!
//! ## Features
//!
//! - **Dependency ordering**: depth-first resolution with cycle and missing
//!   dependency detection; soft dependencies only affect ordering
//! - **Cascade disable**: disabling or losing a module disables everything
//!   that depends on it, and required modules can never be disabled
//! - **Failure isolation**: per-module errors are contained unless the run
//!   asks to fail fast
//! - **Persisted configuration**: a JSON document holding the status switches
//!   and one section per configurable module
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use modulus::prelude::*;
//!
//! #[derive(Default, RegisterModule)]
//! #[module(id = "database", name = "Database")]
//! struct DatabaseModule;
//!
//! impl Module for DatabaseModule {
//!     fn on_enable(&mut self) -> std::result::Result<(), LifecycleError> {
//!         Ok(())
//!     }
//! }
//!
//! #[derive(Default, RegisterModule)]
//! #[module(id = "web", name = "Web Server", dependencies = ["database"])]
//! struct WebModule;
//!
//! impl Module for WebModule {
//!     fn on_enable(&mut self) -> std::result::Result<(), LifecycleError> {
//!         Ok(())
//!     }
//! }
//!
//! fn main() -> anyhow::Result<()> {
//!     let mut registry = ModuleRegistry::new();
//!     registry.register::<WebModule>().register::<DatabaseModule>();
//!
//!     let mut container = ContainerBuilder::new()
//!         .registry(registry)
//!         .config_provider(SystemConfigProvider::new(JsonFileStore::new("modules.json"))?)
//!         .build()?;
//!
//!     container.discover()?;
//!     container.load_modules(false)?;
//!
//!     // ... application runs ...
//!
//!     container.shutdown()?;
//!     Ok(())
//! }
//! ```

extern crate self as modulus;

pub mod config;
pub mod container;
pub mod discovery;
pub mod error;
pub mod lifecycle;
pub mod loader;
pub mod module;
pub mod resolve;

// Re-export core types
pub use container::{ContainerBuilder, ContainerConfig, ModuleContainer};
pub use error::{ModuleError, Result};
pub use module::{LoadingStatus, Module, ModuleDescriptor, ModuleMeta, ModulePhase, RegisterModule};

// Re-export macros
pub use modulus_macro::RegisterModule;

/// Prelude module for convenient imports
///
/// ```
/// use modulus::prelude::*;
/// ```
pub mod prelude {
    pub use crate::config::{
        ConfigAdapter, ConfigProvider, JsonFileStore, MemoryStore, SystemConfigProvider,
        TypedConfigAdapter,
    };
    pub use crate::container::{ContainerBuilder, ContainerConfig, ModuleContainer};
    pub use crate::discovery::{DiscoveredModule, ModuleDiscovery, ModuleRegistry};
    pub use crate::error::{ModuleError, Result};
    pub use crate::lifecycle::{ConstructionPhase, LifecycleError, LifecyclePhase};
    pub use crate::loader::ModuleConstructor;
    pub use crate::module::{LoadingStatus, Module, ModuleDescriptor, ModuleMeta, ModulePhase};
    pub use crate::resolve::{RecursiveResolver, ResolveStrategy, SoftDependencyPolicy};
    // Trait and derive macro share the name
    pub use crate::RegisterModule;
    pub use std::sync::Arc;
}
