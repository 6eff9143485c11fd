//! Lifecycle phases and callbacks
//!
//! A container run walks through the following phases. Every per-module step
//! runs in dependency order, and a cascade-disable pass runs between the steps
//! that can newly fail a module.
//!
//! ```text
//! INITIALIZED
//!    ↓  discover()
//! DISCOVERING   discovery → descriptors → resolve order → status overrides → cascade
//!    ↓
//! DISCOVERED
//!    ↓  load_modules(fail_on_error)
//! ENABLING      construct → attach configs → PRE_ENABLE → cascade
//!               → CHECK_EXTERNAL_DEPENDENCIES → cascade → ENABLE
//!               → cascade → POST_ENABLE
//!    ↓
//! ENABLED
//!
//! ERRORED       reachable from any phase, terminal
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use modulus::lifecycle::LifecycleError;
//! use modulus::Module;
//!
//! pub struct DatabaseModule {
//!     pool: Option<Pool>,
//! }
//!
//! impl Module for DatabaseModule {
//!     fn on_enable(&mut self) -> Result<(), LifecycleError> {
//!         tracing::info!("Opening database pool");
//!         self.pool = Some(Pool::connect().map_err(|e| LifecycleError::loading_failed(e.to_string()))?);
//!         Ok(())
//!     }
//!
//!     fn on_disable(&mut self) -> Result<(), LifecycleError> {
//!         self.pool.take();
//!         Ok(())
//!     }
//! }
//! ```

mod error;
mod hooks;
mod phase;

pub use error::{LifecycleError, Result};
pub use hooks::ContainerHooks;
pub use phase::{ConstructionPhase, LifecyclePhase};
