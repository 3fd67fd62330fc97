//! # Lucent Core Library (`lucent-core`)
//!
//! `lucent-core` is the foundational library for the Lucent graphics stack.
//! It provides the infrastructure services shared by the higher layers:
//!
//! - **Error Handling**: A unified error system through the [`CoreError`] enum
//!   and its associated specific error types like [`ConfigError`].
//! - **Configuration Management**: TOML-based configuration loading with
//!   default fallbacks and validation, through [`ConfigLoader`] and
//!   [`CoreConfig`].
//! - **Logging**: A logging setup built on top of the `tracing` crate,
//!   configurable for text or JSON output.
//!
//! Higher layers (notably `lucent-buffers`, the shared graphics buffer
//! module) build on these services rather than rolling their own.
//!
//! ```rust,ignore
//! use lucent_core::config::ConfigLoader;
//! use lucent_core::error::CoreError;
//! use lucent_core::logging::init_logging;
//!
//! fn main() -> Result<(), CoreError> {
//!     let config = ConfigLoader::load("/etc/lucent/core.toml".as_ref())?;
//!     init_logging(&config.logging)?;
//!     tracing::info!("Lucent core initialized.");
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod logging;

// Re-export key types for convenience
pub use config::{AllocatorConfig, ConfigLoader, CoreConfig, LoggingConfig};
pub use error::{ConfigError, CoreError};
pub use logging::{init_logging, init_minimal_logging};
