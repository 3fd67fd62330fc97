//! Logging System for Lucent Core.
//!
//! This module provides a configurable logging setup for the Lucent stack,
//! built upon the `tracing` ecosystem. Console output is supported in text and
//! JSON formats; filtering honors `RUST_LOG` when present.

use crate::config::LoggingConfig;
use crate::error::CoreError;

use tracing_subscriber::{fmt, EnvFilter};

/// Initializes a minimal logging setup, directing messages to `stderr`.
///
/// Intended for tests, early startup before configuration is loaded, or as a
/// fallback if full logging initialization fails. Filters based on the
/// `RUST_LOG` environment variable, defaulting to "info" when unset or
/// invalid. Errors (e.g. a global logger already being set) are ignored.
pub fn init_minimal_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(atty::is(atty::Stream::Stderr)) // Colors if stderr is a TTY
        .try_init();
}

/// Initializes the global logging system based on the provided [`LoggingConfig`].
///
/// `RUST_LOG` overrides the configured level when set, so a deployed process
/// can be re-filtered without touching its configuration file.
///
/// # Errors
///
/// Returns [`CoreError::LoggingInitialization`] if the configured level/format
/// is invalid or a global subscriber has already been installed.
pub fn init_logging(config: &LoggingConfig) -> Result<(), CoreError> {
    let level = match config.level.to_lowercase().as_str() {
        level @ ("trace" | "debug" | "info" | "warn" | "error") => level.to_string(),
        other => {
            return Err(CoreError::LoggingInitialization(format!(
                "invalid log level '{}'",
                other
            )))
        }
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(atty::is(atty::Stream::Stderr));

    match config.format.to_lowercase().as_str() {
        "json" => builder
            .json()
            .try_init()
            .map_err(|e| CoreError::LoggingInitialization(e.to_string())),
        "text" => builder
            .try_init()
            .map_err(|e| CoreError::LoggingInitialization(e.to_string())),
        other => Err(CoreError::LoggingInitialization(format!(
            "invalid log format '{}'",
            other
        ))),
    }
}
