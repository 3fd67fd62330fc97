//! Configuration Data Structures and Loading for Lucent Core.
//!
//! This module defines the structures used to represent the configuration of
//! the Lucent core system, populated by deserializing a TOML file, together
//! with the [`ConfigLoader`] that reads and validates them.
//!
//! # Key Structs
//! - [`CoreConfig`]: The root configuration structure.
//! - [`LoggingConfig`]: Configuration specific to the logging subsystem.
//! - [`AllocatorConfig`]: Location of the external graphics memory allocator
//!   service consumed by the buffer module.
//!
//! These structs utilize `serde` for deserialization, apply default values for
//! fields not present in the configuration source, and enforce that no unknown
//! fields are present via `#[serde(deny_unknown_fields)]`.

use crate::error::ConfigError;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

fn default_allocator_device() -> PathBuf {
    PathBuf::from("/dev/dma_heap/system")
}

/// Configuration settings for the logging subsystem.
///
/// Used by [`crate::logging`] to initialize the global logger.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// The minimum log level to record.
    /// Valid values (case-insensitive): "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub level: String,
    /// The format for emitted log lines.
    /// Valid values (case-insensitive): "text", "json".
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

/// Location of the external allocator service backing shared graphics buffers.
///
/// The buffer module never allocates physical memory itself; it talks to the
/// kernel heap device named here for mapping and cache synchronization.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct AllocatorConfig {
    /// Path of the allocator heap device node.
    #[serde(default = "default_allocator_device")]
    pub device_path: PathBuf,
}

impl Default for AllocatorConfig {
    fn default() -> Self {
        Self {
            device_path: default_allocator_device(),
        }
    }
}

/// Root configuration structure for the Lucent core system.
#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct CoreConfig {
    /// Configuration for the logging subsystem.
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Configuration for the external allocator service.
    #[serde(default)]
    pub allocator: AllocatorConfig,
}

/// Loads and validates [`CoreConfig`] values.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads configuration from the given file path.
    ///
    /// A missing file is not an error: the defaults are returned instead, so
    /// callers can run unconfigured. Read failures other than absence, parse
    /// failures, and validation failures are reported as [`ConfigError`].
    pub fn load(path: &Path) -> Result<CoreConfig, ConfigError> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(source) if source.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = ?path, "no configuration file found; using defaults");
                return Ok(CoreConfig::default());
            }
            Err(source) => {
                return Err(ConfigError::ReadError {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        Self::load_from_str(&content)
    }

    /// Parses and validates configuration from a TOML string.
    pub fn load_from_str(content: &str) -> Result<CoreConfig, ConfigError> {
        let mut config: CoreConfig = toml::from_str(content)?;
        Self::validate(&mut config)?;
        Ok(config)
    }

    /// Normalizes and validates a parsed configuration in place.
    ///
    /// Log level and format strings are lowercased; unknown values are
    /// rejected rather than silently replaced.
    fn validate(config: &mut CoreConfig) -> Result<(), ConfigError> {
        config.logging.level = config.logging.level.to_lowercase();
        match config.logging.level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            other => {
                return Err(ConfigError::ValidationError(format!(
                    "unknown log level '{}'",
                    other
                )))
            }
        }

        config.logging.format = config.logging.format.to_lowercase();
        match config.logging.format.as_str() {
            "text" | "json" => {}
            other => {
                return Err(ConfigError::ValidationError(format!(
                    "unknown log format '{}'",
                    other
                )))
            }
        }

        if config.allocator.device_path.as_os_str().is_empty() {
            return Err(ConfigError::ValidationError(
                "allocator device_path must not be empty".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn test_default_core_config() {
        let config = CoreConfig::default();
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.format, "text");
        assert_eq!(
            config.allocator.device_path,
            PathBuf::from("/dev/dma_heap/system")
        );
    }

    #[test]
    fn test_load_from_str_full() {
        let toml_str = r#"
            [logging]
            level = "DEBUG"
            format = "json"

            [allocator]
            device_path = "/dev/dma_heap/reserved"
        "#;
        let config = ConfigLoader::load_from_str(toml_str).unwrap();
        // Level is normalized to lowercase during validation.
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, "json");
        assert_eq!(
            config.allocator.device_path,
            PathBuf::from("/dev/dma_heap/reserved")
        );
    }

    #[test]
    fn test_load_from_str_partial_uses_defaults() {
        let config = ConfigLoader::load_from_str("[logging]\nlevel = \"warn\"\n").unwrap();
        assert_eq!(config.logging.level, "warn");
        assert_eq!(config.logging.format, "text");
        assert_eq!(config.allocator, AllocatorConfig::default());
    }

    #[test]
    fn test_load_from_str_rejects_unknown_level() {
        let err = ConfigLoader::load_from_str("[logging]\nlevel = \"loud\"\n").unwrap_err();
        match err {
            ConfigError::ValidationError(msg) => assert!(msg.contains("loud")),
            other => panic!("expected ValidationError, got {:?}", other),
        }
    }

    #[test]
    fn test_load_from_str_rejects_unknown_fields() {
        let err = ConfigLoader::load_from_str("[logging]\nverbosity = 3\n").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn test_load_missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = ConfigLoader::load(&dir.path().join("does-not-exist.toml")).unwrap();
        assert_eq!(config, CoreConfig::default());
    }

    #[test]
    fn test_load_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("core.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "[allocator]\ndevice_path = \"/dev/dma_heap/cma\"").unwrap();

        let config = ConfigLoader::load(&path).unwrap();
        assert_eq!(
            config.allocator.device_path,
            PathBuf::from("/dev/dma_heap/cma")
        );
    }
}
