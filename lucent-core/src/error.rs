//! Error handling for the Lucent core layer.
//!
//! This module defines the error types shared by the foundational services of
//! the Lucent stack (configuration and logging), using the `thiserror` crate
//! for ergonomic error definition. The main error type for this crate is
//! [`CoreError`], which wraps the more specific [`ConfigError`].

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Core error type for the Lucent infrastructure layer.
///
/// Higher layers (such as the buffer module) define their own error enums and
/// convert into or from these variants where the concerns overlap.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Errors related to configuration loading, parsing, or validation.
    /// Wraps a [`ConfigError`].
    #[error("Configuration Error: {0}")]
    Config(#[from] ConfigError),

    /// Errors that occur during the initialization of the logging system.
    #[error("Logging Initialization Failed: {0}")]
    LoggingInitialization(String),

    /// General I/O errors not covered by other specific variants.
    #[error("I/O Error: {0}")]
    Io(#[from] io::Error),

    /// Catch-all for unexpected internal errors within the core library.
    #[error("An unexpected internal error occurred: {0}")]
    Internal(String),
}

/// Error type for configuration-related operations.
///
/// Typically wrapped by [`CoreError::Config`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An error occurred while attempting to read a configuration file.
    #[error("Failed to read configuration file from {path:?}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// An error occurred while parsing a configuration file (invalid TOML).
    #[error("Failed to parse configuration file: {0}")]
    ParseError(#[from] toml::de::Error),

    /// A configuration value failed validation after successful parsing.
    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error; // To use the .source() method
    use std::io::{Error as IoError, ErrorKind};

    #[test]
    fn test_core_error_config_variant() {
        let original_config_err = ConfigError::ValidationError("Test validation".to_string());
        let core_err = CoreError::Config(original_config_err);

        assert_eq!(
            format!("{}", core_err),
            "Configuration Error: Configuration validation failed: Test validation"
        );
        assert!(core_err.source().is_some());
        match core_err.source().unwrap().downcast_ref::<ConfigError>() {
            Some(ConfigError::ValidationError(msg)) => assert_eq!(msg, "Test validation"),
            _ => panic!("Incorrect source for CoreError::Config"),
        }
    }

    #[test]
    fn test_core_error_logging_initialization_variant() {
        let core_err = CoreError::LoggingInitialization("Failed to init logger".to_string());

        assert_eq!(
            format!("{}", core_err),
            "Logging Initialization Failed: Failed to init logger"
        );
        assert!(core_err.source().is_none());
    }

    #[test]
    fn test_core_error_io_variant() {
        let io_err_source = IoError::new(ErrorKind::NotFound, "File not found for io");
        let core_err = CoreError::Io(io_err_source); // Uses #[from]

        assert_eq!(format!("{}", core_err), "I/O Error: File not found for io");
        assert!(core_err.source().is_some());
        assert_eq!(
            core_err
                .source()
                .unwrap()
                .downcast_ref::<IoError>()
                .unwrap()
                .kind(),
            ErrorKind::NotFound
        );
    }

    #[test]
    fn test_config_error_read_error_variant() {
        let path = PathBuf::from("/config/read_test.toml");
        let io_err_source = IoError::new(ErrorKind::NotFound, "Config file not found for read");
        let config_err = ConfigError::ReadError {
            path: path.clone(),
            source: io_err_source,
        };

        assert_eq!(
            format!("{}", config_err),
            format!("Failed to read configuration file from {:?}", path)
        );
        assert!(config_err.source().is_some());
    }

    #[test]
    fn test_config_error_parse_error_variant() {
        // Parse an invalid TOML string to obtain a real toml::de::Error.
        let toml_err_source: toml::de::Error =
            toml::from_str::<toml::Value>("this is not valid toml").unwrap_err();
        let toml_err_display = format!("{}", toml_err_source);

        let config_err = ConfigError::ParseError(toml_err_source);

        assert_eq!(
            format!("{}", config_err),
            format!("Failed to parse configuration file: {}", toml_err_display)
        );
        assert!(config_err.source().unwrap().is::<toml::de::Error>());
    }
}
