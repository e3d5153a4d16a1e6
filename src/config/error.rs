//! Configuration errors

use std::path::PathBuf;

use thiserror::Error;

/// Configuration error type
#[derive(Error, Debug)]
pub enum ConfigError {
    /// File not found
    #[error("Configuration file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// Error loading or deserializing configuration
    #[error("Error parsing configuration: {0}")]
    ParseError(String),

    /// Invalid value for configuration option
    #[error("Invalid value for '{0}': {1}")]
    InvalidValue(String, String),
}

/// Result type alias for configuration operations
pub type Result<T> = std::result::Result<T, ConfigError>;

impl From<::config::ConfigError> for ConfigError {
    fn from(err: ::config::ConfigError) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}

// Convert to crate's common error type
impl From<ConfigError> for crate::common::DetectorError {
    fn from(err: ConfigError) -> Self {
        crate::common::DetectorError::Config(err.to_string())
    }
}
