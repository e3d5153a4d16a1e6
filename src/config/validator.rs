//! Configuration validator

use std::path::Path;

use super::error::{ConfigError, Result};
use super::types::DetectorConfig;

/// Smallest request head limit that still fits ordinary browser requests
const MIN_REQUEST_HEAD: usize = 1024;

const LOG_LEVELS: [&str; 6] = ["off", "error", "warn", "info", "debug", "trace"];

impl DetectorConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("hello_timeout_ms", self.hello_timeout_ms),
            ("handshake_timeout_ms", self.handshake_timeout_ms),
            ("idle_timeout_ms", self.idle_timeout_ms),
        ] {
            if value == 0 {
                return Err(ConfigError::InvalidValue(
                    name.to_string(),
                    "must be greater than zero".to_string(),
                ));
            }
        }

        if self.max_request_head < MIN_REQUEST_HEAD {
            return Err(ConfigError::InvalidValue(
                "max_request_head".to_string(),
                format!("must be at least {} bytes", MIN_REQUEST_HEAD),
            ));
        }

        if !LOG_LEVELS.contains(&self.log_level.to_lowercase().as_str()) {
            return Err(ConfigError::InvalidValue(
                "log_level".to_string(),
                format!("{}. Valid values are: {}", self.log_level, LOG_LEVELS.join(", ")),
            ));
        }

        if self.self_signed {
            if self.server_name.is_empty() {
                return Err(ConfigError::InvalidValue(
                    "server_name".to_string(),
                    "must not be empty when self_signed is enabled".to_string(),
                ));
            }
        } else {
            validate_file_exists(&self.cert, "cert")?;
            validate_file_exists(&self.key, "key")?;
        }

        Ok(())
    }
}

fn validate_file_exists(path: &Path, name: &str) -> Result<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(ConfigError::InvalidValue(
            name.to_string(),
            format!("file does not exist: {}", path.display()),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn self_signed() -> DetectorConfig {
        DetectorConfig {
            self_signed: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_self_signed_defaults_are_valid() {
        assert!(self_signed().validate().is_ok());
    }

    #[test]
    fn test_missing_certificate_files() {
        let config = DetectorConfig {
            cert: "non_existent.crt".into(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_values() {
        let mut config = self_signed();
        config.hello_timeout_ms = 0;
        assert!(config.validate().is_err());

        let mut config = self_signed();
        config.handshake_timeout_ms = 0;
        assert!(config.validate().is_err());

        let mut config = self_signed();
        config.idle_timeout_ms = 0;
        assert!(config.validate().is_err());

        let mut config = self_signed();
        config.max_request_head = 512;
        assert!(config.validate().is_err());

        let mut config = self_signed();
        config.log_level = "verbose".to_string();
        assert!(config.validate().is_err());

        let mut config = self_signed();
        config.log_level = "DEBUG".to_string();
        assert!(config.validate().is_ok());
    }
}
