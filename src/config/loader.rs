//! Configuration loader implementation
//!
//! Layers a JSON file and `MITM_DETECTOR_*` environment variables on top of
//! the defaults using the `config` crate.

use std::path::Path;

use ::config::{Config, Environment, File, FileFormat};
use log::debug;

use super::defaults;
use super::error::{ConfigError, Result};
use super::types::DetectorConfig;

impl DetectorConfig {
    /// Load configuration from defaults, an optional file and the environment
    ///
    /// Priority, lowest first:
    /// 1. Default values
    /// 2. Configuration file (`config.json` in the working directory when `path` is `None`; optional)
    /// 3. Environment variables prefixed with `MITM_DETECTOR_`
    ///
    /// An explicitly given `path` must exist.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (config_path, required) = match path {
            Some(path) => (path, true),
            None => (Path::new(defaults::DEFAULT_CONFIG_FILE), false),
        };

        if required && !config_path.exists() {
            return Err(ConfigError::FileNotFound(config_path.to_path_buf()));
        }

        let file_name = config_path.to_str().ok_or_else(|| {
            ConfigError::InvalidValue(
                "config_file".to_string(),
                format!("Path is not valid UTF-8: {}", config_path.display()),
            )
        })?;

        let config = Config::builder()
            .add_source(File::new(file_name, FileFormat::Json).required(required))
            .add_source(Environment::with_prefix(defaults::ENV_PREFIX).try_parsing(true))
            .build()?;

        let loaded: Self = config.try_deserialize()?;

        if config_path.exists() {
            debug!("Configuration loaded from {}", config_path.display());
        }
        Ok(loaded)
    }

    /// Load configuration from a JSON file only, ignoring the environment
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ParseError(format!("{}: {}", path.display(), e)))?;

        serde_json::from_str(&content)
            .map_err(|e| ConfigError::ParseError(format!("{}: {}", path.display(), e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_from_file_partial_values_keep_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "listen": "127.0.0.1:9443", "hello_timeout_ms": 250 }}"#).unwrap();

        let config = DetectorConfig::from_file(file.path()).unwrap();
        assert_eq!(config.listen.to_string(), "127.0.0.1:9443");
        assert_eq!(config.hello_timeout_ms, 250);
        assert_eq!(config.log_level, defaults::LOG_LEVEL_STR);
    }

    #[test]
    fn test_from_file_rejects_unknown_fields() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "target": "127.0.0.1:6000" }}"#).unwrap();

        let result = DetectorConfig::from_file(file.path());
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_from_file_missing() {
        let result = DetectorConfig::from_file(Path::new("does/not/exist.json"));
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }
}
