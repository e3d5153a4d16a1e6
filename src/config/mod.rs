//! Configuration module
//!
//! This module handles application configuration: defaults, loading from a
//! JSON file and environment variables, and validation. Command line
//! overrides are applied by the binary.

mod defaults;
mod error;
mod loader;
mod types;
mod validator;

pub use defaults::{DEFAULT_CONFIG_FILE, DEFAULT_PORT, ENV_PREFIX};
pub use error::{ConfigError, Result};
pub use types::DetectorConfig;
