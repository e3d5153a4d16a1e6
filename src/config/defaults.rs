//! Default configuration values
//!
//! Single source of truth for defaults, shared by serde, the CLI and tests.

use std::net::SocketAddr;
use std::path::PathBuf;

/// Environment variable prefix for all configuration options
pub const ENV_PREFIX: &str = "MITM_DETECTOR";

/// Default configuration file name
pub const DEFAULT_CONFIG_FILE: &str = "config.json";

/// Default log level as string
pub const LOG_LEVEL_STR: &str = "info";

/// Port used when a listen address names only a host
pub const DEFAULT_PORT: u16 = 8443;

/// Default listen address
pub fn listen() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT))
}

/// Default certificate path
pub fn cert_path() -> PathBuf {
    PathBuf::from("certs/server.crt")
}

/// Default private key path
pub fn key_path() -> PathBuf {
    PathBuf::from("certs/server.key")
}

/// Default server name for generated certificates
pub fn server_name() -> String {
    "localhost".to_string()
}

/// Default time allowed for reading a ClientHello, in milliseconds
pub fn hello_timeout_ms() -> u64 {
    5_000
}

/// Default time allowed for the TLS handshake, in milliseconds
pub fn handshake_timeout_ms() -> u64 {
    10_000
}

/// Default time a connection may sit without progress, in milliseconds
pub fn idle_timeout_ms() -> u64 {
    30_000
}

/// Default upper bound for an HTTP request head, in bytes
pub fn max_request_head() -> usize {
    16 * 1024
}

/// Default log level
pub fn log_level() -> String {
    LOG_LEVEL_STR.to_string()
}
