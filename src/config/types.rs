//! Configuration types

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize};

use crate::common::parse_socket_addr;
use super::defaults;

/// Custom deserializer for socket addresses, accepting `host:port` names
fn deserialize_socket_addr<'de, D>(deserializer: D) -> std::result::Result<SocketAddr, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    parse_socket_addr(&s).map_err(serde::de::Error::custom)
}

/// Detector configuration
///
/// Loaded from (lowest to highest priority) defaults, a JSON file,
/// `MITM_DETECTOR_*` environment variables and command line arguments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DetectorConfig {
    /// Listen address (host:port)
    #[serde(deserialize_with = "deserialize_socket_addr")]
    pub listen: SocketAddr,

    /// PEM certificate (chain) path
    pub cert: PathBuf,

    /// PEM private key path
    pub key: PathBuf,

    /// Generate an ephemeral self-signed certificate instead of loading `cert`/`key`
    pub self_signed: bool,

    /// Subject name of the generated certificate
    pub server_name: String,

    /// Time allowed for a client to send its ClientHello, in milliseconds
    pub hello_timeout_ms: u64,

    /// Time allowed for the TLS handshake after the ClientHello, in milliseconds
    pub handshake_timeout_ms: u64,

    /// Longest wait for a client read or write once the session is up, in milliseconds
    pub idle_timeout_ms: u64,

    /// Largest accepted HTTP request head, in bytes
    pub max_request_head: usize,

    /// Log level (error, warn, info, debug, trace)
    pub log_level: String,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            listen: defaults::listen(),
            cert: defaults::cert_path(),
            key: defaults::key_path(),
            self_signed: false,
            server_name: defaults::server_name(),
            hello_timeout_ms: defaults::hello_timeout_ms(),
            handshake_timeout_ms: defaults::handshake_timeout_ms(),
            idle_timeout_ms: defaults::idle_timeout_ms(),
            max_request_head: defaults::max_request_head(),
            log_level: defaults::log_level(),
        }
    }
}

impl DetectorConfig {
    /// ClientHello read timeout
    pub fn hello_timeout(&self) -> Duration {
        Duration::from_millis(self.hello_timeout_ms)
    }

    /// TLS handshake timeout
    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_millis(self.handshake_timeout_ms)
    }

    /// Per-operation timeout on an established connection
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_millis(self.idle_timeout_ms)
    }
}
