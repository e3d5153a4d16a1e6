//! MITM Detector: passive TLS interception detection
//!
//! Records the ClientHello of every incoming TLS connection before the
//! handshake starts, then compares it with the browser the client claims to
//! be in its HTTP `User-Agent`. Interception proxies terminate TLS and open a
//! new session with their own library, so the fingerprint the server sees no
//! longer matches the browser's.
//!
//! # Main Features
//!
//! - Lossless ClientHello capture: the bytes are replayed into the real handshake
//! - Per-connection fingerprint table, cleaned up when the connection ends
//! - Heuristics for Firefox, Chrome, Edge and Safari
//! - A small HTTPS server that reports the verdict as JSON
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use mitm_detector::config::DetectorConfig;
//! use mitm_detector::server::{MitmServer, VerdictReporter};
//! use mitm_detector::{create_self_signed_acceptor, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = DetectorConfig {
//!         self_signed: true,
//!         ..Default::default()
//!     };
//!     let acceptor = create_self_signed_acceptor(&config.server_name)?;
//!
//!     let server = MitmServer::bind(&config, acceptor, Arc::new(VerdictReporter)).await?;
//!     server.run().await
//! }
//! ```

// Public modules
pub mod common;
pub mod config;
pub mod fingerprint;
pub mod listener;
pub mod server;
pub mod tls;
pub mod verdict;

// Re-export commonly used structures and functions for convenience
pub use common::{parse_socket_addr, DetectorError, Result};
pub use fingerprint::{parse_raw_client_hello, ConnKey, FingerprintTable, RawHelloInfo};
pub use listener::{HelloInterceptor, HelloListener};
pub use server::MitmServer;
pub use tls::{create_self_signed_acceptor, create_tls_acceptor};
pub use verdict::{BrowserFamily, MitmAnnotator, MitmVerdict, RequestContext};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
