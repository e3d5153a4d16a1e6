//! Demonstration HTTPS server
//!
//! Wires the interceptor, the fingerprint table and the verdict annotator
//! into a small HTTP/1.1 server. Each request is handed to a
//! [`RequestHandler`] together with its verdict.

mod connection;
mod handler;
pub mod framing;
#[allow(clippy::module_inception)]
mod server;

pub use connection::{serve_connection, ConnectionLimits};
pub use handler::{RequestHandler, VerdictReporter};
pub use server::MitmServer;
