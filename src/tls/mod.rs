//! TLS handling module
//!
//! Builds the OpenSSL acceptor that performs the real handshake after the
//! ClientHello has been captured and replayed.

mod acceptor;

pub use acceptor::{create_self_signed_acceptor, create_tls_acceptor};
