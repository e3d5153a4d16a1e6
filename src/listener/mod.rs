//! Intercepting listener
//!
//! Reads each connection's ClientHello before the TLS handshake and hands
//! the TLS server an equivalent, replayed byte stream.

mod interceptor;
mod replay;

pub use interceptor::{Accepted, HelloInterceptor, HelloListener, StreamListener};
pub use replay::ReplayStream;
