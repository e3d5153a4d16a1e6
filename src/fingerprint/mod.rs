//! ClientHello fingerprinting
//!
//! Decoding of the raw ClientHello, the per-connection table that keeps the
//! result until the request layer needs it, and the browser heuristics
//! evaluated against it.

mod heuristics;
pub mod hello;
pub mod table;

pub use hello::{parse_raw_client_hello, RawHelloInfo};
pub use table::{ConnKey, FingerprintTable, Registration};
