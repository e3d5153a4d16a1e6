//! Error handling module
//!
//! This module defines the error types and result type aliases used in the application.

use thiserror::Error;
use std::io;

/// MITM detector error type
#[derive(Error, Debug)]
pub enum DetectorError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// OpenSSL error
    #[error("OpenSSL error: {0}")]
    Ssl(#[from] openssl::error::ErrorStack),

    /// TLS handshake error
    #[error("TLS handshake error: {0}")]
    TlsHandshake(String),

    /// Malformed or unsupported HTTP request
    #[error("HTTP error: {0}")]
    Http(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Other error
    #[error("Other error: {0}")]
    Other(String),
}

impl From<http::Error> for DetectorError {
    fn from(err: http::Error) -> Self {
        DetectorError::Http(err.to_string())
    }
}

/// Result type alias
///
/// This is a `Result` type alias that uses our custom `DetectorError`.
pub type Result<T> = std::result::Result<T, DetectorError>;
