//! Logging helpers
//!
//! Thin wrapper around `env_logger` so the binary and tests share one setup path.

/// Initialize the global logger
///
/// `RUST_LOG` takes precedence over `level` when it is set.
///
/// # Parameters
///
/// * `level` - Default log level filter (error, warn, info, debug, trace)
pub fn init_logger(level: &str) {
    let env = env_logger::Env::default()
        .filter_or("RUST_LOG", level);

    // A second call (tests, embedding applications) keeps the first logger.
    let _ = env_logger::Builder::from_env(env).try_init();
}
