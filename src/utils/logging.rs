//! Logging initialization
//!
//! `RUST_LOG` wins when set; otherwise the configured level applies to every
//! target.

use crate::utils::error::{FetcherError, Result};
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Parse a level name such as `info` or `WARNING`
pub fn parse_level(level: &str) -> Result<Level> {
    match level.trim().to_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" | "warning" => Ok(Level::WARN),
        "error" | "critical" => Ok(Level::ERROR),
        other => Err(FetcherError::Config(format!("Invalid LOG_LEVEL: {}", other))),
    }
}

/// Install the global subscriber. Safe to call more than once.
pub fn init_logging(level: &str) -> Result<()> {
    let level = parse_level(level)?;
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_lowercase()));

    // A second call (tests, embedded use) keeps the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init();

    Ok(())
}
