//! Utility modules for error handling, configuration and transport plumbing

pub mod config;
pub mod error;
pub mod logging;
pub mod retry;

// Re-export for convenience
pub use config::{ApiMode, ApiSettings, DownloadSettings, JobSettings, ScraperSettings, Settings};
pub use error::{FetcherError, Result};
pub use retry::RetryPolicy;
