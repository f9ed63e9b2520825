//! Error handling for the fetcher

use thiserror::Error;

/// Main error type for the fetcher
#[derive(Debug, Error)]
pub enum FetcherError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Job not found: {0}")]
    JobNotFound(String),

    #[error("Job {job_id} cannot move from {from} to {to}")]
    InvalidTransition {
        job_id: String,
        from: String,
        to: String,
    },

    #[error("Progress must be between 0 and 100, got {0}")]
    InvalidProgress(u8),

    /// Every credential in the key pool is exhausted.
    #[error("YOUTUBE_QUOTA_EXCEEDED")]
    QuotaExceeded,

    #[error("Job exceeded its deadline of {0:?}")]
    DeadlineExceeded(std::time::Duration),
}

impl FetcherError {
    /// True when the upstream API refused every available credential.
    pub fn is_quota_exceeded(&self) -> bool {
        matches!(self, FetcherError::QuotaExceeded)
    }
}

pub type Result<T> = std::result::Result<T, FetcherError>;
