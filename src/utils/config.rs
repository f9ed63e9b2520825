//! Application configuration
//!
//! Settings are resolved once at startup from the process environment. Every
//! mandatory value is checked up front so a misconfigured worker fails before
//! it accepts any job.

use crate::utils::error::{FetcherError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Number of numbered credential slots read from the environment
pub const MAX_API_KEYS: usize = 12;

/// Operating mode of the Data API client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ApiMode {
    /// Issue real requests and populate the cache
    Live,
    /// Replay cached responses only, never touch the network
    Mock,
}

impl FromStr for ApiMode {
    type Err = FetcherError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_uppercase().as_str() {
            "LIVE" => Ok(ApiMode::Live),
            "MOCK" => Ok(ApiMode::Mock),
            other => Err(FetcherError::Config(format!(
                "YOUTUBE_MODE must be LIVE or MOCK, got {:?}",
                other
            ))),
        }
    }
}

/// Top-level settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub log_level: String,
    pub scraper: ScraperSettings,
    pub api: ApiSettings,
    pub download: DownloadSettings,
    pub jobs: JobSettings,
}

/// Identity and transport settings for the search page scraper
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScraperSettings {
    pub base_url: String,
    pub user_agent: String,
    pub cookies: String,
    pub timeout: Duration,
    pub retry_attempts: usize,
    pub retry_backoff: Duration,
}

impl ScraperSettings {
    /// Settings pointing at the public site with the given identity
    pub fn new(user_agent: impl Into<String>, cookies: impl Into<String>) -> Self {
        Self {
            base_url: "https://www.youtube.com".to_string(),
            user_agent: user_agent.into(),
            cookies: cookies.into(),
            timeout: Duration::from_secs(30),
            retry_attempts: 3,
            retry_backoff: Duration::from_secs(1),
        }
    }
}

/// Data API client settings
#[derive(Clone, Serialize, Deserialize)]
pub struct ApiSettings {
    pub mode: ApiMode,
    pub base_url: String,
    pub cache_dir: PathBuf,
    pub api_keys: Vec<String>,
    pub rotation_cooldown: Duration,
    pub timeout: Duration,
}

impl ApiSettings {
    pub fn new(mode: ApiMode, cache_dir: PathBuf, api_keys: Vec<String>) -> Self {
        Self {
            mode,
            base_url: "https://www.googleapis.com/youtube/v3".to_string(),
            cache_dir,
            api_keys,
            rotation_cooldown: Duration::from_millis(500),
            timeout: Duration::from_secs(30),
        }
    }
}

// Keys are secrets; only their count is printed.
impl fmt::Debug for ApiSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiSettings")
            .field("mode", &self.mode)
            .field("base_url", &self.base_url)
            .field("cache_dir", &self.cache_dir)
            .field("api_keys", &format_args!("<{} keys>", self.api_keys.len()))
            .field("rotation_cooldown", &self.rotation_cooldown)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Thumbnail download settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadSettings {
    /// Maximum simultaneous in-flight downloads
    pub concurrency: usize,
    /// Per-request timeout
    pub timeout: Duration,
    /// Retries per URL after the first attempt; the default of 2 gives
    /// 3 attempts in total
    pub retry_attempts: usize,
    pub retry_delay: Duration,
}

impl Default for DownloadSettings {
    fn default() -> Self {
        Self {
            concurrency: 10,
            timeout: Duration::from_secs(30),
            retry_attempts: 2,
            retry_delay: Duration::from_millis(250),
        }
    }
}

/// Job lifecycle settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSettings {
    /// How long terminal records stay queryable
    pub retention: Duration,
    /// Non-terminal records untouched for this long are treated as abandoned
    pub stale_after: Option<Duration>,
    /// Upper bound on a single job, scrape and downloads included
    pub deadline: Option<Duration>,
    /// SQLite URL for a shared store; memory store when absent
    pub database_url: Option<String>,
}

impl Default for JobSettings {
    fn default() -> Self {
        Self {
            retention: Duration::from_secs(3600),
            stale_after: Some(Duration::from_secs(6 * 3600)),
            deadline: Some(Duration::from_secs(300)),
            database_url: None,
        }
    }
}

impl Settings {
    /// Resolve settings from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Resolve settings from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let required = |name: &str| {
            var(name).ok_or_else(|| FetcherError::Config(format!("{} is required", name)))
        };

        let mode: ApiMode = required("YOUTUBE_MODE")?.parse()?;
        let cache_dir = PathBuf::from(required("YOUTUBE_CACHE_DIR")?);

        let api_keys: Vec<String> = (1..=MAX_API_KEYS)
            .filter_map(|i| var(&format!("YOUTUBE_API_KEY_{}", i)))
            .map(|k| k.trim().to_string())
            .collect();
        if mode == ApiMode::Live && api_keys.is_empty() {
            return Err(FetcherError::Config(format!(
                "At least one YOUTUBE_API_KEY_N is required (1-{})",
                MAX_API_KEYS
            )));
        }

        let mut scraper =
            ScraperSettings::new(required("YOUTUBE_USER_AGENT")?, required("YOUTUBE_COOKIES")?);
        if let Some(secs) = parse_number::<u64>(&var, "SCRAPE_TIMEOUT_SECS")? {
            scraper.timeout = Duration::from_secs(secs);
        }
        if let Some(n) = parse_number::<usize>(&var, "SCRAPE_RETRIES")? {
            scraper.retry_attempts = n;
        }

        let mut download = DownloadSettings::default();
        if let Some(n) = parse_number::<usize>(&var, "THUMBNAIL_CONCURRENCY")? {
            if n == 0 {
                return Err(FetcherError::Config(
                    "THUMBNAIL_CONCURRENCY must be at least 1".to_string(),
                ));
            }
            download.concurrency = n;
        }
        if let Some(secs) = parse_number::<u64>(&var, "THUMBNAIL_TIMEOUT_SECS")? {
            download.timeout = Duration::from_secs(secs);
        }
        if let Some(n) = parse_number::<usize>(&var, "THUMBNAIL_RETRIES")? {
            download.retry_attempts = n;
        }

        let mut jobs = JobSettings::default();
        if let Some(secs) = parse_number::<u64>(&var, "JOB_RETENTION_SECS")? {
            jobs.retention = Duration::from_secs(secs);
        }
        if let Some(secs) = parse_number::<u64>(&var, "JOB_STALE_AFTER_SECS")? {
            jobs.stale_after = (secs > 0).then(|| Duration::from_secs(secs));
        }
        if let Some(secs) = parse_number::<u64>(&var, "JOB_DEADLINE_SECS")? {
            jobs.deadline = (secs > 0).then(|| Duration::from_secs(secs));
        }
        jobs.database_url = var("JOB_DATABASE_URL");

        Ok(Self {
            log_level: var("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            scraper,
            api: ApiSettings::new(mode, cache_dir, api_keys),
            download,
            jobs,
        })
    }
}

fn parse_number<T: FromStr>(
    var: &impl Fn(&str) -> Option<String>,
    name: &str,
) -> Result<Option<T>> {
    match var(name) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| FetcherError::Config(format!("{} must be a number, got {:?}", name, raw))),
        None => Ok(None),
    }
}
