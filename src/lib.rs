//! YouTube fetcher library
//!
//! Scrapes search results, downloads thumbnails, queries the Data API and
//! tracks asynchronous jobs that wrap the first two.

pub mod api;
pub mod database;
pub mod downloader;
pub mod extractor;
pub mod jobs;
pub mod utils;

// Re-export main types for easier use
pub use api::YoutubeApiClient;
pub use database::SqliteJobStore;
pub use downloader::{DownloadConfig, ThumbnailBatch, ThumbnailPipeline};
pub use extractor::{OutputFormat, ScrapeResult, SearchExtractor, YoutubeScraper};
pub use jobs::{JobHandler, JobOutcome, JobRecord, JobRequest, JobStatus, JobStore, MemoryJobStore};
pub use utils::{FetcherError, Settings};
