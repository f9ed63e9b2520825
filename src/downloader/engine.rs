//! Bounded-concurrency thumbnail download pipeline

use crate::downloader::fetch::{fetch_image, FetchedImage};
use crate::downloader::media::MediaType;
use crate::extractor::{OutputFormat, SearchExtractor};
use crate::utils::config::DownloadSettings;
use crate::utils::error::Result;
use crate::utils::retry::RetryPolicy;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use futures::future::join_all;
use reqwest::Client;
use serde::{Serialize, Serializer};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

/// Extra results requested from the scraper to absorb cards without a
/// thumbnail and downloads that fail
const SCRAPE_PADDING: usize = 5;

/// Download configuration
#[derive(Debug, Clone)]
pub struct DownloadConfig {
    pub concurrency: usize,      // Simultaneous in-flight downloads (default: 10)
    pub timeout: Duration,       // Per-request timeout (default: 30s)
    pub retry_attempts: usize,   // Retries per URL after the first try (default: 2)
    pub retry_delay: Duration,   // Delay before the first retry
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self::from(&DownloadSettings::default())
    }
}

impl From<&DownloadSettings> for DownloadConfig {
    fn from(settings: &DownloadSettings) -> Self {
        Self {
            concurrency: settings.concurrency.max(1),
            timeout: settings.timeout,
            retry_attempts: settings.retry_attempts,
            retry_delay: settings.retry_delay,
        }
    }
}

/// One downloaded thumbnail
#[derive(Debug, Clone, Serialize)]
pub struct Thumbnail {
    pub url: String,
    #[serde(rename = "base64", serialize_with = "encode_base64")]
    pub body: Vec<u8>,
    pub media_type: MediaType,
}

fn encode_base64<S: Serializer>(body: &[u8], serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(&STANDARD.encode(body))
}

/// Result payload of a thumbnail job
#[derive(Debug, Clone, Serialize)]
pub struct ThumbnailBatch {
    pub query: String,
    pub thumbnails: Vec<Thumbnail>,
    pub count: usize,
}

/// Scrapes a query, then downloads the result thumbnails concurrently
pub struct ThumbnailPipeline {
    extractor: Arc<dyn SearchExtractor>,
    client: Client,
    config: DownloadConfig,
}

impl ThumbnailPipeline {
    /// Create a pipeline; the connection pool is sized to the concurrency limit
    pub fn new(extractor: Arc<dyn SearchExtractor>, config: DownloadConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .pool_max_idle_per_host(config.concurrency)
            .build()?;

        Ok(Self {
            extractor,
            client,
            config,
        })
    }

    /// Fetch up to `max_thumbnails` thumbnails for `query`.
    ///
    /// `None` when the scrape fails, no card has a thumbnail, or every
    /// download fails. Order follows the scrape, not download completion.
    pub async fn fetch(&self, query: &str, max_thumbnails: usize) -> Option<ThumbnailBatch> {
        let Some(scrape) = self
            .extractor
            .scrape(
                query,
                max_thumbnails.saturating_add(SCRAPE_PADDING),
                OutputFormat::Standard,
            )
            .await
        else {
            error!(query = %query, "Scrape failed for thumbnail query");
            return None;
        };

        let urls: Vec<String> = scrape
            .videos
            .iter()
            .filter_map(|v| v.thumbnail_url())
            .map(str::to_string)
            .collect();

        if urls.is_empty() {
            warn!(query = %query, "No thumbnail URLs found");
            return None;
        }

        let results = self.download_all(&urls).await;
        let thumbnails = collect_thumbnails(urls, results, max_thumbnails);

        if thumbnails.is_empty() {
            error!(query = %query, "Failed to download any thumbnails");
            return None;
        }

        info!(query = %query, count = thumbnails.len(), "Thumbnails fetched");
        Some(ThumbnailBatch {
            query: query.to_string(),
            count: thumbnails.len(),
            thumbnails,
        })
    }

    /// Download every URL under the concurrency limit.
    ///
    /// Slot `i` of the result holds the outcome for `urls[i]`; a failed
    /// download is logged and left as `None`.
    pub async fn download_all(&self, urls: &[String]) -> Vec<Option<FetchedImage>> {
        let permits = Arc::new(Semaphore::new(self.config.concurrency));
        let retry = RetryPolicy::new(self.config.retry_attempts, self.config.retry_delay);

        let tasks = urls.iter().enumerate().map(|(index, url)| {
            let permits = Arc::clone(&permits);
            let client = &self.client;
            let retry = &retry;

            async move {
                let Ok(_permit) = permits.acquire().await else {
                    return None;
                };
                debug!(index, url = %url, "Downloading thumbnail");

                match fetch_image(client, url, retry).await {
                    Ok(image) => Some(image),
                    Err(e) => {
                        warn!(url = %url, error = %e, "Failed to download thumbnail");
                        None
                    }
                }
            }
        });

        join_all(tasks).await
    }
}

/// Pair successful downloads with their URLs, in input order, truncated to
/// `max` only after all downloads have resolved
pub fn collect_thumbnails(
    urls: Vec<String>,
    results: Vec<Option<FetchedImage>>,
    max: usize,
) -> Vec<Thumbnail> {
    urls.into_iter()
        .zip(results)
        .filter_map(|(url, result)| {
            result.map(|image| Thumbnail {
                url,
                body: image.body,
                media_type: image.media_type,
            })
        })
        .take(max)
        .collect()
}
