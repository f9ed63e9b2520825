//! Single image download with retries

use crate::downloader::media::{detect_media_type, MediaType};
use crate::utils::retry::{send_with_retry, RetryPolicy};
use anyhow::{anyhow, Result};
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use tracing::debug;

/// A downloaded image body with its detected type
#[derive(Debug, Clone)]
pub struct FetchedImage {
    pub body: Vec<u8>,
    pub media_type: MediaType,
}

/// Download one URL. Transient failures are retried per `retry`; client
/// errors fail immediately.
pub async fn fetch_image(client: &Client, url: &str, retry: &RetryPolicy) -> Result<FetchedImage> {
    let response = send_with_retry(retry, "thumbnail", || client.get(url)).await?;

    if !response.status().is_success() {
        return Err(anyhow!("HTTP error: {}", response.status()));
    }

    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();

    let body = response.bytes().await?.to_vec();
    if body.is_empty() {
        return Err(anyhow!("empty body"));
    }

    let media_type = detect_media_type(&body, &content_type);
    debug!(url = %url, bytes = body.len(), media_type = %media_type, "Thumbnail downloaded");

    Ok(FetchedImage { body, media_type })
}
