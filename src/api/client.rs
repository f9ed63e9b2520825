//! Data API client with credential rotation and response caching

use crate::api::cache::{cache_key, ResponseCache, CREDENTIAL_PARAM};
use crate::api::key_pool::KeyPool;
use crate::extractor::blob::as_count;
use crate::utils::config::{ApiMode, ApiSettings};
use crate::utils::error::{FetcherError, Result};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

/// Upstream limit on identifiers per call
pub const MAX_IDS_PER_REQUEST: usize = 50;

/// Full description of one video
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoDescription {
    pub description: String,
}

/// YouTube Data API v3 client.
///
/// In LIVE mode requests rotate through the configured credentials and every
/// successful response is cached. In MOCK mode only the cache is consulted.
pub struct YoutubeApiClient {
    mode: ApiMode,
    http: Client,
    base_url: String,
    cache: ResponseCache,
    keys: Mutex<KeyPool>,
    rotation_cooldown: Duration,
}

impl YoutubeApiClient {
    /// Create a client. LIVE mode requires at least one credential.
    pub fn new(settings: &ApiSettings) -> Result<Self> {
        let keys: Vec<String> = settings
            .api_keys
            .iter()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .collect();

        if settings.mode == ApiMode::Live && keys.is_empty() {
            return Err(FetcherError::Config(
                "At least one YouTube API key is required in LIVE mode".to_string(),
            ));
        }

        let http = Client::builder().timeout(settings.timeout).build()?;
        let cache = ResponseCache::new(&settings.cache_dir)?;

        info!(
            mode = ?settings.mode,
            keys = keys.len(),
            cache_dir = %settings.cache_dir.display(),
            "YouTube Data API client initialized"
        );

        Ok(Self {
            mode: settings.mode,
            http,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            cache,
            keys: Mutex::new(KeyPool::new(keys)),
            rotation_cooldown: settings.rotation_cooldown,
        })
    }

    pub fn mode(&self) -> ApiMode {
        self.mode
    }

    /// Call `endpoint` with `params`.
    ///
    /// `Ok(None)` for a cache miss in MOCK mode or a non-quota upstream
    /// error; `Err(QuotaExceeded)` once every credential has been rejected.
    pub async fn make_request(
        &self,
        endpoint: &str,
        params: &BTreeMap<String, String>,
    ) -> Result<Option<Value>> {
        let key = cache_key(endpoint, params);

        if self.mode == ApiMode::Mock {
            return Ok(self.cache.load(&key).await);
        }

        let attempts = {
            let pool = self.keys.lock().await;
            if pool.is_exhausted() {
                return Err(FetcherError::QuotaExceeded);
            }
            pool.len()
        };

        let url = format!("{}/{}", self.base_url, endpoint);
        let query: Vec<(&str, &str)> = params
            .iter()
            .filter(|(name, _)| name.as_str() != CREDENTIAL_PARAM)
            .map(|(name, value)| (name.as_str(), value.as_str()))
            .collect();

        for _ in 0..attempts {
            // The lock covers selection only, never the request itself.
            let Some((slot, credential)) = self.keys.lock().await.select() else {
                break;
            };

            debug!(endpoint = %endpoint, slot = slot + 1, "Calling Data API");
            let response = self
                .http
                .get(&url)
                .query(&query)
                .query(&[(CREDENTIAL_PARAM, credential.as_str())])
                .send()
                .await?;

            match response.status() {
                StatusCode::OK => {
                    let body: Value = response.json().await?;
                    if let Err(e) = self.cache.store(&key, &body).await {
                        warn!(endpoint = %endpoint, error = %e, "Failed to cache response");
                    }
                    return Ok(Some(body));
                }
                StatusCode::FORBIDDEN => {
                    self.keys.lock().await.mark_exhausted(slot);
                    warn!(slot = slot + 1, "YouTube key exhausted");
                    sleep(self.rotation_cooldown).await;
                }
                status => {
                    let text = response.text().await.unwrap_or_default();
                    error!(endpoint = %endpoint, status = %status, body = %text, "YouTube API error");
                    return Ok(None);
                }
            }
        }

        Err(FetcherError::QuotaExceeded)
    }

    /// Full descriptions for up to 50 videos, keyed by video id.
    ///
    /// Ids past the 50th are dropped. Videos missing from the response, or
    /// lacking a description, are omitted.
    pub async fn get_video_descriptions(
        &self,
        video_ids: &[String],
    ) -> Result<HashMap<String, VideoDescription>> {
        let Some(items) = self.fetch_items("videos", "snippet", video_ids).await? else {
            return Ok(HashMap::new());
        };

        Ok(items
            .iter()
            .filter_map(|item| {
                let id = item.get("id")?.as_str()?;
                let description = item.pointer("/snippet/description")?.as_str()?;
                Some((
                    id.to_string(),
                    VideoDescription {
                        description: description.to_string(),
                    },
                ))
            })
            .collect())
    }

    /// Subscriber counts for up to 50 channels, keyed by channel id.
    ///
    /// Channels with hidden or unparseable counts are omitted.
    pub async fn get_channel_subscribers(
        &self,
        channel_ids: &[String],
    ) -> Result<HashMap<String, u64>> {
        let Some(items) = self.fetch_items("channels", "statistics", channel_ids).await? else {
            return Ok(HashMap::new());
        };

        Ok(items
            .iter()
            .filter_map(|item| {
                let id = item.get("id")?.as_str()?;
                let count = as_count(item.pointer("/statistics/subscriberCount")?)?;
                Some((id.to_string(), count))
            })
            .collect())
    }

    /// `items` array of a batched lookup; `None` for empty input or a
    /// response without items
    async fn fetch_items(
        &self,
        endpoint: &str,
        part: &str,
        ids: &[String],
    ) -> Result<Option<Vec<Value>>> {
        if ids.is_empty() {
            return Ok(None);
        }
        if ids.len() > MAX_IDS_PER_REQUEST {
            warn!(
                endpoint = %endpoint,
                requested = ids.len(),
                "Dropping ids beyond the per-request limit"
            );
        }

        let batch = &ids[..ids.len().min(MAX_IDS_PER_REQUEST)];
        let mut params = BTreeMap::new();
        params.insert("part".to_string(), part.to_string());
        params.insert("id".to_string(), batch.join(","));

        let response = self.make_request(endpoint, &params).await?;
        Ok(response.and_then(|mut body| match body.get_mut("items").map(Value::take) {
            Some(Value::Array(items)) => Some(items),
            _ => None,
        }))
    }
}
