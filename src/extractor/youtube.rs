//! Search results scraper
//!
//! Fetches the HTML results page with a browser identity and recovers video
//! cards from the embedded data blob instead of rendering the page.

use crate::extractor::blob::{array_at, as_count, extract_initial_data, find_key, text_at};
use crate::extractor::models::{SearchPage, VideoEntry};
use crate::extractor::traits::SearchExtractor;
use crate::extractor::view_count::parse_view_count;
use crate::utils::config::ScraperSettings;
use crate::utils::error::{FetcherError, Result};
use crate::utils::retry::{send_with_retry, RetryPolicy};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_LANGUAGE, COOKIE};
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, error, info, warn};

/// Path from the blob root to the list of result sections
const SECTIONS_POINTER: &str =
    "/contents/twoColumnSearchResultsRenderer/primaryContents/sectionListRenderer/contents";

/// Key marking a video card; other cards (shelves, ads, channels) lack it
const VIDEO_RENDERER_KEY: &str = "videoRenderer";

/// Key whose presence shows the page carried real results
const ESTIMATED_RESULTS_KEY: &str = "estimatedResults";

/// Scraper for the public search results page
pub struct YoutubeScraper {
    client: Client,
    base_url: String,
    retry: RetryPolicy,
}

impl YoutubeScraper {
    /// Build a scraper with a reusable HTTP session
    pub fn new(settings: &ScraperSettings) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
        headers.insert(
            COOKIE,
            HeaderValue::from_str(&settings.cookies)
                .map_err(|e| FetcherError::Config(format!("Invalid YOUTUBE_COOKIES: {}", e)))?,
        );

        let client = Client::builder()
            .user_agent(settings.user_agent.as_str())
            .default_headers(headers)
            .timeout(settings.timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            retry: RetryPolicy::new(settings.retry_attempts, settings.retry_backoff),
        })
    }

    /// Download the results page HTML, `None` on any transport failure
    async fn fetch_page(&self, query: &str) -> Option<String> {
        let url = format!("{}/results", self.base_url);
        let response = send_with_retry(&self.retry, "search", || {
            self.client
                .get(&url)
                .query(&[("search_query", query), ("page", "1")])
        })
        .await
        .ok()?;

        let response = match response.error_for_status() {
            Ok(r) => r,
            Err(e) => {
                error!(query = %query, error = %e, "Search page request failed");
                return None;
            }
        };

        match response.text().await {
            Ok(body) => Some(body),
            Err(e) => {
                error!(query = %query, error = %e, "Failed to read search page body");
                None
            }
        }
    }
}

#[async_trait]
impl SearchExtractor for YoutubeScraper {
    fn id(&self) -> &'static str {
        "youtube-html"
    }

    async fn search(&self, query: &str, max_results: usize) -> Option<SearchPage> {
        debug!(query = %query, max_results, "Scraping search results");
        let html = self.fetch_page(query).await?;
        let page = parse_search_page(&html, max_results)?;
        info!(
            query = %query,
            videos = page.entries.len(),
            estimated_results = page.estimated_results,
            "Scraped search results"
        );
        Some(page)
    }
}

/// Parse a results page into at most `max_results` video entries.
///
/// Fails when the blob is missing or malformed, or when it has no
/// estimated result count (the page did not load real results).
pub fn parse_search_page(html: &str, max_results: usize) -> Option<SearchPage> {
    let data = extract_initial_data(html)?;

    let Some(estimated) = find_key(&data, ESTIMATED_RESULTS_KEY) else {
        warn!("estimatedResults not found in ytInitialData");
        return None;
    };
    let Some(estimated_results) = as_count(estimated) else {
        warn!(value = %estimated, "estimatedResults is not a count");
        return None;
    };

    let entries = collect_video_renderers(&data, max_results)
        .into_iter()
        .filter_map(parse_video_renderer)
        .collect();

    Some(SearchPage {
        estimated_results,
        entries,
    })
}

/// Video renderers in document order, capped before any field parsing
pub fn collect_video_renderers(data: &Value, max_results: usize) -> Vec<&Value> {
    array_at(data, SECTIONS_POINTER)
        .iter()
        .flat_map(|section| array_at(section, "/itemSectionRenderer/contents"))
        .filter_map(|item| item.get(VIDEO_RENDERER_KEY))
        .take(max_results)
        .collect()
}

/// Read one video renderer. Cards without a video id are skipped.
pub fn parse_video_renderer(renderer: &Value) -> Option<VideoEntry> {
    let video_id = renderer
        .get("videoId")
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())?
        .to_string();

    let view_count_text = view_count_text(renderer);

    Some(VideoEntry {
        video_id,
        title: text_at(renderer, "/title/runs/0/text"),
        channel_name: text_at(renderer, "/ownerText/runs/0/text"),
        channel_id: text_at(
            renderer,
            "/ownerText/runs/0/navigationEndpoint/browseEndpoint/browseId",
        ),
        views: parse_view_count(&view_count_text),
        view_count_text,
        published_time: text_at(renderer, "/publishedTimeText/simpleText"),
        description_snippet: description_snippet(renderer),
        thumbnail_url: best_thumbnail(renderer),
    })
}

fn view_count_text(renderer: &Value) -> String {
    let full = text_at(renderer, "/viewCountText/simpleText");
    if full.is_empty() {
        text_at(renderer, "/shortViewCountText/simpleText")
    } else {
        full
    }
}

fn description_snippet(renderer: &Value) -> String {
    array_at(renderer, "/detailedMetadataSnippets/0/snippetText/runs")
        .iter()
        .filter_map(|run| run.get("text").and_then(Value::as_str))
        .collect()
}

/// Last entry of the thumbnail list is the largest
fn best_thumbnail(renderer: &Value) -> Option<String> {
    array_at(renderer, "/thumbnail/thumbnails")
        .last()
        .and_then(|t| t.get("url"))
        .and_then(Value::as_str)
        .filter(|url| !url.is_empty())
        .map(str::to_string)
}
