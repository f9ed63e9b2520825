//! Shared fixtures for integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use youtube_fetcher::extractor::{SearchExtractor, SearchPage, VideoEntry};

/// One `videoRenderer` card as found in the results blob
pub fn video_card(id: &str, title: &str, thumbnail: Option<&str>) -> Value {
    let thumbnails: Vec<Value> = thumbnail
        .map(|url| {
            vec![
                json!({"url": format!("{}?small", url), "width": 120}),
                json!({"url": url, "width": 720}),
            ]
        })
        .unwrap_or_default();

    json!({
        "videoRenderer": {
            "videoId": id,
            "title": {"runs": [{"text": title}]},
            "ownerText": {"runs": [{
                "text": "Some Channel",
                "navigationEndpoint": {"browseEndpoint": {"browseId": "UCchannel"}}
            }]},
            "viewCountText": {"simpleText": "1,234 views"},
            "publishedTimeText": {"simpleText": "2 days ago"},
            "detailedMetadataSnippets": [{"snippetText": {"runs": [
                {"text": "first "}, {"text": "second"}
            ]}}],
            "thumbnail": {"thumbnails": thumbnails}
        }
    })
}

/// A results page embedding `items` in the initial data blob
pub fn search_html(items: Vec<Value>, estimated_results: u64) -> String {
    let data = json!({
        "estimatedResults": estimated_results.to_string(),
        "contents": {"twoColumnSearchResultsRenderer": {"primaryContents": {
            "sectionListRenderer": {"contents": [
                {"itemSectionRenderer": {"contents": items}}
            ]}
        }}}
    });
    format!(
        "<!DOCTYPE html><html><head><script nonce=\"x\">var ytInitialData = {};</script></head></html>",
        data
    )
}

/// A parsed entry with the given thumbnail
pub fn entry(id: &str, thumbnail: Option<String>) -> VideoEntry {
    VideoEntry {
        video_id: id.to_string(),
        title: format!("Video {}", id),
        channel_name: "Channel".to_string(),
        channel_id: "UCchannel".to_string(),
        view_count_text: "10 views".to_string(),
        views: 10,
        published_time: "1 day ago".to_string(),
        description_snippet: String::new(),
        thumbnail_url: thumbnail,
    }
}

/// Extractor returning a canned page
pub struct FakeExtractor {
    page: Option<SearchPage>,
    delay: Duration,
    panics: bool,
    calls: AtomicUsize,
    last_max_results: AtomicUsize,
}

impl FakeExtractor {
    pub fn with_page(page: SearchPage) -> Self {
        Self {
            page: Some(page),
            delay: Duration::ZERO,
            panics: false,
            calls: AtomicUsize::new(0),
            last_max_results: AtomicUsize::new(0),
        }
    }

    pub fn with_entries(entries: Vec<VideoEntry>) -> Self {
        Self::with_page(SearchPage {
            estimated_results: 1000,
            entries,
        })
    }

    pub fn failing() -> Self {
        Self {
            page: None,
            delay: Duration::ZERO,
            panics: false,
            calls: AtomicUsize::new(0),
            last_max_results: AtomicUsize::new(0),
        }
    }

    pub fn panicking() -> Self {
        Self {
            panics: true,
            ..Self::failing()
        }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// `max_results` passed to the most recent search
    pub fn last_max_results(&self) -> usize {
        self.last_max_results.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SearchExtractor for FakeExtractor {
    fn id(&self) -> &'static str {
        "fake"
    }

    async fn search(&self, _query: &str, max_results: usize) -> Option<SearchPage> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.last_max_results.store(max_results, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.panics {
            panic!("extractor exploded");
        }
        self.page.clone().map(|mut page| {
            page.entries.truncate(max_results);
            page
        })
    }
}

/// Minimal JPEG body (SOI marker plus padding)
pub fn jpeg_bytes() -> Vec<u8> {
    let mut body = vec![0xFF, 0xD8, 0xFF, 0xE0];
    body.extend_from_slice(&[0u8; 32]);
    body
}

/// Minimal PNG body (signature plus padding)
pub fn png_bytes() -> Vec<u8> {
    let mut body = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
    body.extend_from_slice(&[0u8; 16]);
    body
}
