//! Data structures for scraped search results

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One video card recovered from a search results page.
///
/// This is the single intermediate record; both output shapes are rendered
/// from it and never from the raw renderer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VideoEntry {
    pub video_id: String,
    pub title: String,
    pub channel_name: String,
    pub channel_id: String,
    /// View count text as displayed, e.g. "1,234 views" or "1.2M views"
    pub view_count_text: String,
    /// Normalized view count
    pub views: u64,
    pub published_time: String,
    pub description_snippet: String,
    /// Highest-resolution thumbnail, if the card carried one
    pub thumbnail_url: Option<String>,
}

impl VideoEntry {
    pub fn watch_url(&self) -> String {
        format!("https://www.youtube.com/watch?v={}", self.video_id)
    }

    pub fn channel_url(&self) -> String {
        format!("https://www.youtube.com/channel/{}", self.channel_id)
    }

    /// Render into the normalized shape
    pub fn to_standard(&self) -> StandardVideo {
        StandardVideo {
            video_id: self.video_id.clone(),
            title: self.title.clone(),
            channel_name: self.channel_name.clone(),
            channel_id: self.channel_id.clone(),
            views: self.views,
            published_time: self.published_time.clone(),
            description_snippet: self.description_snippet.clone(),
            thumbnail: self.thumbnail_url.clone().unwrap_or_default(),
        }
    }

    /// Render into the legacy-compatible shape
    pub fn to_legacy(&self) -> LegacyVideo {
        LegacyVideo {
            kind: "video".to_string(),
            id: self.video_id.clone(),
            url: self.watch_url(),
            channel_id: self.channel_id.clone(),
            channel_name: self.channel_name.clone(),
            channel_url: self.channel_url(),
            desc: self.description_snippet.clone(),
            published_time: self.published_time.clone(),
            thumbnail: self.thumbnail_url.clone().unwrap_or_default(),
            title: self.title.clone(),
            view_count: self.view_count_text.clone(),
        }
    }

    pub fn render(&self, format: OutputFormat) -> RenderedVideo {
        match format {
            OutputFormat::Standard => RenderedVideo::Standard(self.to_standard()),
            OutputFormat::Legacy => RenderedVideo::Legacy(self.to_legacy()),
        }
    }
}

/// Output shape selector
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputFormat {
    /// Snake-case keys, integer view count
    #[default]
    #[serde(rename = "standard")]
    Standard,
    /// PascalCase keys, derived URLs, raw view count text
    #[serde(rename = "tubebuddy", alias = "legacy")]
    Legacy,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "standard" => Ok(OutputFormat::Standard),
            "tubebuddy" | "legacy" => Ok(OutputFormat::Legacy),
            other => Err(format!("unknown output format: {}", other)),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Standard => write!(f, "standard"),
            OutputFormat::Legacy => write!(f, "tubebuddy"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StandardVideo {
    pub video_id: String,
    pub title: String,
    pub channel_name: String,
    pub channel_id: String,
    pub views: u64,
    pub published_time: String,
    pub description_snippet: String,
    pub thumbnail: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LegacyVideo {
    #[serde(rename = "Type")]
    pub kind: String,
    pub id: String,
    #[serde(rename = "URL")]
    pub url: String,
    pub channel_id: String,
    pub channel_name: String,
    pub channel_url: String,
    pub desc: String,
    pub published_time: String,
    pub thumbnail: String,
    pub title: String,
    pub view_count: String,
}

/// A video rendered in one of the output shapes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RenderedVideo {
    Standard(StandardVideo),
    Legacy(LegacyVideo),
}

impl RenderedVideo {
    /// Thumbnail URL, `None` when the card had none
    pub fn thumbnail_url(&self) -> Option<&str> {
        let url = match self {
            RenderedVideo::Standard(v) => v.thumbnail.as_str(),
            RenderedVideo::Legacy(v) => v.thumbnail.as_str(),
        };
        (!url.is_empty()).then_some(url)
    }
}

/// Structured content of one search results page
#[derive(Debug, Clone, Default)]
pub struct SearchPage {
    pub estimated_results: u64,
    pub entries: Vec<VideoEntry>,
}

impl SearchPage {
    pub fn render(&self, format: OutputFormat) -> ScrapeResult {
        ScrapeResult {
            estimated_results: self.estimated_results,
            videos: self.entries.iter().map(|e| e.render(format)).collect(),
        }
    }
}

/// Scrape payload handed to callers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrapeResult {
    pub estimated_results: u64,
    pub videos: Vec<RenderedVideo>,
}
