pub mod blob;
pub mod models;
pub mod traits;
pub mod view_count;
pub mod youtube;

pub use models::{OutputFormat, RenderedVideo, ScrapeResult, SearchPage, VideoEntry};
pub use traits::SearchExtractor;
pub use view_count::parse_view_count;
pub use youtube::YoutubeScraper;
