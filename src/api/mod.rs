//! YouTube Data API access

pub mod cache;
pub mod client;
pub mod key_pool;

pub use cache::{cache_key, ResponseCache};
pub use client::{VideoDescription, YoutubeApiClient, MAX_IDS_PER_REQUEST};
pub use key_pool::KeyPool;
