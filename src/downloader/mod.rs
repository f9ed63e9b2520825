//! Thumbnail download pipeline

pub mod engine;
pub mod fetch;
pub mod media;

// Re-export for convenience
pub use engine::{DownloadConfig, Thumbnail, ThumbnailBatch, ThumbnailPipeline};
pub use media::{detect_media_type, MediaType};
