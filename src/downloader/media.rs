//! Media type detection for downloaded images

use serde::{Serialize, Serializer};
use std::fmt;

/// Image formats served by the thumbnail CDN
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaType {
    Jpeg,
    Png,
    Webp,
}

impl MediaType {
    pub fn as_mime(&self) -> &'static str {
        match self {
            MediaType::Jpeg => "image/jpeg",
            MediaType::Png => "image/png",
            MediaType::Webp => "image/webp",
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_mime())
    }
}

impl Serialize for MediaType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_mime())
    }
}

const PNG_SIGNATURE: &[u8] = b"\x89PNG\r\n\x1a\n";
const JPEG_SOI: &[u8] = b"\xff\xd8";

/// Media type from the leading bytes, if a known signature matches
pub fn sniff(data: &[u8]) -> Option<MediaType> {
    if data.len() >= 12 && &data[..4] == b"RIFF" && &data[8..12] == b"WEBP" {
        Some(MediaType::Webp)
    } else if data.starts_with(PNG_SIGNATURE) {
        Some(MediaType::Png)
    } else if data.starts_with(JPEG_SOI) {
        Some(MediaType::Jpeg)
    } else {
        None
    }
}

/// Detect the real media type.
///
/// The byte signature wins over the declared `Content-Type`, since the CDN
/// labels WebP bodies as JPEG. Falls back to the header, then to JPEG.
pub fn detect_media_type(data: &[u8], content_type: &str) -> MediaType {
    if let Some(sniffed) = sniff(data) {
        return sniffed;
    }

    let declared = content_type.to_lowercase();
    if declared.contains("webp") {
        MediaType::Webp
    } else if declared.contains("png") {
        MediaType::Png
    } else {
        MediaType::Jpeg
    }
}
