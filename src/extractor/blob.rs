//! Recovery of the structured data blob embedded in a results page
//!
//! The page inlines a large JSON object for client-side rendering. Its shape
//! is unversioned and changes without notice, so it is kept as a generic
//! `serde_json::Value` and read through lenient accessors.

use serde_json::Value;
use tracing::{debug, warn};

/// Assignment that precedes the embedded object in the page source
pub const INITIAL_DATA_MARKER: &str = "var ytInitialData = ";

/// Slice of `text` holding the first balanced `{...}` object.
///
/// Braces inside string literals, escaped quotes included, do not count.
/// Returns `None` when no object starts the text or it never closes.
pub fn balanced_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    if !text[..start].trim().is_empty() {
        return None;
    }

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, byte) in text.as_bytes()[start..].iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if *byte == b'\\' {
                escaped = true;
            } else if *byte == b'"' {
                in_string = false;
            }
            continue;
        }

        match byte {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }

    None
}

/// Locate the marker in `html` and parse the object that follows it.
///
/// Every failure (missing marker, unbalanced braces, invalid JSON) yields
/// `None`.
pub fn extract_initial_data(html: &str) -> Option<Value> {
    let Some(position) = html.find(INITIAL_DATA_MARKER) else {
        warn!("No ytInitialData found in page");
        return None;
    };

    let rest = &html[position + INITIAL_DATA_MARKER.len()..];
    let Some(object) = balanced_object(rest) else {
        warn!("ytInitialData object is not terminated");
        return None;
    };

    match serde_json::from_str(object) {
        Ok(value) => {
            debug!(bytes = object.len(), "Parsed ytInitialData");
            Some(value)
        }
        Err(e) => {
            warn!(error = %e, "Failed to parse ytInitialData JSON");
            None
        }
    }
}

/// Depth-first search for the first non-null value stored under `key`,
/// descending into objects and arrays in document order.
pub fn find_key<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    match value {
        Value::Object(map) => {
            if let Some(found) = map.get(key).filter(|v| !v.is_null()) {
                return Some(found);
            }
            map.values().find_map(|v| find_key(v, key))
        }
        Value::Array(items) => items.iter().find_map(|v| find_key(v, key)),
        _ => None,
    }
}

/// String at a JSON pointer, empty when any step is missing
pub fn text_at(value: &Value, pointer: &str) -> String {
    value
        .pointer(pointer)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

/// Array at a JSON pointer, empty when missing or not an array
pub fn array_at<'a>(value: &'a Value, pointer: &str) -> &'a [Value] {
    value
        .pointer(pointer)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
}

/// Interpret a count that may arrive as a number or as digit text
pub fn as_count(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
