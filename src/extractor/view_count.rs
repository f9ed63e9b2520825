//! View count normalization
//!
//! Abbreviated counts ("1.2M views") are converted through `f64` and
//! truncated, so they are only as precise as the text shown on the page.
//! Counts beyond `u64` saturate at `u64::MAX`.

/// Parse displayed view count text into an integer.
///
/// `"12,345 views"` gives 12345, `"1.2M views"` gives 1200000, `"No views"`
/// and anything without digits give 0.
pub fn parse_view_count(text: &str) -> u64 {
    let lowered = text.to_lowercase().replace(',', "");
    let trimmed = lowered.trim();
    let text = trimmed
        .strip_suffix("views")
        .or_else(|| trimmed.strip_suffix("view"))
        .unwrap_or(trimmed)
        .trim();

    if text.is_empty() || text == "no" {
        return 0;
    }

    let multiplier = match text.chars().last() {
        Some('k') => Some(1_000f64),
        Some('m') => Some(1_000_000f64),
        Some('b') => Some(1_000_000_000f64),
        _ => None,
    };

    if let Some(multiplier) = multiplier {
        let numeric: String = text[..text.len() - 1]
            .chars()
            .filter(|c| c.is_ascii_digit() || *c == '.')
            .collect();
        return numeric
            .parse::<f64>()
            .map(|n| (n * multiplier) as u64)
            .unwrap_or(0);
    }

    let digits: String = text.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return 0;
    }
    // Only overflow can fail once the string is all digits.
    digits.parse::<u64>().unwrap_or(u64::MAX)
}
