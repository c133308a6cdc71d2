//! Recover clean query text from model output.

use once_cell::sync::Lazy;
use regex::Regex;

/// First fenced block, optionally tagged `sql`.
static FENCED_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```(?:sql)?\s*(.*?)```").unwrap());

/// Strip a fenced code block from generated text.
///
/// Returns the trimmed content of the first fenced block when there is one,
/// otherwise the trimmed input. Applying it twice gives the same result as
/// applying it once.
#[must_use]
pub fn extract_query(text: &str) -> String {
    match FENCED_BLOCK.captures(text).and_then(|caps| caps.get(1)) {
        Some(inner) => inner.as_str().trim().to_string(),
        None => text.trim().to_string(),
    }
}
