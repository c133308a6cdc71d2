//! Read-only query check
//!
//! A textual heuristic, not a parser: it looks for mutating keywords as whole
//! words and then requires a `SELECT` or `WITH` prefix. Obfuscated statements
//! may slip through; the store connection is read-only as a second line.

use once_cell::sync::Lazy;
use regex::Regex;

/// Keywords that disqualify a query wherever they appear as a whole word.
pub const FORBIDDEN_KEYWORDS: &[&str] = &[
    "INSERT", "UPDATE", "DELETE", "DROP", "ALTER", "CREATE", "TRUNCATE", "GRANT",
];

/// Error recorded on the workflow state when a query is rejected.
pub const REJECTION_MESSAGE: &str = "Query rejected: only SELECT queries are allowed.";

static FORBIDDEN: Lazy<Regex> = Lazy::new(|| {
    let alternation = FORBIDDEN_KEYWORDS.join("|");
    Regex::new(&format!(r"\b(?:{alternation})\b")).unwrap()
});

/// Whether `text` looks like a read-only query.
#[must_use]
pub fn is_read_only(text: &str) -> bool {
    let normalized = text.trim().to_uppercase();
    if FORBIDDEN.is_match(&normalized) {
        return false;
    }
    normalized.starts_with("SELECT") || normalized.starts_with("WITH")
}
