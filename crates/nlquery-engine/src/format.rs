//! Render result rows into prompt text.

use nlquery_utils::types::Row;

/// Text used when a query returned no rows.
pub const NO_RESULTS: &str = "No results found.";

/// Render up to `max_rows` rows as numbered JSON lines.
///
/// Rows beyond the limit are summarised as `... and K more rows`.
#[must_use]
pub fn format_results_for_prompt(rows: &[Row], max_rows: usize) -> String {
    if rows.is_empty() {
        return NO_RESULTS.to_string();
    }

    let mut lines: Vec<String> = rows
        .iter()
        .take(max_rows)
        .enumerate()
        .map(|(i, row)| {
            let rendered = serde_json::to_string(row).unwrap_or_else(|_| format!("{row:?}"));
            format!("Row {}: {rendered}", i + 1)
        })
        .collect();

    if rows.len() > max_rows {
        lines.push(format!("... and {} more rows", rows.len() - max_rows));
    }

    lines.join("\n")
}
