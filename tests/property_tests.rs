//! Property-based tests for the query guard, the text extractor and chunking
//!
//! ## Configuration
//!
//! - `PROPTEST_CASES`: Number of test cases per property (default: 64)
//! - `PROPTEST_MAX_SHRINK_ITERS`: Max shrinking iterations on failure (default: 1000)
//!
//! ```bash
//! PROPTEST_CASES=256 cargo test --test property_tests
//! ```

use nlquery::{extract_query, is_read_only};
use nlquery_engine::chunk_text;
use nlquery_engine::guard::FORBIDDEN_KEYWORDS;
use proptest::prelude::*;
use std::env;

const DEFAULT_PROPTEST_CASES: u32 = 64;
const DEFAULT_MAX_SHRINK_ITERS: u32 = 1000;

/// ProptestConfig honouring `PROPTEST_CASES` and `PROPTEST_MAX_SHRINK_ITERS`.
fn proptest_config() -> ProptestConfig {
    let cases = env::var("PROPTEST_CASES")
        .ok()
        .and_then(|s| s.parse::<u32>().ok())
        .unwrap_or(DEFAULT_PROPTEST_CASES);
    let max_shrink_iters = env::var("PROPTEST_MAX_SHRINK_ITERS")
        .ok()
        .and_then(|s| s.parse::<u32>().ok())
        .unwrap_or(DEFAULT_MAX_SHRINK_ITERS);

    ProptestConfig {
        cases,
        max_shrink_iters,
        max_shrink_time: 30000,
        ..ProptestConfig::default()
    }
}

/// Whether any whole word of `text` is a forbidden keyword.
fn has_forbidden_word(text: &str) -> bool {
    text.split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .any(|word| FORBIDDEN_KEYWORDS.contains(&word.to_uppercase().as_str()))
}

/// `word` with each letter's case chosen independently.
fn arb_mixed_case(word: &'static str) -> impl Strategy<Value = String> {
    prop::collection::vec(any::<bool>(), word.len()).prop_map(move |upper| {
        word.chars()
            .zip(upper)
            .map(|(c, up)| {
                if up {
                    c.to_ascii_uppercase()
                } else {
                    c.to_ascii_lowercase()
                }
            })
            .collect()
    })
}

fn arb_keyword() -> impl Strategy<Value = String> {
    prop::sample::select(FORBIDDEN_KEYWORDS).prop_flat_map(arb_mixed_case)
}

fn arb_read_prefix() -> impl Strategy<Value = String> {
    prop_oneof![arb_mixed_case("SELECT"), arb_mixed_case("WITH")]
}

/// SQL-ish filler drawn from a small ASCII alphabet.
fn arb_filler(max: usize) -> impl Strategy<Value = String> {
    prop::string::string_regex(&format!("[a-z0-9_ ,*()=.']{{0,{max}}}")).unwrap()
}

/// Text with a good chance of containing fences, tags and stray backticks.
fn arb_fenced_text() -> impl Strategy<Value = String> {
    prop::collection::vec(
        prop_oneof![
            Just("```".to_string()),
            Just("```sql".to_string()),
            Just("\n".to_string()),
            Just(" ".to_string()),
            Just("`".to_string()),
            "[a-zA-Z0-9 ;*]{1,12}",
        ],
        0..12,
    )
    .prop_map(|parts| parts.concat())
}

proptest! {
    #![proptest_config(proptest_config())]

    #[test]
    fn prop_forbidden_keyword_is_always_rejected(
        prefix in prop_oneof![arb_read_prefix(), Just(String::new())],
        left in arb_filler(20),
        keyword in arb_keyword(),
        right in arb_filler(20),
    ) {
        let text = format!("{prefix} {left} {keyword} {right}");
        prop_assert!(!is_read_only(&text), "accepted: {text:?}");
    }

    #[test]
    fn prop_clean_select_or_with_is_accepted(
        leading in "[ \t\n]{0,3}",
        prefix in arb_read_prefix(),
        rest in arb_filler(60),
    ) {
        prop_assume!(!has_forbidden_word(&rest));
        let text = format!("{leading}{prefix} {rest}");
        prop_assert!(is_read_only(&text), "rejected: {text:?}");
    }

    #[test]
    fn prop_text_without_read_prefix_is_rejected(
        first in "[a-v][a-z]{0,8}",
        rest in arb_filler(30),
    ) {
        let upper = first.to_uppercase();
        prop_assume!(!upper.starts_with("SELECT") && !upper.starts_with("WITH"));
        let text = format!("{first} {rest}");
        prop_assert!(!is_read_only(&text));
    }

    #[test]
    fn prop_extract_is_idempotent_on_any_text(text in any::<String>()) {
        let once = extract_query(&text);
        prop_assert_eq!(extract_query(&once), once);
    }

    #[test]
    fn prop_extract_is_idempotent_on_fenced_text(text in arb_fenced_text()) {
        let once = extract_query(&text);
        prop_assert_eq!(extract_query(&once), once);
    }

    #[test]
    fn prop_extract_unwraps_single_fence(body in "[A-Za-z0-9 ,*=]{0,40}") {
        let fenced = format!("```sql\n{body}\n```");
        prop_assert_eq!(extract_query(&fenced), body.trim());
    }

    #[test]
    fn prop_chunks_preserve_text(text in any::<String>(), size in 1usize..80) {
        let chunks = chunk_text(&text, size);
        prop_assert!(chunks.iter().all(|c| !c.is_empty() && c.chars().count() <= size));
        prop_assert_eq!(chunks.concat(), text);
    }
}
