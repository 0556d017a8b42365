//! Message classification
//!
//! Pure functions over message text. All matching is case-insensitive.

/// Default substring marking synthetic test traffic
pub const DEFAULT_TEST_KEYWORD: &str = "TEST";

/// Default duty-officer keywords that trigger escalation
pub const DEFAULT_ESCALATION_KEYWORDS: [&str; 3] = ["LGDO", "MODO", "STDO"];

/// Messages with fewer alphabetic characters than this are likely garbled
pub const DEFAULT_BAD_DECODE_THRESHOLD: usize = 8;

/// True if `text` contains `keyword`, ignoring case. An empty keyword never
/// matches.
pub fn is_test_message(text: &str, keyword: &str) -> bool {
    !keyword.is_empty() && text.to_uppercase().contains(&keyword.to_uppercase())
}

/// Number of ASCII letters in `text`
pub fn alpha_count(text: &str) -> usize {
    text.chars().filter(|c| c.is_ascii_alphabetic()).count()
}

/// True if `text` has strictly fewer than `threshold` ASCII letters
pub fn is_bad_decode(text: &str, threshold: usize) -> bool {
    alpha_count(text) < threshold
}

/// True if the upper-cased text contains any of `keywords`
pub fn matches_escalation_keyword<S: AsRef<str>>(text: &str, keywords: &[S]) -> bool {
    let upper = text.to_uppercase();
    keywords
        .iter()
        .map(|k| k.as_ref().to_uppercase())
        .any(|k| !k.is_empty() && upper.contains(&k))
}

/// Dedup key: `text` without its first `prefix_len` characters. The prefix
/// carries per-transmission framing that differs between repeats.
pub fn dedup_key(text: &str, prefix_len: usize) -> &str {
    match text.char_indices().nth(prefix_len) {
        Some((idx, _)) => &text[idx..],
        None => "",
    }
}
