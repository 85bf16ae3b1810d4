use once_cell::sync::Lazy;
use regex::Regex;

/// C0 and C1 control characters other than tab, LF and CR.
static CONTROL_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\x00-\x08\x0B\x0C\x0E-\x1F\x7F-\x9F]").unwrap());

static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Normalize extracted page text for indexing.
///
/// Control characters become spaces, whitespace runs (including newlines)
/// collapse to a single space, and the result is trimmed.
pub fn clean_text(text: &str) -> String {
    let without_controls = CONTROL_CHARS.replace_all(text, " ");
    WHITESPACE_RUN
        .replace_all(&without_controls, " ")
        .trim()
        .to_string()
}

/// Length of cleaned text as the minimum-length gate counts it (Unicode scalar values).
pub fn char_len(text: &str) -> usize {
    text.chars().count()
}
