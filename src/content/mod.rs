// src/content/mod.rs
// Post-processing of provider output: titles, prompt intent, paragraph counts

use once_cell::sync::Lazy;
use regex::Regex;

/// Words dropped when deriving a title from a summary
pub const TITLE_STOPWORDS: [&str; 9] = ["the", "a", "an", "is", "was", "and", "of", "in", "on"];

/// Maximum number of words kept in a derived title
pub const TITLE_MAX_WORDS: usize = 3;

static STORY_PROMPT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(tell\s+me|write|create)\s+a\s+story").expect("story prompt pattern is valid")
});

static BLANK_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\r?\n\s*\n").expect("blank line pattern is valid"));

/// Heuristic title: the first few non-stopword words of the summary.
///
/// Returns an empty string when the summary holds nothing but stopwords.
pub fn derive_title(summary: &str) -> String {
    summary
        .split_whitespace()
        .filter(|word| !is_stopword(word))
        .take(TITLE_MAX_WORDS)
        .collect::<Vec<_>>()
        .join(" ")
}

fn is_stopword(word: &str) -> bool {
    TITLE_STOPWORDS
        .iter()
        .any(|stop| stop.eq_ignore_ascii_case(word))
}

/// True when the text reads as a request for a story
/// ("tell me a story", "write a story", "create a story"), in any casing.
pub fn is_story_prompt(text: &str) -> bool {
    STORY_PROMPT.is_match(text)
}

/// Trimmed value, or None when absent or blank
pub fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Trimmed, non-empty paragraphs. A paragraph break is a line break, optional
/// whitespace, then another line break (`\n\n`, `\r\n\r\n`, `\n  \n`).
pub fn paragraphs(text: &str) -> impl Iterator<Item = &str> {
    BLANK_LINE
        .split(text)
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
}

/// Number of non-empty blank-line separated paragraphs
pub fn count_paragraphs(text: &str) -> usize {
    paragraphs(text).count()
}
