// text_prep.rs - Keyword text preparation.
//
// Keywords arrive from harvested profiles and from the keyword extractor. Both
// sides go through the same normalization so equal phrases embed identically.

use crate::config;

/// Prepare a keyword for the embedding model: trimmed, whitespace collapsed,
/// and cut to `MAX_KEYWORD_WORDS` words so it stays well inside the context window.
pub fn prepare_keyword_text(keyword: &str) -> String {
    truncate_words(keyword.trim(), config::embedding::MAX_KEYWORD_WORDS)
}

/// Lowercase and trim a keyword, collapsing internal whitespace.
pub fn normalize_keyword(keyword: &str) -> String {
    keyword.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}

/// Normalize a keyword list, dropping entries that are empty after trimming.
/// Order and duplicates are preserved.
pub fn normalize_keywords<S: AsRef<str>>(keywords: &[S]) -> Vec<String> {
    keywords
        .iter()
        .map(|k| normalize_keyword(k.as_ref()))
        .filter(|k| !k.is_empty())
        .collect()
}

/// Number of whitespace-separated words. Used as the keyword's specificity.
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Truncate text to at most `max_words` words, joined by single spaces.
fn truncate_words(text: &str, max_words: usize) -> String {
    text.split_whitespace().take(max_words).collect::<Vec<_>>().join(" ")
}
