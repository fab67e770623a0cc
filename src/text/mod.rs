//! Pure text helpers used by the pipeline.
//!
//! - [`normalize_subject`] - canonical subject keys for thread grouping
//! - [`extract_keywords`] - frequency-ranked keywords for classification
//! - [`ContentCleaner`] - body cleanup ahead of summarization

mod cleaner;
mod keywords;
mod subject;

pub use cleaner::ContentCleaner;
pub use keywords::{extract_keywords, is_stopword, tokenize, DEFAULT_TOP_N};
pub use subject::normalize_subject;

/// Truncates `text` to at most `max_chars` characters.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
