//! Text analysis: cleaning, entity tagging, personal-info and skill extraction.
//!
//! Everything here is synchronous and CPU-light; the pipeline calls it
//! straight from the document task.

pub mod cleaner;
pub mod nlp;
pub mod personal_info;
pub mod skills;

/// Prefix of `text` holding at most `max_chars` characters, cut on a char boundary.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
