//! Term extraction shared by search and ranking

use indexmap::IndexSet;

/// Split text into lower-cased terms on whitespace and punctuation
pub fn terms(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
}

/// Distinct terms in first-seen order
pub fn unique_terms(text: &str) -> IndexSet<String> {
    terms(text).collect()
}
