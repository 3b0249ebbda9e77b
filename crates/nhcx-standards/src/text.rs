//! Text normalization shared by dictionary construction and query matching.
//!
//! Both sides must normalize identically or exact-match determinism breaks.

use std::collections::BTreeMap;

/// Case-folds, strips punctuation to spaces, and collapses whitespace.
pub fn normalize(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        if ch.is_alphanumeric() {
            for lower in ch.to_lowercase() {
                out.push(lower);
            }
        } else {
            out.push(' ');
        }
    }
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Splits a normalized string into tokens.
pub fn tokenize(normalized: &str) -> Vec<String> {
    normalized
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

/// Expands abbreviation tokens in place; expansions are re-tokenized so a
/// single short form may become several tokens.
pub fn expand_tokens(tokens: &[String], abbreviations: &BTreeMap<String, String>) -> Vec<String> {
    let mut expanded = Vec::with_capacity(tokens.len());
    for token in tokens {
        match abbreviations.get(token) {
            Some(expansion) => expanded.extend(tokenize(expansion)),
            None => expanded.push(token.clone()),
        }
    }
    expanded
}
