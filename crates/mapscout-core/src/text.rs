//! Text normalization shared by search expansion and deduplication.

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Lowercase and strip diacritics (`"Panadería"` -> `"panaderia"`).
///
/// Decomposes to NFD and drops combining marks, so `ñ` folds to `n` and
/// `é` to `e`. Whitespace is left untouched.
#[must_use]
pub fn fold_accents(input: &str) -> String {
    input
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .to_lowercase()
}

/// Collapse whitespace runs to a single space and trim both ends.
#[must_use]
pub fn collapse_whitespace(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Full normalization used for identity comparison: accent folding,
/// lowercasing and whitespace collapsing.
#[must_use]
pub fn normalize(input: &str) -> String {
    collapse_whitespace(&fold_accents(input))
}
