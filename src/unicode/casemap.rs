//! Case mapping: `lower`, `upper`, `title`, `foldcase`.
//!
//! The source's casemap resource can fail with `UnsupportedLocaleOrAction`
//! for an action the active ICU locale doesn't support; Rust's built-in
//! Unicode case mapping is locale-agnostic and total, so the façade here
//! never actually produces that error itself — it is reserved for the
//! tokenizer, whose `locale` parameter is genuinely checked (see
//! [`super::tokenize`]).

use unicode_segmentation::UnicodeSegmentation;

/// Lowercase a string using full Unicode case mapping.
pub fn to_lower(s: &str) -> String {
    s.to_lowercase()
}

/// Uppercase a string using full Unicode case mapping.
pub fn to_upper(s: &str) -> String {
    s.to_uppercase()
}

/// Title-case a string: the first letter of every Unicode word is
/// uppercased, the rest lowercased.
pub fn to_title(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut cursor = 0usize;
    for (start, word) in s.unicode_word_indices() {
        // copy any separator text preceding this word verbatim
        out.push_str(&s[cursor..start]);
        let mut chars = word.chars();
        if let Some(first) = chars.next() {
            out.extend(first.to_uppercase());
            out.push_str(&chars.as_str().to_lowercase());
        }
        cursor = start + word.len();
    }
    out.push_str(&s[cursor..]);
    out
}

/// Case-fold a string for caseless comparison (used by facet/mergekey
/// normalization, where two values that differ only in case must bucket
/// together).
pub fn fold_case(s: &str) -> String {
    // Rust's `to_lowercase` implements the Unicode default case algorithm,
    // which is what full case folding reduces to for the common case; it
    // is what the rest of the retrieved corpus reaches for when it needs
    // caseless comparison, so we follow suit rather than pulling in a
    // dedicated folding table.
    s.to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lower_and_upper_round_trip_ascii() {
        assert_eq!(to_lower("HELLO"), "hello");
        assert_eq!(to_upper("hello"), "HELLO");
    }

    #[test]
    fn title_case_capitalizes_each_word() {
        assert_eq!(to_title("war and peace"), "War And Peace");
    }

    #[test]
    fn fold_case_is_caseless() {
        assert_eq!(fold_case("ANNA Karenina"), fold_case("anna KARENINA"));
    }
}
