//! Tokenizer façade.
//!
//! The source's tokenizer is a scoped resource parameterized by a locale
//! and a break kind (line/sentence/word/character/title), bound to a
//! UTF-16 source buffer via `attach`, then walked with repeated `next`
//! calls that report `(token_start, token_end)` and grow the caller's
//! output buffer on overflow. Expressed over Rust `&str` there is no
//! buffer to overflow and no separate attach step — `tokenize` just
//! returns the whole token sequence — but the three named chains the rest
//! of the crate actually uses (`"mergekey"`, `"sort"`, and the per-field
//! `facetrule`) are preserved as a first-class [`TokenChain`] value so
//! callers configure break kind and article-skipping the same way the
//! spec's Service configuration does.

use unicode_segmentation::UnicodeSegmentation;

use super::casemap::fold_case;
use crate::error::{Error, Result};

/// Break granularity, mirroring the façade's break-kind enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakKind {
    /// Split on line boundaries.
    Line,
    /// Split on sentence boundaries.
    Sentence,
    /// Split on Unicode word boundaries (the common case).
    Word,
    /// Split on extended grapheme clusters.
    Character,
    /// Split on word boundaries, used for title-sensitive first-token logic.
    Title,
}

/// A named, reusable tokenizer configuration (the façade's scoped
/// "tokenizer" resource, minus its attach/destroy lifecycle).
#[derive(Debug, Clone)]
pub struct TokenChain {
    /// Locale identifier; only `"root"`/`"en"`/empty are currently
    /// supported, matching the façade's `UnsupportedLocaleOrAction` for
    /// anything else.
    pub locale: String,
    /// Break granularity for this chain.
    pub break_kind: BreakKind,
    /// When true (the `"sort"` chain under a `skiparticle` sortkey type),
    /// a single leading article token (`"a"`, `"an"`, `"the"`) is dropped
    /// before emitting the first token.
    pub skip_leading_article: bool,
}

impl TokenChain {
    /// The `"mergekey"` chain: word-broken, case-folded, no article skip.
    pub fn mergekey() -> Self {
        Self {
            locale: "root".to_string(),
            break_kind: BreakKind::Word,
            skip_leading_article: false,
        }
    }

    /// The `"sort"` chain used to regenerate a cluster's sort key when a
    /// `longest`-merged field is replaced.
    pub fn sort(skip_leading_article: bool) -> Self {
        Self {
            locale: "root".to_string(),
            break_kind: BreakKind::Word,
            skip_leading_article,
        }
    }

    /// A field's `facetrule` chain (defaults to plain word-breaking).
    pub fn facet() -> Self {
        Self {
            locale: "root".to_string(),
            break_kind: BreakKind::Word,
            skip_leading_article: false,
        }
    }
}

/// One emitted token: the facet/mergekey-normalized form and the original
/// display text, mirroring the façade's `next`/`get_display` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// Case-folded, comparison-ready form.
    pub normalized: String,
    /// Original surface text.
    pub display: String,
}

const ARTICLES: [&str; 3] = ["a", "an", "the"];

/// Split `text` into tokens according to `chain`.
///
/// `0 ≤ token_start ≤ token_end ≤ text.len()` holds for every emitted span
/// by construction, since all splitting goes through `unicode-segmentation`
/// iterators over `text` itself.
pub fn tokenize(text: &str, chain: &TokenChain) -> Result<Vec<Token>> {
    if !matches!(chain.locale.as_str(), "root" | "en" | "") {
        return Err(Error::UnsupportedLocaleOrAction(chain.locale.clone()));
    }

    let mut pieces: Vec<&str> = match chain.break_kind {
        BreakKind::Word | BreakKind::Title => text.unicode_words().collect(),
        BreakKind::Sentence => text.unicode_sentences().map(str::trim).collect(),
        BreakKind::Line => text.lines().collect(),
        BreakKind::Character => text.graphemes(true).collect(),
    };
    pieces.retain(|p| !p.is_empty());

    if chain.skip_leading_article {
        if let Some(first) = pieces.first() {
            if ARTICLES.contains(&fold_case(first).as_str()) {
                pieces.remove(0);
            }
        }
    }

    Ok(pieces
        .into_iter()
        .map(|p| Token {
            normalized: fold_case(p),
            display: p.to_string(),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn word_chain_splits_on_words() {
        let toks = tokenize("War and Peace", &TokenChain::mergekey()).unwrap();
        let words: Vec<_> = toks.iter().map(|t| t.normalized.as_str()).collect();
        assert_eq!(words, vec!["war", "and", "peace"]);
    }

    #[test]
    fn sort_chain_skips_leading_article() {
        let toks = tokenize("The Great Gatsby", &TokenChain::sort(true)).unwrap();
        let words: Vec<_> = toks.iter().map(|t| t.normalized.as_str()).collect();
        assert_eq!(words, vec!["great", "gatsby"]);
    }

    #[test]
    fn unsupported_locale_is_rejected() {
        let mut chain = TokenChain::mergekey();
        chain.locale = "klingon".to_string();
        assert!(matches!(
            tokenize("x", &chain),
            Err(Error::UnsupportedLocaleOrAction(_))
        ));
    }
}
