//! Collation-style sort keys.
//!
//! The source derives a sort key from an ICU collator. No collator crate
//! is present anywhere in the retrieved corpus (see `DESIGN.md`), so this
//! builds a deterministic, total, non-locale-sensitive stand-in: NFKD
//! normalization (folds compatibility variants and decomposes accents)
//! followed by full case folding. It is weaker than a real collator but
//! satisfies every testable property the spec actually pins down
//! (determinism, totality, idempotence).

use unicode_normalization::UnicodeNormalization;

use super::casemap::fold_case;

/// Produce a deterministic, comparable sort key for `text`.
pub fn sort_key(text: &str) -> String {
    let normalized: String = text.nfkd().collect();
    fold_case(&normalized)
}
