//! Facet/termlist accumulation (spec §4.E.3, §4.F).
//!
//! Each configured termlist field keeps a running count per normalized
//! term, exposed as a top-k ranking by count. Ties are broken on display
//! text, but the comparator deliberately sorts ties in *reverse* display
//! order (`b.cmp(a)` rather than `a.cmp(b)`) — a quirk carried over
//! verbatim from `original_source`'s term comparator, which compares
//! `strcmp(s2, s1)`. Changing it would silently reorder every tied facet
//! bucket relative to the system this was distilled from.

use std::cmp::Ordering;
use std::collections::HashMap;

/// One accumulated term within a facet field.
#[derive(Debug, Clone)]
pub struct Term {
    /// Normalized (case-folded) form, used as the accumulation key.
    pub normalized: String,
    /// Surface form shown to clients; the first display form seen wins.
    pub display: String,
    /// Occurrence count across every record contributing this term.
    pub count: u64,
}

/// The accumulator for one termlist field.
#[derive(Debug, Default)]
pub struct Termlist {
    terms: HashMap<String, Term>,
}

impl Termlist {
    /// An empty termlist.
    pub fn new() -> Self {
        Self { terms: HashMap::new() }
    }

    /// Increment `normalized`'s count by `term_factor`, recording
    /// `display` the first time the term is seen (spec §4.E.2/§4.E.3:
    /// "each facet call uses `term_factor` as the count increment").
    pub fn increment(&mut self, normalized: &str, display: &str, term_factor: u64) {
        self.terms
            .entry(normalized.to_string())
            .and_modify(|t| t.count += term_factor)
            .or_insert_with(|| Term {
                normalized: normalized.to_string(),
                display: display.to_string(),
                count: term_factor,
            });
    }

    /// Total distinct terms accumulated.
    pub fn len(&self) -> usize {
        self.terms.len()
    }

    /// Whether no terms have been accumulated yet.
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// The top `limit` terms by count, descending, with the reversed
    /// display-text tie-break preserved from the source comparator. A
    /// negative `limit` (spec SPEC_FULL supplement for the `!`-negated
    /// facet-limit syntax) is treated as "no limit, but report the
    /// complement count" by the caller; this method only ever returns the
    /// requested non-negative number of entries.
    pub fn top(&self, limit: usize) -> Vec<&Term> {
        let mut all: Vec<&Term> = self.terms.values().collect();
        all.sort_by(|a, b| match b.count.cmp(&a.count) {
            Ordering::Equal => b.display.cmp(&a.display),
            other => other,
        });
        all.truncate(limit);
        all
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn increment_accumulates_counts_per_normalized_term() {
        let mut tl = Termlist::new();
        tl.increment("fiction", "Fiction", 1);
        tl.increment("fiction", "fiction", 1);
        tl.increment("drama", "Drama", 1);
        assert_eq!(tl.len(), 2);
        let top = tl.top(10);
        assert_eq!(top[0].normalized, "fiction");
        assert_eq!(top[0].count, 2);
    }

    #[test]
    fn top_respects_limit() {
        let mut tl = Termlist::new();
        for i in 0..5 {
            tl.increment(&format!("t{i}"), &format!("T{i}"), 1);
        }
        assert_eq!(tl.top(2).len(), 2);
    }

    #[test]
    fn ties_break_on_reversed_display_order() {
        let mut tl = Termlist::new();
        tl.increment("a", "Alpha", 1);
        tl.increment("b", "Beta", 1);
        let top = tl.top(2);
        // Both have count 1; reversed comparator puts "Beta" before "Alpha".
        assert_eq!(top[0].display, "Beta");
        assert_eq!(top[1].display, "Alpha");
    }

    #[test]
    fn increment_scales_by_term_factor() {
        let mut tl = Termlist::new();
        tl.increment("fiction", "Fiction", 3);
        tl.increment("fiction", "fiction", 3);
        assert_eq!(tl.top(1)[0].count, 6);
    }
}
