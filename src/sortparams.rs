//! Sort-parameter parsing and the resulting cluster comparator (spec §4.C).
//!
//! A sort spec is a comma-separated list of `name[:direction]` entries,
//! evaluated left to right with the first non-equal field deciding order;
//! `recid` is always appended as a final deterministic tie-break so the
//! comparator is total even when every configured key ties.

use std::cmp::Ordering;

use crate::arena::Arena;
use crate::config::ServiceConfig;
use crate::error::{Error, Result};
use crate::model::{Cluster, ClusterFieldSlot, Record};

/// Sort direction for one chain entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

/// What a sort-chain entry compares on.
#[derive(Debug, Clone)]
pub enum SortField {
    /// Descending relevance score (direction is still configurable, but
    /// `relevance` conventionally sorts high-to-low).
    Relevance,
    /// A configured sort key's precomputed string, by index into
    /// `Cluster::sortkeys`.
    String(usize),
    /// A configured numeric (range) field, by index into
    /// `Cluster::metadata`; compares on `min` when increasing and `max`
    /// when decreasing.
    Numeric(usize),
    /// The minimum constituent record position.
    Position,
}

/// One parsed entry in a sort-parameter chain.
#[derive(Debug, Clone)]
pub struct SortEntry {
    pub field: SortField,
    pub direction: Direction,
}

/// A full parsed sort-parameter chain, plus the raw spec it was parsed
/// from (so two chains can be compared for equality without re-parsing).
#[derive(Debug, Clone)]
pub struct SortChain {
    pub raw: String,
    pub entries: Vec<SortEntry>,
}

/// Parse one comma-separated sort spec against `service`'s configured
/// fields and sort keys (spec §4.C).
pub fn parse(spec: &str, service: &ServiceConfig) -> Result<SortChain> {
    if spec.len() >= 256 {
        return Err(Error::MalformedParameterValue { which: "sort" });
    }

    let mut entries = Vec::new();
    for part in spec.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let mut pieces = part.splitn(2, ':');
        let name = pieces.next().unwrap_or("");
        let mut direction_spec = pieces.next().unwrap_or("");

        // A trailing `p`/`P` forces the `position` field regardless of
        // `name`, independent of the direction digit/letter before it.
        let force_position = direction_spec.ends_with('p') || direction_spec.ends_with('P');
        if force_position {
            direction_spec = &direction_spec[..direction_spec.len() - 1];
        }

        let direction = if direction_spec.is_empty() {
            Direction::Ascending
        } else if direction_spec.eq_ignore_ascii_case("0") || direction_spec.eq_ignore_ascii_case("d") {
            Direction::Descending
        } else {
            Direction::Ascending
        };

        let field = if force_position {
            SortField::Position
        } else if name.eq_ignore_ascii_case("relevance") {
            SortField::Relevance
        } else if name.eq_ignore_ascii_case("position") {
            SortField::Position
        } else if let Some(sk) = service.sortkey_by_name(name) {
            SortField::String(sk.id)
        } else if let Some(fc) = service.field_by_name(name) {
            SortField::Numeric(fc.id)
        } else {
            return Err(Error::MalformedParameterValue { which: "sort" });
        };

        entries.push(SortEntry { field, direction });
    }

    if entries.is_empty() {
        return Err(Error::MalformedParameterValue { which: "sort" });
    }

    Ok(SortChain { raw: spec.to_string(), entries })
}

/// Whether two sort specs denote the same effective chain, used by the
/// session to decide whether a `sort` call actually requires re-sorting
/// (spec §4.C `sortparms_cmp`).
pub fn sortparms_cmp(a: &SortChain, b: &SortChain) -> bool {
    a.raw == b.raw
}

fn apply_direction(ord: Ordering, direction: Direction) -> Ordering {
    match direction {
        Direction::Ascending => ord,
        Direction::Descending => ord.reverse(),
    }
}

/// Select the value a numeric comparison reads for one side: `min` when
/// sorting increasing, `max` when sorting decreasing (spec §4.C).
fn select_numeric(slot: Option<&ClusterFieldSlot>, direction: Direction) -> Option<f64> {
    match slot {
        Some(ClusterFieldSlot::Range(Some((min, max)))) => Some(match direction {
            Direction::Ascending => *min,
            Direction::Descending => *max,
        }),
        _ => None,
    }
}

/// Compare two clusters' numeric field. A side with no range present
/// sorts before a side that has one; if neither side has a range, the
/// two compare equal (spec §4.C "present side sorts first").
fn compare_numeric(a: &Cluster, b: &Cluster, idx: usize, direction: Direction) -> Ordering {
    let va = select_numeric(a.metadata.get(idx), direction);
    let vb = select_numeric(b.metadata.get(idx), direction);
    match (va, vb) {
        (Some(x), Some(y)) => apply_direction(x.partial_cmp(&y).unwrap_or(Ordering::Equal), direction),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn compare_entry(a: &Cluster, b: &Cluster, entry: &SortEntry, arena: &Arena<Record>) -> Ordering {
    match &entry.field {
        // Relevance always sorts highest score first, regardless of the
        // entry's requested direction (spec §4.C).
        SortField::Relevance => b.relevance_score.partial_cmp(&a.relevance_score).unwrap_or(Ordering::Equal),
        // Direction is already consumed by the min/max selection above,
        // so it must not be applied again here.
        SortField::Numeric(idx) => compare_numeric(a, b, *idx, entry.direction),
        SortField::String(idx) => {
            let sa = a.sortkeys.get(*idx).and_then(Option::as_deref).unwrap_or("");
            let sb = b.sortkeys.get(*idx).and_then(Option::as_deref).unwrap_or("");
            apply_direction(sa.cmp(sb), entry.direction)
        }
        SortField::Position => {
            let pa = a.min_position(arena).unwrap_or(usize::MAX);
            let pb = b.min_position(arena).unwrap_or(usize::MAX);
            apply_direction(pa.cmp(&pb), entry.direction)
        }
    }
}

/// Total-order comparator for two clusters under `chain`, tie-breaking on
/// `recid` so equal chains always yield a deterministic order (spec §4.C
/// "total order" invariant).
pub fn compare(a: &Cluster, b: &Cluster, chain: &SortChain, arena: &Arena<Record>) -> Ordering {
    for entry in &chain.entries {
        let ord = compare_entry(a, b, entry, arena);
        if ord != Ordering::Equal {
            return ord;
        }
    }
    a.recid.cmp(&b.recid)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cluster(recid: &str, relevance: f64) -> Cluster {
        let mut c = Cluster::new(recid.to_string(), 0, 0, &[]);
        c.relevance_score = relevance;
        c
    }

    #[test]
    fn parses_name_and_explicit_direction() {
        let svc = ServiceConfig::default();
        let chain = parse("relevance,title:0", &svc).unwrap();
        assert_eq!(chain.entries.len(), 2);
        assert!(matches!(chain.entries[0].field, SortField::Relevance));
        assert!(matches!(chain.entries[1].direction, Direction::Descending));
    }

    #[test]
    fn unknown_field_name_is_rejected() {
        let svc = ServiceConfig::default();
        assert!(parse("nonexistent", &svc).is_err());
    }

    #[test]
    fn recid_breaks_ties_for_a_total_order() {
        let svc = ServiceConfig::default();
        let chain = parse("relevance", &svc).unwrap();
        let arena = Arena::new();
        let a = cluster("a", 1.0);
        let b = cluster("b", 1.0);
        assert_eq!(compare(&a, &b, &chain, &arena), Ordering::Less);
        assert_eq!(compare(&b, &a, &chain, &arena), Ordering::Greater);
    }

    #[test]
    fn sortparms_cmp_detects_identical_specs() {
        let svc = ServiceConfig::default();
        let a = parse("relevance,title", &svc).unwrap();
        let b = parse("relevance,title", &svc).unwrap();
        let c = parse("title,relevance", &svc).unwrap();
        assert!(sortparms_cmp(&a, &b));
        assert!(!sortparms_cmp(&a, &c));
    }

    #[test]
    fn relevance_sorts_highest_score_first_regardless_of_direction() {
        let svc = ServiceConfig::default();
        let arena = Arena::new();
        let low = cluster("a", 1.0);
        let high = cluster("b", 5.0);

        let ascending = parse("relevance", &svc).unwrap();
        assert_eq!(compare(&low, &high, &ascending, &arena), Ordering::Greater);

        let descending = parse("relevance:0", &svc).unwrap();
        assert_eq!(compare(&low, &high, &descending, &arena), Ordering::Greater);
    }

    #[test]
    fn overlong_sort_spec_is_rejected() {
        let svc = ServiceConfig::default();
        let spec = "relevance,".repeat(30);
        assert!(parse(&spec, &svc).is_err());
    }

    #[test]
    fn trailing_p_suffix_forces_the_position_field() {
        let svc = ServiceConfig::default();
        let chain = parse("title:0p", &svc).unwrap();
        assert!(matches!(chain.entries[0].field, SortField::Position));
        assert_eq!(chain.entries[0].direction, Direction::Descending);
    }

    fn numeric_cluster(recid: &str, range: Option<(f64, f64)>) -> Cluster {
        let mut c = Cluster::new(recid.to_string(), 1, 0, &[crate::config::MergePolicy::Range]);
        c.metadata[0] = ClusterFieldSlot::Range(range);
        c
    }

    #[test]
    fn numeric_present_side_sorts_before_absent_side() {
        let present = numeric_cluster("a", Some((10.0, 20.0)));
        let absent = numeric_cluster("b", None);
        let entry = SortEntry { field: SortField::Numeric(0), direction: Direction::Ascending };
        let arena = Arena::new();
        assert_eq!(compare_entry(&present, &absent, &entry, &arena), Ordering::Less);
        assert_eq!(compare_entry(&absent, &present, &entry, &arena), Ordering::Greater);
    }

    #[test]
    fn numeric_ascending_uses_min_descending_uses_max() {
        let arena = Arena::new();
        let a = numeric_cluster("a", Some((1.0, 100.0)));
        let b = numeric_cluster("b", Some((2.0, 3.0)));

        let ascending = SortEntry { field: SortField::Numeric(0), direction: Direction::Ascending };
        // a.min (1.0) < b.min (2.0)
        assert_eq!(compare_entry(&a, &b, &ascending, &arena), Ordering::Less);

        let descending = SortEntry { field: SortField::Numeric(0), direction: Direction::Descending };
        // a.max (100.0) > b.max (3.0), descending puts the larger max first
        assert_eq!(compare_entry(&a, &b, &descending, &arena), Ordering::Less);
    }

    #[test]
    fn numeric_both_absent_compares_equal() {
        let a = numeric_cluster("a", None);
        let b = numeric_cluster("b", None);
        let entry = SortEntry { field: SortField::Numeric(0), direction: Direction::Ascending };
        let arena = Arena::new();
        assert_eq!(compare_entry(&a, &b, &entry, &arena), Ordering::Equal);
    }
}
