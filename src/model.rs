//! The record/cluster data model (spec §3).
//!
//! `record_metadata.data`'s tagged union becomes the [`MetadataValue`] enum;
//! the per-field cluster merge policy becomes [`ClusterFieldSlot`], one
//! variant per policy so each keeps exactly the state it needs instead of
//! a single struct with fields that are meaningless under other policies.

use crate::arena::Handle;

/// A single metadata value as stored after parsing (spec §4.E.2 pass 1).
#[derive(Debug, Clone, PartialEq)]
pub enum MetadataValue {
    /// Free text: a normalized display form, and (once computed) a sort
    /// form.
    Text {
        /// Punctuation-stripped display text.
        display: String,
        /// Sort-key form, present once a `longest` merge regenerates it.
        sort: Option<String>,
    },
    /// A year or date, extracted to an inclusive `(min, max)` range.
    Number {
        /// Minimum of the extracted range.
        min: f64,
        /// Maximum of the extracted range.
        max: f64,
    },
}

impl MetadataValue {
    /// The display text, for types that have one.
    pub fn display_text(&self) -> Option<&str> {
        match self {
            MetadataValue::Text { display, .. } => Some(display),
            MetadataValue::Number { .. } => None,
        }
    }

    /// Whether a year/date limit value `target` falls in `[min, max]`.
    pub fn number_contains(&self, target: f64) -> bool {
        match self {
            MetadataValue::Number { min, max } => target >= *min && target <= *max,
            MetadataValue::Text { .. } => false,
        }
    }
}

/// A value attached to one record (pass 1): a parsed value plus the XML
/// attributes (other than `type`) that accompanied it.
#[derive(Debug, Clone)]
pub struct RecordMetadataEntry {
    /// The parsed value.
    pub value: MetadataValue,
    /// Attributes carried on the `<metadata>` element, `type` excluded.
    pub attributes: Vec<(String, String)>,
    /// Per-value relevance rank (falls back to the field's default).
    pub rank: u32,
}

/// A single ingested document from one target client at one position.
#[derive(Debug, Clone)]
pub struct Record {
    /// Identity of the originating client (opaque to this module).
    pub client_id: String,
    /// 1-based position as reported by the client.
    pub position: usize,
    /// One chain of values per configured metadata field, in document
    /// order.
    pub metadata: Vec<Vec<RecordMetadataEntry>>,
}

impl Record {
    /// Create an empty record with `field_count` metadata slots.
    pub fn new(client_id: impl Into<String>, position: usize, field_count: usize) -> Self {
        Self {
            client_id: client_id.into(),
            position,
            metadata: vec![Vec::new(); field_count],
        }
    }

    /// Whether two records compare equal for duplicate-suppression
    /// purposes: same display text in every field that has any value in
    /// either record.
    pub fn compare_equal(&self, other: &Record) -> bool {
        if self.metadata.len() != other.metadata.len() {
            return false;
        }
        self.metadata.iter().zip(other.metadata.iter()).all(|(a, b)| {
            let da: Vec<&str> = a.iter().filter_map(|e| e.value.display_text()).collect();
            let db: Vec<&str> = b.iter().filter_map(|e| e.value.display_text()).collect();
            da == db
        })
    }
}

/// Per-field cluster-level merge state, one variant per merge policy so a
/// cluster only ever carries the state its policy actually needs.
#[derive(Debug, Clone)]
pub enum ClusterFieldSlot {
    /// Deduplicated by display text, insertion order preserved.
    Unique(Vec<MetadataValue>),
    /// Keeps only the longest display string seen, plus its regenerated
    /// sort key.
    Longest {
        /// The current longest value, if any has been merged yet.
        value: Option<MetadataValue>,
    },
    /// Every value appended, unconditionally, order preserved.
    All(Vec<MetadataValue>),
    /// A single widening `(min, max)` range.
    Range(Option<(f64, f64)>),
}

impl ClusterFieldSlot {
    /// An empty slot for the given policy.
    pub fn empty(policy: crate::config::MergePolicy) -> Self {
        use crate::config::MergePolicy;
        match policy {
            MergePolicy::Unique => ClusterFieldSlot::Unique(Vec::new()),
            MergePolicy::Longest => ClusterFieldSlot::Longest { value: None },
            MergePolicy::All => ClusterFieldSlot::All(Vec::new()),
            MergePolicy::Range => ClusterFieldSlot::Range(None),
        }
    }
}

/// The merged view of every record sharing one mergekey within a session
/// (spec §3 "Record cluster").
#[derive(Debug, Clone)]
pub struct Cluster {
    /// Stable identity, equal to the mergekey that created this cluster.
    pub recid: String,
    /// The normalized bucketing key.
    pub merge_key: String,
    /// Constituent records, newest ingested first.
    pub records: Vec<Handle<Record>>,
    /// One merge-policy slot per configured metadata field.
    pub metadata: Vec<ClusterFieldSlot>,
    /// One sort-key slot per configured sort key, populated when the
    /// backing metadata is merged.
    pub sortkeys: Vec<Option<String>>,
    /// Running relevance score.
    pub relevance_score: f64,
    /// Per-term frequency accounting, owned by the relevance subsystem.
    pub term_frequency: Vec<f64>,
    /// Diagnostic buffers for relevance explain output.
    pub relevance_explain1: String,
    /// Second diagnostic buffer.
    pub relevance_explain2: String,
}

impl Cluster {
    /// Create a freshly-inserted cluster: all metadata/sortkey slots
    /// start empty, per spec §4.B `insert`.
    pub fn new(merge_key: String, n_fields: usize, n_sortkeys: usize, policies: &[crate::config::MergePolicy]) -> Self {
        Self {
            recid: merge_key.clone(),
            merge_key,
            records: Vec::new(),
            metadata: policies.iter().map(|p| ClusterFieldSlot::empty(*p)).collect(),
            sortkeys: vec![None; n_sortkeys],
            relevance_score: 0.0,
            term_frequency: vec![0.0; n_fields],
            relevance_explain1: String::new(),
            relevance_explain2: String::new(),
        }
    }

    /// The minimum record position across all constituent records, used by
    /// the `position` sort type. Records are resolved through `arena`.
    pub fn min_position(&self, arena: &crate::arena::Arena<Record>) -> Option<usize> {
        self.records
            .iter()
            .filter_map(|h| arena.get(*h))
            .map(|r| r.position)
            .min()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MergePolicy;

    #[test]
    fn compare_equal_checks_display_text_per_field() {
        let mut a = Record::new("c1", 1, 1);
        a.metadata[0].push(RecordMetadataEntry {
            value: MetadataValue::Text { display: "x".into(), sort: None },
            attributes: vec![],
            rank: 1,
        });
        let mut b = Record::new("c1", 2, 1);
        b.metadata[0].push(RecordMetadataEntry {
            value: MetadataValue::Text { display: "x".into(), sort: None },
            attributes: vec![],
            rank: 1,
        });
        assert!(a.compare_equal(&b));

        b.metadata[0][0].value = MetadataValue::Text { display: "y".into(), sort: None };
        assert!(!a.compare_equal(&b));
    }

    #[test]
    fn empty_slot_matches_policy() {
        assert!(matches!(ClusterFieldSlot::empty(MergePolicy::Range), ClusterFieldSlot::Range(None)));
        assert!(matches!(ClusterFieldSlot::empty(MergePolicy::Unique), ClusterFieldSlot::Unique(v) if v.is_empty()));
    }
}
