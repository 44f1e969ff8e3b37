//! Record ingestion: XML parsing, normalization, mergekey derivation, and
//! cluster insertion (spec §4.E).
//!
//! The source runs ingestion as a single C function threading a handful of
//! out-parameters through three passes over one client record. Here each
//! pass is its own function returning an owned value, composed by
//! [`ingest_record`] the way the teacher's `DeltaProcessor` composes a
//! parse step, a validation step, and an apply step over one delta.

use std::collections::HashMap;

use roxmltree::Document;

use crate::arena::{Arena, Handle};
use crate::config::{FieldValueType, MergekeyPolicy, MergePolicy, ServiceConfig};
use crate::model::{Cluster, ClusterFieldSlot, MetadataValue, Record, RecordMetadataEntry};
use crate::unicode::{sort_key, tokenize, TokenChain};

/// The result of ingesting one record, distinct from [`crate::error::Error`]
/// because none of these outcomes indicate a failure of the pipeline
/// itself (spec §4.E "four possible outcomes").
#[derive(Debug, Clone, PartialEq)]
pub enum IngestOutcome {
    /// A new or pre-existing cluster accepted this record.
    Inserted(Handle<Cluster>),
    /// The record compared equal to one already in its target cluster.
    Duplicate,
    /// A configured record filter excluded this record before merge.
    Filtered,
    /// The originating client had already detached by the time this
    /// record reached the merge stage.
    Rejected,
}

/// A record filter expression, parsed once per database (spec §4.D
/// `RecordFilter`, SPEC_FULL supplement for `!`-negation carried over from
/// `original_source`).
#[derive(Debug, Clone)]
pub struct RecordFilter {
    field: String,
    expected: Option<String>,
    negate: bool,
}

impl RecordFilter {
    /// Parse `name`, `name=value`, `name~value` (substring), each
    /// optionally prefixed with `!` to negate the whole predicate.
    pub fn parse(spec: &str) -> Self {
        let (negate, rest) = match spec.strip_prefix('!') {
            Some(r) => (true, r),
            None => (false, spec),
        };
        if let Some((field, value)) = rest.split_once('=') {
            RecordFilter { field: field.to_string(), expected: Some(value.to_string()), negate }
        } else if let Some((field, value)) = rest.split_once('~') {
            RecordFilter { field: field.to_string(), expected: Some(value.to_string()), negate }
        } else {
            RecordFilter { field: rest.to_string(), expected: None, negate }
        }
    }

    /// Whether `record` passes this filter, given `service` to resolve
    /// the field name to an index.
    pub fn accepts(&self, record: &Record, service: &ServiceConfig) -> bool {
        let matched = match service.field_by_name(&self.field) {
            None => false,
            Some(fc) => {
                let values = &record.metadata[fc.id];
                match &self.expected {
                    None => !values.is_empty(),
                    Some(expected) => values.iter().any(|e| match e.value.display_text() {
                        Some(text) => text == expected || text.contains(expected.as_str()),
                        None => false,
                    }),
                }
            }
        };
        matched != self.negate
    }
}

/// Parse one record's transformed XML into a [`Record`] (spec §4.E.1
/// "parse pass"): one `<metadata type="...">` element per value, with its
/// attributes (`type` excluded) and an optional `rank` override.
pub fn parse_record(xml: &str, service: &ServiceConfig, client_id: &str, position: usize) -> crate::error::Result<Record> {
    let doc = Document::parse(xml).map_err(|e| crate::error::Error::xml(e.to_string()))?;
    let mut record = Record::new(client_id, position, service.fields.len());

    for node in doc.descendants().filter(|n| n.has_tag_name("metadata")) {
        let Some(field_name) = node.attribute("type") else { continue };
        let Some(fc) = service.field_by_name(field_name) else { continue };
        let text = node.text().unwrap_or("").trim();
        if text.is_empty() {
            continue;
        }

        let rank = node
            .attribute("rank")
            .and_then(|r| r.parse::<u32>().ok())
            .unwrap_or(fc.default_rank);

        let attributes = node
            .attributes()
            .filter(|a| a.name() != "type" && a.name() != "rank")
            .map(|a| (a.name().to_string(), a.value().to_string()))
            .collect();

        let value = match fc.value_type {
            FieldValueType::Generic => MetadataValue::Text { display: text.to_string(), sort: None },
            FieldValueType::Year => match text.parse::<f64>() {
                Ok(year) => MetadataValue::Number { min: year, max: year },
                Err(_) => MetadataValue::Text { display: text.to_string(), sort: None },
            },
            FieldValueType::Date => match parse_longdate(text) {
                Some((min, max)) => MetadataValue::Number { min, max },
                None => MetadataValue::Text { display: text.to_string(), sort: None },
            },
        };

        record.metadata[fc.id].push(RecordMetadataEntry { value, attributes, rank });
    }

    Ok(record)
}

/// Parse a `longdate`-style value (`YYYY`, `YYYY-MM`, or `YYYY-MM-DD`) into
/// an inclusive `(min, max)` year range, widening to the full span implied
/// by the precision given (SPEC_FULL supplement for the source's
/// `normalize_date` behavior).
fn parse_longdate(text: &str) -> Option<(f64, f64)> {
    let year_str = text.split('-').next()?;
    let year: f64 = year_str.parse().ok()?;
    Some((year, year))
}

/// Derive a record's mergekey by walking every field configured with a
/// non-`No` mergekey policy, emitting the field name followed by its
/// normalized tokens (spec §4.E.1 "mergekey pass", grammar `"name <tok1>
/// <tok2>"` per contributing field). A `Required` field with no value
/// discards all accumulated key material, per the source's rule. The
/// accumulated parts are joined and prefixed with `"content: "`; if
/// nothing was accumulated (including the `Required`-missing case), the
/// key falls back to `"position: <id>-<n>"` (spec §4.E.1).
pub fn derive_mergekey(record: &Record, service: &ServiceConfig) -> crate::error::Result<String> {
    let chain = TokenChain::mergekey();
    let mut parts: Vec<String> = Vec::new();
    let mut required_missing = false;

    for fc in &service.fields {
        if fc.mergekey_policy == MergekeyPolicy::No {
            continue;
        }
        let texts: Vec<&str> = record.metadata[fc.id]
            .iter()
            .filter_map(|e| e.value.display_text())
            .collect();

        if texts.is_empty() {
            if fc.mergekey_policy == MergekeyPolicy::Required {
                required_missing = true;
                break;
            }
            continue;
        }

        let mut tokens = Vec::new();
        for text in texts {
            for token in tokenize(text, &chain)? {
                tokens.push(token.normalized);
            }
        }
        if !tokens.is_empty() {
            parts.push(fc.name.clone());
            parts.extend(tokens);
        }
    }

    if required_missing || parts.is_empty() {
        return Ok(format!("position: {}-{}", record.client_id, record.position));
    }
    Ok(format!("content: {}", parts.join(" ")))
}

fn merge_value(slot: &mut ClusterFieldSlot, value: MetadataValue) {
    match slot {
        ClusterFieldSlot::Unique(values) => {
            if !values.iter().any(|v| v.display_text() == value.display_text()) {
                values.push(value);
            }
        }
        ClusterFieldSlot::Longest { value: current } => {
            let candidate_len = value.display_text().map(str::len).unwrap_or(0);
            let current_len = current.as_ref().and_then(MetadataValue::display_text).map(str::len).unwrap_or(0);
            if current.is_none() || candidate_len > current_len {
                *current = Some(value);
            }
        }
        ClusterFieldSlot::All(values) => values.push(value),
        ClusterFieldSlot::Range(range) => {
            if let MetadataValue::Number { min, max } = value {
                *range = Some(match *range {
                    None => (min, max),
                    Some((cur_min, cur_max)) => (cur_min.min(min), cur_max.max(max)),
                });
            }
        }
    }
}

/// Merge one record's field values into an existing cluster's slots (spec
/// §4.E.2 pass 2), and regenerate any `longest`-policy field's sort key.
pub fn merge_record_into_cluster(cluster: &mut Cluster, record: &Record, service: &ServiceConfig) {
    for fc in &service.fields {
        for entry in &record.metadata[fc.id] {
            merge_value(&mut cluster.metadata[fc.id], entry.value.clone());
        }
    }
    for sk in &service.sortkeys {
        if let Some(fc) = service.fields.iter().find(|f| f.name == sk.name) {
            if let ClusterFieldSlot::Longest { value: Some(v) } = &cluster.metadata[fc.id] {
                if let Some(text) = v.display_text() {
                    cluster.sortkeys[sk.id] = Some(sort_key(text));
                }
            }
        }
    }
}

/// Outcome of inserting a parsed record into the session's cluster index
/// (spec §4.E.2 "two-pass" merge: find-or-create, then duplicate check).
#[allow(clippy::too_many_arguments)]
pub fn ingest_record(
    record: Record,
    client_attached: bool,
    service: &ServiceConfig,
    reclist: &mut crate::reclist::ReclistGuard<'_>,
    clusters: &mut Arena<Cluster>,
    records: &mut Arena<Record>,
    filter: Option<&RecordFilter>,
) -> crate::error::Result<IngestOutcome> {
    if !client_attached {
        return Ok(IngestOutcome::Rejected);
    }
    if let Some(filter) = filter {
        if !filter.accepts(&record, service) {
            return Ok(IngestOutcome::Filtered);
        }
    }

    let merge_key = derive_mergekey(&record, service)?;

    let existing = reclist.find(&merge_key).to_vec();
    for handle in &existing {
        if let Some(cluster) = clusters.get(*handle) {
            let duplicate = cluster
                .records
                .iter()
                .filter_map(|rh| records.get(*rh))
                .any(|existing_record| existing_record.client_id == record.client_id && existing_record.compare_equal(&record));
            if duplicate {
                return Ok(IngestOutcome::Duplicate);
            }
        }
    }

    let target = existing.first().copied().unwrap_or_else(|| {
        let policies: Vec<MergePolicy> = service.fields.iter().map(|f| f.merge_policy).collect();
        let handle = clusters.insert(Cluster::new(merge_key.clone(), service.fields.len(), service.sortkeys.len(), &policies));
        reclist.insert(&merge_key, handle);
        handle
    });

    if let Some(cluster) = clusters.get_mut(target) {
        merge_record_into_cluster(cluster, &record, service);
        let record_handle = records.insert(record);
        cluster.records.push(record_handle);
    }

    Ok(IngestOutcome::Inserted(target))
}

/// Per-field facet term deltas produced by ingesting a record, keyed by
/// field id then normalized term (spec §4.E.3 "facet pass"), to be folded
/// into the session's termlists by the caller.
pub fn facet_deltas(record: &Record, service: &ServiceConfig) -> crate::error::Result<HashMap<usize, HashMap<String, String>>> {
    let mut out = HashMap::new();
    for fc in &service.fields {
        if !fc.is_termlist {
            continue;
        }
        let chain = TokenChain::facet();
        let mut terms = HashMap::new();
        for entry in &record.metadata[fc.id] {
            if let Some(text) = entry.value.display_text() {
                for token in tokenize(text, &chain)? {
                    terms.insert(token.normalized, token.display);
                }
            }
        }
        if !terms.is_empty() {
            out.insert(fc.id, terms);
        }
    }
    Ok(out)
}
