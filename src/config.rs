//! Session/service configuration (spec §4.D, §6, and SPEC_FULL §I).
//!
//! The upstream spec treats configuration-file loading as an external,
//! immutable input; this module still follows the teacher's shape for an
//! immutable config (serde-derived structs, `Default` impls, a small
//! `from_file` loader) because the ambient stack is carried regardless of
//! what the distilled spec scopes out.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// How a configured metadata field participates in mergekey derivation
/// (spec §4.E.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MergekeyPolicy {
    /// Field never contributes to the mergekey.
    No,
    /// Field contributes if present; absence is fine.
    Optional,
    /// Field must be present or the accumulated key is discarded (spec
    /// §4.E.1's "discard all accumulated key material" rule).
    Required,
}

/// How new values fold into a cluster's per-field metadata (spec §3, §4.E.2
/// pass 2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MergePolicy {
    /// Deduplicate by display text.
    Unique,
    /// Keep only the longest display string.
    Longest,
    /// Append unconditionally, order preserved.
    All,
    /// Widen a `(min, max)` numeric range.
    Range,
}

/// The record-metadata value type a field's `<metadata>` elements parse
/// into (spec §4.E.2 pass 1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldValueType {
    /// Free text, punctuation-normalized.
    Generic,
    /// A bare year, parsed to a one-year `(min, max)` range.
    Year,
    /// A full date, parsed with `longdate` semantics.
    Date,
}

/// Where a field's configured database-level value gets injected during
/// ingestion (spec §4.E step 2/3, §6 "Setting kinds").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldSettingKind {
    /// Injected as a single-quoted XSLT argument before transform.
    Parameter,
    /// Injected as a `<metadata type="name">value</metadata>` child after
    /// transform.
    Postproc,
    /// Not injected at all.
    Neither,
}

/// The definition of one configured metadata field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldConfig {
    /// Stable numeric id, also this field's index into every per-field
    /// slot array.
    pub id: usize,
    /// Configured name, as it appears in `<metadata type="name">`.
    pub name: String,
    /// Value type used when parsing this field's `<metadata>` content.
    pub value_type: FieldValueType,
    /// Mergekey contribution policy.
    pub mergekey_policy: MergekeyPolicy,
    /// Cluster-level merge policy.
    pub merge_policy: MergePolicy,
    /// Setting-injection kind.
    pub setting_kind: FieldSettingKind,
    /// Default relevance rank, used when a value has no per-element
    /// `rank` attribute.
    pub default_rank: u32,
    /// Named facet-rule token chain id (defaults to `"facet"`).
    pub facet_rule: String,
    /// Whether this field is exposed as a termlist/facet.
    pub is_termlist: bool,
}

impl FieldConfig {
    /// Build a plain `generic`/`unique` field with sensible defaults.
    pub fn generic(id: usize, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            value_type: FieldValueType::Generic,
            mergekey_policy: MergekeyPolicy::No,
            merge_policy: MergePolicy::Unique,
            setting_kind: FieldSettingKind::Neither,
            default_rank: 1,
            facet_rule: "facet".to_string(),
            is_termlist: false,
        }
    }
}

/// The definition of one configured sort key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SortKeyConfig {
    /// Stable numeric id, also this sortkey's index into
    /// `Cluster::sortkeys`.
    pub id: usize,
    /// Configured name, as used in sort-parameter strings.
    pub name: String,
    /// Whether the `skiparticle` leading-article rule applies when this
    /// sort key is regenerated.
    pub skip_article: bool,
}

/// Immutable configuration shared by every session for one service
/// (spec §6 "Service").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Configured metadata fields, indexed by `FieldConfig::id`.
    pub fields: Vec<FieldConfig>,
    /// Configured sort keys, indexed by `SortKeyConfig::id`.
    pub sortkeys: Vec<SortKeyConfig>,
    /// Approximate hash-bucket count for every session's reclist.
    pub reclist_hash_size: usize,
}

impl ServiceConfig {
    /// Look up a field by its configured name.
    pub fn field_by_name(&self, name: &str) -> Option<&FieldConfig> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Look up a sort key by its configured name.
    pub fn sortkey_by_name(&self, name: &str) -> Option<&SortKeyConfig> {
        self.sortkeys.iter().find(|s| s.name == name)
    }

    /// Load from a TOML file.
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        toml::from_str(&contents).map_err(|e| Error::config(format!("invalid service config: {e}")))
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            fields: vec![
                FieldConfig {
                    merge_policy: MergePolicy::Longest,
                    mergekey_policy: MergekeyPolicy::Required,
                    is_termlist: true,
                    ..FieldConfig::generic(0, "title")
                },
                FieldConfig {
                    value_type: FieldValueType::Date,
                    merge_policy: MergePolicy::Range,
                    mergekey_policy: MergekeyPolicy::No,
                    is_termlist: true,
                    ..FieldConfig::generic(1, "date")
                },
                FieldConfig {
                    is_termlist: true,
                    ..FieldConfig::generic(2, "medium")
                },
                FieldConfig {
                    merge_policy: MergePolicy::All,
                    ..FieldConfig::generic(3, "author")
                },
            ],
            sortkeys: vec![
                SortKeyConfig { id: 0, name: "title".to_string(), skip_article: true },
                SortKeyConfig { id: 1, name: "date".to_string(), skip_article: false },
            ],
            reclist_hash_size: 401, // prime, per spec's "≈400 buckets, prime-ish"
        }
    }
}

/// Settings understood for a session-database override (spec §4.D, §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SettingKey {
    /// XSLT stylesheet reference, or the literal `"auto"`.
    Xslt,
    /// Human-readable database name.
    Name,
    /// Request syntax used to derive an `"auto"` XSLT filename.
    RequestSyntax,
    /// Record-filter expression (`name`, `name=value`, `name~value`).
    RecordFilter,
    /// Whether termlist counts should be scaled by `term_factor`.
    TermlistTermFactor,
}

/// A per-session view of one target database: the shared definition plus
/// an override chain per setting (spec §4.D).
#[derive(Debug, Clone)]
pub struct SessionDatabase {
    /// Target identity, shared across sessions.
    pub id: String,
    /// Prepend-only override chain per setting; the head is the
    /// currently-effective value.
    overrides: HashMap<SettingKey, Vec<String>>,
    /// Set once any `apply_setting` call has run, per spec §4.D.
    pub settings_modified: bool,
    /// Diagnostic recorded when XSLT resolution or filter parsing fails
    /// for this database (recovered from `original_source`, spec
    /// SPEC_FULL §4.E supplement).
    pub last_error: Option<String>,
}

impl SessionDatabase {
    /// A fresh view with no overrides.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            overrides: HashMap::new(),
            settings_modified: false,
            last_error: None,
        }
    }

    /// Read the currently-effective value for `key`, if any override (or
    /// base default, supplied by the caller) applies.
    pub fn get(&self, key: SettingKey) -> Option<&str> {
        self.overrides.get(&key).and_then(|chain| chain.first()).map(String::as_str)
    }

    /// Prepend a new override for `key` (spec §4.D `apply_setting`).
    pub fn apply_setting(&mut self, key: SettingKey, value: impl Into<String>) {
        self.overrides.entry(key).or_default().insert(0, value.into());
        self.settings_modified = true;
    }

    /// Resolve the XSLT stylesheet reference for this database (spec
    /// §4.D `prepare_map`): if the configured value is the literal
    /// `"auto"`, derive `<lowercased request-syntax>.xsl`.
    pub fn resolve_xslt_reference(&self) -> Option<String> {
        let configured = self.get(SettingKey::Xslt)?;
        if configured != "auto" {
            return Some(configured.to_string());
        }
        let syntax = self.get(SettingKey::RequestSyntax)?;
        let ascii_lower: String = syntax
            .chars()
            .map(|c| if c.is_ascii() { c.to_ascii_lowercase() } else { c })
            .collect();
        Some(format!("{ascii_lower}.xsl"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apply_setting_prepends_and_marks_modified() {
        let mut db = SessionDatabase::new("db1");
        assert!(!db.settings_modified);
        db.apply_setting(SettingKey::Name, "first");
        db.apply_setting(SettingKey::Name, "second");
        assert_eq!(db.get(SettingKey::Name), Some("second"));
        assert!(db.settings_modified);
    }

    #[test]
    fn auto_xslt_derives_from_request_syntax() {
        let mut db = SessionDatabase::new("db1");
        db.apply_setting(SettingKey::Xslt, "auto");
        db.apply_setting(SettingKey::RequestSyntax, "SRW");
        assert_eq!(db.resolve_xslt_reference(), Some("srw.xsl".to_string()));
    }

    #[test]
    fn explicit_xslt_reference_is_used_verbatim() {
        let mut db = SessionDatabase::new("db1");
        db.apply_setting(SettingKey::Xslt, "custom.xsl");
        assert_eq!(db.resolve_xslt_reference(), Some("custom.xsl".to_string()));
    }

    #[test]
    fn default_service_config_has_title_and_date_fields() {
        let svc = ServiceConfig::default();
        assert!(svc.field_by_name("title").is_some());
        assert!(svc.field_by_name("date").is_some());
        assert_eq!(svc.field_by_name("date").unwrap().merge_policy, MergePolicy::Range);
    }
}
