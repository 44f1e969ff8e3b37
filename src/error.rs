//! Error types for the session core.
//!
//! Mirrors the shape of a typical service error enum: one top-level
//! `thiserror`-derived type, constructor helpers for the variants that carry
//! a message, and a couple of classification predicates callers use to
//! decide how to report a failure upward.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the session core.
///
/// `FilteredOut` is deliberately not a variant here: it is a normal,
/// non-error outcome of ingestion (see [`crate::ingest::IngestOutcome`]).
#[derive(Error, Debug)]
pub enum Error {
    /// No database matched the search's target filter.
    #[error("no targets selected")]
    NoTargets,

    /// A user-supplied parameter failed validation.
    #[error("malformed {which} parameter")]
    MalformedParameterValue {
        /// Which parameter was malformed (`"query"` or `"limit"`).
        which: &'static str,
    },

    /// The Unicode façade was asked for a locale/action it can't perform.
    #[error("unsupported locale or action: {0}")]
    UnsupportedLocaleOrAction(String),

    /// A record's XML could not be parsed.
    #[error("xml parse error: {0}")]
    Xml(String),

    /// The session or service configuration was malformed.
    #[error("configuration error: {0}")]
    Config(String),

    /// A watch kind already has a registered watcher.
    #[error("watch already registered for this kind")]
    WatchAlreadyRegistered,

    /// Ambient I/O failure (config file loading).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Build a [`Error::Config`] from anything stringish.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Build a [`Error::Xml`] from anything stringish.
    pub fn xml(msg: impl Into<String>) -> Self {
        Self::Xml(msg.into())
    }

    /// True for errors that stem from bad caller input, not internal state.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Error::MalformedParameterValue { .. }
                | Error::NoTargets
                | Error::WatchAlreadyRegistered
        )
    }

    /// True for errors that indicate a misconfigured or broken façade, as
    /// opposed to bad user input.
    pub fn is_internal_error(&self) -> bool {
        matches!(
            self,
            Error::UnsupportedLocaleOrAction(_) | Error::Config(_) | Error::Io(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_errors_are_classified() {
        assert!(Error::NoTargets.is_client_error());
        assert!(Error::MalformedParameterValue { which: "query" }.is_client_error());
        assert!(!Error::Xml("bad".into()).is_client_error());
    }

    #[test]
    fn config_helper_builds_config_variant() {
        let e = Error::config("bad field");
        assert!(matches!(e, Error::Config(ref s) if s == "bad field"));
    }
}
