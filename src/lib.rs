//! Session core for a metasearch aggregator: record ingestion across
//! concurrently-queried targets, mergekey-based clustering, faceted
//! termlists, and sorted/paged reader APIs over the merged result set.
#![warn(missing_docs)]

pub mod api;
pub mod arena;
pub mod client;
pub mod config;
pub mod counter;
pub mod error;
pub mod ingest;
pub mod model;
pub mod reclist;
pub mod session;
pub mod sortparams;
pub mod termlist;
pub mod unicode;

pub use error::{Error, Result};
pub use session::{Session, SessionRegistry};

/// Crate version, exposed for the `/info` endpoint.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
/// Crate name, exposed for the `/info` endpoint.
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Install the process-wide tracing subscriber. Call once at startup.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();
}
