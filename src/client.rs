//! The per-target client interface and lifecycle state (spec §6).
//!
//! Each session holds one client per selected target database. The source
//! drives a client through a fixed state machine via callback pointers
//! invoked from the network layer; this module keeps the state machine but
//! expresses the external behavior a session depends on as a trait so the
//! search-dispatch and ingestion code can depend on `dyn Client` instead of
//! a protocol-specific implementation, the way the teacher's
//! `DocumentStorage` trait isolates `DeltaProcessor` from any one backing
//! store.

use async_trait::async_trait;

use crate::config::SessionDatabase;
use crate::error::Result;

/// A client's position in its lifecycle (spec §6 "Client states").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    /// Connection to the target has not yet started.
    Connecting,
    /// Connected, idle, ready to accept a search.
    Idle,
    /// A search or present request is in flight.
    Working,
    /// The target reported a protocol or application-level failure.
    Failed,
    /// A local/transport error occurred; distinct from `Failed` because
    /// the target itself may still be healthy.
    Error,
    /// Cleanly detached; no further requests will be issued.
    Disconnected,
}

/// The behavior a session depends on from one target connection.
///
/// Implementations own the protocol-specific plumbing (request encoding,
/// response parsing) and report ingested records back to the session
/// through [`ingest_record`](Self::ingest_record)'s return value rather
/// than a callback, since async/await makes the round trip a plain
/// `.await` instead of a registered continuation.
#[async_trait]
pub trait Client: Send + Sync {
    /// The target database this client searches.
    fn database(&self) -> &SessionDatabase;

    /// Current lifecycle state.
    fn state(&self) -> ClientState;

    /// Issue a search against the target, returning once the target has
    /// either delivered a result count or failed.
    async fn search(&mut self, query: &str) -> Result<SearchOutcome>;

    /// Fetch the raw record at `position` (1-based) from the target's
    /// result set.
    async fn present(&mut self, position: usize) -> Result<String>;

    /// Tear down the connection; subsequent calls observe
    /// `ClientState::Disconnected`.
    async fn disconnect(&mut self);
}

/// The result of a client's `search` call.
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    /// Number of hits the target reported.
    pub hit_count: usize,
    /// Diagnostic message surfaced by the target, if any.
    pub diagnostic: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StubClient {
        db: SessionDatabase,
        state: ClientState,
    }

    #[async_trait]
    impl Client for StubClient {
        fn database(&self) -> &SessionDatabase {
            &self.db
        }
        fn state(&self) -> ClientState {
            self.state
        }
        async fn search(&mut self, _query: &str) -> Result<SearchOutcome> {
            self.state = ClientState::Idle;
            Ok(SearchOutcome { hit_count: 3, diagnostic: None })
        }
        async fn present(&mut self, _position: usize) -> Result<String> {
            Ok("<record/>".to_string())
        }
        async fn disconnect(&mut self) {
            self.state = ClientState::Disconnected;
        }
    }

    #[tokio::test]
    async fn search_transitions_to_idle_and_reports_hits() {
        let mut client = StubClient { db: SessionDatabase::new("db1"), state: ClientState::Connecting };
        let outcome = client.search("dune").await.unwrap();
        assert_eq!(outcome.hit_count, 3);
        assert_eq!(client.state(), ClientState::Idle);
    }

    #[tokio::test]
    async fn disconnect_transitions_to_disconnected() {
        let mut client = StubClient { db: SessionDatabase::new("db1"), state: ClientState::Idle };
        client.disconnect().await;
        assert_eq!(client.state(), ClientState::Disconnected);
    }
}
