//! Session lifecycle and reader APIs (spec §4, §6).
//!
//! A `Session` owns one arena-backed cluster population, one reclist, one
//! client per selected target, and the termlists/watch machinery layered
//! on top. Grounded on the teacher's `NodeStorageEngine`-style registry
//! (a `DashMap` keyed by id, entries created lazily) for the session
//! registry held by [`SessionRegistry`], and on its `Arc<AtomicU64>`-style
//! shared counters for [`crate::counter::SessionCounter`]. Cluster/record
//! arenas and the reclist stay behind `parking_lot::Mutex` since they are
//! only ever touched synchronously; the target map uses `tokio::sync::Mutex`
//! instead because a search holds it across a client's `.await`.

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::sync::{Mutex as AsyncMutex, Notify};

use crate::arena::{Arena, Handle};
use crate::client::{Client, ClientState};
use crate::config::{ServiceConfig, SessionDatabase, SettingKey};
use crate::counter::SessionCounter;
use crate::error::{Error, Result};
use crate::ingest::{facet_deltas, ingest_record, parse_record, IngestOutcome, RecordFilter};
use crate::model::{Cluster, Record};
use crate::reclist::SharedReclist;
use crate::sortparams::{self, SortChain};
use crate::termlist::Termlist;

/// What a session watcher is notified about (spec §4.B watch kinds).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WatchKind {
    /// A search's result set changed (new hits merged in).
    Search,
    /// A termlist's term counts changed.
    Termlist,
}

/// One selected target and its session-scoped view.
pub struct TargetSlot {
    pub database: SessionDatabase,
    pub client: Box<dyn Client>,
}

/// A single user's interaction with one search across selected targets.
pub struct Session {
    id: String,
    service: Arc<ServiceConfig>,
    clusters: Mutex<Arena<Cluster>>,
    records: Mutex<Arena<Record>>,
    reclist: SharedReclist,
    targets: AsyncMutex<HashMap<String, TargetSlot>>,
    termlists: Mutex<HashMap<usize, Termlist>>,
    sort_chain: Mutex<Option<SortChain>>,
    watchers: Mutex<HashMap<WatchKind, Arc<Notify>>>,
    record_filter: Mutex<Option<RecordFilter>>,
}

impl Session {
    /// Create a new session bound to `service`'s field/sortkey layout.
    pub fn new(id: impl Into<String>, service: Arc<ServiceConfig>) -> Self {
        let hash_size = service.reclist_hash_size;
        Self {
            id: id.into(),
            service,
            clusters: Mutex::new(Arena::new()),
            records: Mutex::new(Arena::new()),
            reclist: SharedReclist::new(hash_size),
            targets: AsyncMutex::new(HashMap::new()),
            termlists: Mutex::new(HashMap::new()),
            sort_chain: Mutex::new(None),
            watchers: Mutex::new(HashMap::new()),
            record_filter: Mutex::new(None),
        }
    }

    /// Stable session identity.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Select one target database for this session (spec §4.A
    /// "select_targets"; `session_search` itself enforces at least one
    /// target is present).
    pub async fn select_target(&self, database: SessionDatabase, client: Box<dyn Client>) {
        self.targets.lock().await.insert(database.id.clone(), TargetSlot { database, client });
    }

    /// Number of currently-selected targets.
    pub async fn target_count(&self) -> usize {
        self.targets.lock().await.len()
    }

    /// Apply a database-level setting override before search (spec §4.D).
    pub async fn apply_setting(&self, target_id: &str, key: SettingKey, value: impl Into<String>) {
        if let Some(slot) = self.targets.lock().await.get_mut(target_id) {
            slot.database.apply_setting(key, value);
        }
    }

    /// Install the record filter expression used during ingestion for
    /// every target (spec §4.D `RecordFilter`).
    pub fn set_record_filter(&self, spec: &str) {
        *self.record_filter.lock() = Some(RecordFilter::parse(spec));
    }

    /// Dispatch a search across every selected target sequentially,
    /// pulling and ingesting every hit each target reports (spec §4.A
    /// `session_search`, §4.F.2 `limit`→`facet_limits`). A single target's
    /// failure does not abort the others. Fails up front if no targets are
    /// selected, the query is empty, or `limit` is present but zero.
    pub async fn session_search(&self, query: &str, limit: Option<usize>) -> Result<()> {
        if self.target_count().await == 0 {
            return Err(Error::NoTargets);
        }
        if query.trim().is_empty() {
            return Err(Error::MalformedParameterValue { which: "query" });
        }
        if limit == Some(0) {
            return Err(Error::MalformedParameterValue { which: "limit" });
        }
        self.set_limit(limit);

        let target_ids: Vec<String> = self.targets.lock().await.keys().cloned().collect();
        for target_id in target_ids {
            let _ = self.dispatch_one(&target_id, query).await;
        }
        Ok(())
    }

    async fn dispatch_one(&self, target_id: &str, query: &str) -> Result<()> {
        let hit_count = {
            let mut targets = self.targets.lock().await;
            let slot = targets.get_mut(target_id).ok_or(Error::NoTargets)?;
            slot.client.search(query).await?.hit_count
        };

        for position in 1..=hit_count {
            let xml = {
                let mut targets = self.targets.lock().await;
                let slot = targets.get_mut(target_id).ok_or(Error::NoTargets)?;
                slot.client.present(position).await?
            };
            self.ingest_xml(target_id, &xml, position).await?;
        }
        if hit_count > 0 {
            self.alert_watch(WatchKind::Search);
        }
        Ok(())
    }

    /// Ingest one record's transformed XML for `target_id` at `position`
    /// (spec §4.E, the full pipeline run per record).
    pub async fn ingest_xml(&self, target_id: &str, xml: &str, position: usize) -> Result<IngestOutcome> {
        let (client_attached, term_factor) = {
            let targets = self.targets.lock().await;
            let slot = targets.get(target_id);
            let client_attached = slot.map(|slot| slot.client.state() != ClientState::Disconnected).unwrap_or(false);
            let term_factor = slot
                .and_then(|slot| slot.database.get(SettingKey::TermlistTermFactor))
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(1);
            (client_attached, term_factor)
        };

        let record = parse_record(xml, &self.service, target_id, position)?;
        let deltas = facet_deltas(&record, &self.service)?;

        let filter_guard = self.record_filter.lock();
        let filter = filter_guard.as_ref();

        let outcome = {
            let mut clusters = self.clusters.lock();
            let mut records = self.records.lock();
            let mut reclist = self.reclist.enter();
            ingest_record(record, client_attached, &self.service, &mut reclist, &mut clusters, &mut records, filter)?
        };
        drop(filter_guard);

        if matches!(outcome, IngestOutcome::Inserted(_)) {
            let mut termlists = self.termlists.lock();
            for (field_id, terms) in deltas {
                let tl = termlists.entry(field_id).or_insert_with(Termlist::new);
                for (normalized, display) in terms {
                    tl.increment(&normalized, &display, term_factor);
                }
            }
            self.alert_watch(WatchKind::Termlist);
        }

        Ok(outcome)
    }

    /// Set and, if the chain actually changed, apply a new sort order
    /// across the current cluster population (spec §4.C `session_sort`).
    pub fn session_sort(&self, spec: &str) -> Result<()> {
        let chain = sortparams::parse(spec, &self.service)?;
        let mut current = self.sort_chain.lock();
        let changed = match current.as_ref() {
            Some(existing) => !sortparams::sortparms_cmp(existing, &chain),
            None => true,
        };
        if !changed {
            return Ok(());
        }

        let handles = {
            let clusters = self.clusters.lock();
            let records = self.records.lock();
            let mut handles: Vec<Handle<Cluster>> = clusters.iter().map(|(h, _)| h).collect();
            handles.sort_by(|a, b| {
                let ca = clusters.get(*a).expect("handle from this arena's iter is live");
                let cb = clusters.get(*b).expect("handle from this arena's iter is live");
                sortparams::compare(ca, cb, &chain, &records)
            });
            handles
        };

        self.reclist.enter().sort(handles);
        *current = Some(chain);
        self.alert_watch(WatchKind::Search);
        Ok(())
    }

    /// Cap the sorted view exposed by `show_range` (spec §4.B `limit`).
    pub fn set_limit(&self, limit: Option<usize>) {
        self.reclist.enter().limit(limit);
    }

    /// Read `count` clusters starting at `start` (1-based) in the current
    /// sort order (spec §6 `show`/`show-range`).
    pub fn show_range(&self, start: usize, count: usize) -> Vec<Handle<Cluster>> {
        let guard = self.reclist.enter();
        (start..start + count)
            .map_while(|pos| guard.read_record(pos.saturating_sub(1)))
            .collect()
    }

    /// Total hits currently clustered, independent of any limit.
    pub fn total_hits(&self) -> usize {
        self.reclist.enter().total_inserted()
    }

    /// Resolve a cluster handle to a cloned snapshot for read-only display.
    pub fn read_cluster(&self, handle: Handle<Cluster>) -> Option<Cluster> {
        self.clusters.lock().get(handle).cloned()
    }

    /// Configured metadata field names, in field-id order, for callers that
    /// need to label a cluster's metadata slots (spec §6 reader output).
    pub fn service_field_names(&self) -> Vec<String> {
        self.service.fields.iter().map(|f| f.name.clone()).collect()
    }

    /// Resolve a configured field's id by name.
    pub fn field_id_by_name(&self, name: &str) -> Option<usize> {
        self.service.field_by_name(name).map(|f| f.id)
    }

    /// The current top-k facet terms for a configured termlist field (spec
    /// §4.F `perform_termlist`).
    pub fn perform_termlist(&self, field_id: usize, limit: usize) -> Vec<(String, u64)> {
        self.termlists
            .lock()
            .get(&field_id)
            .map(|tl| tl.top(limit).into_iter().map(|t| (t.display.clone(), t.count)).collect())
            .unwrap_or_default()
    }

    /// Register interest in `kind`, returning the `Notify` that fires the
    /// next time that kind is signalled (spec §4.B `set_watch`, property
    /// #11). At most one watcher may be outstanding per kind at a time;
    /// installing a second before the first fires is an error.
    pub fn set_watch(&self, kind: WatchKind) -> Result<Arc<Notify>> {
        let mut watchers = self.watchers.lock();
        if watchers.contains_key(&kind) {
            return Err(Error::WatchAlreadyRegistered);
        }
        let notify = Arc::new(Notify::new());
        watchers.insert(kind, notify.clone());
        Ok(notify)
    }

    /// Fire `kind`'s watcher, if one is registered, then clear its slot so
    /// the registration is consumed exactly once (spec §4.F property #11):
    /// a subsequent alert with no intervening `set_watch` is a no-op.
    fn alert_watch(&self, kind: WatchKind) {
        if let Some(notify) = self.watchers.lock().remove(&kind) {
            notify.notify_waiters();
        }
    }

    /// Tear down this session: disconnect every target, then clear the
    /// reclist before the arenas it indexes into, matching the source's
    /// strict teardown ordering.
    pub async fn teardown(&self) {
        let mut targets = self.targets.lock().await;
        for (_, mut slot) in targets.drain() {
            slot.client.disconnect().await;
        }
        drop(targets);
        self.reclist.enter().destroy();
        self.clusters.lock().clear();
        self.records.lock().clear();
    }
}

/// Process-wide registry of live sessions, keyed by session id (spec §4.A
/// session creation/lookup), grounded on the teacher's `DashMap`-backed
/// per-key registry pattern.
pub struct SessionRegistry {
    sessions: DashMap<String, Arc<Session>>,
    service: Arc<ServiceConfig>,
    counter: Arc<SessionCounter>,
}

impl SessionRegistry {
    /// Build an empty registry bound to one service configuration.
    pub fn new(service: Arc<ServiceConfig>) -> Self {
        Self {
            sessions: DashMap::new(),
            service,
            counter: SessionCounter::new(),
        }
    }

    /// The shared liveness counter, for external metrics reporting.
    pub fn counter(&self) -> Arc<SessionCounter> {
        self.counter.clone()
    }

    /// Create and register a new session, returning its handle.
    pub fn create(&self, id: impl Into<String>) -> Arc<Session> {
        let id = id.into();
        self.counter.session_started();
        let session = Arc::new(Session::new(id.clone(), self.service.clone()));
        self.sessions.insert(id, session.clone());
        session
    }

    /// Look up a session by id.
    pub fn get(&self, id: &str) -> Option<Arc<Session>> {
        self.sessions.get(id).map(|entry| entry.clone())
    }

    /// Tear down and remove a session.
    pub async fn destroy(&self, id: &str) {
        if let Some((_, session)) = self.sessions.remove(id) {
            session.teardown().await;
            self.counter.session_ended();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::SearchOutcome;
    use async_trait::async_trait;

    struct StubClient {
        db: SessionDatabase,
        state: ClientState,
        records: Vec<&'static str>,
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
            Ok(SearchOutcome { hit_count: self.records.len(), diagnostic: None })
        }
        async fn present(&mut self, position: usize) -> Result<String> {
            Ok(self.records[position - 1].to_string())
        }
        async fn disconnect(&mut self) {
            self.state = ClientState::Disconnected;
        }
    }

    fn xml(title: &str) -> String {
        format!(r#"<record><metadata type="title">{title}</metadata></record>"#)
    }

    fn stub_target(id: &str, records: Vec<&'static str>) -> (SessionDatabase, Box<dyn Client>) {
        (
            SessionDatabase::new(id),
            Box::new(StubClient { db: SessionDatabase::new(id), state: ClientState::Idle, records }),
        )
    }

    #[tokio::test]
    async fn search_without_targets_is_rejected() {
        let session = Session::new("s1", Arc::new(ServiceConfig::default()));
        let err = session.session_search("dune", None).await.unwrap_err();
        assert!(matches!(err, Error::NoTargets));
    }

    #[tokio::test]
    async fn ingest_then_show_range_returns_the_inserted_cluster() {
        let session = Session::new("s1", Arc::new(ServiceConfig::default()));
        let (db, client) = stub_target("db1", vec![]);
        session.select_target(db, client).await;

        let outcome = session.ingest_xml("db1", &xml("Dune"), 1).await.unwrap();
        assert!(matches!(outcome, IngestOutcome::Inserted(_)));
        assert_eq!(session.total_hits(), 1);
    }

    #[tokio::test]
    async fn search_pulls_every_hit_from_the_target() {
        let session = Session::new("s1", Arc::new(ServiceConfig::default()));
        let (db, client) = stub_target("db1", vec![
            r#"<record><metadata type="title">Dune</metadata></record>"#,
            r#"<record><metadata type="title">Foundation</metadata></record>"#,
        ]);
        session.select_target(db, client).await;
        session.session_search("scifi", None).await.unwrap();
        assert_eq!(session.total_hits(), 2);
    }

    #[tokio::test]
    async fn zero_limit_is_rejected_as_malformed() {
        let session = Session::new("s1", Arc::new(ServiceConfig::default()));
        let (db, client) = stub_target("db1", vec![]);
        session.select_target(db, client).await;
        let err = session.session_search("scifi", Some(0)).await.unwrap_err();
        assert!(matches!(err, Error::MalformedParameterValue { which: "limit" }));
    }

    #[tokio::test]
    async fn search_applies_the_requested_limit() {
        let session = Session::new("s1", Arc::new(ServiceConfig::default()));
        let (db, client) = stub_target("db1", vec![
            r#"<record><metadata type="title">Dune</metadata></record>"#,
            r#"<record><metadata type="title">Foundation</metadata></record>"#,
        ]);
        session.select_target(db, client).await;
        session.session_search("scifi", Some(1)).await.unwrap();
        session.session_sort("title").unwrap();
        assert_eq!(session.show_range(1, 10).len(), 1);
    }

    #[tokio::test]
    async fn sort_then_show_range_reflects_new_order() {
        let session = Session::new("s1", Arc::new(ServiceConfig::default()));
        let (db, client) = stub_target("db1", vec![]);
        session.select_target(db, client).await;
        session.ingest_xml("db1", &xml("Zebra"), 1).await.unwrap();
        session.ingest_xml("db1", &xml("Apple"), 2).await.unwrap();
        session.session_sort("title").unwrap();
        let handles = session.show_range(1, 2);
        assert_eq!(handles.len(), 2);
        let first = session.read_cluster(handles[0]).unwrap();
        assert!(matches!(&first.metadata[0], crate::model::ClusterFieldSlot::Longest { value: Some(v) } if v.display_text() == Some("Apple")));
    }

    #[tokio::test]
    async fn watch_is_one_shot_and_rejects_duplicate_registration() {
        use std::time::Duration;

        let session = Session::new("s1", Arc::new(ServiceConfig::default()));
        let (db, client) = stub_target("db1", vec![]);
        session.select_target(db, client).await;
        session.ingest_xml("db1", &xml("Dune"), 1).await.unwrap();

        let notify = session.set_watch(WatchKind::Search).unwrap();
        assert!(matches!(session.set_watch(WatchKind::Search), Err(Error::WatchAlreadyRegistered)));

        // Register the waiter (so it is polling before the alert fires),
        // then trigger the alert and confirm it resolves.
        let waiter = tokio::spawn({
            let notify = notify.clone();
            async move { notify.notified().await }
        });
        tokio::task::yield_now().await;
        session.session_sort("title").unwrap();
        tokio::time::timeout(Duration::from_secs(1), waiter).await.unwrap().unwrap();

        // Firing cleared the slot, so a fresh registration succeeds again.
        let notify2 = session.set_watch(WatchKind::Search).unwrap();
        let waiter2 = tokio::spawn({
            let notify2 = notify2.clone();
            async move { notify2.notified().await }
        });
        tokio::task::yield_now().await;
        session.session_sort("date").unwrap();
        tokio::time::timeout(Duration::from_secs(1), waiter2).await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn termlist_increment_is_scaled_by_configured_term_factor() {
        let session = Session::new("s1", Arc::new(ServiceConfig::default()));
        let (mut db, client) = stub_target("db1", vec![]);
        db.apply_setting(SettingKey::TermlistTermFactor, "5");
        session.select_target(db, client).await;

        let record_xml = r#"<record><metadata type="title">Dune</metadata><metadata type="medium">ebook</metadata></record>"#;
        session.ingest_xml("db1", record_xml, 1).await.unwrap();

        let field_id = session.field_id_by_name("medium").unwrap();
        let terms = session.perform_termlist(field_id, 10);
        assert_eq!(terms[0].1, 5);
    }

    #[tokio::test]
    async fn teardown_clears_hits() {
        let session = Session::new("s1", Arc::new(ServiceConfig::default()));
        let (db, client) = stub_target("db1", vec![]);
        session.select_target(db, client).await;
        session.ingest_xml("db1", &xml("Dune"), 1).await.unwrap();
        session.teardown().await;
        assert_eq!(session.total_hits(), 0);
    }

    #[test]
    fn registry_create_and_destroy_tracks_counter() {
        let registry = SessionRegistry::new(Arc::new(ServiceConfig::default()));
        let session = registry.create("s1");
        assert_eq!(registry.counter().live(), 1);
        assert!(registry.get("s1").is_some());
        assert_eq!(session.id(), "s1");
    }
}
