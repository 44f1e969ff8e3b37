//! HTTP request handlers for the session reader APIs (spec §4.G, §6).
//!
//! This is "ambient wiring, not protocol-framing logic" (SPEC_FULL §4.G):
//! target-client protocols stay out of scope, so the only way records
//! enter a session over HTTP is the `ingest` endpoint, standing in for a
//! trusted backend that has already fetched and transformed a record's
//! XML. Everything else here is a thin read-side view over [`Session`].

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::config::SettingKey;
use crate::model::{Cluster, MetadataValue};
use crate::session::SessionRegistry;

/// Standard API response wrapper for all endpoints.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    /// Whether the operation was successful.
    pub success: bool,
    /// Response data, present on success.
    pub data: Option<T>,
    /// Optional human-readable error, present on failure.
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self { success: true, data: Some(data), error: None }
    }
}

fn err_response<T>(message: impl Into<String>) -> Json<ApiResponse<T>> {
    Json(ApiResponse { success: false, data: None, error: Some(message.into()) })
}

/// Shared application state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<SessionRegistry>,
}

/// `POST /api/v1/sessions` — create a new session.
pub async fn create_session(State(state): State<AppState>) -> Json<ApiResponse<Value>> {
    let id = uuid_like_id();
    let session = state.registry.create(id.clone());
    Json(ApiResponse::ok(json!({ "session_id": session.id() })))
}

/// `DELETE /api/v1/sessions/:id` — tear down and remove a session.
pub async fn destroy_session(State(state): State<AppState>, Path(id): Path<String>) -> Json<ApiResponse<Value>> {
    state.registry.destroy(&id).await;
    Json(ApiResponse::ok(json!({ "destroyed": id })))
}

/// Request body for pushing one pre-fetched record into a session.
#[derive(Debug, Deserialize)]
pub struct IngestRequest {
    pub target_id: String,
    pub xml: String,
    pub position: usize,
}

/// `POST /api/v1/sessions/:id/ingest` — ingest one already-transformed
/// record XML string for a target, standing in for what a protocol client
/// would push internally.
pub async fn ingest_record(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<IngestRequest>,
) -> (StatusCode, Json<ApiResponse<Value>>) {
    let Some(session) = state.registry.get(&id) else {
        return (StatusCode::NOT_FOUND, err_response("unknown session"));
    };
    match session.ingest_xml(&req.target_id, &req.xml, req.position).await {
        Ok(outcome) => (StatusCode::OK, Json(ApiResponse::ok(json!({ "outcome": format!("{outcome:?}") })))),
        Err(e) => (StatusCode::BAD_REQUEST, err_response(e.to_string())),
    }
}

/// Request body for dispatching a search.
#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    #[serde(default)]
    pub limit: Option<usize>,
}

/// `POST /api/v1/sessions/:id/search` — dispatch a query to every
/// selected target (spec §4.F `session_search`).
pub async fn search(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<SearchRequest>,
) -> (StatusCode, Json<ApiResponse<Value>>) {
    let Some(session) = state.registry.get(&id) else {
        return (StatusCode::NOT_FOUND, err_response("unknown session"));
    };
    match session.session_search(&req.query, req.limit).await {
        Ok(()) => (StatusCode::OK, Json(ApiResponse::ok(json!({ "total_hits": session.total_hits() })))),
        Err(e) if e.is_client_error() => (StatusCode::BAD_REQUEST, err_response(e.to_string())),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, err_response(e.to_string())),
    }
}

/// Request body for a sort-order change.
#[derive(Debug, Deserialize)]
pub struct SortRequest {
    pub sort: String,
}

/// `POST /api/v1/sessions/:id/sort` — change sort order (spec §4.C
/// `session_sort`).
pub async fn sort(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<SortRequest>,
) -> (StatusCode, Json<ApiResponse<Value>>) {
    let Some(session) = state.registry.get(&id) else {
        return (StatusCode::NOT_FOUND, err_response("unknown session"));
    };
    match session.session_sort(&req.sort) {
        Ok(()) => (StatusCode::OK, Json(ApiResponse::ok(json!({ "sort": req.sort })))),
        Err(e) => (StatusCode::BAD_REQUEST, err_response(e.to_string())),
    }
}

/// Query parameters for a paged result read.
#[derive(Debug, Deserialize)]
pub struct ShowRangeQuery {
    #[serde(default = "default_start")]
    pub start: usize,
    #[serde(default = "default_count")]
    pub count: usize,
}
fn default_start() -> usize { 1 }
fn default_count() -> usize { 20 }

/// One cluster's JSON view (spec §4.G `show_range_start`).
#[derive(Debug, Serialize)]
pub struct ClusterView {
    pub recid: String,
    pub relevance_score: f64,
    pub metadata: serde_json::Map<String, Value>,
}

fn cluster_view(cluster: &Cluster, field_names: &[String]) -> ClusterView {
    let mut metadata = serde_json::Map::new();
    for (idx, slot) in cluster.metadata.iter().enumerate() {
        let Some(name) = field_names.get(idx) else { continue };
        let value = match slot {
            crate::model::ClusterFieldSlot::Unique(values) | crate::model::ClusterFieldSlot::All(values) => {
                Value::Array(values.iter().filter_map(MetadataValue::display_text).map(|s| json!(s)).collect())
            }
            crate::model::ClusterFieldSlot::Longest { value } => {
                json!(value.as_ref().and_then(MetadataValue::display_text))
            }
            crate::model::ClusterFieldSlot::Range(range) => json!(range),
        };
        metadata.insert(name.clone(), value);
    }
    ClusterView { recid: cluster.recid.clone(), relevance_score: cluster.relevance_score, metadata }
}

/// `GET /api/v1/sessions/:id/show` — paged, sorted cluster read (spec §4.G
/// `show_range_start`/`show_range_stop`, collapsed into one snapshot read
/// since HTTP has no persistent cursor to hold a lock across).
pub async fn show_range(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<ShowRangeQuery>,
) -> (StatusCode, Json<ApiResponse<Value>>) {
    let Some(session) = state.registry.get(&id) else {
        return (StatusCode::NOT_FOUND, err_response("unknown session"));
    };
    let field_names: Vec<String> = session.service_field_names();
    let handles = session.show_range(params.start, params.count);
    let views: Vec<ClusterView> = handles
        .into_iter()
        .filter_map(|h| session.read_cluster(h))
        .map(|c| cluster_view(&c, &field_names))
        .collect();
    (StatusCode::OK, Json(ApiResponse::ok(json!({ "total_hits": session.total_hits(), "records": views }))))
}

/// `GET /api/v1/sessions/:id/termlist/:field` — top facet terms for one
/// configured termlist field (spec §4.G `perform_termlist`).
pub async fn termlist(
    State(state): State<AppState>,
    Path((id, field)): Path<(String, String)>,
    Query(params): Query<TermlistQuery>,
) -> (StatusCode, Json<ApiResponse<Value>>) {
    let Some(session) = state.registry.get(&id) else {
        return (StatusCode::NOT_FOUND, err_response("unknown session"));
    };
    let Some(field_id) = session.field_id_by_name(&field) else {
        return (StatusCode::BAD_REQUEST, err_response(format!("unknown termlist field {field}")));
    };
    let terms = session.perform_termlist(field_id, params.limit);
    (StatusCode::OK, Json(ApiResponse::ok(json!({ "field": field, "terms": terms }))))
}

/// Query parameters for a termlist read.
#[derive(Debug, Deserialize)]
pub struct TermlistQuery {
    #[serde(default = "default_termlist_limit")]
    pub limit: usize,
}
fn default_termlist_limit() -> usize { 10 }

/// Request body for a session-database setting override.
#[derive(Debug, Deserialize)]
pub struct SettingRequest {
    pub target_id: String,
    pub key: String,
    pub value: String,
}

/// `POST /api/v1/sessions/:id/settings` — apply a per-database setting
/// override (spec §4.D `apply_setting`).
pub async fn apply_setting(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<SettingRequest>,
) -> (StatusCode, Json<ApiResponse<Value>>) {
    let Some(session) = state.registry.get(&id) else {
        return (StatusCode::NOT_FOUND, err_response("unknown session"));
    };
    let Some(key) = parse_setting_key(&req.key) else {
        return (StatusCode::BAD_REQUEST, err_response(format!("unknown setting {}", req.key)));
    };
    session.apply_setting(&req.target_id, key, req.value).await;
    (StatusCode::OK, Json(ApiResponse::ok(json!({ "applied": true }))))
}

fn parse_setting_key(name: &str) -> Option<SettingKey> {
    match name {
        "xslt" => Some(SettingKey::Xslt),
        "name" => Some(SettingKey::Name),
        "request_syntax" => Some(SettingKey::RequestSyntax),
        "record_filter" => Some(SettingKey::RecordFilter),
        "termlist_term_factor" => Some(SettingKey::TermlistTermFactor),
        _ => None,
    }
}

/// `GET /api/v1/health` — liveness probe.
pub async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// `GET /api/v1/info` — crate identity and live session counts.
pub async fn system_info(State(state): State<AppState>) -> Json<Value> {
    let counter = state.registry.counter();
    Json(json!({
        "name": crate::NAME,
        "version": crate::VERSION,
        "sessions_live": counter.live(),
        "sessions_cumulative": counter.cumulative(),
    }))
}

fn uuid_like_id() -> String {
    use std::sync::atomic::{AtomicU64, Ordering};
    static COUNTER: AtomicU64 = AtomicU64::new(1);
    format!("s{}", COUNTER.fetch_add(1, Ordering::Relaxed))
}
