//! Route table for the session reader API.

use axum::{
    routing::{delete, get, post},
    Router,
};

use super::handlers::{self, AppState};

/// Build the `/api/v1` router.
pub fn create_api_routes() -> Router<AppState> {
    Router::new()
        .route("/api/v1/sessions", post(handlers::create_session))
        .route("/api/v1/sessions/:id", delete(handlers::destroy_session))
        .route("/api/v1/sessions/:id/ingest", post(handlers::ingest_record))
        .route("/api/v1/sessions/:id/search", post(handlers::search))
        .route("/api/v1/sessions/:id/sort", post(handlers::sort))
        .route("/api/v1/sessions/:id/show", get(handlers::show_range))
        .route("/api/v1/sessions/:id/termlist/:field", get(handlers::termlist))
        .route("/api/v1/sessions/:id/settings", post(handlers::apply_setting))
        .route("/api/v1/health", get(handlers::health_check))
        .route("/api/v1/info", get(handlers::system_info))
}
