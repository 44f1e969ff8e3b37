//! HTTP server wiring: CORS/tracing middleware over the route table.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{http::Method, response::Json, Router};
use serde_json::json;
use tower::ServiceBuilder;
use tower_http::{cors::Any, cors::CorsLayer, trace::TraceLayer};

use super::handlers::AppState;
use super::routes::create_api_routes;
use crate::session::SessionRegistry;

/// Build the full application router over a shared session registry.
pub fn create_app(registry: Arc<SessionRegistry>) -> Router {
    let state = AppState { registry };

    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers(Any)
        .allow_origin(Any);

    Router::new()
        .route("/", axum::routing::get(root_handler))
        .merge(create_api_routes())
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(cors))
        .with_state(state)
}

async fn root_handler() -> Json<serde_json::Value> {
    Json(json!({
        "name": crate::NAME,
        "version": crate::VERSION,
        "endpoints": {
            "health": "/api/v1/health",
            "info": "/api/v1/info",
            "sessions": "/api/v1/sessions",
        },
    }))
}

/// Start the HTTP server, serving until the process is signalled to stop.
pub async fn start_server(addr: SocketAddr, registry: Arc<SessionRegistry>) -> std::io::Result<()> {
    let app = create_app(registry);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("listening on http://{addr}");
    axum::serve(listener, app).await
}
