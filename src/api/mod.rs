//! HTTP reader-API surface over [`crate::session::Session`] (spec §4.G,
//! §6). Ambient wiring only — target-client protocol handling stays out
//! of this crate's scope.

pub mod handlers;
pub mod routes;
pub mod server;

pub use handlers::AppState;
pub use server::{create_app, start_server};
