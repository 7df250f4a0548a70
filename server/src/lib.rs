//! Tally Server - scan station server for sample manifest reconciliation.
//!
//! This server exposes the tally-engine session over HTTP: operators upload a
//! manifest, map its columns, confirm the session and scan barcodes. Read-only
//! observers follow progress through a WebSocket live feed.
//!
//! The library target holds the router and state so integration tests can
//! drive the app in-process; `main.rs` only wires configuration and the
//! listener.

pub mod config;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod websocket;

use crate::config::Config;
use crate::websocket::ConnectionManager;
use axum::extract::DefaultBodyLimit;
use axum::Router;
use std::sync::Arc;
use tally_engine::Session;
use tokio::sync::RwLock;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Application state shared across handlers.
///
/// The session is the single writer boundary: every mutation takes the write
/// lock for its whole duration, so readers only ever see complete states.
#[derive(Clone)]
pub struct AppState {
    pub session: Arc<RwLock<Session>>,
    pub config: Arc<Config>,
    pub conn_manager: Arc<ConnectionManager>,
}

impl AppState {
    /// Create state with an empty session.
    pub fn new(config: Config) -> Self {
        Self {
            session: Arc::new(RwLock::new(Session::new())),
            config: Arc::new(config),
            conn_manager: ConnectionManager::new_shared(),
        }
    }
}

/// Build the application router.
pub fn app(state: AppState) -> Router {
    let body_limit = state.config.max_upload_bytes;

    Router::new()
        .merge(routes::create_routes())
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
