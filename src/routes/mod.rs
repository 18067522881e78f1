//! Router assembly for the gate server.
//!
//! SYSTEM CONTEXT
//! ==============
//! Serves the built dashboard bundle from `STATIC_DIR` behind the edge gate.
//! Unknown paths fall back to `index.html` so client-side routes load the
//! app shell, where the route guard takes over.

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;

use std::sync::Arc;

use axum::Router;
use axum::http::StatusCode;
use axum::middleware::from_fn_with_state;
use axum::routing::get;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

use crate::config::DashboardConfig;
use crate::edge::{EdgeRouter, edge_gate};

const INDEX_FILE: &str = "index.html";

/// Build the gate server router.
pub fn app(config: &DashboardConfig) -> Router {
    let gate = Arc::new(EdgeRouter::from_config(config));
    let assets = ServeDir::new(&config.static_dir)
        .append_index_html_on_directories(true)
        .fallback(ServeFile::new(config.static_dir.join(INDEX_FILE)));

    Router::new()
        .route("/healthz", get(healthz))
        .fallback_service(assets)
        .layer(from_fn_with_state(gate, edge_gate))
        .layer(TraceLayer::new_for_http())
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}
