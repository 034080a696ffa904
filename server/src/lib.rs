//! CarBall relay server library.
//!
//! This module exposes the server components for use in tests and binaries.

pub mod config;
pub mod page;
pub mod relay;
pub mod rooms;
pub mod ws;

use axum::routing::get;
use axum::Router;
use tower_http::cors::CorsLayer;

/// Routes: `/` serves the landing page, `/ws` upgrades to the relay protocol.
pub fn router(app_state: ws::AppState) -> Router {
    Router::new()
        .route("/", get(page::index))
        .route("/ws", get(ws::ws_handler))
        .layer(CorsLayer::permissive())
        .with_state(app_state)
}
