//! Router assembly (§6, C13).
//!
//! Grounded on the teacher's `server::http::create_router`: a handful of
//! plain routes plus the WebSocket upgrades, wrapped in the same
//! trace/CORS/timeout middleware stack. The teacher's CRUD, admin,
//! MCP/tool, and WebRTC/PTT routes have no counterpart here (§1
//! non-goals: "HTTP CRUD endpoints ... the admin plan-editor UI") and are
//! not carried over.

use std::time::Duration;

use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use axum::extract::State;
use crate::state::AppState;
use crate::{voice, websocket};

/// `GET /health` — liveness, no dependency checks.
async fn health() -> StatusCode {
    StatusCode::OK
}

/// `GET /ready` — readiness; the engine is constructed synchronously at
/// startup so by the time the router is serving traffic it is always
/// ready. Kept as a distinct route so a load balancer can probe it
/// independently of liveness.
async fn ready() -> StatusCode {
    StatusCode::OK
}

async fn metrics_handler(State(state): State<AppState>) -> String {
    state.metrics_handle.render()
}

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/ready", get(ready))
        .route("/metrics", get(metrics_handler))
        .route("/ws/:user_id", get(websocket::handle))
        .route("/voice/:user_id", get(voice::handle))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(60)))
        .layer(cors)
        .with_state(state)
}
