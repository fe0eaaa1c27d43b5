//! Application State
//!
//! Shared state across all handlers (§6, C13). Narrowed down from the
//! teacher's multi-service `AppState` to the one thing every transport
//! needs: a handle to the `ConversationEngine` plus the connection-level
//! rate limiter and a read-only config snapshot for the health/metrics
//! routes.

use std::sync::Arc;

use metrics_exporter_prometheus::PrometheusHandle;
use pregnancy_agent::{ConversationEngine, RateLimiter};
use pregnancy_config::Settings;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<ConversationEngine>,
    pub rate_limiter: Arc<RateLimiter>,
    pub config: Arc<Settings>,
    pub metrics_handle: Arc<PrometheusHandle>,
}

impl AppState {
    pub fn new(
        engine: Arc<ConversationEngine>,
        rate_limiter: Arc<RateLimiter>,
        config: Arc<Settings>,
        metrics_handle: Arc<PrometheusHandle>,
    ) -> Self {
        Self { engine, rate_limiter, config, metrics_handle }
    }
}
