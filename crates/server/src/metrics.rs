//! Prometheus metrics bootstrap (ambient observability stack, §6).
//!
//! Grounded on the teacher's `server::metrics` wiring of
//! `metrics-exporter-prometheus`: install a global recorder once at
//! startup, expose its text-format snapshot on `/metrics`, and record a
//! handful of counters/histograms from the turn pipeline.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Installs the global Prometheus recorder. Call once, early in `main`.
pub fn init_metrics() -> Result<PrometheusHandle, metrics_exporter_prometheus::BuildError> {
    PrometheusBuilder::new().install_recorder()
}

pub fn record_turn_started() {
    metrics::counter!("pregnancy_agent_turns_total").increment(1);
}

pub fn record_turn_failed(reason: &'static str) {
    metrics::counter!("pregnancy_agent_turn_errors_total", "reason" => reason).increment(1);
}

pub fn record_turn_duration(seconds: f64) {
    metrics::histogram!("pregnancy_agent_turn_duration_seconds").record(seconds);
}
