//! Prometheus metrics recording and endpoint.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Install the Prometheus metrics recorder and return the handle for rendering.
pub fn install_prometheus_recorder() -> anyhow::Result<PrometheusHandle> {
    Ok(PrometheusBuilder::new().install_recorder()?)
}

/// Record a `/pipe` request in the given mode ("stream" or "text").
pub fn record_pipe_request(mode: &'static str) {
    metrics::counter!("pipe_requests_total", "mode" => mode).increment(1);
}

/// Record how long the pipe took to produce its output (or first chunk).
pub fn record_pipe_latency(mode: &'static str, duration_secs: f64) {
    metrics::histogram!("pipe_response_seconds", "mode" => mode).record(duration_secs);
}
