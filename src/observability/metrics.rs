//! Metrics collection and exposition.
//!
//! # Metrics
//! - `session_gate_outcomes_total` (counter): gate results by terminal state
//! - `session_gate_redirects_total` (counter): protected paths turned away
//! - `upstream_requests_total` (counter): upstream calls by endpoint, outcome
//! - `upstream_request_duration_seconds` (histogram): upstream latency
//!
//! Recording is a no-op until [`init_metrics`] installs the exporter.

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Instant;

/// Install the Prometheus exporter with its own HTTP listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_gate_outcome(state: &'static str) {
    counter!("session_gate_outcomes_total", "state" => state).increment(1);
}

pub fn record_redirect() {
    counter!("session_gate_redirects_total").increment(1);
}

pub fn record_upstream_call(endpoint: &'static str, outcome: &'static str, started: Instant) {
    counter!("upstream_requests_total", "endpoint" => endpoint, "outcome" => outcome).increment(1);
    histogram!("upstream_request_duration_seconds", "endpoint" => endpoint)
        .record(started.elapsed().as_secs_f64());
}
