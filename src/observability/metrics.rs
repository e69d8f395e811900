//! Metrics collection and exposition.
//!
//! # Metrics
//! - `honeypot_requests_total` (counter): answered requests by method, response id
//! - `honeypot_peer_errors_total` (counter): peers lost mid-request, by stage
//! - `honeypot_active_connections` (gauge): current connection count
//! - `honeypot_reloads_total` (counter): snapshot reloads
//! - `honeypot_telemetry_submitted_total` (counter): records delivered
//! - `honeypot_telemetry_dropped_total` (counter): records lost, by reason
//!
//! # Design Decisions
//! - Recording is a no-op until an exporter is installed
//! - Labels are low-cardinality: never paths or addresses

use std::net::SocketAddr;
use metrics::{counter, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter. Must run inside a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(method: &str, response_id: u32) {
    counter!(
        "honeypot_requests_total",
        "method" => method.to_string(),
        "response_id" => response_id.to_string()
    )
    .increment(1);
}

pub fn record_peer_error(stage: &'static str) {
    counter!("honeypot_peer_errors_total", "stage" => stage).increment(1);
}

pub fn set_active_connections(count: u64) {
    gauge!("honeypot_active_connections").set(count as f64);
}

pub fn record_reload() {
    counter!("honeypot_reloads_total").increment(1);
}

pub fn record_telemetry_submitted(count: usize) {
    counter!("honeypot_telemetry_submitted_total").increment(count as u64);
}

pub fn record_telemetry_dropped(reason: &'static str, count: usize) {
    counter!("honeypot_telemetry_dropped_total", "reason" => reason).increment(count as u64);
}
