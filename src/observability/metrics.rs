//! Metrics collection and exposition.
//!
//! # Metrics
//! - `relaylog_requests_total` (counter): HTTP requests by method, status
//! - `relaylog_request_duration_seconds` (histogram): handler latency
//! - `relaylog_ws_connections` (gauge): live registry size
//! - `relaylog_broadcast_failures_total` (counter): deliveries that pruned a connection
//! - `relaylog_log_entries_total` (counter): journal entries written, by direction
//! - `relaylog_log_sink_failures_total` (counter): journal appends that failed
//!
//! Without an installed recorder every call here is a no-op.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Start the Prometheus scrape endpoint. Must run inside the Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(method: &str, status: u16, start: Instant) {
    counter!(
        "relaylog_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("relaylog_request_duration_seconds").record(start.elapsed().as_secs_f64());
}

pub fn record_ws_connections(live: usize) {
    gauge!("relaylog_ws_connections").set(live as f64);
}

pub fn record_broadcast_failure() {
    counter!("relaylog_broadcast_failures_total").increment(1);
}

pub fn record_log_entry(direction: &'static str) {
    counter!("relaylog_log_entries_total", "direction" => direction).increment(1);
}

pub fn record_log_sink_failure() {
    counter!("relaylog_log_sink_failures_total").increment(1);
}
