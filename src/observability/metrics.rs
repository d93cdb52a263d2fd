//! Metrics collection and exposition.
//!
//! # Metrics
//! - `wide_events_emitted_total` (counter): emitted records by outcome
//! - `wide_event_emit_failures_total` (counter): records lost to flatten/sink errors
//! - `http_request_duration_seconds` (histogram): latency by method, status
//!
//! # Design Decisions
//! - `metrics` facade; recording is a no-op until an exporter is installed
//! - Prometheus exporter serves its own scrape listener

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter with an HTTP scrape listener on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Record a successfully emitted wide event.
pub fn record_wide_event(outcome: &'static str) {
    counter!("wide_events_emitted_total", "outcome" => outcome).increment(1);
}

/// Record a wide event that could not be emitted.
pub fn record_emit_failure() {
    counter!("wide_event_emit_failures_total").increment(1);
}

/// Record request latency.
pub fn record_request(method: &str, status: u16, start: Instant) {
    histogram!(
        "http_request_duration_seconds",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .record(start.elapsed().as_secs_f64());
}
