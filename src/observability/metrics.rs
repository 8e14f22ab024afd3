//! Metrics collection and exposition.
//!
//! # Metrics
//! - `http_requests_total` (counter): requests by method, route, status
//! - `http_request_duration_seconds` (histogram): request latency
//! - `cache_operations_total` (counter): cache calls by operation, outcome
//! - `cache_operation_duration_seconds` (histogram): cache call latency
//! - `cache_circuit_state` (gauge): 0=closed, 1=half-open, 2=open
//! - `cache_circuit_transitions_total` (counter): breaker transitions

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

use crate::resilience::CircuitState;

/// Start the Prometheus scrape endpoint. Must be called inside a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(method: &str, route: &str, status: u16, start: Instant) {
    let labels = [
        ("method", method.to_string()),
        ("route", route.to_string()),
        ("status", status.to_string()),
    ];
    counter!("http_requests_total", &labels).increment(1);
    histogram!("http_request_duration_seconds", &labels).record(start.elapsed().as_secs_f64());
}

pub fn record_cache_operation(operation: &'static str, outcome: &'static str, latency: Duration) {
    counter!("cache_operations_total", "operation" => operation, "outcome" => outcome).increment(1);
    histogram!("cache_operation_duration_seconds", "operation" => operation).record(latency.as_secs_f64());
}

pub fn record_circuit_state(circuit: &str, state: CircuitState) {
    gauge!("cache_circuit_state", "circuit" => circuit.to_string()).set(state as u8 as f64);
}

pub fn record_circuit_transition(circuit: &str, from: CircuitState, to: CircuitState) {
    counter!(
        "cache_circuit_transitions_total",
        "circuit" => circuit.to_string(),
        "from" => from.as_str(),
        "to" => to.as_str()
    )
    .increment(1);
    record_circuit_state(circuit, to);
}
