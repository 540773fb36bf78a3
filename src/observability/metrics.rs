//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define server metrics (API calls, latency, cache, sessions)
//! - Expose Prometheus-compatible metrics endpoint
//!
//! # Metrics
//! - `tracker_api_requests_total` (counter): API calls by name and type
//! - `tracker_api_latency_seconds` (histogram): handler execution time
//! - `tracker_http_requests_total` (counter): all requests by method, status
//! - `tracker_cache_lookups_total` (counter): HIT / MISS / SKIP
//! - `tracker_cache_entries` (gauge): entries held by the response cache
//! - `tracker_sessions_in_memory` (gauge): session registry size
//! - `tracker_auth_failures_total` (counter): rejected requests by reason
//! - `tracker_session_flush_total` (counter): batched flushes by outcome
//! - `tracker_session_flush_size` (histogram): updates per flush
//! - `tracker_events_total` (counter): event log writes by outcome
//!
//! # Design Decisions
//! - Without an installed recorder every call is a no-op (tests, CLI)
//! - Emission never blocks a request (atomic updates in the recorder)

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Duration;

use crate::cache::CacheStatus;

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install Prometheus exporter"),
    }
}

/// Count one API call.
pub fn record_api_call(api_name: &'static str, api_type: &'static str) {
    counter!("tracker_api_requests_total", "api_name" => api_name, "api_type" => api_type)
        .increment(1);
}

/// Record handler latency for one API call.
pub fn record_api_latency(api_name: &'static str, api_type: &'static str, latency: Duration) {
    histogram!("tracker_api_latency_seconds", "api_name" => api_name, "api_type" => api_type)
        .record(latency.as_secs_f64());
}

pub fn record_request(method: &str, status: u16) {
    counter!(
        "tracker_http_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

pub fn record_cache_lookup(status: CacheStatus) {
    counter!("tracker_cache_lookups_total", "status" => status.as_str()).increment(1);
}

pub fn record_cache_size(entries: usize) {
    gauge!("tracker_cache_entries").set(entries as f64);
}

pub fn record_session_count(count: usize) {
    gauge!("tracker_sessions_in_memory").set(count as f64);
}

pub fn record_auth_failure(reason: &'static str) {
    counter!("tracker_auth_failures_total", "reason" => reason).increment(1);
}

/// Record the outcome of one batched session flush.
pub fn record_session_flush(size: usize, ok: bool) {
    let outcome = if ok { "ok" } else { "dropped" };
    counter!("tracker_session_flush_total", "outcome" => outcome).increment(1);
    histogram!("tracker_session_flush_size").record(size as f64);
}

pub fn record_event_write(ok: bool) {
    let outcome = if ok { "ok" } else { "failed" };
    counter!("tracker_events_total", "outcome" => outcome).increment(1);
}
