//! Metrics collection and exposition.
//!
//! # Metrics
//! - `isolation_decisions_total` (counter): decisions by service, result
//! - `isolation_events_total` (counter): delivered events by service, kind
//! - `isolation_events_dropped_total` (counter): events lost to a full sink
//! - `isolation_policy_reloads_total` (counter): configuration swaps
//!
//! # Design Decisions
//! - Recording is a no-op until an exporter is installed
//! - Labels kept low-cardinality (service, never instance)

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

/// Install the Prometheus exporter listening on `addr`.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_decision(service: &str, allowed: bool) {
    let result = if allowed { "allow" } else { "isolate" };
    metrics::counter!(
        "isolation_decisions_total",
        "service" => service.to_string(),
        "result" => result
    )
    .increment(1);
}

pub fn record_event(service: &str, kind: &'static str) {
    metrics::counter!(
        "isolation_events_total",
        "service" => service.to_string(),
        "kind" => kind
    )
    .increment(1);
}

pub fn record_event_dropped() {
    metrics::counter!("isolation_events_dropped_total").increment(1);
}

pub fn record_policy_reload() {
    metrics::counter!("isolation_policy_reloads_total").increment(1);
}
