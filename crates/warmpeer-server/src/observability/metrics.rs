//! Prometheus Metrics
//!
//! Metrics tracked:
//! - `warmpeer_discovery_cycles_total` - counter of discovery cycles by outcome
//! - `warmpeer_providers_discovered_total` - counter of provider records enqueued
//! - `warmpeer_providers_skipped_total` - counter of dequeued providers not dialed, by reason
//! - `warmpeer_connection_attempts_total` - counter of finished connection attempts by outcome
//! - `warmpeer_dial_duration_seconds` - histogram of individual dial durations by candidate kind
//! - `warmpeer_connected_peers` - gauge of connected peers at the last snapshot
//! - `warmpeer_provider_queue_depth` - gauge of providers awaiting a connection attempt

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Duration;

/// Result of installing the metrics recorder
#[derive(Debug, Clone)]
pub struct MetricsState {
    /// Address the `/metrics` endpoint listens on
    pub listen_addr: SocketAddr,
}

/// Install the Prometheus recorder with an HTTP listener on `listen_addr`.
///
/// Must be called from within a tokio runtime. Without a recorder the
/// recording functions below are no-ops.
pub fn init_metrics(
    listen_addr: SocketAddr,
) -> Result<MetricsState, Box<dyn std::error::Error + Send + Sync>> {
    PrometheusBuilder::new()
        .with_http_listener(listen_addr)
        .install()?;

    register_metric_descriptions();

    Ok(MetricsState { listen_addr })
}

fn register_metric_descriptions() {
    describe_counter!(
        "warmpeer_discovery_cycles_total",
        "Discovery cycles by outcome"
    );
    describe_counter!(
        "warmpeer_providers_discovered_total",
        "Provider records appended to the provider queue"
    );
    describe_counter!(
        "warmpeer_providers_skipped_total",
        "Dequeued providers that were not dialed"
    );
    describe_counter!(
        "warmpeer_connection_attempts_total",
        "Finished connection attempts by outcome"
    );
    describe_histogram!(
        "warmpeer_dial_duration_seconds",
        "Duration of individual candidate dials in seconds"
    );
    describe_gauge!(
        "warmpeer_connected_peers",
        "Connected peers at the most recent snapshot"
    );
    describe_gauge!(
        "warmpeer_provider_queue_depth",
        "Providers awaiting a connection attempt"
    );
}

pub fn record_cycle(outcome: &'static str) {
    counter!("warmpeer_discovery_cycles_total", "outcome" => outcome).increment(1);
}

pub fn record_provider_discovered() {
    counter!("warmpeer_providers_discovered_total").increment(1);
}

pub fn record_provider_skipped(reason: &'static str) {
    counter!("warmpeer_providers_skipped_total", "reason" => reason).increment(1);
}

pub fn record_attempt(outcome: &'static str) {
    counter!("warmpeer_connection_attempts_total", "outcome" => outcome).increment(1);
}

pub fn record_dial_duration(kind: &'static str, duration: Duration) {
    histogram!("warmpeer_dial_duration_seconds", "kind" => kind).record(duration.as_secs_f64());
}

pub fn set_connected_peers(count: usize) {
    gauge!("warmpeer_connected_peers").set(count as f64);
}

pub fn set_queue_depth(depth: usize) {
    gauge!("warmpeer_provider_queue_depth").set(depth as f64);
}
