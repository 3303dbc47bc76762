//! Prometheus metrics for the odds stream and bet lifecycle.
//!
//! Counters cover stream traffic and every bet lifecycle step; histograms
//! track REST latency per endpoint and per-frame handling time.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing::{debug, info};

// === Metric Name Constants ===

/// Stream frame handling latency metric name.
pub const METRIC_STREAM_MESSAGE_LATENCY: &str = "stream_message_latency_ms";
/// HTTP request latency metric name.
pub const METRIC_HTTP_REQUEST_LATENCY: &str = "http_request_latency_ms";
/// Stream messages received counter metric name.
pub const METRIC_STREAM_MESSAGES: &str = "stream_messages_received_total";
/// Heartbeats answered counter metric name.
pub const METRIC_HEARTBEATS: &str = "stream_heartbeats_answered_total";
/// Undecodable frames counter metric name.
pub const METRIC_DECODE_ERRORS: &str = "stream_decode_errors_total";
/// Update batches the observer was too slow to take.
pub const METRIC_OBSERVER_DROPS: &str = "stream_observer_drops_total";
/// Event deltas merged counter metric name.
pub const METRIC_UPDATES_APPLIED: &str = "event_updates_applied_total";
/// Advice requests counter metric name.
pub const METRIC_ADVICE_REQUESTS: &str = "bet_advice_requests_total";
/// Confirmations counter metric name.
pub const METRIC_CONFIRMATIONS: &str = "bet_confirmations_total";
/// Status polls counter metric name.
pub const METRIC_STATUS_POLLS: &str = "bet_status_polls_total";
/// Resolved bets counter metric name, labelled by final status.
pub const METRIC_BETS_RESOLVED: &str = "bets_resolved_total";

/// Initialize all metric descriptions.
/// Call this once at startup to register metrics with descriptions.
pub fn init_metrics() {
    describe_histogram!(
        METRIC_STREAM_MESSAGE_LATENCY,
        "Odds stream frame handling latency in milliseconds"
    );
    describe_histogram!(
        METRIC_HTTP_REQUEST_LATENCY,
        "HTTP request latency in milliseconds"
    );

    describe_counter!(METRIC_STREAM_MESSAGES, "Total odds stream frames received");
    describe_counter!(METRIC_HEARTBEATS, "Total heartbeats answered");
    describe_counter!(METRIC_DECODE_ERRORS, "Total undecodable stream frames dropped");
    describe_counter!(METRIC_OBSERVER_DROPS, "Total update notifications dropped on a full observer");
    describe_counter!(METRIC_UPDATES_APPLIED, "Total event deltas merged into the store");
    describe_counter!(METRIC_ADVICE_REQUESTS, "Total bet advice requests");
    describe_counter!(METRIC_CONFIRMATIONS, "Total bet confirmations sent");
    describe_counter!(METRIC_STATUS_POLLS, "Total status polls of pending bets");
    describe_counter!(METRIC_BETS_RESOLVED, "Total bets resolved, by final status");

    debug!("Metrics initialized");
}

/// Install the Prometheus exporter on `port`.
pub fn install_exporter(port: u16) -> Result<(), String> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| format!("failed to install Prometheus exporter: {}", e))?;

    info!(addr = %addr, "Prometheus exporter listening");
    Ok(())
}

/// Record stream frame handling latency.
pub fn record_stream_message_latency(start: Instant) {
    let latency_ms = start.elapsed().as_secs_f64() * 1000.0;
    histogram!(METRIC_STREAM_MESSAGE_LATENCY).record(latency_ms);
}

/// Record HTTP request latency.
pub fn record_http_latency(start: Instant, endpoint: &str) {
    let latency_ms = start.elapsed().as_secs_f64() * 1000.0;
    histogram!(METRIC_HTTP_REQUEST_LATENCY, "endpoint" => endpoint.to_string()).record(latency_ms);
}

/// Increment stream messages counter.
pub fn inc_stream_messages() {
    counter!(METRIC_STREAM_MESSAGES).increment(1);
}

/// Increment heartbeats counter.
pub fn inc_heartbeats() {
    counter!(METRIC_HEARTBEATS).increment(1);
}

/// Increment decode errors counter.
pub fn inc_decode_errors() {
    counter!(METRIC_DECODE_ERRORS).increment(1);
}

/// Increment dropped observer notifications.
pub fn inc_observer_drops() {
    counter!(METRIC_OBSERVER_DROPS).increment(1);
}

/// Add merged deltas.
pub fn inc_updates_applied(count: u64) {
    counter!(METRIC_UPDATES_APPLIED).increment(count);
}

/// Increment advice requests counter.
pub fn inc_advice_requests() {
    counter!(METRIC_ADVICE_REQUESTS).increment(1);
}

/// Increment confirmations counter.
pub fn inc_confirmations() {
    counter!(METRIC_CONFIRMATIONS).increment(1);
}

/// Increment status polls counter.
pub fn inc_status_polls() {
    counter!(METRIC_STATUS_POLLS).increment(1);
}

/// Increment resolved bets counter.
pub fn inc_bets_resolved(status: &str) {
    counter!(METRIC_BETS_RESOLVED, "status" => status.to_string()).increment(1);
}
