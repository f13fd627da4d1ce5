//! Prometheus metrics for the exchange core.
//!
//! - HTTP request metrics (latency, count, in-flight)
//! - Order lifecycle metrics (submitted, rejected, matched, cancelled)
//! - Pipeline metrics (queue depth per stage, coordinator pending count)
//! - Venue metrics (phase transitions, rate-limit rejections)

#![allow(dead_code)]

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Instant;

pub mod names {
    pub const HTTP_REQUESTS_TOTAL: &str = "http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "http_request_duration_seconds";
    pub const HTTP_REQUESTS_IN_FLIGHT: &str = "http_requests_in_flight";

    pub const ORDERS_SUBMITTED_TOTAL: &str = "orders_submitted_total";
    pub const ORDERS_REJECTED_TOTAL: &str = "orders_rejected_total";
    pub const ORDERS_CANCELLED_TOTAL: &str = "orders_cancelled_total";
    pub const ORDER_PROCESSING_DURATION_SECONDS: &str = "order_processing_duration_seconds";
    pub const TRADES_EXECUTED_TOTAL: &str = "trades_executed_total";
    pub const TRADE_VOLUME_TOTAL: &str = "trade_volume_total";

    pub const PIPELINE_QUEUE_DEPTH: &str = "pipeline_queue_depth";
    pub const COORDINATOR_PENDING_REQUESTS: &str = "coordinator_pending_requests";

    pub const PHASE_TRANSITIONS_TOTAL: &str = "phase_transitions_total";
    pub const RATE_LIMIT_REJECTIONS_TOTAL: &str = "rate_limit_rejections_total";
    pub const CONSTRAINT_VIOLATIONS_TOTAL: &str = "constraint_violations_total";

    pub const WS_CONNECTIONS_ACTIVE: &str = "ws_connections_active";
    pub const WS_EVENTS_PUBLISHED_TOTAL: &str = "ws_events_published_total";
    pub const WS_SUBSCRIBER_LAG_TOTAL: &str = "ws_subscriber_lag_total";
}

pub mod labels {
    pub const METHOD: &str = "method";
    pub const ENDPOINT: &str = "endpoint";
    pub const STATUS: &str = "status";
    pub const ORDER_SIDE: &str = "side";
    pub const ORDER_TYPE: &str = "order_type";
    pub const ROLE: &str = "role";
    pub const INSTRUMENT_ID: &str = "instrument_id";
    pub const STAGE: &str = "stage";
    pub const REASON: &str = "reason";
    pub const PHASE: &str = "phase";
}

pub fn init_metrics() -> PrometheusHandle {
    let builder = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full(names::HTTP_REQUEST_DURATION_SECONDS.to_string()),
            &[0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0],
        )
        .unwrap()
        .set_buckets_for_metric(
            Matcher::Full(names::ORDER_PROCESSING_DURATION_SECONDS.to_string()),
            &[0.0001, 0.0005, 0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.5, 1.0],
        )
        .unwrap();

    builder.install_recorder().expect("failed to install Prometheus recorder")
}

/// `phase` tags the venue phase active when the request was served, so a
/// spike in rejections can be correlated with the opening auction or close
/// without cross-referencing the phase_transitions_total series by time.
pub fn record_http_request(method: &str, endpoint: &str, status: u16, phase: &str, duration_secs: f64) {
    let status_str = status.to_string();
    counter!(
        names::HTTP_REQUESTS_TOTAL,
        labels::METHOD => method.to_string(),
        labels::ENDPOINT => endpoint.to_string(),
        labels::STATUS => status_str.clone(),
        labels::PHASE => phase.to_string()
    )
    .increment(1);

    histogram!(
        names::HTTP_REQUEST_DURATION_SECONDS,
        labels::METHOD => method.to_string(),
        labels::ENDPOINT => endpoint.to_string(),
        labels::STATUS => status_str
    )
    .record(duration_secs);
}

pub fn set_http_requests_in_flight(count: i64) {
    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).set(count as f64);
}

pub fn record_order_submitted(role: &str, side: &str, order_type: &str) {
    counter!(
        names::ORDERS_SUBMITTED_TOTAL,
        labels::ROLE => role.to_string(),
        labels::ORDER_SIDE => side.to_string(),
        labels::ORDER_TYPE => order_type.to_string()
    )
    .increment(1);
}

pub fn record_order_rejected(reason: &str) {
    counter!(names::ORDERS_REJECTED_TOTAL, labels::REASON => reason.to_string()).increment(1);
}

pub fn record_order_cancelled() {
    counter!(names::ORDERS_CANCELLED_TOTAL).increment(1);
}

pub fn record_order_processing_duration(stage: &str, duration_secs: f64) {
    histogram!(names::ORDER_PROCESSING_DURATION_SECONDS, labels::STAGE => stage.to_string()).record(duration_secs);
}

pub fn record_trade_executed(instrument_id: &str, quantity: i64) {
    counter!(names::TRADES_EXECUTED_TOTAL, labels::INSTRUMENT_ID => instrument_id.to_string()).increment(1);
    counter!(names::TRADE_VOLUME_TOTAL, labels::INSTRUMENT_ID => instrument_id.to_string()).increment(quantity as u64);
}

pub fn set_pipeline_queue_depth(stage: &str, depth: usize) {
    gauge!(names::PIPELINE_QUEUE_DEPTH, labels::STAGE => stage.to_string()).set(depth as f64);
}

pub fn set_coordinator_pending_requests(count: usize) {
    gauge!(names::COORDINATOR_PENDING_REQUESTS).set(count as f64);
}

pub fn record_phase_transition(phase: &str) {
    counter!(names::PHASE_TRANSITIONS_TOTAL, labels::PHASE => phase.to_string()).increment(1);
}

pub fn record_rate_limit_rejection() {
    counter!(names::RATE_LIMIT_REJECTIONS_TOTAL).increment(1);
}

pub fn record_constraint_violation(code: &str) {
    counter!(names::CONSTRAINT_VIOLATIONS_TOTAL, labels::REASON => code.to_string()).increment(1);
}

pub fn set_ws_connections(count: i64) {
    gauge!(names::WS_CONNECTIONS_ACTIVE).set(count as f64);
}

pub fn record_ws_event_published() {
    counter!(names::WS_EVENTS_PUBLISHED_TOTAL).increment(1);
}

pub fn record_ws_subscriber_lag(skipped: u64) {
    counter!(names::WS_SUBSCRIBER_LAG_TOTAL).increment(skipped);
}

/// Measures elapsed wall time for a histogram observation.
pub struct Timer {
    start: Instant,
}

impl Timer {
    pub fn new() -> Self {
        Self { start: Instant::now() }
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timer_reports_elapsed_time() {
        let timer = Timer::new();
        std::thread::sleep(std::time::Duration::from_millis(10));
        let elapsed = timer.elapsed_secs();
        assert!(elapsed >= 0.01);
        assert!(elapsed < 0.5);
    }

    #[test]
    fn metric_names_are_stable() {
        assert_eq!(names::HTTP_REQUESTS_TOTAL, "http_requests_total");
        assert_eq!(names::ORDERS_SUBMITTED_TOTAL, "orders_submitted_total");
        assert_eq!(names::TRADES_EXECUTED_TOTAL, "trades_executed_total");
    }
}
