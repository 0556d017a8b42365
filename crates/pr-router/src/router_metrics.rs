//! Prometheus-compatible counters for the relay

use metrics::{counter, gauge};

use pr_common::ChannelKind;

/// Record the outcome of one dispatch call
pub fn record_dispatch(channel: ChannelKind, outcome: &str) {
    counter!(
        "pagerelay_dispatch_total",
        "channel" => channel.as_str(),
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

/// Record a failed provider call
pub fn record_send_failure(channel: ChannelKind, stage: &str) {
    counter!(
        "pagerelay_send_failures_total",
        "channel" => channel.as_str(),
        "stage" => stage.to_string()
    )
    .increment(1);
}

/// Record a health-check firing
pub fn record_health_check(result: &str) {
    counter!("pagerelay_health_checks_total", "result" => result.to_string()).increment(1);
}

/// Test messages counted by the last health check
pub fn set_last_test_traffic(count: usize) {
    gauge!("pagerelay_last_test_traffic_count").set(count as f64);
}
