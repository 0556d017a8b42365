use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::health_check::SchedulerState;
use crate::relay::ChannelOutcome;

/// Response after relaying one inbound event
#[derive(Debug, Serialize)]
pub struct RelayMessageResponse {
    /// One entry per configured channel
    pub outcomes: Vec<ChannelOutcome>,
}

/// Simple health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Always UP while the process serves requests
    pub status: String,
    pub version: String,
    pub health_check: SchedulerState,
}

/// Test traffic accumulated since the last health check
#[derive(Debug, Serialize)]
pub struct TestTrafficResponse {
    pub pending: usize,
    pub since: DateTime<Utc>,
    pub last_health_check: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct HealthCheckTriggerResponse {
    /// FIRED, or SKIPPED when the health check has no target
    pub status: String,
}
