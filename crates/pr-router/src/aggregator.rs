//! Test-Traffic Aggregator
//!
//! Collects test messages between health-check ticks. The batch and its
//! start time live under one lock so a drain reads and resets both in a
//! single critical section; a concurrent `record` lands either before the
//! drain (and is counted by it) or after (and is counted by the next one).

use std::sync::atomic::{AtomicBool, Ordering};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use tracing::debug;

use pr_common::PagerMessage;

/// Result of draining one aggregation window
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TestTrafficSummary {
    pub count: usize,
    pub since: DateTime<Utc>,
    pub until: DateTime<Utc>,
}

#[derive(Debug)]
struct Window {
    messages: Vec<String>,
    since: DateTime<Utc>,
}

#[derive(Debug)]
pub struct TestTrafficAggregator {
    window: Mutex<Window>,
}

impl TestTrafficAggregator {
    pub fn new() -> Self {
        Self {
            window: Mutex::new(Window {
                messages: Vec::new(),
                since: Utc::now(),
            }),
        }
    }

    /// Append a test message to the current window
    pub fn record(&self, message: &PagerMessage) {
        let pending = {
            let mut window = self.window.lock();
            window.messages.push(message.text.clone());
            window.messages.len()
        };
        debug!(
            address = %message.source_address,
            pending = pending,
            "Test message recorded for health check"
        );
    }

    /// Close the current window and open a new one
    pub fn drain(&self) -> TestTrafficSummary {
        let now = Utc::now();
        let mut window = self.window.lock();
        let messages = std::mem::take(&mut window.messages);
        let since = std::mem::replace(&mut window.since, now);

        TestTrafficSummary {
            count: messages.len(),
            since,
            until: now,
        }
    }

    /// Read-and-reset the count
    pub fn drain_count(&self) -> usize {
        self.drain().count
    }

    /// Messages recorded so far in the current window
    pub fn pending_count(&self) -> usize {
        self.window.lock().messages.len()
    }

    /// Start of the current window
    pub fn window_start(&self) -> DateTime<Utc> {
        self.window.lock().since
    }
}

impl Default for TestTrafficAggregator {
    fn default() -> Self {
        Self::new()
    }
}

/// Records one inbound event's test message at most once, however many
/// channels classify it as test traffic.
#[derive(Debug)]
pub struct EventRecorder<'a> {
    aggregator: &'a TestTrafficAggregator,
    recorded: AtomicBool,
}

impl<'a> EventRecorder<'a> {
    pub fn new(aggregator: &'a TestTrafficAggregator) -> Self {
        Self {
            aggregator,
            recorded: AtomicBool::new(false),
        }
    }

    /// Record `message` unless this event was already recorded. Returns
    /// whether this call recorded it.
    pub fn record(&self, message: &PagerMessage) -> bool {
        if self.recorded.swap(true, Ordering::AcqRel) {
            return false;
        }
        self.aggregator.record(message);
        true
    }
}
