//! Health-Check Scheduler
//!
//! Reports, on a fixed interval, how many test messages arrived since the
//! previous report. Silence means the radio side or the decoder has stopped
//! delivering, which is otherwise invisible.
//!
//! `Stopped -> Running` via [`HealthCheckScheduler::start`] (idempotent),
//! back via [`HealthCheckScheduler::stop`]. Each firing drains the
//! aggregator synchronously and hands the provider call to its own task, so
//! a slow send never delays the next firing.

use std::sync::Arc;
use std::time::Duration;
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info};

use crate::aggregator::TestTrafficAggregator;
use crate::notifier::Notifier;
use crate::router_metrics;

/// Default time between reports
pub const DEFAULT_HEALTH_CHECK_INTERVAL: Duration = Duration::from_secs(12 * 60 * 60);

/// Where health-check reports go, captured when the scheduler starts
#[derive(Clone)]
pub struct HealthCheckTarget {
    pub notifier: Arc<dyn Notifier>,
    pub credentials: String,
    pub destination: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SchedulerState {
    Stopped,
    Running,
}

struct RunningTimer {
    shutdown_tx: broadcast::Sender<()>,
    handle: JoinHandle<()>,
}

pub struct HealthCheckScheduler {
    interval: Duration,
    aggregator: Arc<TestTrafficAggregator>,
    target: RwLock<Option<HealthCheckTarget>>,
    timer: Mutex<Option<RunningTimer>>,
    last_fired: Mutex<Option<DateTime<Utc>>>,
}

impl HealthCheckScheduler {
    pub fn new(interval: Duration, aggregator: Arc<TestTrafficAggregator>) -> Self {
        Self {
            interval,
            aggregator,
            target: RwLock::new(None),
            timer: Mutex::new(None),
            last_fired: Mutex::new(None),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn state(&self) -> SchedulerState {
        if self.timer.lock().is_some() {
            SchedulerState::Running
        } else {
            SchedulerState::Stopped
        }
    }

    pub fn last_fired(&self) -> Option<DateTime<Utc>> {
        *self.last_fired.lock()
    }

    /// Capture `target` and start the recurring timer. Returns `false` and
    /// leaves the running timer and its target untouched if already running.
    pub fn start(self: &Arc<Self>, target: HealthCheckTarget) -> bool {
        let mut timer = self.timer.lock();
        if timer.is_some() {
            debug!("Health check already running");
            return false;
        }

        info!(
            interval_secs = self.interval.as_secs(),
            channel = %target.notifier.channel(),
            destination = %target.destination,
            "Starting health check scheduler"
        );
        *self.target.write() = Some(target);

        let (shutdown_tx, mut shutdown_rx) = broadcast::channel(1);
        let scheduler = self.clone();

        // First deadline is one interval after start(), not after the first poll
        let mut ticker = tokio::time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        // Fire-and-forget: the send task is not awaited here
                        let _ = scheduler.fire();
                    }
                    _ = shutdown_rx.recv() => {
                        info!("Health check scheduler shutting down");
                        break;
                    }
                }
            }
        });

        *timer = Some(RunningTimer { shutdown_tx, handle });
        true
    }

    /// Stop the timer and wait for its loop to exit. Sends already in
    /// flight are not cancelled. Returns `false` if it was not running.
    pub async fn stop(&self) -> bool {
        let timer = self.timer.lock().take();
        let Some(timer) = timer else {
            return false;
        };
        let _ = timer.shutdown_tx.send(());
        if let Err(e) = timer.handle.await {
            error!(error = %e, "Health check timer task ended abnormally");
        }
        true
    }

    /// One firing: drain the aggregator and submit the summary. Returns the
    /// send task, or `None` when no target has been captured.
    pub fn fire(&self) -> Option<JoinHandle<()>> {
        let Some(target) = self.target.read().clone() else {
            error!("Health check fired with no notifier configured, skipping");
            router_metrics::record_health_check("skipped");
            return None;
        };

        let summary = self.aggregator.drain();
        *self.last_fired.lock() = Some(summary.until);
        router_metrics::set_last_test_traffic(summary.count);

        let text = build_summary(summary.count, self.interval);
        info!(
            test_messages = summary.count,
            since = %summary.since,
            destination = %target.destination,
            "Sending health check summary"
        );

        Some(tokio::spawn(async move {
            match target
                .notifier
                .send(&target.credentials, &target.destination, &text)
                .await
            {
                Ok(()) => {
                    router_metrics::record_health_check("sent");
                    debug!(destination = %target.destination, "Health check summary sent");
                }
                Err(e) => {
                    router_metrics::record_health_check("failed");
                    error!(
                        destination = %target.destination,
                        error = %e,
                        "Failed to send health check summary"
                    );
                }
            }
        }))
    }
}

/// Human wording for a report period, e.g. "12 hours"
pub fn describe_interval(interval: Duration) -> String {
    fn plural(n: u64, unit: &str) -> String {
        if n == 1 {
            format!("1 {}", unit)
        } else {
            format!("{} {}s", n, unit)
        }
    }

    let secs = interval.as_secs();
    if secs >= 3600 && secs % 3600 == 0 {
        plural(secs / 3600, "hour")
    } else if secs >= 60 && secs % 60 == 0 {
        plural(secs / 60, "minute")
    } else {
        plural(secs, "second")
    }
}

/// Summary text for `count` test messages over `interval`
pub fn build_summary(count: usize, interval: Duration) -> String {
    let period = describe_interval(interval);
    if count > 0 {
        format!(
            "✅ *System health check:*\n```\n{} pager test/s received in last {}.\n```",
            count, period
        )
    } else {
        format!(
            "❌ *System health check:*\n```\nNO pager test/s received in last {}.\n```",
            period
        )
    }
}
