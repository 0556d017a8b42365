//! PagerRelay Router
//!
//! This crate relays decoded pager messages to chat channels:
//! - ExpiringKeyCache: Per-channel dedup with lazy eviction and a periodic sweeper
//! - Classifier: Test, bad-decode and escalation predicates over message text
//! - TestTrafficAggregator: Test messages seen between health checks
//! - HealthCheckScheduler: Recurring summary of test traffic
//! - Dispatcher: The per-channel pipeline, parameterised by a ChannelProfile
//! - Notifiers: Slack and Telegram delivery
//! - PagerRelay: Owns the dispatchers and the background tasks
//! - API: HTTP endpoints for inbound messages, health and monitoring

pub mod error;
pub mod expiring_cache;
pub mod classifier;
pub mod aggregator;
pub mod notifier;
pub mod profile;
pub mod router_metrics;
pub mod dispatcher;
pub mod health_check;
pub mod relay;
pub mod api;

pub use error::RouterError;
pub use expiring_cache::{ExpiringKeyCache, spawn_cache_sweeper};
pub use aggregator::{EventRecorder, TestTrafficAggregator, TestTrafficSummary};
pub use notifier::{Notifier, SlackNotifier, TelegramNotifier, create_notifier};
pub use profile::{
    ChannelProfile, ChannelSettings, MessageTemplate, EscalationOrder,
    BadDecodeRoute, EscalationRoute,
};
pub use dispatcher::{Dispatcher, DispatchOutcome, Escalation, SendStage};
pub use health_check::{
    HealthCheckScheduler, HealthCheckTarget, SchedulerState,
    DEFAULT_HEALTH_CHECK_INTERVAL, build_summary, describe_interval,
};
pub use relay::{PagerRelay, ChannelOutcome};
pub use api::{AppState, create_router};

pub type Result<T> = std::result::Result<T, RouterError>;
