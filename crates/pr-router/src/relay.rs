//! PagerRelay - owns the per-channel dispatchers and their shared state
//!
//! The relay is constructed explicitly (no process-wide singletons) and has
//! an explicit lifecycle: [`PagerRelay::start`] starts the health-check
//! timer and the dedup-cache sweeper, [`PagerRelay::shutdown`] stops both.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use futures::future::join_all;
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{info, info_span, warn, Instrument};

use pr_common::{ChannelKind, InboundEvent};
use pr_config::RelayConfig;

use crate::aggregator::{EventRecorder, TestTrafficAggregator};
use crate::dispatcher::{DispatchOutcome, Dispatcher};
use crate::error::RouterError;
use crate::expiring_cache::spawn_cache_sweeper;
use crate::health_check::{HealthCheckScheduler, HealthCheckTarget};
use crate::notifier::{create_notifier, Notifier};
use crate::profile::{ChannelProfile, ChannelSettings};
use crate::Result;

/// Outcome of one channel for one inbound event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ChannelOutcome {
    pub channel: ChannelKind,
    pub outcome: DispatchOutcome,
}

struct Sweeper {
    shutdown_tx: broadcast::Sender<()>,
    handle: JoinHandle<()>,
}

pub struct PagerRelay {
    dispatchers: Vec<Dispatcher>,
    credentials: HashMap<ChannelKind, String>,
    test_traffic: Arc<TestTrafficAggregator>,
    health_check: Arc<HealthCheckScheduler>,
    health_check_target: Option<HealthCheckTarget>,
    sweep_interval: Duration,
    sweeper: Mutex<Option<Sweeper>>,
}

impl PagerRelay {
    /// Build a relay with HTTP notifiers for every enabled channel
    pub fn from_config(config: &RelayConfig) -> Result<Self> {
        let notifiers = ChannelKind::ALL
            .into_iter()
            .filter(|kind| config.channel_enabled(*kind))
            .map(|kind| create_notifier(kind, config))
            .collect::<Result<Vec<_>>>()?;
        Self::with_notifiers(config, notifiers)
    }

    /// Build a relay with one dispatcher per given notifier. Notifiers for
    /// channels disabled in `config` are ignored.
    pub fn with_notifiers(config: &RelayConfig, notifiers: Vec<Arc<dyn Notifier>>) -> Result<Self> {
        let test_traffic = Arc::new(TestTrafficAggregator::new());
        let health_check = Arc::new(HealthCheckScheduler::new(
            Duration::from_secs(config.health_check.interval_secs.max(1)),
            test_traffic.clone(),
        ));

        let mut dispatchers = Vec::new();
        let mut credentials = HashMap::new();
        for notifier in notifiers {
            let kind = notifier.channel();
            if !config.channel_enabled(kind) {
                continue;
            }
            if dispatchers.iter().any(|d: &Dispatcher| d.kind() == kind) {
                return Err(RouterError::Config(format!("more than one notifier for {}", kind)));
            }
            match config.credentials_for(kind) {
                Some(token) => {
                    credentials.insert(kind, token.to_string());
                }
                None => warn!(channel = %kind, "Channel enabled without credentials, messages will be dropped"),
            }
            let profile = ChannelProfile::from_config(kind, config);
            info!(
                channel = %kind,
                dedup_ttl_secs = profile.dedup_ttl.as_secs(),
                test_routing = profile.test_keyword.is_some(),
                bad_decode = profile.bad_decode.is_some(),
                escalation = profile.escalation.is_some(),
                "Channel dispatcher configured"
            );
            dispatchers.push(Dispatcher::new(profile, notifier, test_traffic.clone()));
        }

        let health_check_target = if config.health_check.enabled {
            let kind = config
                .health_check_channel()
                .map_err(|e| RouterError::Config(e.to_string()))?;
            let notifier = dispatchers
                .iter()
                .find(|d| d.kind() == kind)
                .map(|d| d.notifier().clone())
                .ok_or_else(|| RouterError::Config(format!("health check channel {} is not enabled", kind)))?;
            let token = credentials
                .get(&kind)
                .cloned()
                .ok_or_else(|| RouterError::Config(format!("health check channel {} has no credentials", kind)))?;
            Some(HealthCheckTarget {
                notifier,
                credentials: token,
                destination: config.health_check.destination.clone(),
            })
        } else {
            None
        };

        Ok(Self {
            dispatchers,
            credentials,
            test_traffic,
            health_check,
            health_check_target,
            sweep_interval: Duration::from_secs(config.cache.sweep_interval_secs.max(1)),
            sweeper: Mutex::new(None),
        })
    }

    pub fn dispatchers(&self) -> &[Dispatcher] {
        &self.dispatchers
    }

    pub fn test_traffic(&self) -> &Arc<TestTrafficAggregator> {
        &self.test_traffic
    }

    pub fn health_check(&self) -> &Arc<HealthCheckScheduler> {
        &self.health_check
    }

    /// Start background tasks. Calling it again is a no-op.
    pub fn start(&self) {
        if let Some(target) = &self.health_check_target {
            self.health_check.start(target.clone());
        } else {
            info!("Health check disabled");
        }

        let mut sweeper = self.sweeper.lock();
        if sweeper.is_none() {
            let (shutdown_tx, _) = broadcast::channel(1);
            let caches = self
                .dispatchers
                .iter()
                .map(|d| d.dedup_cache().clone())
                .collect();
            let handle = spawn_cache_sweeper(caches, self.sweep_interval, &shutdown_tx);
            *sweeper = Some(Sweeper { shutdown_tx, handle });
        }
    }

    /// Stop background tasks and wait for them to exit
    pub async fn shutdown(&self) {
        self.health_check.stop().await;

        let sweeper = self.sweeper.lock().take();
        if let Some(sweeper) = sweeper {
            let _ = sweeper.shutdown_tx.send(());
            let _ = sweeper.handle.await;
        }
        info!("Relay shut down");
    }

    /// Dispatch one inbound event to every channel concurrently. A test
    /// message is counted once per event.
    pub async fn handle(&self, event: &InboundEvent) -> Vec<ChannelOutcome> {
        let message = event.to_message();
        let recorder = EventRecorder::new(&self.test_traffic);
        let span = info_span!("relay", address = %message.source_address, agency = %message.agency);

        async {
            let dispatches = self.dispatchers.iter().map(|dispatcher| {
                let kind = dispatcher.kind();
                let settings = ChannelSettings::new(
                    event.pluginconf.toggle_for(kind),
                    self.credentials.get(&kind).map(String::as_str),
                );
                let message = &message;
                let recorder = &recorder;
                async move {
                    ChannelOutcome {
                        channel: kind,
                        outcome: dispatcher.dispatch_event(message, &settings, recorder).await,
                    }
                }
            });
            join_all(dispatches).await
        }
        .instrument(span)
        .await
    }
}
