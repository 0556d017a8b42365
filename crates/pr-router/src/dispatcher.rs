//! Dispatch Pipeline
//!
//! One pipeline for every channel, parameterised by a [`ChannelProfile`]:
//!
//! 1. Admission: enabled, credentials, destination, minimum length
//! 2. Test routing: test traffic goes to the aggregator and stops
//! 3. Dedup: atomic check-and-set on the prefix-stripped text
//! 4. Bad-decode: garbled text goes only to the bad-decode destination
//! 5. Primary send, then escalation when a duty-officer keyword matches
//!
//! Every call returns exactly one [`DispatchOutcome`]. Nothing is thrown:
//! provider failures are logged and reported in the outcome. Shared state
//! (dedup cache, aggregator) is fully updated before the first await.

use std::sync::Arc;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use pr_common::{ChannelKind, PagerMessage};

use crate::aggregator::{EventRecorder, TestTrafficAggregator};
use crate::classifier::{alpha_count, dedup_key, is_bad_decode, is_test_message, matches_escalation_keyword};
use crate::expiring_cache::ExpiringKeyCache;
use crate::notifier::Notifier;
use crate::profile::{ChannelProfile, ChannelSettings, EscalationOrder, EscalationRoute};
use crate::router_metrics;

/// Which provider call failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SendStage {
    Primary,
    Escalation,
    BadDecode,
}

impl SendStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            SendStage::Primary => "primary",
            SendStage::Escalation => "escalation",
            SendStage::BadDecode => "bad_decode",
        }
    }
}

/// Result of the escalation step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Escalation {
    NotRequired,
    Sent,
    Failed,
    /// Keyword matched, but the primary send failed first
    Skipped,
}

/// Completion signal of one dispatch call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DispatchOutcome {
    Disabled,
    MissingCredentials,
    MissingDestination,
    TooShort,
    TestRecorded,
    Duplicate,
    BadDecodeDelivered,
    Delivered { escalation: Escalation },
    /// `escalation` still reports an escalation sent ahead of a failed
    /// primary send
    Failed { stage: SendStage, escalation: Escalation },
}

impl DispatchOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            DispatchOutcome::Disabled => "disabled",
            DispatchOutcome::MissingCredentials => "missing_credentials",
            DispatchOutcome::MissingDestination => "missing_destination",
            DispatchOutcome::TooShort => "too_short",
            DispatchOutcome::TestRecorded => "test_recorded",
            DispatchOutcome::Duplicate => "duplicate",
            DispatchOutcome::BadDecodeDelivered => "bad_decode_delivered",
            DispatchOutcome::Delivered { .. } => "delivered",
            DispatchOutcome::Failed { .. } => "failed",
        }
    }

    /// True if the message reached at least one provider destination
    pub fn is_delivered(&self) -> bool {
        matches!(
            self,
            DispatchOutcome::Delivered { .. } | DispatchOutcome::BadDecodeDelivered
        )
    }
}

pub struct Dispatcher {
    profile: ChannelProfile,
    notifier: Arc<dyn Notifier>,
    dedup: Arc<ExpiringKeyCache>,
    test_traffic: Arc<TestTrafficAggregator>,
}

impl Dispatcher {
    pub fn new(
        profile: ChannelProfile,
        notifier: Arc<dyn Notifier>,
        test_traffic: Arc<TestTrafficAggregator>,
    ) -> Self {
        Self::with_cache(profile, notifier, test_traffic, Arc::new(ExpiringKeyCache::new()))
    }

    pub fn with_cache(
        profile: ChannelProfile,
        notifier: Arc<dyn Notifier>,
        test_traffic: Arc<TestTrafficAggregator>,
        dedup: Arc<ExpiringKeyCache>,
    ) -> Self {
        if notifier.channel() != profile.kind {
            warn!(
                profile = %profile.kind,
                notifier = %notifier.channel(),
                "Dispatcher profile and notifier are for different channels"
            );
        }
        Self {
            profile,
            notifier,
            dedup,
            test_traffic,
        }
    }

    pub fn kind(&self) -> ChannelKind {
        self.profile.kind
    }

    pub fn profile(&self) -> &ChannelProfile {
        &self.profile
    }

    pub fn notifier(&self) -> &Arc<dyn Notifier> {
        &self.notifier
    }

    pub fn dedup_cache(&self) -> &Arc<ExpiringKeyCache> {
        &self.dedup
    }

    /// Run one message through the pipeline
    pub async fn dispatch(&self, message: &PagerMessage, settings: &ChannelSettings) -> DispatchOutcome {
        let recorder = EventRecorder::new(&self.test_traffic);
        self.dispatch_event(message, settings, &recorder).await
    }

    /// Run one message through the pipeline as part of a multi-channel
    /// event. Test traffic goes through `recorder`, so an event counts once
    /// however many channels treat it as a test.
    pub async fn dispatch_event(
        &self,
        message: &PagerMessage,
        settings: &ChannelSettings,
        recorder: &EventRecorder<'_>,
    ) -> DispatchOutcome {
        let outcome = self.run(message, settings, recorder).await;
        router_metrics::record_dispatch(self.profile.kind, outcome.label());
        outcome
    }

    async fn run(
        &self,
        message: &PagerMessage,
        settings: &ChannelSettings,
        recorder: &EventRecorder<'_>,
    ) -> DispatchOutcome {
        let channel = self.profile.kind;

        if !settings.enabled {
            debug!(channel = %channel, address = %message.source_address, "Channel disabled for message");
            return DispatchOutcome::Disabled;
        }

        let Some(credentials) = settings.credentials.as_deref() else {
            error!(channel = %channel, address = %message.source_address, "No credentials configured");
            return DispatchOutcome::MissingCredentials;
        };

        let Some(destination) = settings.destination.as_deref() else {
            error!(channel = %channel, address = %message.source_address, "No destination configured");
            return DispatchOutcome::MissingDestination;
        };

        if message.text.chars().count() < self.profile.min_length {
            error!(
                channel = %channel,
                address = %message.source_address,
                min_length = self.profile.min_length,
                "Message is too short to process"
            );
            return DispatchOutcome::TooShort;
        }

        if let Some(keyword) = &self.profile.test_keyword {
            if is_test_message(&message.text, keyword) {
                recorder.record(message);
                return DispatchOutcome::TestRecorded;
            }
        }

        let key = dedup_key(&message.text, self.profile.dedup_prefix_len);
        if !self.dedup.insert(key, self.profile.dedup_ttl) {
            debug!(channel = %channel, text = %message.text, "Dropping duplicate message");
            return DispatchOutcome::Duplicate;
        }

        let formatted = self.profile.template.render(message);

        if let Some(route) = &self.profile.bad_decode {
            if is_bad_decode(&message.text, route.threshold) {
                debug!(
                    channel = %channel,
                    letters = alpha_count(&message.text),
                    destination = %route.destination,
                    "Message flagged as possible bad decode"
                );
                return if self
                    .deliver(credentials, &route.destination, &formatted, SendStage::BadDecode)
                    .await
                {
                    DispatchOutcome::BadDecodeDelivered
                } else {
                    DispatchOutcome::Failed {
                        stage: SendStage::BadDecode,
                        escalation: Escalation::NotRequired,
                    }
                };
            }
        }

        let escalation = self
            .profile
            .escalation
            .as_ref()
            .filter(|route| matches_escalation_keyword(&message.text, &route.keywords));

        let mut escalation_result = Escalation::NotRequired;

        if let Some(route) = escalation.filter(|r| r.order == EscalationOrder::BeforePrimary) {
            escalation_result = self.escalate(credentials, route, &formatted).await;
        }

        if !self
            .deliver(credentials, destination, &formatted, SendStage::Primary)
            .await
        {
            if escalation.is_some() && escalation_result == Escalation::NotRequired {
                escalation_result = Escalation::Skipped;
            }
            return DispatchOutcome::Failed {
                stage: SendStage::Primary,
                escalation: escalation_result,
            };
        }

        if let Some(route) = escalation.filter(|r| r.order == EscalationOrder::AfterPrimary) {
            escalation_result = self.escalate(credentials, route, &formatted).await;
        }

        DispatchOutcome::Delivered { escalation: escalation_result }
    }

    async fn escalate(&self, credentials: &str, route: &EscalationRoute, formatted: &str) -> Escalation {
        info!(
            channel = %self.profile.kind,
            destination = %route.destination,
            "Duty officer keyword matched, escalating"
        );
        if self
            .deliver(credentials, &route.destination, formatted, SendStage::Escalation)
            .await
        {
            Escalation::Sent
        } else {
            Escalation::Failed
        }
    }

    async fn deliver(&self, credentials: &str, destination: &str, text: &str, stage: SendStage) -> bool {
        match self.notifier.send(credentials, destination, text).await {
            Ok(()) => {
                debug!(
                    channel = %self.profile.kind,
                    destination = %destination,
                    stage = stage.as_str(),
                    "Message delivered"
                );
                true
            }
            Err(e) => {
                error!(
                    channel = %self.profile.kind,
                    destination = %destination,
                    stage = stage.as_str(),
                    error = %e,
                    "Failed to deliver message"
                );
                router_metrics::record_send_failure(self.profile.kind, stage.as_str());
                false
            }
        }
    }
}
