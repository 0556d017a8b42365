//! Channel profiles - the per-channel knobs of the dispatch pipeline
//!
//! One pipeline serves every channel; what differs between Slack and
//! Telegram (template, bad-decode support, escalation, dedup window) lives
//! here as data.

use std::time::Duration;

use pr_common::{ChannelKind, ChannelToggle, PagerMessage};
use pr_config::{RelayConfig, RoutingConfig};

use crate::classifier::{
    DEFAULT_BAD_DECODE_THRESHOLD, DEFAULT_ESCALATION_KEYWORDS, DEFAULT_TEST_KEYWORD,
};

pub const DEFAULT_DEDUP_TTL: Duration = Duration::from_secs(5 * 60);
pub const DEFAULT_DEDUP_PREFIX_LEN: usize = 3;
pub const DEFAULT_MIN_LENGTH: usize = 7;
pub const DEFAULT_BAD_DECODE_DESTINATION: &str = "#possible-bad-decodes";
pub const DEFAULT_ESCALATION_DESTINATION: &str = "#seac-duty-officers";

/// How a message is rendered for a provider
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageTemplate {
    /// `*agency*` followed by the text in a code block
    SlackCodeBlock,
    /// `*agency - alias*` followed by `Message: text`, Markdown parse mode
    TelegramMarkdown,
}

impl MessageTemplate {
    pub fn render(&self, message: &PagerMessage) -> String {
        match self {
            MessageTemplate::SlackCodeBlock => {
                format!("*{}*\n```\n{}\n```", message.agency, message.text)
            }
            MessageTemplate::TelegramMarkdown => {
                format!("*{} - {}*\nMessage: {}", message.agency, message.alias, message.text)
            }
        }
    }
}

/// Whether escalation is sent before or after the primary destination
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EscalationOrder {
    AfterPrimary,
    BeforePrimary,
}

/// Destination for messages that look garbled
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BadDecodeRoute {
    pub threshold: usize,
    pub destination: String,
}

/// Secondary destination for messages naming a duty officer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EscalationRoute {
    pub keywords: Vec<String>,
    pub destination: String,
    pub order: EscalationOrder,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelProfile {
    pub kind: ChannelKind,
    pub template: MessageTemplate,
    /// `None` disables test-traffic aggregation for this channel
    pub test_keyword: Option<String>,
    pub dedup_ttl: Duration,
    pub dedup_prefix_len: usize,
    pub min_length: usize,
    pub bad_decode: Option<BadDecodeRoute>,
    pub escalation: Option<EscalationRoute>,
}

impl ChannelProfile {
    /// Slack: test aggregation, bad-decode routing and duty-officer escalation
    pub fn slack() -> Self {
        Self {
            kind: ChannelKind::Slack,
            template: MessageTemplate::SlackCodeBlock,
            test_keyword: Some(DEFAULT_TEST_KEYWORD.to_string()),
            dedup_ttl: DEFAULT_DEDUP_TTL,
            dedup_prefix_len: DEFAULT_DEDUP_PREFIX_LEN,
            min_length: DEFAULT_MIN_LENGTH,
            bad_decode: Some(BadDecodeRoute {
                threshold: DEFAULT_BAD_DECODE_THRESHOLD,
                destination: DEFAULT_BAD_DECODE_DESTINATION.to_string(),
            }),
            escalation: Some(EscalationRoute {
                keywords: DEFAULT_ESCALATION_KEYWORDS.iter().map(|k| k.to_string()).collect(),
                destination: DEFAULT_ESCALATION_DESTINATION.to_string(),
                order: EscalationOrder::AfterPrimary,
            }),
        }
    }

    /// Telegram: plain relay with dedup only
    pub fn telegram() -> Self {
        Self {
            kind: ChannelKind::Telegram,
            template: MessageTemplate::TelegramMarkdown,
            test_keyword: None,
            dedup_ttl: DEFAULT_DEDUP_TTL,
            dedup_prefix_len: DEFAULT_DEDUP_PREFIX_LEN,
            min_length: DEFAULT_MIN_LENGTH,
            bad_decode: None,
            escalation: None,
        }
    }

    pub fn defaults_for(kind: ChannelKind) -> Self {
        match kind {
            ChannelKind::Slack => Self::slack(),
            ChannelKind::Telegram => Self::telegram(),
        }
    }

    /// Built-in defaults for `kind` with the configured overrides applied
    pub fn from_config(kind: ChannelKind, config: &RelayConfig) -> Self {
        Self::defaults_for(kind).with_overrides(config.routing_for(kind))
    }

    pub fn with_overrides(mut self, routing: &RoutingConfig) -> Self {
        if let Some(keyword) = &routing.test_keyword {
            let keyword = keyword.trim();
            self.test_keyword = (!keyword.is_empty()).then(|| keyword.to_string());
        }
        if let Some(secs) = routing.dedup_ttl_secs {
            self.dedup_ttl = Duration::from_secs(secs);
        }
        if let Some(len) = routing.dedup_prefix_len {
            self.dedup_prefix_len = len;
        }
        if let Some(len) = routing.min_length {
            self.min_length = len;
        }

        let bad_decode_enabled = routing
            .bad_decode_enabled
            .unwrap_or(self.bad_decode.is_some());
        self.bad_decode = if bad_decode_enabled {
            let current = self.bad_decode.take();
            Some(BadDecodeRoute {
                threshold: routing
                    .bad_decode_threshold
                    .or(current.as_ref().map(|r| r.threshold))
                    .unwrap_or(DEFAULT_BAD_DECODE_THRESHOLD),
                destination: routing
                    .bad_decode_destination
                    .clone()
                    .or(current.map(|r| r.destination))
                    .unwrap_or_else(|| DEFAULT_BAD_DECODE_DESTINATION.to_string()),
            })
        } else {
            None
        };

        let current = self.escalation.take();
        let destination = match &routing.escalation_destination {
            Some(d) if d.trim().is_empty() => None,
            Some(d) => Some(d.clone()),
            None => current.as_ref().map(|r| r.destination.clone()),
        };
        let keywords = routing
            .escalation_keywords
            .clone()
            .or_else(|| current.as_ref().map(|r| r.keywords.clone()))
            .unwrap_or_else(|| DEFAULT_ESCALATION_KEYWORDS.iter().map(|k| k.to_string()).collect());
        let order = match routing.escalate_before_primary {
            Some(true) => EscalationOrder::BeforePrimary,
            Some(false) => EscalationOrder::AfterPrimary,
            None => current.map(|r| r.order).unwrap_or(EscalationOrder::AfterPrimary),
        };
        self.escalation = destination
            .filter(|_| keywords.iter().any(|k| !k.trim().is_empty()))
            .map(|destination| EscalationRoute {
                keywords,
                destination,
                order,
            });

        self
    }
}

/// What the configuration collaborator knows about a channel for one
/// message: the per-message toggle plus the configured credentials.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelSettings {
    pub enabled: bool,
    pub destination: Option<String>,
    pub credentials: Option<String>,
}

impl ChannelSettings {
    pub fn new(toggle: ChannelToggle, credentials: Option<&str>) -> Self {
        Self {
            enabled: toggle.enabled,
            destination: toggle.destination,
            credentials: credentials
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(str::to_string),
        }
    }
}
