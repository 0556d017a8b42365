use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub mod logging;

// ============================================================================
// Core Message Types
// ============================================================================

/// A single decoded pager transmission.
///
/// Created by the ingestion side from an [`InboundEvent`] and consumed once
/// per dispatch call. Never mutated after construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PagerMessage {
    pub agency: String,
    pub alias: String,
    pub text: String,
    pub source_address: String,
}

impl PagerMessage {
    pub fn new(
        agency: impl Into<String>,
        alias: impl Into<String>,
        text: impl Into<String>,
        source_address: impl Into<String>,
    ) -> Self {
        Self {
            agency: agency.into(),
            alias: alias.into(),
            text: text.into(),
            source_address: source_address.into(),
        }
    }
}

/// Chat integrations a message can be relayed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelKind {
    Slack,
    Telegram,
}

impl ChannelKind {
    pub const ALL: [ChannelKind; 2] = [ChannelKind::Slack, ChannelKind::Telegram];

    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelKind::Slack => "slack",
            ChannelKind::Telegram => "telegram",
        }
    }
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChannelKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "slack" => Ok(ChannelKind::Slack),
            "telegram" => Ok(ChannelKind::Telegram),
            other => Err(format!("unknown channel: {}", other)),
        }
    }
}

// ============================================================================
// Inbound Event (wire format from the pager decoder)
// ============================================================================

/// Event delivered once per pager transmission.
///
/// Field names match the decoder's JSON payload, including the per-plugin
/// settings block (`pluginconf.Slack`, `pluginconf.Telegram`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InboundEvent {
    #[serde(default)]
    pub agency: String,
    #[serde(default)]
    pub alias: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub pluginconf: PluginConf,
}

impl InboundEvent {
    /// Convert into the immutable message form. A missing message body
    /// becomes an empty text, which admission rejects as too short.
    pub fn to_message(&self) -> PagerMessage {
        PagerMessage {
            agency: self.agency.clone(),
            alias: self.alias.clone(),
            text: self.message.clone().unwrap_or_default(),
            source_address: self.address.clone(),
        }
    }
}

/// Per-message plugin settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PluginConf {
    #[serde(rename = "Slack", default, skip_serializing_if = "Option::is_none")]
    pub slack: Option<SlackPluginConf>,
    #[serde(rename = "Telegram", default, skip_serializing_if = "Option::is_none")]
    pub telegram: Option<TelegramPluginConf>,
}

impl PluginConf {
    /// Resolve the enable flag and destination for one channel.
    /// An absent block means the channel is disabled for this message.
    pub fn toggle_for(&self, kind: ChannelKind) -> ChannelToggle {
        match kind {
            ChannelKind::Slack => self
                .slack
                .as_ref()
                .map(|c| ChannelToggle {
                    enabled: c.enable,
                    destination: c.channel.clone().filter(|s| !s.trim().is_empty()),
                })
                .unwrap_or_default(),
            ChannelKind::Telegram => self
                .telegram
                .as_ref()
                .map(|c| ChannelToggle {
                    enabled: c.enable,
                    destination: c.chat_id(),
                })
                .unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SlackPluginConf {
    #[serde(default)]
    pub enable: bool,
    #[serde(default)]
    pub channel: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TelegramPluginConf {
    #[serde(default)]
    pub enable: bool,
    /// Chat id, sent either as a number or a string
    #[serde(default)]
    pub chat: Option<serde_json::Value>,
}

impl TelegramPluginConf {
    /// Normalised chat id. `0`, `"0"` and `""` are treated as unset.
    pub fn chat_id(&self) -> Option<String> {
        let raw = match self.chat.as_ref()? {
            serde_json::Value::Number(n) => n.to_string(),
            serde_json::Value::String(s) => s.trim().to_string(),
            _ => return None,
        };
        if raw.is_empty() || raw == "0" {
            None
        } else {
            Some(raw)
        }
    }
}

/// Enable flag and destination for one channel, as seen by one message
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelToggle {
    pub enabled: bool,
    pub destination: Option<String>,
}
