//! PagerRelay Configuration
//!
//! TOML configuration with environment variable overrides. Every section is
//! optional; a missing file yields a relay with defaults that still needs
//! credentials from the environment.

use pr_common::ChannelKind;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

mod loader;

pub use loader::ConfigLoader;

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),

    #[error("Environment variable error: {0}")]
    EnvError(String),
}

/// Root configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    pub http: HttpConfig,
    pub health_check: HealthCheckConfig,
    pub cache: CacheConfig,
    pub slack: SlackConfig,
    pub telegram: TelegramConfig,
}

/// HTTP ingestion/monitoring server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub host: String,
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

/// Periodic test-traffic report
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthCheckConfig {
    pub enabled: bool,
    /// Seconds between reports
    pub interval_secs: u64,
    /// Channel whose notifier and credentials carry the report
    pub channel: String,
    pub destination: String,
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 12 * 60 * 60,
            channel: "slack".to_string(),
            destination: "#all-pagers".to_string(),
        }
    }
}

/// Dedup cache housekeeping
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Seconds between sweeps of expired dedup keys
    pub sweep_interval_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { sweep_interval_secs: 60 }
    }
}

/// Per-channel routing overrides.
///
/// Unset fields fall back to the channel's built-in defaults, so a partial
/// `[slack.routing]` table only changes what it names.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingConfig {
    /// Substring marking synthetic test traffic. Empty disables test routing.
    pub test_keyword: Option<String>,
    pub dedup_ttl_secs: Option<u64>,
    pub dedup_prefix_len: Option<usize>,
    pub min_length: Option<usize>,
    pub bad_decode_enabled: Option<bool>,
    pub bad_decode_threshold: Option<usize>,
    pub bad_decode_destination: Option<String>,
    pub escalation_keywords: Option<Vec<String>>,
    /// Empty disables escalation
    pub escalation_destination: Option<String>,
    pub escalate_before_primary: Option<bool>,
}

/// Slack Web API integration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SlackConfig {
    pub enabled: bool,
    pub bot_token: Option<String>,
    pub api_base_url: String,
    pub timeout_ms: u64,
    pub routing: RoutingConfig,
}

impl Default for SlackConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bot_token: None,
            api_base_url: "https://slack.com".to_string(),
            timeout_ms: 10_000,
            routing: RoutingConfig::default(),
        }
    }
}

/// Telegram Bot API integration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    pub enabled: bool,
    pub api_key: Option<String>,
    pub api_base_url: String,
    pub timeout_ms: u64,
    pub routing: RoutingConfig,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api_key: None,
            api_base_url: "https://api.telegram.org".to_string(),
            timeout_ms: 10_000,
            routing: RoutingConfig::default(),
        }
    }
}

impl RelayConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Load with the standard search path and environment overrides
    pub fn load() -> Result<Self, ConfigError> {
        ConfigLoader::new().load()
    }

    /// Credentials configured for a channel, if any
    pub fn credentials_for(&self, kind: ChannelKind) -> Option<&str> {
        let raw = match kind {
            ChannelKind::Slack => self.slack.bot_token.as_deref(),
            ChannelKind::Telegram => self.telegram.api_key.as_deref(),
        };
        raw.map(str::trim).filter(|s| !s.is_empty())
    }

    pub fn channel_enabled(&self, kind: ChannelKind) -> bool {
        match kind {
            ChannelKind::Slack => self.slack.enabled,
            ChannelKind::Telegram => self.telegram.enabled,
        }
    }

    pub fn routing_for(&self, kind: ChannelKind) -> &RoutingConfig {
        match kind {
            ChannelKind::Slack => &self.slack.routing,
            ChannelKind::Telegram => &self.telegram.routing,
        }
    }

    /// Channel carrying the health-check report
    pub fn health_check_channel(&self) -> Result<ChannelKind, ConfigError> {
        self.health_check
            .channel
            .parse()
            .map_err(ConfigError::ValidationError)
    }

    /// Reject settings the relay cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.health_check.enabled {
            if self.health_check.interval_secs == 0 {
                return Err(ConfigError::ValidationError(
                    "health_check.interval_secs must be greater than zero".to_string(),
                ));
            }
            let channel = self.health_check_channel()?;
            if !self.channel_enabled(channel) {
                return Err(ConfigError::ValidationError(format!(
                    "health_check.channel '{}' is disabled",
                    channel
                )));
            }
            if self.credentials_for(channel).is_none() {
                return Err(ConfigError::ValidationError(format!(
                    "health_check.channel '{}' has no credentials configured",
                    channel
                )));
            }
            if self.health_check.destination.trim().is_empty() {
                return Err(ConfigError::ValidationError(
                    "health_check.destination must not be empty".to_string(),
                ));
            }
        }

        if self.cache.sweep_interval_secs == 0 {
            return Err(ConfigError::ValidationError(
                "cache.sweep_interval_secs must be greater than zero".to_string(),
            ));
        }

        for kind in ChannelKind::ALL {
            let routing = self.routing_for(kind);
            if routing.dedup_ttl_secs == Some(0) {
                return Err(ConfigError::ValidationError(format!(
                    "{}.routing.dedup_ttl_secs must be greater than zero",
                    kind
                )));
            }
            if routing.bad_decode_destination.as_deref().map(str::trim) == Some("") {
                return Err(ConfigError::ValidationError(format!(
                    "{}.routing.bad_decode_destination must not be empty",
                    kind
                )));
            }
        }

        Ok(())
    }

    /// Annotated example configuration
    pub fn example_toml() -> String {
        r##"# PagerRelay Configuration
# Environment variables (PAGERELAY_*) override these settings

[http]
host = "0.0.0.0"
port = 8080

[health_check]
enabled = true
interval_secs = 43200          # 12 hours
channel = "slack"              # notifier + credentials used for the report
destination = "#all-pagers"

[cache]
sweep_interval_secs = 60

[slack]
enabled = true
bot_token = "xoxb-..."         # or PAGERELAY_SLACK_BOT_TOKEN
api_base_url = "https://slack.com"
timeout_ms = 10000

[slack.routing]
test_keyword = "TEST"
dedup_ttl_secs = 300
dedup_prefix_len = 3
min_length = 7
bad_decode_enabled = true
bad_decode_threshold = 8
bad_decode_destination = "#possible-bad-decodes"
escalation_keywords = ["LGDO", "MODO", "STDO"]
escalation_destination = "#seac-duty-officers"
escalate_before_primary = false

[telegram]
enabled = true
api_key = "123456:ABC..."      # or PAGERELAY_TELEGRAM_API_KEY
api_base_url = "https://api.telegram.org"
timeout_ms = 10000

[telegram.routing]
test_keyword = ""              # empty: test messages are relayed like any other
dedup_ttl_secs = 300
"##
        .to_string()
    }
}
