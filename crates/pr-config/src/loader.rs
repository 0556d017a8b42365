//! Configuration loader with file and environment variable support

use crate::{ConfigError, RelayConfig};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::info;

/// Standard config file search paths
const CONFIG_PATHS: &[&str] = &[
    "pagerelay.toml",
    "config.toml",
    "./config/pagerelay.toml",
    "/etc/pagerelay/config.toml",
];

/// Configuration loader
#[derive(Debug, Default)]
pub struct ConfigLoader {
    config_path: Option<PathBuf>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self { config_path: None }
    }

    /// Create a loader with a specific config file path
    pub fn with_path<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            config_path: Some(path.into()),
        }
    }

    /// Load from file (if found), apply environment overrides, validate
    pub fn load(&self) -> Result<RelayConfig, ConfigError> {
        let mut config = match self.find_config_file() {
            Some(path) => {
                info!(?path, "Loading configuration from file");
                RelayConfig::from_file(&path)?
            }
            None => {
                info!("No configuration file found, using defaults");
                RelayConfig::default()
            }
        };

        apply_env_overrides(&mut config, |key| env::var(key).ok())?;
        config.validate()?;

        Ok(config)
    }

    fn find_config_file(&self) -> Option<PathBuf> {
        if let Some(path) = &self.config_path {
            if path.exists() {
                return Some(path.clone());
            }
        }

        if let Ok(path) = env::var("PAGERELAY_CONFIG") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        CONFIG_PATHS
            .iter()
            .map(PathBuf::from)
            .find(|path| path.exists())
    }
}

fn parse_var<T: FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::EnvError(format!("{} has an invalid value: {}", key, value)))
}

/// Apply `PAGERELAY_*` overrides using `lookup` to read variables
pub(crate) fn apply_env_overrides<F>(config: &mut RelayConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    // HTTP
    if let Some(val) = lookup("PAGERELAY_HTTP_HOST") {
        config.http.host = val;
    }
    if let Some(val) = lookup("PAGERELAY_HTTP_PORT") {
        config.http.port = parse_var("PAGERELAY_HTTP_PORT", &val)?;
    }

    // Health check
    if let Some(val) = lookup("PAGERELAY_HEALTH_CHECK_ENABLED") {
        config.health_check.enabled = parse_var("PAGERELAY_HEALTH_CHECK_ENABLED", &val)?;
    }
    if let Some(val) = lookup("PAGERELAY_HEALTH_CHECK_INTERVAL_SECS") {
        config.health_check.interval_secs = parse_var("PAGERELAY_HEALTH_CHECK_INTERVAL_SECS", &val)?;
    }
    if let Some(val) = lookup("PAGERELAY_HEALTH_CHECK_CHANNEL") {
        config.health_check.channel = val;
    }
    if let Some(val) = lookup("PAGERELAY_HEALTH_CHECK_DESTINATION") {
        config.health_check.destination = val;
    }

    // Cache
    if let Some(val) = lookup("PAGERELAY_CACHE_SWEEP_INTERVAL_SECS") {
        config.cache.sweep_interval_secs = parse_var("PAGERELAY_CACHE_SWEEP_INTERVAL_SECS", &val)?;
    }

    // Slack
    if let Some(val) = lookup("PAGERELAY_SLACK_ENABLED") {
        config.slack.enabled = parse_var("PAGERELAY_SLACK_ENABLED", &val)?;
    }
    if let Some(val) = lookup("PAGERELAY_SLACK_BOT_TOKEN") {
        config.slack.bot_token = Some(val);
    }
    if let Some(val) = lookup("PAGERELAY_SLACK_API_BASE_URL") {
        config.slack.api_base_url = val;
    }
    if let Some(val) = lookup("PAGERELAY_SLACK_DEDUP_TTL_SECS") {
        config.slack.routing.dedup_ttl_secs = Some(parse_var("PAGERELAY_SLACK_DEDUP_TTL_SECS", &val)?);
    }

    // Telegram
    if let Some(val) = lookup("PAGERELAY_TELEGRAM_ENABLED") {
        config.telegram.enabled = parse_var("PAGERELAY_TELEGRAM_ENABLED", &val)?;
    }
    if let Some(val) = lookup("PAGERELAY_TELEGRAM_API_KEY") {
        config.telegram.api_key = Some(val);
    }
    if let Some(val) = lookup("PAGERELAY_TELEGRAM_API_BASE_URL") {
        config.telegram.api_base_url = val;
    }
    if let Some(val) = lookup("PAGERELAY_TELEGRAM_DEDUP_TTL_SECS") {
        config.telegram.routing.dedup_ttl_secs = Some(parse_var("PAGERELAY_TELEGRAM_DEDUP_TTL_SECS", &val)?);
    }

    Ok(())
}
