//! Notifiers - outbound delivery to chat providers
//!
//! Provides:
//! - The [`Notifier`] capability the dispatch pipeline sends through
//! - Slack Web API delivery (`chat.postMessage`)
//! - Telegram Bot API delivery (`sendMessage`, Markdown)
//!
//! A notifier makes exactly one attempt per call. Retrying is the caller's
//! decision, and the relay does not retry.

use std::sync::Arc;
use std::time::Duration;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use pr_common::ChannelKind;
use pr_config::RelayConfig;

use crate::error::RouterError;
use crate::Result;

/// Delivery of formatted text to one destination of a chat provider
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Provider this notifier talks to
    fn channel(&self) -> ChannelKind;

    /// Send `text` to `destination`, authenticating with `credentials`
    async fn send(&self, credentials: &str, destination: &str, text: &str) -> Result<()>;
}

fn build_client(timeout: Duration) -> Result<Client> {
    Ok(Client::builder().timeout(timeout).build()?)
}

async fn rejected(response: reqwest::Response) -> RouterError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    RouterError::Rejected { status, body }
}

// ============================================================================
// Slack
// ============================================================================

#[derive(Serialize)]
struct SlackPostMessage<'a> {
    channel: &'a str,
    text: &'a str,
}

#[derive(Deserialize)]
struct SlackResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
}

/// Slack Web API notifier
pub struct SlackNotifier {
    client: Client,
    base_url: String,
}

impl SlackNotifier {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        info!(base_url = %base_url, "SlackNotifier initialized");
        Ok(Self {
            client: build_client(timeout)?,
            base_url,
        })
    }
}

#[async_trait]
impl Notifier for SlackNotifier {
    fn channel(&self) -> ChannelKind {
        ChannelKind::Slack
    }

    async fn send(&self, credentials: &str, destination: &str, text: &str) -> Result<()> {
        let response = self
            .client
            .post(format!("{}/api/chat.postMessage", self.base_url))
            .bearer_auth(credentials)
            .json(&SlackPostMessage { channel: destination, text })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(rejected(response).await);
        }

        let body: SlackResponse = response.json().await?;
        if !body.ok {
            return Err(RouterError::Notify(format!(
                "Slack API error: {}",
                body.error.unwrap_or_else(|| "unknown".to_string())
            )));
        }

        debug!(destination = %destination, "Slack message posted");
        Ok(())
    }
}

// ============================================================================
// Telegram
// ============================================================================

#[derive(Serialize)]
struct TelegramSendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'static str,
}

#[derive(Deserialize)]
struct TelegramResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

/// Telegram Bot API notifier
pub struct TelegramNotifier {
    client: Client,
    base_url: String,
}

impl TelegramNotifier {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        info!(base_url = %base_url, "TelegramNotifier initialized");
        Ok(Self {
            client: build_client(timeout)?,
            base_url,
        })
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    fn channel(&self) -> ChannelKind {
        ChannelKind::Telegram
    }

    async fn send(&self, credentials: &str, destination: &str, text: &str) -> Result<()> {
        let response = self
            .client
            .post(format!("{}/bot{}/sendMessage", self.base_url, credentials))
            .json(&TelegramSendMessage {
                chat_id: destination,
                text,
                parse_mode: "Markdown",
            })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(rejected(response).await);
        }

        let body: TelegramResponse = response.json().await?;
        if !body.ok {
            return Err(RouterError::Notify(format!(
                "Telegram API error: {}",
                body.description.unwrap_or_else(|| "unknown".to_string())
            )));
        }

        debug!(chat_id = %destination, "Telegram message sent");
        Ok(())
    }
}

/// Build the HTTP notifier for a channel from configuration
pub fn create_notifier(kind: ChannelKind, config: &RelayConfig) -> Result<Arc<dyn Notifier>> {
    let notifier: Arc<dyn Notifier> = match kind {
        ChannelKind::Slack => Arc::new(SlackNotifier::new(
            config.slack.api_base_url.clone(),
            Duration::from_millis(config.slack.timeout_ms),
        )?),
        ChannelKind::Telegram => Arc::new(TelegramNotifier::new(
            config.telegram.api_base_url.clone(),
            Duration::from_millis(config.telegram.timeout_ms),
        )?),
    };
    Ok(notifier)
}
