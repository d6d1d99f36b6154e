// src/notifier.rs

//! Message formatting and delivery.
//!
//! Formatting produces a Markdown digest with a dated header, a NEW section
//! (only when there are new items), an EXISTING section listing the
//! pre-update snapshot, and a fixed footer. Delivery goes through the
//! [`MessageChannel`] seam; production uses the Telegram Bot API.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::config::ChannelConfig;
use crate::error::{AppError, Result};
use crate::models::{Announcement, Snapshot};

const RULE: &str = "━━━━━━━━━━━━━━━━━━━━━━";
const FOOTER: &str = "_Note: This is an automated notification from the SDE BU Scraper Service_";

/// Format the notification message for one cycle.
///
/// `existing` is the pre-update snapshot; numbering restarts at 1 in each
/// section.
pub fn format_message(new_items: &Snapshot, existing: &Snapshot, date: NaiveDate) -> String {
    let mut message = format!(
        "*📢 SDE BU Notifications Update - {}*\n\n",
        date.format("%d-%m-%Y")
    );

    if !new_items.is_empty() {
        message.push_str("🔔 *NEW NOTIFICATIONS:*\n");
        message.push_str(RULE);
        message.push('\n');
        for (i, item) in new_items.news.iter().enumerate() {
            message.push_str(&format!("*{}.* {}", i + 1, item.title));
            push_link(&mut message, item);
            message.push('\n');
        }
        message.push('\n');
    }

    message.push_str("📋 *EXISTING NOTIFICATIONS:*\n");
    message.push_str(RULE);
    message.push('\n');

    if existing.is_empty() {
        message.push_str("No existing notifications.\n");
    } else {
        for (i, item) in existing.news.iter().enumerate() {
            message.push_str(&format!("{}. {}", i + 1, item.title));
            push_link(&mut message, item);
            message.push('\n');
        }
    }

    message.push('\n');
    message.push_str(RULE);
    message.push('\n');
    message.push_str(FOOTER);

    message
}

fn push_link(message: &mut String, item: &Announcement) {
    if let Some(url) = &item.url {
        message.push_str(&format!(" - [Link]({url})"));
    }
}

/// Delivery channel for formatted messages.
#[async_trait]
pub trait MessageChannel: Send + Sync {
    /// Attempt delivery exactly once. Channel-level failures are errors;
    /// the caller decides what a failure means for persistence.
    async fn send(&self, text: &str, config: &ChannelConfig) -> Result<()>;
}

/// Telegram Bot API channel.
pub struct TelegramChannel {
    client: reqwest::Client,
}

#[derive(Serialize)]
struct SendMessageRequest<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'a str,
}

#[derive(Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

impl TelegramChannel {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl MessageChannel for TelegramChannel {
    async fn send(&self, text: &str, config: &ChannelConfig) -> Result<()> {
        let url = format!(
            "https://api.telegram.org/bot{}/sendMessage",
            config.bot_token
        );
        let payload = SendMessageRequest {
            chat_id: &config.chat_id,
            text,
            parse_mode: "Markdown",
        };

        let response = self.client.post(&url).json(&payload).send().await?;
        let status = response.status();
        let body: ApiResponse = response
            .json()
            .await
            .map_err(|e| AppError::delivery(format!("unreadable response: {e}")))?;

        if !status.is_success() || !body.ok {
            return Err(AppError::delivery(
                body.description
                    .unwrap_or_else(|| format!("HTTP {status}")),
            ));
        }
        Ok(())
    }
}

/// Formats and delivers cycle notifications.
pub struct Notifier {
    channel: Arc<dyn MessageChannel>,
}

impl Notifier {
    /// Create a notifier over an arbitrary channel.
    pub fn new(channel: Arc<dyn MessageChannel>) -> Self {
        Self { channel }
    }

    /// Create a notifier over the Telegram Bot API.
    pub fn telegram() -> Result<Self> {
        Ok(Self::new(Arc::new(TelegramChannel::new()?)))
    }

    /// Deliver a message through the channel.
    ///
    /// Missing credentials skip the attempt entirely and report
    /// [`AppError::ConfigIncomplete`]; this is a configuration state, not a
    /// transient fault, but it gates persistence the same way a delivery
    /// failure does.
    pub async fn deliver(&self, message: &str, config: &ChannelConfig) -> Result<()> {
        if !config.has_credentials() {
            log::warn!("Telegram credentials not configured. Update the env file.");
            return Err(AppError::config_incomplete("bot token or chat id missing"));
        }

        match self.channel.send(message, config).await {
            Ok(()) => {
                log::info!("Notification sent to chat {}", config.chat_id);
                Ok(())
            }
            Err(e) => {
                log::error!("Failed to send notification: {}", e);
                Err(e)
            }
        }
    }
}
