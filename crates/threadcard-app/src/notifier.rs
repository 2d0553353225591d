//! REST access to the chat platform for out-of-band notifications.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use threadcard_core::config::ChatConfig;
use threadcard_core::ChannelId;
use threadcard_store::RecordCard;
use threadcard_webhook::{ChatNotifier, WebhookError};
use tracing::debug;

/// Channel types the platform uses for threads.
const THREAD_CHANNEL_TYPES: [u64; 3] = [10, 11, 12];
const NOTIFICATION_COLOR: u32 = 0xE67E22;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

pub struct RestChatNotifier {
    client: Client,
    base_url: String,
    token: String,
}

impl RestChatNotifier {
    pub fn new(config: &ChatConfig, token: impl Into<String>) -> Result<Self, WebhookError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| WebhookError::Notify(e.to_string()))?;
        Ok(Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            token: token.into(),
        })
    }

    fn authorization(&self) -> String {
        format!("Bot {}", self.token)
    }
}

/// Parent of a channel object, but only when the channel is a thread.
/// A top-level channel's parent is its category, not a configurable channel.
pub fn thread_parent(channel: &Value) -> Option<ChannelId> {
    let kind = channel.get("type").and_then(Value::as_u64)?;
    if !THREAD_CHANNEL_TYPES.contains(&kind) {
        return None;
    }
    channel
        .get("parent_id")
        .and_then(Value::as_str)
        .map(ChannelId::from)
}

/// Message body carrying `card` as an embed.
pub fn card_message(card: &RecordCard) -> Value {
    let fields: Vec<Value> = card
        .fields
        .iter()
        .map(|(name, value)| json!({"name": name, "value": value, "inline": false}))
        .collect();
    let mut embed = json!({
        "title": card.title,
        "url": card.url,
        "color": NOTIFICATION_COLOR,
        "fields": fields,
    });
    if let Some(description) = &card.description {
        embed["description"] = Value::String(description.clone());
    }
    if let Some(footer) = &card.footer {
        embed["footer"] = json!({ "text": footer });
    }
    json!({ "embeds": [embed] })
}

#[async_trait]
impl ChatNotifier for RestChatNotifier {
    async fn parent_channel(&self, destination: &ChannelId) -> Result<Option<ChannelId>, WebhookError> {
        let url = format!("{}/channels/{}", self.base_url, destination);
        let response = self
            .client
            .get(&url)
            .header("Authorization", self.authorization())
            .send()
            .await
            .map_err(|e| WebhookError::Notify(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            debug!(channel = %destination, "Linked channel no longer exists");
            return Ok(None);
        }
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error body".to_string());
            return Err(WebhookError::Notify(format!("HTTP {}: {}", status, body)));
        }
        let channel: Value = response
            .json()
            .await
            .map_err(|e| WebhookError::Notify(e.to_string()))?;
        Ok(thread_parent(&channel))
    }

    async fn deliver(&self, destination: &ChannelId, card: RecordCard) -> Result<(), WebhookError> {
        let url = format!("{}/channels/{}/messages", self.base_url, destination);
        let response = self
            .client
            .post(&url)
            .header("Authorization", self.authorization())
            .json(&card_message(&card))
            .send()
            .await
            .map_err(|e| WebhookError::Notify(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error body".to_string());
            return Err(WebhookError::Notify(format!("HTTP {}: {}", status, body)));
        }
        Ok(())
    }
}
