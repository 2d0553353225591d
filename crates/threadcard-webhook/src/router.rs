//! Notification correlation: from a changed record back to the chat thread
//! it was created from.
//!
//! The only hint is the record itself. Its first `url` property holding a
//! chat link names the workspace and the thread; the thread's parent channel
//! names the configuration to render with. Every failure is logged and the
//! event dropped.

use std::sync::Arc;

use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;
use threadcard_core::{ChannelConfigStore, ChannelId, WorkspaceId};
use threadcard_store::{format_record, Record, RecordCard, RecordStore};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::error::WebhookError;
use crate::state::RecordEvent;

pub const UPDATED_DESCRIPTION: &str = "A store automation was triggered for this card.";

/// Out-of-band access to the chat platform.
#[async_trait]
pub trait ChatNotifier: Send + Sync {
    /// Parent channel of a thread, `None` for a top-level channel or an
    /// unknown destination.
    async fn parent_channel(&self, destination: &ChannelId) -> Result<Option<ChannelId>, WebhookError>;

    /// Post a card to a channel or thread.
    async fn deliver(&self, destination: &ChannelId, card: RecordCard) -> Result<(), WebhookError>;
}

/// A chat link found on a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadLink {
    pub workspace: WorkspaceId,
    pub destination: ChannelId,
}

/// What became of one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    Delivered(ChannelId),
    NoThreadLink,
    NotConfigured,
}

pub struct NotificationRouter {
    store: Arc<dyn RecordStore>,
    notifier: Arc<dyn ChatNotifier>,
    channels: Arc<ChannelConfigStore>,
    link_pattern: Regex,
}

impl NotificationRouter {
    /// `link_pattern` must capture the workspace id in group 1 and the
    /// destination id in group 2.
    pub fn new(
        store: Arc<dyn RecordStore>,
        notifier: Arc<dyn ChatNotifier>,
        channels: Arc<ChannelConfigStore>,
        link_pattern: &str,
    ) -> Result<Self, WebhookError> {
        Ok(Self {
            store,
            notifier,
            channels,
            link_pattern: Regex::new(link_pattern)?,
        })
    }

    /// First `url` property of `record`, in declaration order, holding a chat link.
    pub fn find_thread_link(&self, record: &Record) -> Option<ThreadLink> {
        record
            .properties
            .values()
            .filter(|p| p.get("type").and_then(Value::as_str) == Some("url"))
            .filter_map(|p| p.get("url").and_then(Value::as_str))
            .find_map(|url| {
                let caps = self.link_pattern.captures(url)?;
                Some(ThreadLink {
                    workspace: WorkspaceId::from(caps.get(1)?.as_str()),
                    destination: ChannelId::from(caps.get(2)?.as_str()),
                })
            })
    }

    /// Route one event to its thread.
    pub async fn handle(&self, event: &RecordEvent) -> Result<Delivery, WebhookError> {
        let record = self.store.retrieve(&event.record_id).await?;
        let Some(link) = self.find_thread_link(&record) else {
            info!(record_id = %event.record_id, "No chat link on record, dropping event");
            return Ok(Delivery::NoThreadLink);
        };

        let config_channel = self
            .notifier
            .parent_channel(&link.destination)
            .await?
            .unwrap_or_else(|| link.destination.clone());
        let Some(config) = self.channels.load(&link.workspace, &config_channel)? else {
            info!(
                workspace = %link.workspace,
                channel = %config_channel,
                "No configuration for linked channel, dropping event"
            );
            return Ok(Delivery::NotConfigured);
        };

        let card = format_record(&record, &config.display_properties);
        let title = format!("🔔 Card updated: {}", card.title);
        let card = card
            .with_title(title)
            .with_description(UPDATED_DESCRIPTION);
        self.notifier.deliver(&link.destination, card).await?;
        info!(record_id = %event.record_id, thread = %link.destination, "Update notification delivered");
        Ok(Delivery::Delivered(link.destination))
    }

    /// Drain `events` until every sender is gone.
    pub async fn run(self: Arc<Self>, mut events: mpsc::Receiver<RecordEvent>) {
        info!("Notification worker started");
        while let Some(event) = events.recv().await {
            match self.handle(&event).await {
                Ok(delivery) => debug!(record_id = %event.record_id, ?delivery, "Event handled"),
                Err(e) => warn!(record_id = %event.record_id, error = %e, "Failed to handle record event"),
            }
        }
        info!("Notification worker stopped");
    }
}
