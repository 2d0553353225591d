//! Test doubles shared by the flow tests.

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use threadcard_core::{
    ChannelConfig, ChannelConfigStore, ChannelId, ConfigPatch, UserId, WorkspaceId,
};
use threadcard_core::config::SessionTimeouts;
use threadcard_store::{InMemoryStore, Person, Record};

use crate::engine::SessionEngine;
use crate::error::ChatError;
use crate::gateway::{
    ChatGateway, ChatUser, CommandContext, HistoryMessage, Interaction, MessageHandle,
    OutgoingMessage, ThreadInfo,
};
use crate::summarize::Summarizer;

/// Gateway replaying a fixed script of interactions. An exhausted script
/// behaves like a step deadline passing.
pub(crate) struct ScriptedGateway {
    script: Mutex<VecDeque<Interaction>>,
    sent: Mutex<Vec<(ChannelId, OutgoingMessage)>>,
    edits: Mutex<Vec<(MessageHandle, OutgoingMessage)>>,
    notices: Mutex<Vec<(UserId, String)>>,
    history: Mutex<Vec<HistoryMessage>>,
    next_id: AtomicUsize,
}

impl ScriptedGateway {
    pub(crate) fn new(script: Vec<Interaction>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            sent: Mutex::new(Vec::new()),
            edits: Mutex::new(Vec::new()),
            notices: Mutex::new(Vec::new()),
            history: Mutex::new(Vec::new()),
            next_id: AtomicUsize::new(1),
        }
    }

    pub(crate) fn with_history(self, history: Vec<HistoryMessage>) -> Self {
        *self.history.lock().unwrap() = history;
        self
    }

    pub(crate) fn push(&self, interaction: Interaction) {
        self.script.lock().unwrap().push_back(interaction);
    }

    pub(crate) fn sent(&self) -> Vec<(ChannelId, OutgoingMessage)> {
        self.sent.lock().unwrap().clone()
    }

    pub(crate) fn edits(&self) -> Vec<(MessageHandle, OutgoingMessage)> {
        self.edits.lock().unwrap().clone()
    }

    pub(crate) fn notices(&self) -> Vec<(UserId, String)> {
        self.notices.lock().unwrap().clone()
    }

    pub(crate) fn unconsumed(&self) -> usize {
        self.script.lock().unwrap().len()
    }

    /// Messages visible to everyone in the channel.
    pub(crate) fn public_messages(&self) -> Vec<OutgoingMessage> {
        self.sent()
            .into_iter()
            .map(|(_, m)| m)
            .filter(|m| !m.ephemeral)
            .collect()
    }

    /// Every text the user saw, sent or edited, in order of emission.
    pub(crate) fn texts(&self) -> Vec<String> {
        let sent = self.sent.lock().unwrap();
        let edits = self.edits.lock().unwrap();
        sent.iter()
            .map(|(_, m)| m.text.clone())
            .chain(edits.iter().map(|(_, m)| m.text.clone()))
            .collect()
    }

    pub(crate) fn saw(&self, fragment: &str) -> bool {
        self.texts().iter().any(|t| t.contains(fragment))
            || self.notices().iter().any(|(_, t)| t.contains(fragment))
    }
}

#[async_trait]
impl ChatGateway for ScriptedGateway {
    async fn send(
        &self,
        channel: &ChannelId,
        message: OutgoingMessage,
    ) -> Result<MessageHandle, ChatError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.sent.lock().unwrap().push((channel.clone(), message));
        Ok(MessageHandle {
            channel: channel.clone(),
            id: format!("m-{id}"),
        })
    }

    async fn edit(&self, handle: &MessageHandle, message: OutgoingMessage) -> Result<(), ChatError> {
        self.edits.lock().unwrap().push((handle.clone(), message));
        Ok(())
    }

    async fn notify_user(
        &self,
        _handle: &MessageHandle,
        user: &UserId,
        text: &str,
    ) -> Result<(), ChatError> {
        self.notices
            .lock()
            .unwrap()
            .push((user.clone(), text.to_string()));
        Ok(())
    }

    async fn next_interaction(
        &self,
        _handle: &MessageHandle,
        _timeout: Duration,
    ) -> Result<Option<Interaction>, ChatError> {
        Ok(self.script.lock().unwrap().pop_front())
    }

    async fn thread_history(
        &self,
        _thread: &ChannelId,
        limit: usize,
    ) -> Result<Vec<HistoryMessage>, ChatError> {
        Ok(self.history.lock().unwrap().iter().take(limit).cloned().collect())
    }
}

/// Summarizer returning a fixed text.
pub(crate) struct StaticSummarizer(pub(crate) String);

#[async_trait]
impl Summarizer for StaticSummarizer {
    async fn summarize(&self, _history: &[HistoryMessage]) -> String {
        self.0.clone()
    }
}

pub(crate) const COLLECTION_ID: &str = "0123456789abcdef0123456789abcdef";
pub(crate) const OWNER: &str = "u-1";

pub(crate) fn collection_url() -> String {
    format!("https://www.notion.so/team/{COLLECTION_ID}?v=1")
}

pub(crate) fn raw_schema() -> Map<String, Value> {
    json!({
        "Name": {"type": "title", "title": {}},
        "Status": {"type": "status", "status": {"options": [
            {"name": "Todo"}, {"name": "Doing"}, {"name": "Done"}
        ]}},
        "Tags": {"type": "multi_select", "multi_select": {"options": [
            {"name": "bug"}, {"name": "ui"}, {"name": "api"}
        ]}},
        "Notes": {"type": "rich_text", "rich_text": {}},
        "Owner": {"type": "people", "people": {}},
        "Participants": {"type": "people", "people": {}},
        "Thread": {"type": "url", "url": {}},
        "Due": {"type": "date", "date": {}},
        "Score": {"type": "formula", "formula": {}}
    })
    .as_object()
    .cloned()
    .unwrap()
}

/// A stored record with a title, a status and tags.
pub(crate) fn sample_record(id: &str, title: &str, status: &str) -> Record {
    serde_json::from_value(json!({
        "id": id,
        "url": format!("https://store.local/{id}"),
        "properties": {
            "Name": {"type": "title", "title": [{"plain_text": title, "text": {"content": title}}]},
            "Status": {"type": "status", "status": {"name": status}},
            "Tags": {"type": "multi_select", "multi_select": [{"name": "bug"}]}
        }
    }))
    .unwrap()
}

pub(crate) struct Fixture {
    pub(crate) engine: SessionEngine,
    pub(crate) store: Arc<InMemoryStore>,
    pub(crate) gateway: Arc<ScriptedGateway>,
    pub(crate) channels: Arc<ChannelConfigStore>,
    _dir: TempDir,
}

impl Fixture {
    pub(crate) fn new(script: Vec<Interaction>) -> Self {
        Self::with_gateway(ScriptedGateway::new(script), "")
    }

    pub(crate) fn with_gateway(gateway: ScriptedGateway, summary: &str) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(InMemoryStore::new());
        store.add_collection(COLLECTION_ID, raw_schema());
        store.add_person(Person::new("p-ana", "Ana Souza").with_email("ana@example.com"));
        store.add_person(Person::new("p-bruno", "Bruno Lima"));

        let gateway = Arc::new(gateway);
        let channels = Arc::new(ChannelConfigStore::new(dir.path().join("configs.json")));
        let engine = SessionEngine::new(
            store.clone(),
            gateway.clone(),
            Arc::new(StaticSummarizer(summary.to_string())),
            channels.clone(),
            SessionTimeouts::default(),
        );
        Self {
            engine,
            store,
            gateway,
            channels,
            _dir: dir,
        }
    }

    /// Configure the test channel directly through the channel store.
    pub(crate) fn configure(&self, create: &[&str], display: &[&str]) -> ChannelConfig {
        let create: Vec<String> = create.iter().map(|s| s.to_string()).collect();
        let display: Vec<String> = display.iter().map(|s| s.to_string()).collect();
        self.channels
            .save(
                &WorkspaceId::from("g-1"),
                &ChannelId::from("c-1"),
                ConfigPatch::new_channel_defaults()
                    .record_store_url(collection_url())
                    .create_properties(&create)
                    .display_properties(&display),
            )
            .unwrap()
    }

    pub(crate) fn patch(&self, patch: ConfigPatch) -> ChannelConfig {
        self.channels
            .save(&WorkspaceId::from("g-1"), &ChannelId::from("c-1"), patch)
            .unwrap()
    }

    pub(crate) fn config(&self) -> Option<ChannelConfig> {
        self.channels
            .load(&WorkspaceId::from("g-1"), &ChannelId::from("c-1"))
            .unwrap()
    }
}

/// Command invoked by [`OWNER`] in channel `c-1`.
pub(crate) fn channel_context() -> CommandContext {
    CommandContext {
        workspace: WorkspaceId::from("g-1"),
        channel: ChannelId::from("c-1"),
        parent_channel: None,
        thread: None,
        user: ChatUser::new(OWNER, "Ana Souza"),
    }
}

/// Command invoked by [`OWNER`] inside thread `t-1` of channel `c-1`.
pub(crate) fn thread_context() -> CommandContext {
    CommandContext {
        workspace: WorkspaceId::from("g-1"),
        channel: ChannelId::from("t-1"),
        parent_channel: Some(ChannelId::from("c-1")),
        thread: Some(ThreadInfo {
            id: ChannelId::from("t-1"),
            name: "Login bug".to_string(),
            permalink: "https://discord.com/channels/g-1/t-1".to_string(),
        }),
        user: ChatUser::new(OWNER, "Ana Souza"),
    }
}
