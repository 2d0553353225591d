//! File-backed store of per-channel configuration.
//!
//! The backing document is a single JSON object keyed by workspace id, then
//! `"channels"`, then channel id. Saves are partial merges: a save only
//! touches the keys it carries, so fields written by an earlier step survive.
//! Concurrent writers are last-writer-wins.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::{Result, ThreadcardError};
use crate::types::{ChannelConfig, ChannelId, WorkspaceId};

/// A partial channel configuration update.
///
/// Built with the setter methods; only keys that were set are merged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigPatch {
    fields: Map<String, Value>,
}

impl ConfigPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_store_url(self, url: impl Into<String>) -> Self {
        self.set("record_store_url", Value::String(url.into()))
    }

    pub fn create_properties(self, names: &[String]) -> Self {
        self.set("create_properties", names_value(names))
    }

    pub fn display_properties(self, names: &[String]) -> Self {
        self.set("display_properties", names_value(names))
    }

    pub fn action_buttons_enabled(self, enabled: bool) -> Self {
        self.set("action_buttons_enabled", Value::Bool(enabled))
    }

    pub fn ai_summary_enabled(self, enabled: bool) -> Self {
        self.set("ai_summary_enabled", Value::Bool(enabled))
    }

    pub fn topic_link_property(self, name: Option<&str>) -> Self {
        self.set("topic_link_property", optional_value(name))
    }

    pub fn individual_person_property(self, name: Option<&str>) -> Self {
        self.set("individual_person_property", optional_value(name))
    }

    pub fn collective_person_property(self, name: Option<&str>) -> Self {
        self.set("collective_person_property", optional_value(name))
    }

    /// Defaults written once when a brand-new configuration completes setup.
    pub fn new_channel_defaults() -> Self {
        Self::new()
            .action_buttons_enabled(true)
            .topic_link_property(None)
            .individual_person_property(None)
            .collective_person_property(None)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    fn set(mut self, key: &str, value: Value) -> Self {
        self.fields.insert(key.to_string(), value);
        self
    }
}

fn names_value(names: &[String]) -> Value {
    Value::Array(names.iter().cloned().map(Value::String).collect())
}

fn optional_value(name: Option<&str>) -> Value {
    name.map(|n| Value::String(n.to_string()))
        .unwrap_or(Value::Null)
}

/// JSON file holding every channel's configuration.
pub struct ChannelConfigStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl ChannelConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load one channel's configuration. A missing file or entry is `None`.
    pub fn load(
        &self,
        workspace: &WorkspaceId,
        channel: &ChannelId,
    ) -> Result<Option<ChannelConfig>> {
        let document = match std::fs::read_to_string(&self.path) {
            Ok(content) => serde_json::from_str::<Value>(&content)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let entry = document
            .get(workspace.as_str())
            .and_then(|w| w.get("channels"))
            .and_then(|c| c.get(channel.as_str()));

        match entry {
            Some(value) => Ok(Some(serde_json::from_value(value.clone())?)),
            None => Ok(None),
        }
    }

    /// Merge `patch` into the channel's entry and write the document back.
    ///
    /// Returns the merged configuration.
    pub fn save(
        &self,
        workspace: &WorkspaceId,
        channel: &ChannelId,
        patch: ConfigPatch,
    ) -> Result<ChannelConfig> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|e| ThreadcardError::ChannelStore(format!("Lock poisoned: {}", e)))?;

        let mut document = self.read_document_for_write()?;

        let workspace_entry = object_entry(&mut document, workspace.as_str())?;
        let channels = object_entry(workspace_entry, "channels")?;
        let channel_entry = object_entry(channels, channel.as_str())?;
        for (key, value) in patch.fields {
            channel_entry.insert(key, value);
        }
        let merged: ChannelConfig = serde_json::from_value(Value::Object(channel_entry.clone()))?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let content = serde_json::to_string_pretty(&Value::Object(document))?;
        std::fs::write(&self.path, content)?;
        debug!(
            workspace = %workspace,
            channel = %channel,
            "Channel configuration saved"
        );
        Ok(merged)
    }

    fn read_document_for_write(&self) -> Result<Map<String, Value>> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(e) => return Err(e.into()),
        };
        match serde_json::from_str::<Value>(&content) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) | Err(_) => {
                warn!(
                    path = %self.path.display(),
                    "Channel configuration file is not a JSON object, starting a fresh document"
                );
                Ok(Map::new())
            }
        }
    }
}

/// Get `map[key]` as an object, replacing any non-object value.
fn object_entry<'a>(map: &'a mut Map<String, Value>, key: &str) -> Result<&'a mut Map<String, Value>> {
    let slot = map
        .entry(key.to_string())
        .or_insert_with(|| Value::Object(Map::new()));
    if !slot.is_object() {
        *slot = Value::Object(Map::new());
    }
    slot.as_object_mut()
        .ok_or_else(|| ThreadcardError::ChannelStore(format!("entry '{}' is not an object", key)))
}
