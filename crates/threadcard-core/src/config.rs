use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{Result, ThreadcardError};

/// Top-level configuration for the threadcard service.
///
/// Loaded from `threadcard.toml` by default. Secrets are never stored here:
/// each section names the environment variable that holds its token.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ThreadcardConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub chat: ChatConfig,
    #[serde(default)]
    pub summary: SummaryConfig,
    #[serde(default)]
    pub webhook: WebhookConfig,
    #[serde(default)]
    pub sessions: SessionTimeouts,
    #[serde(default)]
    pub channels: ChannelsConfig,
}

impl ThreadcardConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: ThreadcardConfig = toml::from_str(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration, falling back to defaults when the file is missing
    /// or unparseable.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save the configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| ThreadcardError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }
}

/// Read a secret from the environment variable named by a config field.
pub fn secret_from_env(var: &str) -> Result<String> {
    match std::env::var(var) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ThreadcardError::Config(format!(
            "environment variable {} is not set",
            var
        ))),
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
    /// Directory holding the channel configuration file.
    pub data_dir: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            data_dir: ".".to_string(),
        }
    }
}

/// Record store REST endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub base_url: String,
    /// Value of the API version header sent with every request.
    pub api_version: String,
    /// Environment variable holding the integration token.
    pub token_env: String,
    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.notion.com/v1".to_string(),
            api_version: "2022-06-28".to_string(),
            token_env: "NOTION_TOKEN".to_string(),
            request_timeout_secs: 30,
        }
    }
}

/// Chat platform REST endpoint used for out-of-band notifications.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    pub api_base_url: String,
    pub token_env: String,
    /// Regex matching a destination link; group 1 is the workspace id,
    /// group 2 the destination id.
    pub channel_link_pattern: String,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            api_base_url: "https://discord.com/api/v10".to_string(),
            token_env: "DISCORD_TOKEN".to_string(),
            channel_link_pattern: r"discord(?:app)?\.com/channels/(\d+)/(\d+)".to_string(),
        }
    }
}

/// Thread summarization service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SummaryConfig {
    pub base_url: String,
    pub model: String,
    pub api_key_env: String,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            base_url: "https://generativelanguage.googleapis.com/v1beta/models".to_string(),
            model: "gemini-1.5-flash-latest".to_string(),
            api_key_env: "GOOGLE_API_KEY".to_string(),
        }
    }
}

/// Inbound webhook listener.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebhookConfig {
    pub host: String,
    pub port: u16,
    pub path: String,
    /// Capacity of the hand-off queue between the listener and the worker.
    pub queue_capacity: usize,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            path: "/notion-webhook".to_string(),
            queue_capacity: 256,
        }
    }
}

/// Per-step timeouts of the interactive flows, in seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionTimeouts {
    pub setup_step_secs: u64,
    pub creation_step_secs: u64,
    pub edit_property_secs: u64,
    pub edit_value_secs: u64,
    pub edit_continue_secs: u64,
    pub browse_secs: u64,
    pub delete_confirm_secs: u64,
    pub publish_secs: u64,
    pub management_secs: u64,
    pub search_step_secs: u64,
    /// Number of thread messages read for participants, attachments and summaries.
    pub history_limit: usize,
}

impl Default for SessionTimeouts {
    fn default() -> Self {
        Self {
            setup_step_secs: 300,
            creation_step_secs: 300,
            edit_property_secs: 180,
            edit_value_secs: 180,
            edit_continue_secs: 60,
            browse_secs: 300,
            delete_confirm_secs: 60,
            publish_secs: 300,
            management_secs: 180,
            search_step_secs: 180,
            history_limit: 100,
        }
    }
}

impl SessionTimeouts {
    pub fn setup_step(&self) -> Duration {
        Duration::from_secs(self.setup_step_secs)
    }

    pub fn creation_step(&self) -> Duration {
        Duration::from_secs(self.creation_step_secs)
    }

    pub fn edit_property(&self) -> Duration {
        Duration::from_secs(self.edit_property_secs)
    }

    pub fn edit_value(&self) -> Duration {
        Duration::from_secs(self.edit_value_secs)
    }

    pub fn edit_continue(&self) -> Duration {
        Duration::from_secs(self.edit_continue_secs)
    }

    pub fn browse(&self) -> Duration {
        Duration::from_secs(self.browse_secs)
    }

    pub fn delete_confirm(&self) -> Duration {
        Duration::from_secs(self.delete_confirm_secs)
    }

    pub fn publish(&self) -> Duration {
        Duration::from_secs(self.publish_secs)
    }

    pub fn management(&self) -> Duration {
        Duration::from_secs(self.management_secs)
    }

    pub fn search_step(&self) -> Duration {
        Duration::from_secs(self.search_step_secs)
    }
}

/// Location of the channel configuration document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelsConfig {
    pub path: String,
}

impl Default for ChannelsConfig {
    fn default() -> Self {
        Self {
            path: "configs.json".to_string(),
        }
    }
}
