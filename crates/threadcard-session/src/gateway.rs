//! The chat platform as seen by the interaction engine.
//!
//! Everything here is transport-neutral: messages carry an optional
//! [`RecordCard`] and a list of [`Component`]s, and user input comes back as
//! [`Interaction`]s addressed to a previously sent message.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::time::Duration;
use threadcard_core::{ChannelId, UserId, WorkspaceId};
use threadcard_store::RecordCard;

use crate::error::ChatError;
use crate::form::{cap_options, TextField};

// =============================================================================
// Participants and context
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatUser {
    pub id: UserId,
    pub display_name: String,
    pub is_bot: bool,
}

impl ChatUser {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: UserId::new(id),
            display_name: display_name.into(),
            is_bot: false,
        }
    }

    pub fn bot(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            is_bot: true,
            ..Self::new(id, display_name)
        }
    }
}

/// The discussion thread a command was invoked in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadInfo {
    pub id: ChannelId,
    pub name: String,
    pub permalink: String,
}

/// Where and by whom a command was invoked.
#[derive(Debug, Clone)]
pub struct CommandContext {
    pub workspace: WorkspaceId,
    pub channel: ChannelId,
    /// Set when `channel` is a thread inside a parent channel.
    pub parent_channel: Option<ChannelId>,
    pub thread: Option<ThreadInfo>,
    pub user: ChatUser,
}

impl CommandContext {
    /// Channel whose configuration applies: the parent of a thread, else the channel itself.
    pub fn config_channel(&self) -> &ChannelId {
        self.parent_channel.as_ref().unwrap_or(&self.channel)
    }
}

// =============================================================================
// Thread history
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    /// Video or animated image, linked rather than embedded.
    Motion,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub url: String,
    pub filename: String,
    pub content_type: String,
}

impl Attachment {
    /// Media classification, `None` for documents and other files.
    pub fn media(&self) -> Option<MediaKind> {
        let content_type = self.content_type.to_lowercase();
        let animated = content_type == "image/gif" || self.filename.to_lowercase().ends_with(".gif");
        if content_type.starts_with("video/") || animated {
            Some(MediaKind::Motion)
        } else if content_type.starts_with("image/") {
            Some(MediaKind::Image)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryMessage {
    pub author: ChatUser,
    pub content: String,
    pub attachments: Vec<Attachment>,
}

// =============================================================================
// Outgoing messages
// =============================================================================

/// Address of a message the engine sent and may edit or await input on.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MessageHandle {
    pub channel: ChannelId,
    pub id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonStyle {
    Primary,
    Secondary,
    Success,
    Danger,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ButtonControl {
    pub id: String,
    pub label: String,
    pub style: ButtonStyle,
    pub disabled: bool,
}

impl ButtonControl {
    pub fn new(id: impl Into<String>, label: impl Into<String>, style: ButtonStyle) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            style,
            disabled: false,
        }
    }

    pub fn disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }
}

/// A selection control. Options are capped at the platform ceiling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChoiceControl {
    pub id: String,
    pub placeholder: String,
    pub options: Vec<String>,
    pub min_values: usize,
    pub max_values: usize,
}

impl ChoiceControl {
    /// Exactly one choice.
    pub fn single(id: impl Into<String>, placeholder: impl Into<String>, options: &[String]) -> Self {
        Self {
            id: id.into(),
            placeholder: placeholder.into(),
            options: cap_options(options),
            min_values: 1,
            max_values: 1,
        }
    }

    /// Between `min` and every option.
    pub fn multi(
        id: impl Into<String>,
        placeholder: impl Into<String>,
        options: &[String],
        min: usize,
    ) -> Self {
        let options = cap_options(options);
        Self {
            id: id.into(),
            placeholder: placeholder.into(),
            max_values: options.len().max(1),
            options,
            min_values: min,
        }
    }

    pub fn with_min(mut self, min: usize) -> Self {
        self.min_values = min;
        self
    }
}

/// A pop-up form of free-text inputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextForm {
    pub id: String,
    pub title: String,
    pub fields: Vec<TextField>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Component {
    Choice(ChoiceControl),
    Button(ButtonControl),
    Form(TextForm),
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OutgoingMessage {
    pub text: String,
    pub card: Option<RecordCard>,
    pub components: Vec<Component>,
    /// Visible only to the invoking user.
    pub ephemeral: bool,
}

impl OutgoingMessage {
    pub fn ephemeral(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ephemeral: true,
            ..Self::default()
        }
    }

    pub fn public(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn with_card(mut self, card: RecordCard) -> Self {
        self.card = Some(card);
        self
    }

    pub fn with_component(mut self, component: Component) -> Self {
        self.components.push(component);
        self
    }

    pub fn with_button(self, id: &str, label: &str, style: ButtonStyle) -> Self {
        self.with_component(Component::Button(ButtonControl::new(id, label, style)))
    }

    pub fn with_choice(self, choice: ChoiceControl) -> Self {
        self.with_component(Component::Choice(choice))
    }

    pub fn with_form(self, form: TextForm) -> Self {
        self.with_component(Component::Form(form))
    }

    /// Buttons and selection controls, in order.
    pub fn control_ids(&self) -> Vec<&str> {
        self.components
            .iter()
            .map(|c| match c {
                Component::Choice(choice) => choice.id.as_str(),
                Component::Button(button) => button.id.as_str(),
                Component::Form(form) => form.id.as_str(),
            })
            .collect()
    }

    pub fn button(&self, id: &str) -> Option<&ButtonControl> {
        self.components.iter().find_map(|c| match c {
            Component::Button(button) if button.id == id => Some(button),
            _ => None,
        })
    }
}

// =============================================================================
// Incoming interactions
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InteractionAction {
    Selected(Vec<String>),
    Submitted(BTreeMap<String, String>),
    Pressed,
}

/// One user action on a control of a sent message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interaction {
    pub user: UserId,
    pub control_id: String,
    pub action: InteractionAction,
}

impl Interaction {
    pub fn pressed(user: &str, control_id: &str) -> Self {
        Self {
            user: UserId::from(user),
            control_id: control_id.to_string(),
            action: InteractionAction::Pressed,
        }
    }

    pub fn selected(user: &str, control_id: &str, values: &[&str]) -> Self {
        Self {
            user: UserId::from(user),
            control_id: control_id.to_string(),
            action: InteractionAction::Selected(values.iter().map(|v| v.to_string()).collect()),
        }
    }

    pub fn submitted(user: &str, control_id: &str, values: &[(&str, &str)]) -> Self {
        Self {
            user: UserId::from(user),
            control_id: control_id.to_string(),
            action: InteractionAction::Submitted(
                values
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
            ),
        }
    }
}

// =============================================================================
// Collaborator
// =============================================================================

/// Chat platform operations used by the flows.
#[async_trait]
pub trait ChatGateway: Send + Sync {
    /// Post a message and return its handle.
    async fn send(
        &self,
        channel: &ChannelId,
        message: OutgoingMessage,
    ) -> Result<MessageHandle, ChatError>;

    /// Replace the content and controls of a sent message.
    async fn edit(&self, handle: &MessageHandle, message: OutgoingMessage) -> Result<(), ChatError>;

    /// Show a private notice to `user` in reply to an interaction on `handle`.
    async fn notify_user(
        &self,
        handle: &MessageHandle,
        user: &UserId,
        text: &str,
    ) -> Result<(), ChatError>;

    /// Next interaction on `handle`, or `None` once `timeout` elapses.
    async fn next_interaction(
        &self,
        handle: &MessageHandle,
        timeout: Duration,
    ) -> Result<Option<Interaction>, ChatError>;

    /// Up to `limit` messages of a thread, newest first.
    async fn thread_history(
        &self,
        thread: &ChannelId,
        limit: usize,
    ) -> Result<Vec<HistoryMessage>, ChatError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attachment(filename: &str, content_type: &str) -> Attachment {
        Attachment {
            url: format!("https://cdn.example/{filename}"),
            filename: filename.to_string(),
            content_type: content_type.to_string(),
        }
    }

    #[test]
    fn test_media_classification() {
        assert_eq!(attachment("a.png", "image/png").media(), Some(MediaKind::Image));
        assert_eq!(attachment("a.gif", "image/gif").media(), Some(MediaKind::Motion));
        assert_eq!(attachment("clip.mp4", "video/mp4").media(), Some(MediaKind::Motion));
        assert_eq!(attachment("report.pdf", "application/pdf").media(), None);
    }

    #[test]
    fn test_config_channel_prefers_parent() {
        let mut ctx = CommandContext {
            workspace: WorkspaceId::from("g-1"),
            channel: ChannelId::from("t-1"),
            parent_channel: Some(ChannelId::from("c-1")),
            thread: None,
            user: ChatUser::new("u-1", "Ana"),
        };
        assert_eq!(ctx.config_channel().as_str(), "c-1");
        ctx.parent_channel = None;
        assert_eq!(ctx.config_channel().as_str(), "t-1");
    }

    #[test]
    fn test_choice_control_caps_options() {
        let options: Vec<String> = (0..30).map(|i| i.to_string()).collect();
        let multi = ChoiceControl::multi("props", "Pick", &options, 1);
        assert_eq!(multi.options.len(), 25);
        assert_eq!(multi.max_values, 25);
        assert_eq!(multi.min_values, 1);

        let single = ChoiceControl::single("prop", "Pick", &options[..3]);
        assert_eq!((single.min_values, single.max_values), (1, 1));
    }

    #[test]
    fn test_message_builders() {
        let message = OutgoingMessage::ephemeral("hi")
            .with_button("a", "A", ButtonStyle::Primary)
            .with_choice(ChoiceControl::single("b", "B", &["x".to_string()]));
        assert!(message.ephemeral);
        assert_eq!(message.control_ids(), vec!["a", "b"]);
        assert_eq!(message.button("a").map(|b| b.label.as_str()), Some("A"));
        assert!(message.button("b").is_none());
    }
}
