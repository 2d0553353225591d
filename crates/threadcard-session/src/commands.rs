//! Command routing.
//!
//! Maps a chat command or a press on a published card to its flow, and turns
//! flow errors into user notices.

use tracing::{debug, info};

use crate::browse::CardAction;
use crate::engine::{FlowOutcome, SessionEngine};
use crate::error::SessionError;
use crate::gateway::{CommandContext, MessageHandle};

/// A user request the engine can serve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `config [url]`: set the channel up, or open the settings menu.
    Config { url: Option<String> },
    /// `card`: create a record from the current thread.
    Card,
    /// `search`: find and browse records.
    Search,
    /// `count`: post the number of records.
    Count,
    /// A press on a published card's edit or delete control.
    CardAction {
        action: CardAction,
        record_id: String,
        message: MessageHandle,
    },
}

impl Command {
    /// Parse a slash-command invocation: its name and optional argument.
    pub fn parse(name: &str, argument: Option<&str>) -> Option<Self> {
        let argument = argument
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .map(str::to_string);
        match name.trim_start_matches('/') {
            "config" => Some(Command::Config { url: argument }),
            "card" => Some(Command::Card),
            "search" => Some(Command::Search),
            "count" => Some(Command::Count),
            _ => None,
        }
    }

    /// Recognize a press on a card control, e.g. `card:delete:<record id>`.
    pub fn from_control(control_id: &str, message: MessageHandle) -> Option<Self> {
        let (action, record_id) = CardAction::parse(control_id)?;
        Some(Command::CardAction {
            action,
            record_id: record_id.to_string(),
            message,
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            Command::Config { .. } => "config",
            Command::Card => "card",
            Command::Search => "search",
            Command::Count => "count",
            Command::CardAction { .. } => "card-action",
        }
    }
}

impl SessionEngine {
    /// Run `command` to completion. Errors are reported to the invoker here.
    pub async fn dispatch(&self, ctx: &CommandContext, command: Command) -> FlowOutcome {
        info!(
            command = command.name(),
            user = %ctx.user.id,
            channel = %ctx.channel,
            "Dispatching command"
        );
        let result = match command {
            Command::Config { url: Some(url) } => self.run_setup(ctx, &url).await,
            Command::Config { url: None } => self.run_settings(ctx).await,
            Command::Card => self.run_creation(ctx).await,
            Command::Search => self.run_search(ctx).await,
            Command::Count => self.run_count(ctx).await,
            Command::CardAction {
                action,
                record_id,
                message,
            } => self.run_card_action(ctx, action, &record_id, &message).await,
        };

        match result {
            Ok(outcome) => {
                debug!(?outcome, "Command finished");
                outcome
            }
            Err(err) => {
                self.report(ctx, &err).await;
                match err {
                    SessionError::Timeout => FlowOutcome::TimedOut,
                    _ => FlowOutcome::Failed,
                }
            }
        }
    }

    /// `config` without a URL only makes sense once the channel has one.
    async fn run_settings(&self, ctx: &CommandContext) -> Result<FlowOutcome, SessionError> {
        let configured = self
            .load_config(ctx)?
            .is_some_and(|config| config.record_store_url.is_some());
        if !configured {
            return Err(SessionError::Validation(
                "Provide the collection URL to configure this channel.".to_string(),
            ));
        }
        self.run_management(ctx).await
    }
}
