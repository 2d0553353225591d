//! Management menu of an already configured channel.

use threadcard_core::{ChannelConfig, ConfigPatch, PropertyKind};
use threadcard_store::interaction_schema;
use tracing::info;

use crate::engine::{FlowOutcome, SessionEngine};
use crate::error::SessionError;
use crate::gateway::{ButtonStyle, ChoiceControl, CommandContext, MessageHandle, OutgoingMessage};
use crate::session::Session;
use crate::stages::ManagementStage;

const RECONFIGURE: &str = "manage-reconfigure";
const ACTION_BUTTONS: &str = "manage-action-buttons";
const AI_SUMMARY: &str = "manage-ai-summary";
const TOPIC_LINK: &str = "manage-topic-link";
const INDIVIDUAL: &str = "manage-individual";
const COLLECTIVE: &str = "manage-collective";
const TOGGLE: &str = "manage-toggle";
const PROPERTY_SELECT: &str = "manage-property";

const MENU_ITEMS: [&str; 6] = [RECONFIGURE, ACTION_BUTTONS, AI_SUMMARY, TOPIC_LINK, INDIVIDUAL, COLLECTIVE];

const MANAGEMENT_EXPIRED: &str = "⌛ Management menu closed: time is up.";

/// Settings stored as a property name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PropertySetting {
    TopicLink,
    Individual,
    Collective,
}

impl PropertySetting {
    fn kinds(self) -> &'static [PropertyKind] {
        match self {
            PropertySetting::TopicLink => &[PropertyKind::Text, PropertyKind::Url],
            PropertySetting::Individual | PropertySetting::Collective => &[PropertyKind::People],
        }
    }

    fn prompt(self) -> &'static str {
        match self {
            PropertySetting::TopicLink => "Which property stores the link to the thread?",
            PropertySetting::Individual => "Which property stores the person who created the card?",
            PropertySetting::Collective => "Which property stores everyone who took part in the thread?",
        }
    }

    fn patch(self, name: &str) -> ConfigPatch {
        match self {
            PropertySetting::TopicLink => ConfigPatch::new().topic_link_property(Some(name)),
            PropertySetting::Individual => ConfigPatch::new().individual_person_property(Some(name)),
            PropertySetting::Collective => ConfigPatch::new().collective_person_property(Some(name)),
        }
    }

    fn confirmation(self, name: &str) -> String {
        match self {
            PropertySetting::TopicLink => format!("✅ The thread link will be saved in **{}**.", name),
            PropertySetting::Individual => format!("✅ The card creator will be saved in **{}**.", name),
            PropertySetting::Collective => format!("✅ Thread participants will be saved in **{}**.", name),
        }
    }
}

fn on_off(enabled: bool) -> &'static str {
    if enabled {
        "ENABLED"
    } else {
        "DISABLED"
    }
}

fn menu_message(config: &ChannelConfig) -> OutgoingMessage {
    let setting = |name: &Option<String>| name.clone().unwrap_or_else(|| "not set".to_string());
    OutgoingMessage::ephemeral(format!(
        "⚙️ **Channel settings**\n\
         Action buttons: {}\n\
         AI summary: {}\n\
         Thread link property: {}\n\
         Creator property: {}\n\
         Participants property: {}",
        on_off(config.action_buttons_enabled),
        on_off(config.ai_summary_enabled),
        setting(&config.topic_link_property),
        setting(&config.individual_person_property),
        setting(&config.collective_person_property),
    ))
    .with_button(RECONFIGURE, "🔄 Reconfigure", ButtonStyle::Secondary)
    .with_button(ACTION_BUTTONS, "🔘 Action buttons", ButtonStyle::Primary)
    .with_button(AI_SUMMARY, "🤖 AI summary", ButtonStyle::Primary)
    .with_button(TOPIC_LINK, "🔗 Thread link property", ButtonStyle::Secondary)
    .with_button(INDIVIDUAL, "👤 Creator property", ButtonStyle::Secondary)
    .with_button(COLLECTIVE, "👥 Participants property", ButtonStyle::Secondary)
}

impl SessionEngine {
    /// Show the settings menu and apply one change.
    pub async fn run_management(&self, ctx: &CommandContext) -> Result<FlowOutcome, SessionError> {
        let channel = self.require_config(ctx)?;
        let config = channel.config;
        let mut session = Session::new(ctx.user.id.clone(), ManagementStage::Menu);
        let expired = OutgoingMessage::ephemeral(MANAGEMENT_EXPIRED);

        let handle = self.send(ctx, menu_message(&config)).await?;
        session.arm(self.timeouts.management());
        let pressed = self
            .next_press(&mut session, &handle, &MENU_ITEMS, &expired)
            .await?;

        match pressed.as_str() {
            RECONFIGURE => {
                session.advance(ManagementStage::Done)?;
                self.edit(
                    &handle,
                    OutgoingMessage::ephemeral(
                        "🔄 To point this channel at another collection, run `config` again with the new URL.",
                    ),
                )
                .await?;
                Ok(FlowOutcome::Completed)
            }
            ACTION_BUTTONS => {
                let enabled = config.action_buttons_enabled;
                self.toggle(&mut session, ctx, &handle, "Action buttons", enabled, |on| {
                    ConfigPatch::new().action_buttons_enabled(on)
                })
                .await
            }
            AI_SUMMARY => {
                let enabled = config.ai_summary_enabled;
                self.toggle(&mut session, ctx, &handle, "AI summary", enabled, |on| {
                    ConfigPatch::new().ai_summary_enabled(on)
                })
                .await
            }
            TOPIC_LINK => {
                self.choose_property(&mut session, ctx, &handle, &channel.store_url, PropertySetting::TopicLink)
                    .await
            }
            INDIVIDUAL => {
                self.choose_property(&mut session, ctx, &handle, &channel.store_url, PropertySetting::Individual)
                    .await
            }
            _ => {
                self.choose_property(&mut session, ctx, &handle, &channel.store_url, PropertySetting::Collective)
                    .await
            }
        }
    }

    async fn toggle(
        &self,
        session: &mut Session<ManagementStage>,
        ctx: &CommandContext,
        handle: &MessageHandle,
        label: &str,
        enabled: bool,
        patch: impl Fn(bool) -> ConfigPatch,
    ) -> Result<FlowOutcome, SessionError> {
        session.advance(ManagementStage::Choosing)?;
        let action = if enabled { "Disable" } else { "Enable" };
        self.edit(
            handle,
            OutgoingMessage::ephemeral(format!("{} is currently **{}**.", label, on_off(enabled)))
                .with_button(TOGGLE, &format!("{} {}", action, label.to_lowercase()), ButtonStyle::Primary),
        )
        .await?;

        session.arm(self.timeouts.management());
        self.next_press(session, handle, &[TOGGLE], &OutgoingMessage::ephemeral(MANAGEMENT_EXPIRED))
            .await?;
        self.channels
            .save(&ctx.workspace, ctx.config_channel(), patch(!enabled))?;
        session.advance(ManagementStage::Done)?;
        info!(channel = %ctx.config_channel(), setting = label, enabled = !enabled, "Setting toggled");
        self.edit(
            handle,
            OutgoingMessage::ephemeral(format!("✅ {} set to **{}**.", label, on_off(!enabled))),
        )
        .await?;
        Ok(FlowOutcome::Completed)
    }

    async fn choose_property(
        &self,
        session: &mut Session<ManagementStage>,
        ctx: &CommandContext,
        handle: &MessageHandle,
        store_url: &str,
        setting: PropertySetting,
    ) -> Result<FlowOutcome, SessionError> {
        session.advance(ManagementStage::Choosing)?;
        let schema = interaction_schema(self.store.as_ref(), store_url).await?;
        let candidates: Vec<String> = schema
            .iter()
            .filter(|d| setting.kinds().contains(&d.kind))
            .map(|d| d.name.clone())
            .collect();
        if candidates.is_empty() {
            session.advance(ManagementStage::Cancelled)?;
            self.edit(
                handle,
                OutgoingMessage::ephemeral("❌ The collection has no compatible property for this setting."),
            )
            .await?;
            return Ok(FlowOutcome::Cancelled);
        }

        self.edit(
            handle,
            OutgoingMessage::ephemeral(setting.prompt())
                .with_choice(ChoiceControl::single(PROPERTY_SELECT, "Property", &candidates)),
        )
        .await?;
        session.arm(self.timeouts.management());
        let selected = self
            .next_selection(session, handle, PROPERTY_SELECT, &OutgoingMessage::ephemeral(MANAGEMENT_EXPIRED))
            .await?;
        let Some(name) = selected.into_iter().find(|name| candidates.contains(name)) else {
            session.advance(ManagementStage::Cancelled)?;
            return Ok(FlowOutcome::Cancelled);
        };

        self.channels
            .save(&ctx.workspace, ctx.config_channel(), setting.patch(&name))?;
        session.advance(ManagementStage::Done)?;
        info!(channel = %ctx.config_channel(), setting = ?setting, property = %name, "Property setting saved");
        self.edit(handle, OutgoingMessage::ephemeral(setting.confirmation(&name)))
            .await?;
        Ok(FlowOutcome::Completed)
    }
}
