//! Paging through records, and the actions offered on a shown card.

use threadcard_core::ChannelConfig;
use threadcard_store::{format_record, Record, RecordCard};
use tracing::{info, warn};

use crate::engine::{FlowOutcome, SessionEngine};
use crate::error::SessionError;
use crate::gateway::{
    ButtonControl, ButtonStyle, CommandContext, Component, MessageHandle, OutgoingMessage,
};
use crate::session::Session;
use crate::stages::{BrowseStage, ConfirmStage};

const PREV_BUTTON: &str = "page-prev";
const NEXT_BUTTON: &str = "page-next";
const EDIT_BUTTON: &str = "page-edit";
const DELETE_BUTTON: &str = "page-delete";
const SHARE_BUTTON: &str = "page-share";
const CONFIRM_YES: &str = "delete-yes";
const CONFIRM_NO: &str = "delete-no";

/// Prefix of the persistent controls attached to published cards.
pub const CARD_ACTION_PREFIX: &str = "card:";

/// Actions on a published card, pressed by anyone who can see it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardAction {
    Edit,
    Delete,
}

impl CardAction {
    pub fn control_id(self, record_id: &str) -> String {
        match self {
            CardAction::Edit => format!("{CARD_ACTION_PREFIX}edit:{record_id}"),
            CardAction::Delete => format!("{CARD_ACTION_PREFIX}delete:{record_id}"),
        }
    }

    /// Inverse of [`CardAction::control_id`].
    pub fn parse(control_id: &str) -> Option<(CardAction, &str)> {
        let rest = control_id.strip_prefix(CARD_ACTION_PREFIX)?;
        let (action, record_id) = rest.split_once(':')?;
        let action = match action {
            "edit" => CardAction::Edit,
            "delete" => CardAction::Delete,
            _ => return None,
        };
        (!record_id.is_empty()).then_some((action, record_id))
    }
}

/// Attach the edit and delete controls of a published card.
pub fn with_card_actions(message: OutgoingMessage, record_id: &str) -> OutgoingMessage {
    message
        .with_button(&CardAction::Edit.control_id(record_id), "✏️ Edit", ButtonStyle::Secondary)
        .with_button(&CardAction::Delete.control_id(record_id), "🗑️ Delete", ButtonStyle::Danger)
}

/// A card visibly marked as deleted.
pub fn deleted_card(card: RecordCard) -> RecordCard {
    let title = format!("[DELETED] {}", card.title);
    card.with_title(title)
        .with_description("This card was deleted.")
}

/// Which per-card actions a browse session offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BrowseActions {
    pub edit: bool,
    pub delete: bool,
    pub share: bool,
}

impl BrowseActions {
    pub fn all() -> Self {
        Self {
            edit: true,
            delete: true,
            share: true,
        }
    }

    pub fn none() -> Self {
        Self {
            edit: false,
            delete: false,
            share: false,
        }
    }
}

/// Cursor over a non-empty result list. Navigation saturates at both ends.
#[derive(Debug, Clone)]
pub struct ResultPager {
    records: Vec<Record>,
    current: usize,
}

impl ResultPager {
    /// `None` for an empty result list.
    pub fn new(records: Vec<Record>) -> Option<Self> {
        (!records.is_empty()).then_some(Self {
            records,
            current: 0,
        })
    }

    pub fn current(&self) -> &Record {
        &self.records[self.current]
    }

    /// Zero-based index of the current record.
    pub fn position(&self) -> usize {
        self.current
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn has_prev(&self) -> bool {
        self.current > 0
    }

    pub fn has_next(&self) -> bool {
        self.current + 1 < self.records.len()
    }

    pub fn prev(&mut self) {
        self.current = self.current.saturating_sub(1);
    }

    pub fn next(&mut self) {
        if self.has_next() {
            self.current += 1;
        }
    }

    /// Swap in a fresher copy of the current record.
    pub fn replace_current(&mut self, record: Record) {
        self.records[self.current] = record;
    }

    /// "Card i of N" for the current position.
    pub fn footer(&self) -> String {
        format!("Card {} of {}", self.current + 1, self.records.len())
    }
}

fn page_message(pager: &ResultPager, config: &ChannelConfig, actions: BrowseActions) -> OutgoingMessage {
    let card = format_record(pager.current(), &config.display_properties).with_footer(pager.footer());
    let mut message = OutgoingMessage::ephemeral("").with_card(card);
    let mut buttons = vec![
        ButtonControl::new(PREV_BUTTON, "⬅️ Previous", ButtonStyle::Secondary).disabled(!pager.has_prev()),
        ButtonControl::new(NEXT_BUTTON, "Next ➡️", ButtonStyle::Secondary).disabled(!pager.has_next()),
    ];
    if actions.edit {
        buttons.push(ButtonControl::new(EDIT_BUTTON, "✏️ Edit", ButtonStyle::Primary));
    }
    if actions.delete {
        buttons.push(ButtonControl::new(DELETE_BUTTON, "🗑️ Delete", ButtonStyle::Danger));
    }
    if actions.share {
        buttons.push(ButtonControl::new(SHARE_BUTTON, "📢 Share", ButtonStyle::Success));
    }
    message.components = buttons.into_iter().map(Component::Button).collect();
    message
}

impl SessionEngine {
    /// Post `record` publicly, with card controls when the channel allows them.
    pub(crate) async fn publish_card(
        &self,
        ctx: &CommandContext,
        config: &ChannelConfig,
        record: &Record,
        text: String,
    ) -> Result<MessageHandle, SessionError> {
        let mut message = OutgoingMessage::public(text)
            .with_card(format_record(record, &config.display_properties));
        if config.action_buttons_enabled {
            message = with_card_actions(message, &record.id);
        }
        self.send(ctx, message).await
    }

    /// Page through `records` one card at a time.
    pub async fn run_browse(
        &self,
        ctx: &CommandContext,
        config: &ChannelConfig,
        records: Vec<Record>,
        actions: BrowseActions,
    ) -> Result<FlowOutcome, SessionError> {
        let Some(mut pager) = ResultPager::new(records) else {
            self.send(ctx, OutgoingMessage::ephemeral("❌ No cards to show.")).await?;
            return Ok(FlowOutcome::Completed);
        };
        let mut session = Session::new(ctx.user.id.clone(), BrowseStage::Browsing);
        let handle = self.send(ctx, page_message(&pager, config, actions)).await?;

        loop {
            session.arm(self.timeouts.browse());
            let expired = page_message(&pager, config, BrowseActions::none());
            let pressed = self
                .next_press(
                    &mut session,
                    &handle,
                    &[PREV_BUTTON, NEXT_BUTTON, EDIT_BUTTON, DELETE_BUTTON, SHARE_BUTTON],
                    &expired,
                )
                .await?;

            match pressed.as_str() {
                PREV_BUTTON => {
                    session.advance(BrowseStage::Browsing)?;
                    pager.prev();
                }
                NEXT_BUTTON => {
                    session.advance(BrowseStage::Browsing)?;
                    pager.next();
                }
                EDIT_BUTTON if actions.edit => {
                    session.advance(BrowseStage::Editing)?;
                    let record_id = pager.current().id.clone();
                    if let Err(err) = self.run_editing(ctx, config, &record_id).await {
                        self.report(ctx, &err).await;
                    }
                    match self.store.retrieve(&record_id).await {
                        Ok(record) => pager.replace_current(record),
                        Err(err) => warn!(record = %record_id, error = %err, "Could not refresh edited card"),
                    }
                    session.advance(BrowseStage::Browsing)?;
                }
                DELETE_BUTTON if actions.delete => {
                    session.advance(BrowseStage::Deleting)?;
                    let record = pager.current().clone();
                    if self.confirm_and_delete(ctx, &record, config, &handle, true).await? {
                        session.advance(BrowseStage::Closed)?;
                        return Ok(FlowOutcome::Completed);
                    }
                    session.advance(BrowseStage::Browsing)?;
                    continue;
                }
                SHARE_BUTTON if actions.share => {
                    self.publish_card(
                        ctx,
                        config,
                        pager.current(),
                        format!("{} shared this card:", ctx.user.display_name),
                    )
                    .await?;
                    self.gateway
                        .notify_user(&handle, &ctx.user.id, "✅ Card shown in the channel!")
                        .await?;
                    continue;
                }
                _ => continue,
            }
            self.edit(&handle, page_message(&pager, config, actions)).await?;
        }
    }

    /// Ask for confirmation, archive on yes, and mark `shown` as deleted.
    /// `shown_ephemeral` is the visibility `shown` was sent with.
    ///
    /// Returns whether the record was deleted. A declined or lapsed prompt
    /// only clears the prompt itself.
    pub(crate) async fn confirm_and_delete(
        &self,
        ctx: &CommandContext,
        record: &Record,
        config: &ChannelConfig,
        shown: &MessageHandle,
        shown_ephemeral: bool,
    ) -> Result<bool, SessionError> {
        let mut confirm = Session::new(ctx.user.id.clone(), ConfirmStage::Pending);
        let prompt = OutgoingMessage::ephemeral("⚠️ Are you sure you want to delete this card?")
            .with_button(CONFIRM_YES, "Yes, delete", ButtonStyle::Danger)
            .with_button(CONFIRM_NO, "No, keep it", ButtonStyle::Secondary);
        let prompt_handle = self.send(ctx, prompt).await?;

        confirm.arm(self.timeouts.delete_confirm());
        let answer = self
            .next_press(
                &mut confirm,
                &prompt_handle,
                &[CONFIRM_YES, CONFIRM_NO],
                &OutgoingMessage::ephemeral("⌛ Deletion cancelled: time is up."),
            )
            .await;
        match answer {
            Ok(pressed) if pressed == CONFIRM_YES => confirm.advance(ConfirmStage::Confirmed)?,
            Ok(_) => {
                confirm.advance(ConfirmStage::Declined)?;
                self.edit(&prompt_handle, OutgoingMessage::ephemeral("❌ Deletion cancelled."))
                    .await?;
                return Ok(false);
            }
            Err(SessionError::Timeout) => return Ok(false),
            Err(err) => return Err(err),
        }

        if let Err(err) = self.store.archive(&record.id).await {
            warn!(record = %record.id, error = %err, "Archive failed");
            self.edit(
                &prompt_handle,
                OutgoingMessage::ephemeral(SessionError::from(err).user_message()),
            )
            .await?;
            return Ok(false);
        }
        info!(record = %record.id, user = %ctx.user.id, "Card deleted");

        let card = deleted_card(format_record(record, &config.display_properties));
        let marked = if shown_ephemeral {
            OutgoingMessage::ephemeral("")
        } else {
            OutgoingMessage::public("")
        };
        self.edit(shown, marked.with_card(card)).await?;
        self.edit(&prompt_handle, OutgoingMessage::ephemeral("✅ Card deleted."))
            .await?;
        Ok(true)
    }

    /// Handle a press on a published card's persistent controls. The presser
    /// owns the session opened for it.
    pub async fn run_card_action(
        &self,
        ctx: &CommandContext,
        action: CardAction,
        record_id: &str,
        message: &MessageHandle,
    ) -> Result<FlowOutcome, SessionError> {
        let channel = self.require_config(ctx)?;
        match action {
            CardAction::Edit => self.run_editing(ctx, &channel.config, record_id).await,
            CardAction::Delete => {
                let record = self.store.retrieve(record_id).await?;
                if self
                    .confirm_and_delete(ctx, &record, &channel.config, message, false)
                    .await?
                {
                    Ok(FlowOutcome::Completed)
                } else {
                    Ok(FlowOutcome::Cancelled)
                }
            }
        }
    }
}
