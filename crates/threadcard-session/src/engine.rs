//! Session engine: central coordinator of the interactive flows.
//!
//! Holds the injected collaborators and the primitives every flow uses to
//! prompt the owner and wait for an answer. The flows themselves live in
//! their own modules as further `impl SessionEngine` blocks.

use std::collections::BTreeMap;
use std::sync::Arc;
use threadcard_core::config::SessionTimeouts;
use threadcard_core::{ChannelConfig, ChannelConfigStore};
use threadcard_store::{extract_collection_id, RecordStore};
use tracing::{error, info, warn};

use crate::error::SessionError;
use crate::gateway::{
    ChatGateway, CommandContext, Interaction, InteractionAction, MessageHandle, OutgoingMessage,
};
use crate::session::{FlowStage, Session};
use crate::summarize::Summarizer;

/// How a flow ended, as seen by the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowOutcome {
    Completed,
    Cancelled,
    TimedOut,
    Failed,
}

/// A channel with a usable record-store binding.
#[derive(Debug, Clone)]
pub struct ConfiguredChannel {
    pub config: ChannelConfig,
    pub store_url: String,
    pub collection_id: String,
}

/// Central coordinator of the interactive flows.
pub struct SessionEngine {
    pub(crate) store: Arc<dyn RecordStore>,
    pub(crate) gateway: Arc<dyn ChatGateway>,
    pub(crate) summarizer: Arc<dyn Summarizer>,
    pub(crate) channels: Arc<ChannelConfigStore>,
    pub(crate) timeouts: SessionTimeouts,
}

impl SessionEngine {
    pub fn new(
        store: Arc<dyn RecordStore>,
        gateway: Arc<dyn ChatGateway>,
        summarizer: Arc<dyn Summarizer>,
        channels: Arc<ChannelConfigStore>,
        timeouts: SessionTimeouts,
    ) -> Self {
        Self {
            store,
            gateway,
            summarizer,
            channels,
            timeouts,
        }
    }

    pub fn timeouts(&self) -> &SessionTimeouts {
        &self.timeouts
    }

    // =========================================================================
    // Channel configuration
    // =========================================================================

    pub(crate) fn load_config(&self, ctx: &CommandContext) -> Result<Option<ChannelConfig>, SessionError> {
        Ok(self.channels.load(&ctx.workspace, ctx.config_channel())?)
    }

    /// Configuration of the invoking channel, which must point at a collection.
    pub(crate) fn require_config(&self, ctx: &CommandContext) -> Result<ConfiguredChannel, SessionError> {
        let config = self.load_config(ctx)?.unwrap_or_default();
        let Some(store_url) = config.record_store_url.clone() else {
            return Err(SessionError::Validation(
                "This channel is not configured yet. Run `config` with the collection URL first."
                    .to_string(),
            ));
        };
        let collection_id = extract_collection_id(&store_url)?;
        Ok(ConfiguredChannel {
            config,
            store_url,
            collection_id,
        })
    }

    // =========================================================================
    // Messaging
    // =========================================================================

    /// Send a message to the invoking channel.
    pub(crate) async fn send(
        &self,
        ctx: &CommandContext,
        message: OutgoingMessage,
    ) -> Result<MessageHandle, SessionError> {
        Ok(self.gateway.send(&ctx.channel, message).await?)
    }

    pub(crate) async fn edit(
        &self,
        handle: &MessageHandle,
        message: OutgoingMessage,
    ) -> Result<(), SessionError> {
        Ok(self.gateway.edit(handle, message).await?)
    }

    /// Tell the user why a flow ended, unless a timeout notice already did.
    pub(crate) async fn report(&self, ctx: &CommandContext, err: &SessionError) {
        match err {
            SessionError::Timeout => {
                info!(user = %ctx.user.id, "Flow timed out");
                return;
            }
            SessionError::Validation(_) | SessionError::Form(_) => {
                info!(user = %ctx.user.id, error = %err, "Flow rejected");
            }
            SessionError::Store(_) => warn!(user = %ctx.user.id, error = %err, "Flow failed"),
            _ => error!(user = %ctx.user.id, error = %err, "Flow failed unexpectedly"),
        }
        if let Err(send_err) = self
            .gateway
            .send(&ctx.channel, OutgoingMessage::ephemeral(err.user_message()))
            .await
        {
            error!(error = %send_err, "Failed to deliver error notice");
        }
    }

    // =========================================================================
    // Waiting for the owner
    // =========================================================================

    /// Next owner interaction on `handle` within the armed deadline.
    ///
    /// On timeout the session expires and the message is replaced by
    /// `expired`, which carries no live controls.
    pub(crate) async fn await_response<S: FlowStage>(
        &self,
        session: &mut Session<S>,
        handle: &MessageHandle,
        expired: &OutgoingMessage,
    ) -> Result<Interaction, SessionError> {
        match session.wait_for_owner(self.gateway.as_ref(), handle).await {
            Err(SessionError::Timeout) => {
                session.expire();
                let mut expired = expired.clone();
                expired.components.clear();
                self.edit(handle, expired).await?;
                Err(SessionError::Timeout)
            }
            other => other,
        }
    }

    /// Wait for a selection on `control_id`, ignoring other interactions.
    pub(crate) async fn next_selection<S: FlowStage>(
        &self,
        session: &mut Session<S>,
        handle: &MessageHandle,
        control_id: &str,
        expired: &OutgoingMessage,
    ) -> Result<Vec<String>, SessionError> {
        loop {
            let interaction = self.await_response(session, handle, expired).await?;
            if let (true, InteractionAction::Selected(values)) =
                (interaction.control_id == control_id, interaction.action)
            {
                return Ok(values);
            }
        }
    }

    /// Wait for a submission of form `form_id`.
    pub(crate) async fn next_submission<S: FlowStage>(
        &self,
        session: &mut Session<S>,
        handle: &MessageHandle,
        form_id: &str,
        expired: &OutgoingMessage,
    ) -> Result<BTreeMap<String, String>, SessionError> {
        loop {
            let interaction = self.await_response(session, handle, expired).await?;
            if let (true, InteractionAction::Submitted(values)) =
                (interaction.control_id == form_id, interaction.action)
            {
                return Ok(values);
            }
        }
    }

    /// Wait for a press on one of `buttons`, returning its id.
    pub(crate) async fn next_press<S: FlowStage>(
        &self,
        session: &mut Session<S>,
        handle: &MessageHandle,
        buttons: &[&str],
        expired: &OutgoingMessage,
    ) -> Result<String, SessionError> {
        loop {
            let interaction = self.await_response(session, handle, expired).await?;
            if interaction.action == InteractionAction::Pressed
                && buttons.contains(&interaction.control_id.as_str())
            {
                return Ok(interaction.control_id);
            }
        }
    }
}
