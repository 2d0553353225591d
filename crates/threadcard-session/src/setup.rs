//! Channel setup: bind a channel to a collection and pick its properties.
//!
//! Every confirmed step is persisted immediately, so a timeout in a later
//! step keeps what was already chosen.

use threadcard_core::ConfigPatch;
use threadcard_store::{extract_collection_id, interaction_schema};
use tracing::info;

use crate::engine::{FlowOutcome, SessionEngine};
use crate::error::SessionError;
use crate::gateway::{ChoiceControl, CommandContext, MessageHandle, OutgoingMessage};
use crate::session::Session;
use crate::stages::SetupStage;

const SETUP_EXPIRED: &str = "⌛ Setup cancelled. The process was not completed.";

impl SessionEngine {
    /// Run channel setup for the collection at `url`.
    pub async fn run_setup(
        &self,
        ctx: &CommandContext,
        url: &str,
    ) -> Result<FlowOutcome, SessionError> {
        let workspace = &ctx.workspace;
        let channel = ctx.config_channel();
        let mut session = Session::new(ctx.user.id.clone(), SetupStage::ValidatingUrl);

        if extract_collection_id(url).is_err() {
            return Err(SessionError::Validation(format!(
                "`{}` does not look like a collection URL.",
                url
            )));
        }
        let is_update = self.load_config(ctx)?.is_some();
        let schema = interaction_schema(self.store.as_ref(), url).await?;
        if schema.is_empty() {
            return Err(SessionError::Validation(
                "The collection has no properties that can be filled in.".to_string(),
            ));
        }

        self.channels
            .save(workspace, channel, ConfigPatch::new().record_store_url(url))?;
        let names: Vec<String> = schema.iter().map(|d| d.name.clone()).collect();

        session.advance(SetupStage::SelectingCreate)?;
        let create = self
            .select_properties(
                &mut session,
                ctx,
                "🛠️ **Step 1/2:** pick the properties asked for when creating a card (`card`).",
                "Creation properties",
                &names,
            )
            .await?;
        self.channels.save(
            workspace,
            channel,
            ConfigPatch::new().create_properties(&create),
        )?;
        self.send(
            ctx,
            OutgoingMessage::ephemeral(format!("✅ Creation properties saved: `{}`", create.join(", "))),
        )
        .await?;

        session.advance(SetupStage::SelectingDisplay)?;
        let display = self
            .select_properties(
                &mut session,
                ctx,
                "🔎 **Step 2/2:** pick the properties shown on cards and offered by `search`.",
                "Display properties",
                &names,
            )
            .await?;
        let mut patch = ConfigPatch::new().display_properties(&display);
        if !is_update {
            patch = ConfigPatch::new_channel_defaults().display_properties(&display);
        }
        self.channels.save(workspace, channel, patch)?;

        session.advance(SetupStage::Complete)?;
        let display_len = display.len();
        info!(
            workspace = %workspace,
            channel = %channel,
            create = create.len(),
            display = display_len,
            updated = is_update,
            "Channel configured"
        );
        self.send(
            ctx,
            OutgoingMessage::ephemeral(format!(
                "✅ Display properties saved: `{}`\n🎉 Setup for this channel is complete!",
                display.join(", ")
            )),
        )
        .await?;
        Ok(FlowOutcome::Completed)
    }

    /// Ask for one or more property names and confirm the pick in place.
    async fn select_properties(
        &self,
        session: &mut Session<SetupStage>,
        ctx: &CommandContext,
        prompt: &str,
        placeholder: &str,
        names: &[String],
    ) -> Result<Vec<String>, SessionError> {
        let message = OutgoingMessage::ephemeral(prompt)
            .with_choice(ChoiceControl::multi("properties", placeholder, names, 1));
        let handle: MessageHandle = self.send(ctx, message).await?;
        let expired = OutgoingMessage::ephemeral(SETUP_EXPIRED);

        session.arm(self.timeouts.setup_step());
        loop {
            let selected = self
                .next_selection(session, &handle, "properties", &expired)
                .await?;
            let selected: Vec<String> = selected
                .into_iter()
                .filter(|name| names.contains(name))
                .collect();
            if selected.is_empty() {
                self.gateway
                    .notify_user(&handle, &ctx.user.id, "Pick at least one property.")
                    .await?;
                continue;
            }
            self.edit(
                &handle,
                OutgoingMessage::ephemeral(format!("Selection for '{}' confirmed!", placeholder)),
            )
            .await?;
            return Ok(selected);
        }
    }
}
