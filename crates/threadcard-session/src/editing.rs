//! Property-by-property editing of an existing record.

use serde_json::Map;
use threadcard_core::{ChannelConfig, FieldValue, PropertyDescriptor, PropertyKind};
use threadcard_store::{format_record, interaction_schema, to_store_value, PeopleDirectory};
use tracing::{info, warn};

use crate::engine::{FlowOutcome, SessionEngine};
use crate::error::SessionError;
use crate::form::TextField;
use crate::gateway::{ButtonStyle, ChoiceControl, CommandContext, MessageHandle, OutgoingMessage, TextForm};
use crate::session::Session;
use crate::stages::EditStage;

const PROPERTY_SELECT: &str = "edit-property";
const VALUE_SELECT: &str = "edit-value";
const VALUE_FORM: &str = "edit-value-form";
const VALUE_FIELD: &str = "value";
const CONTINUE_BUTTON: &str = "edit-continue";
const FINISH_BUTTON: &str = "edit-finish";

const EDIT_EXPIRED: &str = "⌛ Editing finished: time is up.";

/// Properties offered for editing: the channel's creation properties, in schema order.
pub fn editable_properties(
    schema: &[PropertyDescriptor],
    config: &ChannelConfig,
) -> Vec<PropertyDescriptor> {
    schema
        .iter()
        .filter(|d| config.create_properties.contains(&d.name))
        .cloned()
        .collect()
}

impl SessionEngine {
    /// Edit one property at a time until the user finishes or a step lapses,
    /// then show the record as stored.
    pub async fn run_editing(
        &self,
        ctx: &CommandContext,
        config: &ChannelConfig,
        record_id: &str,
    ) -> Result<FlowOutcome, SessionError> {
        let Some(store_url) = config.record_store_url.as_deref() else {
            return Err(SessionError::Validation(
                "This channel is not configured yet.".to_string(),
            ));
        };
        let schema = interaction_schema(self.store.as_ref(), store_url).await?;
        let editable = editable_properties(&schema, config);
        if editable.is_empty() {
            return Err(SessionError::Validation(
                "No editable properties are configured for this channel.".to_string(),
            ));
        }
        let names: Vec<String> = editable.iter().map(|d| d.name.clone()).collect();

        let mut session = Session::new(ctx.user.id.clone(), EditStage::SelectProperty);
        let expired = OutgoingMessage::ephemeral(EDIT_EXPIRED);
        let handle = self
            .send(ctx, OutgoingMessage::ephemeral("✏️ Starting edit..."))
            .await?;
        let mut people: Option<PeopleDirectory> = None;
        let mut updated = 0usize;

        while !session.is_finished() {
            self.edit(
                &handle,
                OutgoingMessage::ephemeral("Which property do you want to change?")
                    .with_choice(ChoiceControl::single(PROPERTY_SELECT, "Property", &names)),
            )
            .await?;
            session.arm(self.timeouts.edit_property());
            let selected = match self
                .next_selection(&mut session, &handle, PROPERTY_SELECT, &expired)
                .await
            {
                Ok(selected) => selected,
                Err(SessionError::Timeout) => break,
                Err(err) => return Err(err),
            };
            let Some(descriptor) = selected
                .first()
                .and_then(|name| editable.iter().find(|d| &d.name == name))
            else {
                continue;
            };

            let value = match self.ask_value(&mut session, &handle, descriptor, &expired).await {
                Ok(value) => value,
                Err(SessionError::Timeout) => break,
                Err(err) => return Err(err),
            };
            let Some(value) = value else {
                session.advance(EditStage::SelectProperty)?;
                self.gateway
                    .notify_user(&handle, &ctx.user.id, "❌ No new value provided.")
                    .await?;
                continue;
            };

            session.advance(EditStage::ApplyUpdate)?;
            self.edit(&handle, OutgoingMessage::ephemeral("⚙️ Updating property..."))
                .await?;
            let lookup = if descriptor.kind == PropertyKind::People && people.is_none() {
                self.store
                    .list_people()
                    .await
                    .map(|directory| people = Some(directory))
            } else {
                Ok(())
            };
            let result = match lookup {
                Ok(()) => {
                    self.apply_update(record_id, descriptor, &value, people.as_ref())
                        .await
                }
                Err(err) => {
                    warn!(record = %record_id, property = %descriptor.name, error = %err, "People lookup failed");
                    Err(format!(
                        "❌ Could not look up people for **{}**: {}",
                        descriptor.name, err
                    ))
                }
            };
            let report = match result {
                Ok(report) => {
                    updated += 1;
                    report
                }
                Err(report) => report,
            };

            session.advance(EditStage::ContinueOrFinish)?;
            self.edit(
                &handle,
                OutgoingMessage::ephemeral(format!("{}\nDo you want to keep editing?", report))
                    .with_button(CONTINUE_BUTTON, "✏️ Edit another property", ButtonStyle::Primary)
                    .with_button(FINISH_BUTTON, "✅ Finish editing", ButtonStyle::Success),
            )
            .await?;
            session.arm(self.timeouts.edit_continue());
            match self
                .next_press(&mut session, &handle, &[CONTINUE_BUTTON, FINISH_BUTTON], &expired)
                .await
            {
                Ok(pressed) if pressed == CONTINUE_BUTTON => {
                    session.advance(EditStage::SelectProperty)?
                }
                Ok(_) => session.advance(EditStage::Complete)?,
                Err(SessionError::Timeout) => break,
                Err(err) => return Err(err),
            }
        }

        info!(record = %record_id, updated, "Editing finished");
        let record = self.store.retrieve(record_id).await?;
        let card = format_record(&record, &config.display_properties);
        self.edit(
            &handle,
            OutgoingMessage::ephemeral("Editing finished! This is the card now:").with_card(card),
        )
        .await?;
        Ok(FlowOutcome::Completed)
    }

    /// Ask for the new value of `descriptor`. `None` when nothing was given.
    async fn ask_value(
        &self,
        session: &mut Session<EditStage>,
        handle: &MessageHandle,
        descriptor: &PropertyDescriptor,
        expired: &OutgoingMessage,
    ) -> Result<Option<FieldValue>, SessionError> {
        let prompt = format!("What is the new value for **{}**?", descriptor.name);

        if descriptor.kind.is_choice() {
            session.advance(EditStage::SelectValue)?;
            let options = descriptor.option_labels();
            let control = if descriptor.kind == PropertyKind::MultiSelect {
                ChoiceControl::multi(VALUE_SELECT, "New value", options, 1)
            } else {
                ChoiceControl::single(VALUE_SELECT, "New value", options)
            };
            self.edit(handle, OutgoingMessage::ephemeral(prompt).with_choice(control))
                .await?;
            session.arm(self.timeouts.edit_value());
            let selected = self
                .next_selection(session, handle, VALUE_SELECT, expired)
                .await?;
            return Ok(if descriptor.kind == PropertyKind::MultiSelect {
                (!selected.is_empty()).then_some(FieldValue::List(selected))
            } else {
                selected.into_iter().next().map(FieldValue::Text)
            });
        }

        session.advance(EditStage::FreeTextInput)?;
        let form = TextForm {
            id: VALUE_FORM.to_string(),
            title: format!("Edit '{}'", descriptor.name),
            fields: vec![TextField {
                name: VALUE_FIELD.to_string(),
                kind: descriptor.kind.clone(),
                required: true,
                multiline: true,
                default: None,
            }],
        };
        self.edit(handle, OutgoingMessage::ephemeral(prompt).with_form(form))
            .await?;
        session.arm(self.timeouts.edit_value());
        let submitted = self
            .next_submission(session, handle, VALUE_FORM, expired)
            .await?;
        Ok(submitted
            .get(VALUE_FIELD)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
            .map(FieldValue::from))
    }

    /// Write one property. Both arms carry the report shown to the user;
    /// failures stay local to this property and earlier updates are kept.
    async fn apply_update(
        &self,
        record_id: &str,
        descriptor: &PropertyDescriptor,
        value: &FieldValue,
        people: Option<&PeopleDirectory>,
    ) -> Result<String, String> {
        let empty = PeopleDirectory::default();
        let Some(wire) = to_store_value(&descriptor.kind, value, people.unwrap_or(&empty)) else {
            return Err(format!(
                "⚠️ That is not a valid value for **{}**. Nothing was changed.",
                descriptor.name
            ));
        };
        let mut properties = Map::new();
        properties.insert(descriptor.name.clone(), wire);
        match self.store.update(record_id, properties).await {
            Ok(_) => Ok(format!("✅ Property **{}** updated!", descriptor.name)),
            Err(err) => {
                warn!(record = %record_id, property = %descriptor.name, error = %err, "Update failed");
                Err(format!("❌ Could not update **{}**: {}", descriptor.name, err))
            }
        }
    }
}
