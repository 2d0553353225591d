//! Record creation from a thread: two-stage form, computed fields, body
//! content and an optional one-shot publish.

use chrono::Local;
use threadcard_core::{ChannelConfig, FieldValue, PropertyDescriptor, PropertyKind};
use threadcard_store::{
    encode_properties, find_descriptor, format_record, interaction_schema, parse_summary_to_blocks,
    ContentBlock, PeopleDirectory, Record, TextRun,
};
use tracing::{info, warn};

use crate::engine::{ConfiguredChannel, FlowOutcome, SessionEngine};
use crate::error::SessionError;
use crate::form::{compose_form, FormPlan};
use crate::gateway::{
    ButtonControl, ButtonStyle, ChoiceControl, CommandContext, Component, HistoryMessage,
    InteractionAction, MediaKind, OutgoingMessage, TextForm,
};
use crate::session::Session;
use crate::stages::CreationStage;
use crate::summarize::is_usable_summary;

const TEXT_FORM: &str = "card-text";
const CHOICE_PREFIX: &str = "choice:";
const CREATE_BUTTON: &str = "card-create";
const PUBLISH_BUTTON: &str = "card-publish";

const CREATION_EXPIRED: &str = "⌛ Card creation cancelled: time is up.";

/// Properties the creation form asks for: configured ones in schema order,
/// minus those the engine fills itself.
pub fn creation_properties(
    schema: &[PropertyDescriptor],
    config: &ChannelConfig,
) -> Vec<PropertyDescriptor> {
    let auto_filled = config.auto_filled_properties();
    schema
        .iter()
        .filter(|d| config.create_properties.contains(&d.name))
        .filter(|d| !auto_filled.contains(&d.name.as_str()))
        .cloned()
        .collect()
}

/// Title used when the user leaves it empty.
pub fn default_title() -> String {
    format!("Card created on {}", Local::now().format("%d/%m"))
}

/// Distinct human authors of newest-first `history`, oldest first.
pub fn participants(history: &[HistoryMessage]) -> Vec<&str> {
    let mut names: Vec<&str> = Vec::new();
    for message in history.iter().rev().filter(|m| !m.author.is_bot) {
        let name = message.author.display_name.as_str();
        if !names.contains(&name) {
            names.push(name);
        }
    }
    names
}

/// Record body: the AI summary section, then thread media, divided when both exist.
pub fn build_content(summary: Option<&str>, history: &[HistoryMessage]) -> Vec<ContentBlock> {
    let mut content = Vec::new();
    if let Some(summary) = summary.filter(|s| is_usable_summary(s)) {
        content.push(ContentBlock::heading(2, "🤖 AI summary"));
        content.extend(parse_summary_to_blocks(summary));
    }

    let media: Vec<_> = history
        .iter()
        .rev()
        .flat_map(|m| m.attachments.iter())
        .filter_map(|a| a.media().map(|kind| (kind, a)))
        .collect();
    if media.is_empty() {
        return content;
    }

    if !content.is_empty() {
        content.push(ContentBlock::Divider);
    }
    content.push(ContentBlock::heading(2, "📎 Thread attachments"));
    for (kind, attachment) in media {
        content.push(match kind {
            MediaKind::Image => ContentBlock::Image {
                url: attachment.url.clone(),
            },
            MediaKind::Motion => ContentBlock::Paragraph(vec![
                TextRun::plain(format!("Video/GIF ({}): ", attachment.filename)),
                TextRun::link(attachment.url.clone(), attachment.url.clone()),
            ]),
        });
    }
    content
}

fn choice_message(plan: &FormPlan) -> OutgoingMessage {
    let mut message =
        OutgoingMessage::ephemeral("📋 Almost there! Pick the remaining values, then create the card.");
    for field in &plan.choice_fields {
        let id = format!("{CHOICE_PREFIX}{}", field.name);
        let control = if field.multi {
            ChoiceControl::multi(id, &field.name, &field.options, 0)
        } else {
            ChoiceControl::single(id, &field.name, &field.options).with_min(0)
        };
        message = message.with_choice(control);
    }
    message.with_button(CREATE_BUTTON, "✅ Create card", ButtonStyle::Success)
}

impl SessionEngine {
    /// Create a record in the invoking channel's collection.
    pub async fn run_creation(&self, ctx: &CommandContext) -> Result<FlowOutcome, SessionError> {
        let channel = self.require_config(ctx)?;
        let schema = interaction_schema(self.store.as_ref(), &channel.store_url).await?;
        let title_property = schema
            .iter()
            .find(|d| d.kind == PropertyKind::Title)
            .map(|d| d.name.clone())
            .ok_or_else(|| {
                SessionError::Validation("The collection has no title property.".to_string())
            })?;
        let plan = compose_form(&creation_properties(&schema, &channel.config))?
            .with_default_title(ctx.thread.as_ref().map(|t| t.name.as_str()));

        let mut session = Session::new(ctx.user.id.clone(), CreationStage::AwaitingTextForm);
        let expired = OutgoingMessage::ephemeral(CREATION_EXPIRED);

        if !plan.text_fields.is_empty() {
            let message = OutgoingMessage::ephemeral("📝 Fill in the new card.").with_form(TextForm {
                id: TEXT_FORM.to_string(),
                title: "Create new card".to_string(),
                fields: plan.text_fields.clone(),
            });
            let handle = self.send(ctx, message).await?;
            session.arm(self.timeouts.creation_step());
            let values = self
                .next_submission(&mut session, &handle, TEXT_FORM, &expired)
                .await?;
            for field in &plan.text_fields {
                if let Some(value) = values.get(&field.name).map(|v| v.trim()).filter(|v| !v.is_empty()) {
                    session.collect(field.name.clone(), FieldValue::from(value));
                }
            }
        }

        if plan.has_choice_stage() {
            session.advance(CreationStage::AwaitingChoiceForm)?;
            let handle = self.send(ctx, choice_message(&plan)).await?;
            session.arm(self.timeouts.creation_step());
            loop {
                let interaction = self.await_response(&mut session, &handle, &expired).await?;
                match interaction.action {
                    InteractionAction::Pressed if interaction.control_id == CREATE_BUTTON => break,
                    InteractionAction::Selected(values) => {
                        let Some(name) = interaction.control_id.strip_prefix(CHOICE_PREFIX) else {
                            continue;
                        };
                        if !plan.choice_fields.iter().any(|f| f.name == name) {
                            continue;
                        }
                        match FieldValue::from_selection(values) {
                            Some(value) => session.collect(name, value),
                            None => {
                                session.take(name);
                            }
                        }
                    }
                    _ => {}
                }
            }
            self.edit(&handle, OutgoingMessage::ephemeral("⚙️ Creating card...")).await?;
        }

        session.advance(CreationStage::BuildingRecord)?;
        let record = match self
            .build_record(ctx, &channel, &schema, &title_property, &mut session)
            .await
        {
            Ok(record) => record,
            Err(err) => {
                session.advance(CreationStage::Failed)?;
                return Err(err);
            }
        };
        session.advance(CreationStage::Publishable)?;
        info!(record = %record.id, user = %ctx.user.id, "Card created");

        self.offer_publish(&mut session, ctx, &channel.config, &record).await
    }

    async fn build_record(
        &self,
        ctx: &CommandContext,
        channel: &ConfiguredChannel,
        schema: &[PropertyDescriptor],
        title_property: &str,
        session: &mut Session<CreationStage>,
    ) -> Result<Record, SessionError> {
        let config = &channel.config;

        let title = session
            .take(title_property)
            .and_then(|v| v.first().map(str::trim).filter(|t| !t.is_empty()).map(str::to_string))
            .unwrap_or_else(default_title);
        session.collect(title_property, FieldValue::Text(title));

        if let Some(property) = &config.individual_person_property {
            session.collect(property.clone(), FieldValue::Text(ctx.user.display_name.clone()));
        }

        let history = match &ctx.thread {
            Some(thread) => {
                if let Some(property) = &config.topic_link_property {
                    session.collect(property.clone(), FieldValue::Text(thread.permalink.clone()));
                }
                self.gateway
                    .thread_history(&thread.id, self.timeouts.history_limit)
                    .await?
            }
            None => Vec::new(),
        };

        let collective = config
            .collective_person_property
            .as_ref()
            .filter(|_| ctx.thread.is_some());
        let needs_people = collective.is_some()
            || session
                .collected()
                .keys()
                .any(|name| find_descriptor(schema, name).is_some_and(|d| d.kind == PropertyKind::People));
        let people = if needs_people {
            self.store.list_people().await?
        } else {
            PeopleDirectory::default()
        };

        if let Some(property) = collective {
            let mut ids = Vec::new();
            for name in participants(&history) {
                match people.resolve(name) {
                    Some(id) if !ids.iter().any(|known: &String| known == id) => ids.push(id.to_string()),
                    Some(_) => {}
                    None => warn!(participant = name, "Participant not found in the store"),
                }
            }
            session.collect(property.clone(), FieldValue::List(ids));
        }

        let summary = if config.ai_summary_enabled && !history.is_empty() {
            Some(self.summarizer.summarize(&history).await)
        } else {
            None
        };
        let content = build_content(summary.as_deref(), &history);

        let properties = encode_properties(schema, session.collected(), &people);
        Ok(self
            .store
            .create(&channel.collection_id, properties, &content)
            .await?)
    }

    /// Show the created card to its author with a single-use publish button.
    async fn offer_publish(
        &self,
        session: &mut Session<CreationStage>,
        ctx: &CommandContext,
        config: &ChannelConfig,
        record: &Record,
    ) -> Result<FlowOutcome, SessionError> {
        let card = format_record(record, &config.display_properties);
        let created = OutgoingMessage::ephemeral(format!("✅ Card '{}' created!", card.title))
            .with_card(card);
        let handle = self
            .send(
                ctx,
                created
                    .clone()
                    .with_button(PUBLISH_BUTTON, "📢 Show to everyone", ButtonStyle::Primary),
            )
            .await?;

        session.arm(self.timeouts.publish());
        match self
            .next_press(session, &handle, &[PUBLISH_BUTTON], &created)
            .await
        {
            Ok(_) => {}
            // the record exists; only the publish offer lapsed
            Err(SessionError::Timeout) => return Ok(FlowOutcome::Completed),
            Err(err) => return Err(err),
        }

        session.advance(CreationStage::Published)?;
        let mut published = created;
        published.text = "📢 Card published to the channel!".to_string();
        published.components = vec![Component::Button(
            ButtonControl::new(PUBLISH_BUTTON, "📢 Show to everyone", ButtonStyle::Primary)
                .disabled(true),
        )];
        self.edit(&handle, published).await?;
        self.publish_card(
            ctx,
            config,
            record,
            format!("📢 {} created a new card:", ctx.user.display_name),
        )
        .await?;
        Ok(FlowOutcome::Completed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::{Attachment, ChatUser, Interaction};
    use crate::testing::{channel_context, thread_context, Fixture, ScriptedGateway, OWNER};
    use threadcard_core::ConfigPatch;
    use threadcard_store::record_title;

    fn history_message(author: ChatUser, content: &str, attachments: Vec<Attachment>) -> HistoryMessage {
        HistoryMessage {
            author,
            content: content.to_string(),
            attachments,
        }
    }

    fn attachment(filename: &str, content_type: &str) -> Attachment {
        Attachment {
            url: format!("https://cdn.example/{filename}"),
            filename: filename.to_string(),
            content_type: content_type.to_string(),
        }
    }

    /// Newest first, as the platform returns it.
    fn thread_history() -> Vec<HistoryMessage> {
        vec![
            history_message(
                ChatUser::new("u-2", "Bruno Lima"),
                "here is a recording",
                vec![attachment("repro.mp4", "video/mp4")],
            ),
            history_message(ChatUser::bot("b-1", "Helper"), "beep", vec![]),
            history_message(ChatUser::new("u-3", "Carla"), "same here", vec![]),
            history_message(
                ChatUser::new("u-1", "Ana Souza"),
                "login is broken",
                vec![attachment("shot.png", "image/png")],
            ),
        ]
    }

    fn ids(record: &Record, property: &str) -> Vec<String> {
        record.properties[property]["people"]
            .as_array()
            .unwrap()
            .iter()
            .map(|p| p["id"].as_str().unwrap().to_string())
            .collect()
    }

    // =====================================================================
    // Pure helpers
    // =====================================================================

    #[test]
    fn test_creation_properties_skip_auto_filled() {
        let schema = threadcard_store::normalize_schema(&crate::testing::raw_schema());
        let config = ChannelConfig {
            create_properties: vec!["Thread".into(), "Status".into(), "Name".into()],
            topic_link_property: Some("Thread".into()),
            ..ChannelConfig::default()
        };
        let names: Vec<String> = creation_properties(&schema, &config)
            .into_iter()
            .map(|d| d.name)
            .collect();
        assert_eq!(names, vec!["Name", "Status"]);
    }

    #[test]
    fn test_participants_are_distinct_humans_oldest_first() {
        let mut history = thread_history();
        history.push(history_message(ChatUser::new("u-2", "Bruno Lima"), "first!", vec![]));
        assert_eq!(participants(&history), vec!["Bruno Lima", "Ana Souza", "Carla"]);
    }

    #[test]
    fn test_build_content_summary_and_media() {
        let content = build_content(Some("**Topic:**\n- login fails"), &thread_history());
        assert_eq!(content[0], ContentBlock::heading(2, "🤖 AI summary"));
        assert_eq!(content[1], ContentBlock::heading(3, "Topic:"));
        assert!(matches!(content[2], ContentBlock::BulletedItem(_)));
        assert_eq!(content[3], ContentBlock::Divider);
        assert_eq!(content[4], ContentBlock::heading(2, "📎 Thread attachments"));
        assert_eq!(
            content[5],
            ContentBlock::Image {
                url: "https://cdn.example/shot.png".to_string()
            }
        );
        let ContentBlock::Paragraph(runs) = &content[6] else {
            panic!("expected a linked paragraph");
        };
        assert_eq!(runs[0].text, "Video/GIF (repro.mp4): ");
        assert_eq!(runs[1].link.as_deref(), Some("https://cdn.example/repro.mp4"));
        assert_eq!(content.len(), 7);
    }

    #[test]
    fn test_build_content_skips_failed_summary() {
        let content = build_content(Some("Error: quota exceeded"), &thread_history());
        assert_eq!(content[0], ContentBlock::heading(2, "📎 Thread attachments"));
        assert!(!content.contains(&ContentBlock::Divider));

        assert!(build_content(Some(""), &[]).is_empty());
        assert!(build_content(None, &[]).is_empty());
    }

    #[test]
    fn test_default_title_shape() {
        let title = default_title();
        assert!(title.starts_with("Card created on "));
        assert_eq!(title.len(), "Card created on dd/mm".len());
    }

    // =====================================================================
    // Flow
    // =====================================================================

    #[tokio::test]
    async fn test_title_and_status_create_and_publish() {
        let fixture = Fixture::new(vec![
            Interaction::submitted(OWNER, TEXT_FORM, &[("Name", "Login bug")]),
            Interaction::selected(OWNER, "choice:Status", &["Doing"]),
            Interaction::pressed(OWNER, CREATE_BUTTON),
            Interaction::pressed(OWNER, PUBLISH_BUTTON),
        ]);
        fixture.configure(&["Name", "Status"], &["Status"]);

        let outcome = fixture.engine.run_creation(&channel_context()).await.unwrap();
        assert_eq!(outcome, FlowOutcome::Completed);

        let records = fixture.store.records_in(crate::testing::COLLECTION_ID);
        assert_eq!(records.len(), 1);
        assert_eq!(record_title(&records[0]), "Login bug");
        assert_eq!(records[0].properties["Status"]["status"]["name"], "Doing");

        let public = fixture.gateway.public_messages();
        assert_eq!(public.len(), 1);
        let card = public[0].card.as_ref().unwrap();
        assert_eq!(card.title, "Login bug");
        assert_eq!(card.field("Status"), Some("Doing"));
        assert_eq!(public[0].control_ids().len(), 2);
        assert!(fixture.gateway.saw("✅ Card 'Login bug' created!"));
    }

    #[tokio::test]
    async fn test_choice_form_offers_capped_single_and_multi_controls() {
        let fixture = Fixture::new(vec![]);
        fixture.configure(&["Status", "Tags"], &["Status"]);

        let err = fixture.engine.run_creation(&channel_context()).await.unwrap_err();
        assert!(matches!(err, SessionError::Timeout));

        let sent = fixture.gateway.sent();
        let controls: Vec<&ChoiceControl> = sent[0]
            .1
            .components
            .iter()
            .filter_map(|c| match c {
                Component::Choice(choice) => Some(choice),
                _ => None,
            })
            .collect();
        assert_eq!(controls.len(), 2);
        assert_eq!((controls[0].min_values, controls[0].max_values), (0, 1));
        assert_eq!((controls[1].min_values, controls[1].max_values), (0, 3));
        assert!(sent[0].1.button(CREATE_BUTTON).is_some());
        assert!(fixture.gateway.saw(CREATION_EXPIRED));
        assert_eq!(fixture.store.write_count(), 0);
    }

    #[tokio::test]
    async fn test_form_too_large_before_any_prompt() {
        let fixture = Fixture::new(vec![]);
        fixture.configure(
            &["Name", "Notes", "Owner", "Participants", "Thread", "Due"],
            &["Name"],
        );

        let err = fixture.engine.run_creation(&channel_context()).await.unwrap_err();
        assert!(matches!(err, SessionError::Form(_)));
        assert!(fixture.gateway.sent().is_empty());
        assert_eq!(fixture.store.write_count(), 0);
    }

    #[tokio::test]
    async fn test_thread_card_fills_computed_fields_and_content() {
        let gateway = ScriptedGateway::new(vec![Interaction::submitted(OWNER, TEXT_FORM, &[("Name", "  ")])])
            .with_history(thread_history());
        let fixture = Fixture::with_gateway(gateway, "**Topic:**\n- login fails");
        fixture.configure(&["Name"], &["Name"]);
        fixture.patch(
            ConfigPatch::new()
                .topic_link_property(Some("Thread"))
                .individual_person_property(Some("Owner"))
                .collective_person_property(Some("Participants"))
                .ai_summary_enabled(true),
        );

        // publish offer left to lapse
        let outcome = fixture.engine.run_creation(&thread_context()).await.unwrap();
        assert_eq!(outcome, FlowOutcome::Completed);
        assert!(fixture.gateway.public_messages().is_empty());

        let record = fixture.store.records_in(crate::testing::COLLECTION_ID).remove(0);
        assert!(record_title(&record).starts_with("Card created on "));
        assert_eq!(record.properties["Thread"]["url"], "https://discord.com/channels/g-1/t-1");
        assert_eq!(ids(&record, "Owner"), vec!["p-ana"]);
        // Carla has no store account and is dropped
        assert_eq!(ids(&record, "Participants"), vec!["p-ana", "p-bruno"]);

        let content = fixture.store.content_of(&record.id);
        assert_eq!(content[0], ContentBlock::heading(2, "🤖 AI summary"));
        assert!(content.contains(&ContentBlock::Divider));
        assert_eq!(content.len(), 7);
    }

    #[tokio::test]
    async fn test_summary_disabled_means_no_summary_section() {
        let gateway = ScriptedGateway::new(vec![Interaction::submitted(
            OWNER,
            TEXT_FORM,
            &[("Name", "Crash")],
        )])
        .with_history(thread_history());
        let fixture = Fixture::with_gateway(gateway, "**Topic:**\n- never used");
        fixture.configure(&["Name"], &["Name"]);

        fixture.engine.run_creation(&thread_context()).await.unwrap();
        let record = fixture.store.records_in(crate::testing::COLLECTION_ID).remove(0);
        let content = fixture.store.content_of(&record.id);
        assert_eq!(content[0], ContentBlock::heading(2, "📎 Thread attachments"));
    }

    #[tokio::test]
    async fn test_publish_is_one_shot() {
        let fixture = Fixture::new(vec![
            Interaction::submitted(OWNER, TEXT_FORM, &[("Name", "Once")]),
            Interaction::pressed(OWNER, PUBLISH_BUTTON),
            Interaction::pressed(OWNER, PUBLISH_BUTTON),
        ]);
        fixture.configure(&["Name"], &["Name"]);

        fixture.engine.run_creation(&channel_context()).await.unwrap();
        assert_eq!(fixture.gateway.public_messages().len(), 1);
        assert_eq!(fixture.gateway.unconsumed(), 1);

        let published = fixture.gateway.edits().pop().unwrap().1;
        assert!(published.button(PUBLISH_BUTTON).unwrap().disabled);
    }

    #[tokio::test]
    async fn test_publish_without_action_buttons() {
        let fixture = Fixture::new(vec![
            Interaction::submitted(OWNER, TEXT_FORM, &[("Name", "Quiet")]),
            Interaction::pressed(OWNER, PUBLISH_BUTTON),
        ]);
        fixture.configure(&["Name"], &["Name"]);
        fixture.patch(ConfigPatch::new().action_buttons_enabled(false));

        fixture.engine.run_creation(&channel_context()).await.unwrap();
        let public = fixture.gateway.public_messages();
        assert!(public[0].components.is_empty());
    }

    #[tokio::test]
    async fn test_unconfigured_channel() {
        let fixture = Fixture::new(vec![]);
        let err = fixture.engine.run_creation(&channel_context()).await.unwrap_err();
        assert!(matches!(err, SessionError::Validation(_)));
    }

    #[tokio::test]
    async fn test_foreign_user_cannot_submit() {
        let fixture = Fixture::new(vec![
            Interaction::submitted("intruder", TEXT_FORM, &[("Name", "Hijack")]),
            Interaction::submitted(OWNER, TEXT_FORM, &[("Name", "Mine")]),
        ]);
        fixture.configure(&["Name"], &["Name"]);

        fixture.engine.run_creation(&channel_context()).await.unwrap();
        let record = fixture.store.records_in(crate::testing::COLLECTION_ID).remove(0);
        assert_eq!(record_title(&record), "Mine");
        assert!(fixture.gateway.saw("You cannot interact with another person's menu."));
    }
}
