//! Search over a channel's collection, and the record count.

use threadcard_core::{PropertyDescriptor, PropertyKind};
use threadcard_store::{interaction_schema, RecordFilter};
use tracing::info;

use crate::browse::BrowseActions;
use crate::engine::{FlowOutcome, SessionEngine};
use crate::error::SessionError;
use crate::form::TextField;
use crate::gateway::{ChoiceControl, CommandContext, OutgoingMessage, TextForm};
use crate::session::Session;
use crate::stages::SearchStage;

const PROPERTY_SELECT: &str = "search-property";
const OPTION_SELECT: &str = "search-option";
const TERM_FORM: &str = "search-term";
const TERM_FIELD: &str = "term";

const SEARCH_EXPIRED: &str = "⌛ Search cancelled: time is up.";

/// Display properties that can be filtered on, in schema order.
pub fn searchable_properties(
    schema: &[PropertyDescriptor],
    display_properties: &[String],
) -> Vec<PropertyDescriptor> {
    schema
        .iter()
        .filter(|d| display_properties.contains(&d.name))
        .filter(|d| RecordFilter::for_kind(d.name.clone(), d.kind.clone(), "").is_some())
        .cloned()
        .collect()
}

impl SessionEngine {
    /// Pick a property and a term, then page through the matches.
    pub async fn run_search(&self, ctx: &CommandContext) -> Result<FlowOutcome, SessionError> {
        let channel = self.require_config(ctx)?;
        if channel.config.display_properties.is_empty() {
            return Err(SessionError::Validation(
                "No search properties are configured. Run `config` to choose them.".to_string(),
            ));
        }
        let schema = interaction_schema(self.store.as_ref(), &channel.store_url).await?;
        let searchable = searchable_properties(&schema, &channel.config.display_properties);
        if searchable.is_empty() {
            return Err(SessionError::Validation(
                "None of the configured properties can be searched.".to_string(),
            ));
        }
        let names: Vec<String> = searchable.iter().map(|d| d.name.clone()).collect();

        let mut session = Session::new(ctx.user.id.clone(), SearchStage::PickProperty);
        let expired = OutgoingMessage::ephemeral(SEARCH_EXPIRED);
        let handle = self
            .send(
                ctx,
                OutgoingMessage::ephemeral("🔎 Which property do you want to search by?")
                    .with_choice(ChoiceControl::single(PROPERTY_SELECT, "Property", &names)),
            )
            .await?;
        session.arm(self.timeouts.search_step());
        let descriptor = loop {
            let selected = self
                .next_selection(&mut session, &handle, PROPERTY_SELECT, &expired)
                .await?;
            if let Some(descriptor) = selected
                .first()
                .and_then(|name| searchable.iter().find(|d| &d.name == name))
            {
                break descriptor;
            }
        };

        let term = if descriptor.kind.is_choice() {
            session.advance(SearchStage::PickOption)?;
            self.edit(
                &handle,
                OutgoingMessage::ephemeral(format!("➡️ Pick a value for **{}**:", descriptor.name))
                    .with_choice(ChoiceControl::single(
                        OPTION_SELECT,
                        "Value",
                        descriptor.option_labels(),
                    )),
            )
            .await?;
            session.arm(self.timeouts.search_step());
            self.next_selection(&mut session, &handle, OPTION_SELECT, &expired)
                .await?
                .into_iter()
                .next()
        } else {
            session.advance(SearchStage::EnterTerm)?;
            let form = TextForm {
                id: TERM_FORM.to_string(),
                title: format!("Search by '{}'", descriptor.name),
                fields: vec![TextField {
                    name: TERM_FIELD.to_string(),
                    kind: descriptor.kind.clone(),
                    required: true,
                    multiline: false,
                    default: None,
                }],
            };
            self.edit(
                &handle,
                OutgoingMessage::ephemeral(format!("✍️ Type what to look for in **{}**.", descriptor.name))
                    .with_form(form),
            )
            .await?;
            session.arm(self.timeouts.search_step());
            self.next_submission(&mut session, &handle, TERM_FORM, &expired)
                .await?
                .remove(TERM_FIELD)
                .map(|term| term.trim().to_string())
                .filter(|term| !term.is_empty())
        };
        let Some(term) = term else {
            return Err(SessionError::Validation("A search term is required.".to_string()));
        };

        session.advance(SearchStage::Querying)?;
        self.edit(&handle, OutgoingMessage::ephemeral(format!("🔎 Searching for '{}'...", term)))
            .await?;
        let records = match self.filter_for(descriptor, &term).await? {
            Some(filter) => {
                self.store
                    .query(&channel.collection_id, Some(&filter))
                    .await?
            }
            None => Vec::new(),
        };
        session.advance(SearchStage::Done)?;
        info!(property = %descriptor.name, results = records.len(), "Search finished");

        if records.is_empty() {
            self.edit(&handle, OutgoingMessage::ephemeral(format!("❌ No results for '{}'.", term)))
                .await?;
            return Ok(FlowOutcome::Completed);
        }
        self.edit(
            &handle,
            OutgoingMessage::ephemeral(format!("✅ {} result(s) found for '{}'.", records.len(), term)),
        )
        .await?;
        self.run_browse(ctx, &channel.config, records, BrowseActions::all())
            .await
    }

    /// Filter for `term`; people terms are resolved to a store id first.
    /// `None` when a person term matches nobody.
    async fn filter_for(
        &self,
        descriptor: &PropertyDescriptor,
        term: &str,
    ) -> Result<Option<RecordFilter>, SessionError> {
        let value = if descriptor.kind == PropertyKind::People {
            let people = self.store.list_people().await?;
            match people.resolve(term) {
                Some(id) => id.to_string(),
                None => return Ok(None),
            }
        } else {
            term.to_string()
        };
        Ok(RecordFilter::for_kind(
            descriptor.name.clone(),
            descriptor.kind.clone(),
            value,
        ))
    }

    /// Post the number of live records in the channel's collection.
    pub async fn run_count(&self, ctx: &CommandContext) -> Result<FlowOutcome, SessionError> {
        let channel = self.require_config(ctx)?;
        let records = self.store.query(&channel.collection_id, None).await?;
        self.send(
            ctx,
            OutgoingMessage::public(format!(
                "📊 This channel's collection holds **{}** cards.",
                records.len()
            )),
        )
        .await?;
        Ok(FlowOutcome::Completed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::Interaction;
    use crate::testing::{channel_context, sample_record, Fixture, COLLECTION_ID, OWNER};
    use serde_json::json;
    use threadcard_store::Record;

    fn seeded(script: Vec<Interaction>) -> Fixture {
        let fixture = Fixture::new(script);
        fixture.configure(&["Name"], &["Name", "Status", "Tags", "Owner", "Due"]);
        fixture
            .store
            .insert_record(COLLECTION_ID, sample_record("r-1", "Login bug", "Todo"));
        fixture
            .store
            .insert_record(COLLECTION_ID, sample_record("r-2", "Logout bug", "Done"));
        fixture
            .store
            .insert_record(COLLECTION_ID, sample_record("r-3", "Dark mode", "Todo"));
        fixture
    }

    fn footers(fixture: &Fixture) -> Vec<String> {
        fixture
            .gateway
            .sent()
            .into_iter()
            .filter_map(|(_, m)| m.card.and_then(|c| c.footer))
            .collect()
    }

    #[test]
    fn test_searchable_excludes_dates() {
        let schema = threadcard_store::normalize_schema(&crate::testing::raw_schema());
        let display: Vec<String> = ["Due", "Status", "Name"].iter().map(|s| s.to_string()).collect();
        let names: Vec<String> = searchable_properties(&schema, &display)
            .into_iter()
            .map(|d| d.name)
            .collect();
        assert_eq!(names, vec!["Name", "Status"]);
    }

    #[tokio::test]
    async fn test_search_by_status_option() {
        let fixture = seeded(vec![
            Interaction::selected(OWNER, PROPERTY_SELECT, &["Status"]),
            Interaction::selected(OWNER, OPTION_SELECT, &["Todo"]),
        ]);

        let _ = fixture.engine.run_search(&channel_context()).await;
        assert!(fixture.gateway.saw("2 result(s) found for 'Todo'."));
        assert_eq!(footers(&fixture), vec!["Card 1 of 2"]);
    }

    #[tokio::test]
    async fn test_search_title_contains_case_insensitive() {
        let fixture = seeded(vec![
            Interaction::selected(OWNER, PROPERTY_SELECT, &["Name"]),
            Interaction::submitted(OWNER, TERM_FORM, &[(TERM_FIELD, "BUG")]),
        ]);

        let _ = fixture.engine.run_search(&channel_context()).await;
        assert!(fixture.gateway.saw("2 result(s) found for 'BUG'."));
    }

    #[tokio::test]
    async fn test_search_no_results() {
        let fixture = seeded(vec![
            Interaction::selected(OWNER, PROPERTY_SELECT, &["Name"]),
            Interaction::submitted(OWNER, TERM_FORM, &[(TERM_FIELD, "payments")]),
        ]);

        let outcome = fixture.engine.run_search(&channel_context()).await.unwrap();
        assert_eq!(outcome, FlowOutcome::Completed);
        assert!(fixture.gateway.saw("❌ No results for 'payments'."));
        assert!(footers(&fixture).is_empty());
    }

    #[tokio::test]
    async fn test_search_people_by_name() {
        let fixture = seeded(vec![
            Interaction::selected(OWNER, PROPERTY_SELECT, &["Owner"]),
            Interaction::submitted(OWNER, TERM_FORM, &[(TERM_FIELD, "ana")]),
        ]);
        let owned: Record = serde_json::from_value(json!({
            "id": "r-4",
            "url": "https://store.local/r-4",
            "properties": {
                "Name": {"type": "title", "title": [{"plain_text": "Owned"}]},
                "Owner": {"type": "people", "people": [{"id": "p-ana", "name": "Ana Souza"}]}
            }
        }))
        .unwrap();
        fixture.store.insert_record(COLLECTION_ID, owned);

        let _ = fixture.engine.run_search(&channel_context()).await;
        assert!(fixture.gateway.saw("1 result(s) found for 'ana'."));
    }

    #[tokio::test]
    async fn test_search_unknown_person_is_empty() {
        let fixture = seeded(vec![
            Interaction::selected(OWNER, PROPERTY_SELECT, &["Owner"]),
            Interaction::submitted(OWNER, TERM_FORM, &[(TERM_FIELD, "zelda")]),
        ]);
        fixture.engine.run_search(&channel_context()).await.unwrap();
        assert!(fixture.gateway.saw("No results for 'zelda'."));
    }

    #[tokio::test]
    async fn test_search_requires_display_properties() {
        let fixture = Fixture::new(vec![]);
        fixture.configure(&["Name"], &[]);
        let err = fixture.engine.run_search(&channel_context()).await.unwrap_err();
        assert!(matches!(err, SessionError::Validation(_)));
    }

    #[tokio::test]
    async fn test_count_is_public() {
        let fixture = seeded(vec![]);
        fixture.engine.run_count(&channel_context()).await.unwrap();
        let public = fixture.gateway.public_messages();
        assert_eq!(public.len(), 1);
        assert_eq!(public[0].text, "📊 This channel's collection holds **3** cards.");
    }

    #[tokio::test]
    async fn test_count_store_unavailable() {
        let fixture = seeded(vec![]);
        fixture.store.set_unavailable(true);
        let err = fixture.engine.run_count(&channel_context()).await.unwrap_err();
        assert!(matches!(err, SessionError::Store(_)));
    }
}
