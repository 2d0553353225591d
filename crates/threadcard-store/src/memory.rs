//! In-process record store.
//!
//! Behaves like the REST store closely enough to drive every flow: records
//! come back tagged with their property types, written rich text gets a
//! `plain_text`, people entries get names, and archived records drop out of
//! queries. Used by tests across the workspace and by `inspect` dry runs.

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use threadcard_core::PropertyKind;

use crate::blocks::ContentBlock;
use crate::client::RecordStore;
use crate::codec::from_wire_value;
use crate::error::StoreError;
use crate::people::{PeopleDirectory, Person};
use crate::record::{FilterOp, Record, RecordFilter};

#[derive(Default)]
struct Collection {
    schema: Map<String, Value>,
    record_ids: Vec<String>,
}

#[derive(Default)]
struct State {
    collections: HashMap<String, Collection>,
    records: HashMap<String, Record>,
    content: HashMap<String, Vec<ContentBlock>>,
    people: Vec<Person>,
    unavailable: bool,
    people_unavailable: bool,
    writes: usize,
}

/// A [`RecordStore`] kept entirely in memory.
#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<State>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>, StoreError> {
        self.state
            .lock()
            .map_err(|e| StoreError::Unavailable(format!("Lock poisoned: {}", e)))
    }

    fn lock_available(&self) -> Result<MutexGuard<'_, State>, StoreError> {
        let state = self.lock()?;
        if state.unavailable {
            return Err(StoreError::Unavailable("store is offline".to_string()));
        }
        Ok(state)
    }

    /// Register a collection with its raw schema.
    pub fn add_collection(&self, collection_id: &str, schema: Map<String, Value>) {
        if let Ok(mut state) = self.lock() {
            state.collections.insert(
                collection_id.to_string(),
                Collection {
                    schema,
                    record_ids: Vec::new(),
                },
            );
        }
    }

    pub fn add_person(&self, person: Person) {
        if let Ok(mut state) = self.lock() {
            state.people.push(person);
        }
    }

    /// Insert a record as-is, e.g. one carrying a back-link.
    pub fn insert_record(&self, collection_id: &str, record: Record) {
        if let Ok(mut state) = self.lock() {
            if let Some(collection) = state.collections.get_mut(collection_id) {
                collection.record_ids.push(record.id.clone());
            }
            state.records.insert(record.id.clone(), record);
        }
    }

    /// Make every subsequent call fail as unavailable (or recover).
    pub fn set_unavailable(&self, unavailable: bool) {
        if let Ok(mut state) = self.lock() {
            state.unavailable = unavailable;
        }
    }

    /// Make only the people directory fail as unavailable (or recover).
    pub fn set_people_unavailable(&self, unavailable: bool) {
        if let Ok(mut state) = self.lock() {
            state.people_unavailable = unavailable;
        }
    }

    /// Number of successful create, update and archive calls so far.
    pub fn write_count(&self) -> usize {
        self.lock().map(|s| s.writes).unwrap_or_default()
    }

    pub fn record(&self, record_id: &str) -> Option<Record> {
        self.lock().ok()?.records.get(record_id).cloned()
    }

    /// Body content a record was created with.
    pub fn content_of(&self, record_id: &str) -> Vec<ContentBlock> {
        self.lock()
            .ok()
            .and_then(|s| s.content.get(record_id).cloned())
            .unwrap_or_default()
    }

    /// Live (non-archived) records of a collection.
    pub fn records_in(&self, collection_id: &str) -> Vec<Record> {
        let Ok(state) = self.lock() else {
            return Vec::new();
        };
        live_records(&state, collection_id)
    }
}

fn live_records(state: &State, collection_id: &str) -> Vec<Record> {
    state
        .collections
        .get(collection_id)
        .map(|c| {
            c.record_ids
                .iter()
                .filter_map(|id| state.records.get(id))
                .filter(|r| !r.archived)
                .cloned()
                .collect()
        })
        .unwrap_or_default()
}

/// Give written properties the shape the store echoes back.
fn echo_properties(
    schema: Option<&Map<String, Value>>,
    existing: Option<&Map<String, Value>>,
    written: Map<String, Value>,
    people: &[Person],
) -> Map<String, Value> {
    let mut out = Map::new();
    for (name, mut property) in written {
        let kind = schema
            .and_then(|s| s.get(&name))
            .or_else(|| existing.and_then(|e| e.get(&name)))
            .and_then(|p| p.get("type"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .or_else(|| first_key(&property));
        let Some(kind) = kind else {
            continue;
        };

        if let Some(runs) = property.get_mut(&kind).and_then(Value::as_array_mut) {
            for run in runs.iter_mut() {
                let text = run
                    .get("text")
                    .and_then(|t| t.get("content"))
                    .and_then(Value::as_str)
                    .map(str::to_string);
                match (kind.as_str(), text) {
                    ("title" | "rich_text", Some(text)) => run["plain_text"] = Value::String(text),
                    ("people", _) => {
                        let name = run
                            .get("id")
                            .and_then(Value::as_str)
                            .and_then(|id| people.iter().find(|p| p.id == id))
                            .and_then(|p| p.name.clone());
                        if let Some(name) = name {
                            run["name"] = Value::String(name);
                        }
                    }
                    _ => {}
                }
            }
        }
        property["type"] = Value::String(kind);
        out.insert(name, property);
    }
    out
}

fn first_key(property: &Value) -> Option<String> {
    property.as_object()?.keys().next().cloned()
}

fn matches_filter(record: &Record, filter: &RecordFilter) -> bool {
    let Some(property) = record.properties.get(&filter.property) else {
        return false;
    };
    if filter.kind == PropertyKind::People {
        return property
            .get("people")
            .and_then(Value::as_array)
            .is_some_and(|people| {
                people
                    .iter()
                    .any(|p| p.get("id").and_then(Value::as_str) == Some(filter.value.as_str()))
            });
    }

    let shown = from_wire_value(&filter.kind, property);
    match filter.op {
        FilterOp::Equals => shown == filter.value,
        FilterOp::Contains if filter.kind == PropertyKind::MultiSelect => {
            shown.split(", ").any(|tag| tag == filter.value)
        }
        FilterOp::Contains => shown.to_lowercase().contains(&filter.value.to_lowercase()),
    }
}

#[async_trait]
impl RecordStore for InMemoryStore {
    async fn query(
        &self,
        collection_id: &str,
        filter: Option<&RecordFilter>,
    ) -> Result<Vec<Record>, StoreError> {
        let state = self.lock_available()?;
        if !state.collections.contains_key(collection_id) {
            return Err(StoreError::Unavailable(format!(
                "unknown collection {}",
                collection_id
            )));
        }
        Ok(live_records(&state, collection_id)
            .into_iter()
            .filter(|r| filter.map_or(true, |f| matches_filter(r, f)))
            .collect())
    }

    async fn retrieve_schema(&self, collection_id: &str) -> Result<Map<String, Value>, StoreError> {
        let state = self.lock_available()?;
        state
            .collections
            .get(collection_id)
            .map(|c| c.schema.clone())
            .ok_or_else(|| StoreError::Unavailable(format!("unknown collection {}", collection_id)))
    }

    async fn create(
        &self,
        collection_id: &str,
        properties: Map<String, Value>,
        content: &[ContentBlock],
    ) -> Result<Record, StoreError> {
        let mut state = self.lock_available()?;
        let Some(collection) = state.collections.get(collection_id) else {
            return Err(StoreError::Unavailable(format!(
                "unknown collection {}",
                collection_id
            )));
        };

        let id = uuid::Uuid::new_v4().simple().to_string();
        let properties = echo_properties(Some(&collection.schema), None, properties, &state.people);
        let record = Record {
            url: format!("https://store.local/{}", id),
            id: id.clone(),
            properties,
            archived: false,
        };

        if let Some(collection) = state.collections.get_mut(collection_id) {
            collection.record_ids.push(id.clone());
        }
        state.records.insert(id.clone(), record.clone());
        state.content.insert(id, content.to_vec());
        state.writes += 1;
        Ok(record)
    }

    async fn update(
        &self,
        record_id: &str,
        properties: Map<String, Value>,
    ) -> Result<Record, StoreError> {
        let mut state = self.lock_available()?;
        let existing = state
            .records
            .get(record_id)
            .ok_or_else(|| StoreError::NotFound(record_id.to_string()))?;
        let echoed = echo_properties(None, Some(&existing.properties), properties, &state.people);

        let record = state
            .records
            .get_mut(record_id)
            .ok_or_else(|| StoreError::NotFound(record_id.to_string()))?;
        for (name, property) in echoed {
            record.properties.insert(name, property);
        }
        let updated = record.clone();
        state.writes += 1;
        Ok(updated)
    }

    async fn archive(&self, record_id: &str) -> Result<Record, StoreError> {
        let mut state = self.lock_available()?;
        let record = state
            .records
            .get_mut(record_id)
            .ok_or_else(|| StoreError::NotFound(record_id.to_string()))?;
        record.archived = true;
        let archived = record.clone();
        state.writes += 1;
        Ok(archived)
    }

    async fn retrieve(&self, record_id: &str) -> Result<Record, StoreError> {
        let state = self.lock_available()?;
        state
            .records
            .get(record_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(record_id.to_string()))
    }

    async fn list_people(&self) -> Result<PeopleDirectory, StoreError> {
        let state = self.lock_available()?;
        if state.people_unavailable {
            return Err(StoreError::Unavailable("people directory is offline".to_string()));
        }
        Ok(PeopleDirectory::new(state.people.clone()))
    }
}
