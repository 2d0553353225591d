//! Schema Adapter: raw collection schema to UI-ready property descriptors.

use regex::Regex;
use serde_json::{Map, Value};
use std::sync::LazyLock;
use threadcard_core::{PropertyDescriptor, PropertyKind};
use tracing::debug;

use crate::client::RecordStore;
use crate::error::StoreError;

static COLLECTION_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[a-f0-9]{32}").expect("Invalid collection id regex"));

/// Extract the 32-character hexadecimal collection id embedded in a store URL.
pub fn extract_collection_id(url: &str) -> Result<String, StoreError> {
    COLLECTION_ID
        .find(url)
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| StoreError::InvalidUrl(url.to_string()))
}

/// Normalize a raw schema (property name to property object) into descriptors.
///
/// Computed kinds are dropped, choice kinds get their option labels, and the
/// title descriptor, if any, moves to the front. Other descriptors keep
/// their source order.
pub fn normalize_schema(raw: &Map<String, Value>) -> Vec<PropertyDescriptor> {
    let mut title = None;
    let mut rest = Vec::new();

    for (name, property) in raw {
        let raw_kind = property.get("type").and_then(Value::as_str).unwrap_or("");
        let Some(kind) = PropertyKind::from_store_type(raw_kind) else {
            debug!(property = %name, kind = raw_kind, "Skipping computed property");
            continue;
        };

        let mut descriptor = PropertyDescriptor::new(name.clone(), kind.clone());
        if kind.is_choice() {
            descriptor = descriptor.with_options(option_labels(property, kind.store_type()));
        }

        if kind == PropertyKind::Title && title.is_none() {
            title = Some(descriptor);
        } else if kind != PropertyKind::Title {
            rest.push(descriptor);
        }
    }

    if let Some(title) = title {
        rest.insert(0, title);
    }
    rest
}

fn option_labels(property: &Value, key: &str) -> Vec<String> {
    property
        .get(key)
        .and_then(|p| p.get("options"))
        .and_then(Value::as_array)
        .map(|options| {
            options
                .iter()
                .filter_map(|o| o.get("name").and_then(Value::as_str))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Fetch and normalize the schema of the collection behind `store_url`.
pub async fn interaction_schema(
    store: &dyn RecordStore,
    store_url: &str,
) -> Result<Vec<PropertyDescriptor>, StoreError> {
    let collection_id = extract_collection_id(store_url)?;
    let raw = store.retrieve_schema(&collection_id).await?;
    Ok(normalize_schema(&raw))
}

/// Find a descriptor by property name.
pub fn find_descriptor<'a>(
    schema: &'a [PropertyDescriptor],
    name: &str,
) -> Option<&'a PropertyDescriptor> {
    schema.iter().find(|d| d.name == name)
}
