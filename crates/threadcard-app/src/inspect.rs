//! `inspect`: show what threadcard makes of a collection.

use thiserror::Error;
use threadcard_core::PropertyDescriptor;
use threadcard_session::{compose_form, FormError};
use threadcard_store::{interaction_schema, RecordStore, StoreError};

#[derive(Debug, Error)]
pub enum InspectError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Form(#[from] FormError),
    #[error("unknown properties: {0}")]
    UnknownProperties(String),
}

/// Render the normalized schema, and the form plan when `create` names
/// properties.
pub async fn inspect(
    store: &dyn RecordStore,
    url: &str,
    create: &[String],
) -> Result<String, InspectError> {
    let schema = interaction_schema(store, url).await?;
    let mut out = String::from("Properties:\n");
    for descriptor in &schema {
        out.push_str(&format!("  {} ({})", descriptor.name, descriptor.kind));
        if !descriptor.option_labels().is_empty() {
            out.push_str(&format!(": {}", descriptor.option_labels().join(", ")));
        }
        out.push('\n');
    }
    if create.is_empty() {
        return Ok(out);
    }

    let unknown: Vec<&str> = create
        .iter()
        .filter(|name| !schema.iter().any(|d| &d.name == *name))
        .map(String::as_str)
        .collect();
    if !unknown.is_empty() {
        return Err(InspectError::UnknownProperties(unknown.join(", ")));
    }
    let selected: Vec<PropertyDescriptor> = schema
        .into_iter()
        .filter(|d| create.contains(&d.name))
        .collect();
    let plan = compose_form(&selected)?;

    out.push_str("Text form:\n");
    for field in &plan.text_fields {
        let mut flags = Vec::new();
        if field.required {
            flags.push("required");
        }
        if field.multiline {
            flags.push("multi-line");
        }
        out.push_str(&format!("  {} ({})", field.name, field.kind));
        if !flags.is_empty() {
            out.push_str(&format!(" [{}]", flags.join(", ")));
        }
        out.push('\n');
    }
    out.push_str("Choice form:\n");
    for field in &plan.choice_fields {
        out.push_str(&format!(
            "  {} ({}, {} options{})\n",
            field.name,
            field.kind,
            field.options.len(),
            if field.multi { ", multi" } else { "" }
        ));
    }
    Ok(out)
}
