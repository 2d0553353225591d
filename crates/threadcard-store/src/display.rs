//! Rendering records as chat cards.

use crate::codec::decode_property;
use crate::record::Record;

/// Title used when a record has no title value.
pub const UNTITLED: &str = "Untitled card";

/// A record decoded for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordCard {
    pub title: String,
    pub url: String,
    /// `(property name, display value)` pairs in display order.
    pub fields: Vec<(String, String)>,
    pub description: Option<String>,
    pub footer: Option<String>,
}

impl RecordCard {
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_footer(mut self, footer: impl Into<String>) -> Self {
        self.footer = Some(footer.into());
        self
    }

    /// Plain-text rendering, used by transports without rich cards.
    pub fn to_plain_text(&self) -> String {
        let mut out = format!("{}\n{}", self.title, self.url);
        if let Some(description) = &self.description {
            out.push('\n');
            out.push_str(description);
        }
        for (name, value) in &self.fields {
            out.push_str(&format!("\n{}: {}", name, value));
        }
        if let Some(footer) = &self.footer {
            out.push('\n');
            out.push_str(footer);
        }
        out
    }

    /// Value shown for a field, if present.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Decoded value of the record's title property, empty when absent.
pub fn record_title(record: &Record) -> String {
    record
        .title_property()
        .map(|name| decode_property(&record.properties, name))
        .unwrap_or_default()
}

/// Decode `record` into a card showing `display_properties` in order.
///
/// Empty values are left out; the title property is shown as a regular field
/// when it is listed.
pub fn format_record(record: &Record, display_properties: &[String]) -> RecordCard {
    let title = record_title(record);
    let fields = display_properties
        .iter()
        .filter_map(|name| {
            let value = decode_property(&record.properties, name);
            (!value.is_empty()).then(|| (name.clone(), value))
        })
        .collect();

    RecordCard {
        title: if title.is_empty() {
            UNTITLED.to_string()
        } else {
            title
        },
        url: record.url.clone(),
        fields,
        description: None,
        footer: None,
    }
}
