//! Core types and value objects shared by every threadcard crate.
//!
//! Identifiers for the chat side (workspace, channel, user), the property
//! schema vocabulary of the record store, raw field values collected from
//! users, and the per-channel configuration record.

use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// Identifiers
// =============================================================================

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

string_id!(
    /// Chat workspace (server / guild) identifier.
    WorkspaceId
);
string_id!(
    /// Chat channel or thread identifier.
    ChannelId
);
string_id!(
    /// Chat user identifier.
    UserId
);

// =============================================================================
// Property schema
// =============================================================================

/// Store property types that are computed by the store itself and can never
/// be written or asked for.
pub const COMPUTED_KINDS: [&str; 6] = [
    "rollup",
    "formula",
    "created_by",
    "created_time",
    "last_edited_by",
    "last_edited_time",
];

/// Kind of a record-store property, as seen by the interaction layer.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PropertyKind {
    Title,
    Text,
    Url,
    Select,
    MultiSelect,
    Status,
    Date,
    People,
    Number,
    /// Any other writable store type. Kept in the schema, skipped by the codec.
    Other(String),
}

impl PropertyKind {
    /// Map a raw store type name to a kind.
    ///
    /// Returns `None` for computed kinds, which must never surface past the
    /// schema boundary.
    pub fn from_store_type(raw: &str) -> Option<Self> {
        if COMPUTED_KINDS.contains(&raw) {
            return None;
        }
        Some(match raw {
            "title" => PropertyKind::Title,
            "rich_text" => PropertyKind::Text,
            "url" => PropertyKind::Url,
            "select" => PropertyKind::Select,
            "multi_select" => PropertyKind::MultiSelect,
            "status" => PropertyKind::Status,
            "date" => PropertyKind::Date,
            "people" => PropertyKind::People,
            "number" => PropertyKind::Number,
            other => PropertyKind::Other(other.to_string()),
        })
    }

    /// The store's type name for this kind.
    pub fn store_type(&self) -> &str {
        match self {
            PropertyKind::Title => "title",
            PropertyKind::Text => "rich_text",
            PropertyKind::Url => "url",
            PropertyKind::Select => "select",
            PropertyKind::MultiSelect => "multi_select",
            PropertyKind::Status => "status",
            PropertyKind::Date => "date",
            PropertyKind::People => "people",
            PropertyKind::Number => "number",
            PropertyKind::Other(raw) => raw,
        }
    }

    /// Kinds rendered as choice controls instead of free-text inputs.
    pub fn is_choice(&self) -> bool {
        matches!(
            self,
            PropertyKind::Select | PropertyKind::MultiSelect | PropertyKind::Status
        )
    }
}

impl fmt::Display for PropertyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.store_type())
    }
}

/// A UI-ready description of one store property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyDescriptor {
    pub name: String,
    pub kind: PropertyKind,
    /// Option labels, in store order. Only present for choice kinds.
    pub options: Option<Vec<String>>,
}

impl PropertyDescriptor {
    pub fn new(name: impl Into<String>, kind: PropertyKind) -> Self {
        Self {
            name: name.into(),
            kind,
            options: None,
        }
    }

    pub fn with_options(mut self, options: Vec<String>) -> Self {
        self.options = Some(options);
        self
    }

    /// Option labels, empty when the property has none.
    pub fn option_labels(&self) -> &[String] {
        self.options.as_deref().unwrap_or(&[])
    }
}

// =============================================================================
// Field values
// =============================================================================

/// A raw value collected from a user (or computed) before encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Text(String),
    List(Vec<String>),
}

impl FieldValue {
    /// First scalar of the value: the text itself or element 0 of a list.
    pub fn first(&self) -> Option<&str> {
        match self {
            FieldValue::Text(text) => Some(text.as_str()),
            FieldValue::List(items) => items.first().map(String::as_str),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            FieldValue::Text(text) => text.is_empty(),
            FieldValue::List(items) => items.is_empty(),
        }
    }

    /// Normalize a multi-choice answer: one selection collapses to text.
    pub fn from_selection(mut values: Vec<String>) -> Option<Self> {
        match values.len() {
            0 => None,
            1 => values.pop().map(FieldValue::Text),
            _ => Some(FieldValue::List(values)),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

// =============================================================================
// Channel configuration
// =============================================================================

/// Per (workspace, channel) configuration as persisted by the channel store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    pub record_store_url: Option<String>,
    pub create_properties: Vec<String>,
    pub display_properties: Vec<String>,
    pub action_buttons_enabled: bool,
    pub topic_link_property: Option<String>,
    pub individual_person_property: Option<String>,
    pub collective_person_property: Option<String>,
    pub ai_summary_enabled: bool,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            record_store_url: None,
            create_properties: Vec::new(),
            display_properties: Vec::new(),
            action_buttons_enabled: true,
            topic_link_property: None,
            individual_person_property: None,
            collective_person_property: None,
            ai_summary_enabled: false,
        }
    }
}

impl ChannelConfig {
    /// Whether the channel has been pointed at a record collection.
    pub fn is_configured(&self) -> bool {
        self.record_store_url.is_some()
    }

    /// Properties filled by the engine itself during record creation.
    pub fn auto_filled_properties(&self) -> Vec<&str> {
        [
            self.topic_link_property.as_deref(),
            self.individual_person_property.as_deref(),
            self.collective_person_property.as_deref(),
        ]
        .into_iter()
        .flatten()
        .collect()
    }
}
