//! Records and query filters as exchanged with the store.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use threadcard_core::PropertyKind;

/// One item of a collection.
///
/// `properties` keeps the store's declaration order; the notification router
/// relies on it when scanning for a back-link.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub properties: Map<String, Value>,
    #[serde(default)]
    pub archived: bool,
}

impl Record {
    /// Kind of a property as reported by the record itself.
    pub fn property_kind(&self, name: &str) -> Option<PropertyKind> {
        self.properties
            .get(name)
            .and_then(|p| p.get("type"))
            .and_then(Value::as_str)
            .and_then(PropertyKind::from_store_type)
    }

    /// Name of the record's title property, if it has one.
    pub fn title_property(&self) -> Option<&str> {
        self.properties
            .iter()
            .find(|(_, p)| p.get("type").and_then(Value::as_str) == Some("title"))
            .map(|(name, _)| name.as_str())
    }
}

/// Comparison used by a [`RecordFilter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Contains,
    Equals,
}

/// A single-property query filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordFilter {
    pub property: String,
    pub kind: PropertyKind,
    pub op: FilterOp,
    /// The compared value. For people filters this is a resolved person id.
    pub value: String,
}

impl RecordFilter {
    /// Build the filter a search on `kind` uses: substring match for text-like
    /// kinds and multi-choice, equality for single choice, membership for people.
    ///
    /// Returns `None` for kinds that cannot be searched.
    pub fn for_kind(property: impl Into<String>, kind: PropertyKind, value: impl Into<String>) -> Option<Self> {
        let op = match kind {
            PropertyKind::Title
            | PropertyKind::Text
            | PropertyKind::Url
            | PropertyKind::MultiSelect
            | PropertyKind::People => FilterOp::Contains,
            PropertyKind::Select | PropertyKind::Status => FilterOp::Equals,
            PropertyKind::Date | PropertyKind::Number | PropertyKind::Other(_) => return None,
        };
        Some(Self {
            property: property.into(),
            kind,
            op,
            value: value.into(),
        })
    }

    /// Wire form of the filter, e.g. `{"property": "Status", "status": {"equals": "Done"}}`.
    pub fn to_wire(&self) -> Value {
        let op = match self.op {
            FilterOp::Contains => "contains",
            FilterOp::Equals => "equals",
        };
        let mut filter = Map::new();
        filter.insert("property".to_string(), Value::String(self.property.clone()));
        filter.insert(self.kind.store_type().to_string(), json!({ op: self.value }));
        Value::Object(filter)
    }
}
