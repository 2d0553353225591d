//! Record Codec: typed field values to and from the store's wire form.
//!
//! Encoding fails closed: a value that cannot be represented for its kind
//! yields `None` and the field is left out of the payload. Decoding is total
//! and yields an empty string for anything missing or malformed.

use chrono::NaiveDate;
use regex::Regex;
use serde_json::{json, Map, Number, Value};
use std::collections::BTreeMap;
use std::sync::LazyLock;
use threadcard_core::{FieldValue, PropertyDescriptor, PropertyKind};
use tracing::{debug, warn};

use crate::blocks::{parse_rich_text, rich_text_wire};
use crate::people::PeopleDirectory;

/// Accepted date inputs, tried in order. Each shape guard keeps a two-digit
/// year from being read by a four-digit format.
static DATE_FORMATS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    [
        (r"^\d{1,2}/\d{1,2}/\d{4}$", "%d/%m/%Y"),
        (r"^\d{1,2}-\d{1,2}-\d{4}$", "%d-%m-%Y"),
        (r"^\d{1,2}/\d{1,2}/\d{2}$", "%d/%m/%y"),
        (r"^\d{1,2}-\d{1,2}-\d{2}$", "%d-%m-%y"),
        (r"^\d{4}-\d{1,2}-\d{1,2}$", "%Y-%m-%d"),
    ]
    .into_iter()
    .map(|(shape, format)| (Regex::new(shape).expect("Invalid date shape regex"), format))
    .collect()
});

/// Label shown for a person entry that carries no name.
pub const UNKNOWN_PERSON: &str = "Unknown user";

/// Parse a user-typed date. The first accepted format wins.
pub fn parse_date(input: &str) -> Option<NaiveDate> {
    let input = input.trim();
    DATE_FORMATS
        .iter()
        .filter(|(shape, _)| shape.is_match(input))
        .find_map(|(_, format)| NaiveDate::parse_from_str(input, format).ok())
}

/// Encode one value for `kind`. Returns the property object, e.g.
/// `{"status": {"name": "Done"}}`, or `None` when the value is dropped.
pub fn to_store_value(
    kind: &PropertyKind,
    value: &FieldValue,
    people: &PeopleDirectory,
) -> Option<Value> {
    match kind {
        PropertyKind::Title => Some(json!({ "title": rich_text_wire(&parse_rich_text(&joined(value))) })),
        PropertyKind::Text => {
            Some(json!({ "rich_text": rich_text_wire(&parse_rich_text(&joined(value))) }))
        }
        PropertyKind::Url => Some(json!({ "url": joined(value) })),
        PropertyKind::Select | PropertyKind::Status => {
            let name = value.first().filter(|name| !name.is_empty())?;
            Some(json!({ kind.store_type(): { "name": name } }))
        }
        PropertyKind::MultiSelect => {
            let names: Vec<Value> = match value {
                FieldValue::List(items) => items
                    .iter()
                    .map(|item| item.trim())
                    .filter(|item| !item.is_empty())
                    .map(|item| json!({ "name": item }))
                    .collect(),
                FieldValue::Text(text) => text
                    .split(',')
                    .map(str::trim)
                    .filter(|tag| !tag.is_empty())
                    .map(|tag| json!({ "name": tag }))
                    .collect(),
            };
            Some(json!({ "multi_select": names }))
        }
        PropertyKind::Date => {
            let raw = value.first().unwrap_or_default();
            match parse_date(raw) {
                Some(date) => Some(json!({ "date": { "start": date.format("%Y-%m-%d").to_string() } })),
                None => {
                    debug!(input = raw, "Unparseable date, field omitted");
                    None
                }
            }
        }
        PropertyKind::People => match value {
            FieldValue::List(ids) => Some(json!({
                "people": ids.iter().map(|id| json!({ "id": id })).collect::<Vec<_>>()
            })),
            FieldValue::Text(term) => match people.resolve(term) {
                Some(id) => Some(json!({ "people": [{ "id": id }] })),
                None => {
                    debug!(term = %term, "No person matched, field omitted");
                    None
                }
            },
        },
        PropertyKind::Number => {
            let raw = value.first().unwrap_or_default().trim();
            let number = raw
                .parse::<i64>()
                .map(Number::from)
                .ok()
                .or_else(|| raw.parse::<f64>().ok().and_then(Number::from_f64))?;
            Some(json!({ "number": number }))
        }
        PropertyKind::Other(raw) => {
            warn!(kind = %raw, "Unsupported property kind, field omitted");
            None
        }
    }
}

fn joined(value: &FieldValue) -> String {
    match value {
        FieldValue::Text(text) => text.clone(),
        FieldValue::List(items) => items.join(", "),
    }
}

/// Decode a property object into its display string.
pub fn from_wire_value(kind: &PropertyKind, property: &Value) -> String {
    let body = property.get(kind.store_type());
    match kind {
        PropertyKind::Title | PropertyKind::Text => body
            .and_then(Value::as_array)
            .map(|runs| runs.iter().map(run_text).collect())
            .unwrap_or_default(),
        PropertyKind::Url => body.and_then(Value::as_str).unwrap_or_default().to_string(),
        PropertyKind::Select | PropertyKind::Status => body
            .and_then(|b| b.get("name"))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        PropertyKind::MultiSelect => join_names(body, ""),
        PropertyKind::People => join_names(body, UNKNOWN_PERSON),
        PropertyKind::Date => body
            .and_then(|b| b.get("start"))
            .and_then(Value::as_str)
            .and_then(|start| start.get(..10))
            .and_then(|day| NaiveDate::parse_from_str(day, "%Y-%m-%d").ok())
            .map(|date| date.format("%d/%m/%Y").to_string())
            .unwrap_or_default(),
        PropertyKind::Number => match body {
            Some(Value::Number(n)) => n.to_string(),
            _ => String::new(),
        },
        PropertyKind::Other(_) => String::new(),
    }
}

/// Plain text of one rich-text run. Freshly written runs may lack `plain_text`.
fn run_text(run: &Value) -> &str {
    run.get("plain_text")
        .and_then(Value::as_str)
        .or_else(|| run.get("text").and_then(|t| t.get("content")).and_then(Value::as_str))
        .unwrap_or_default()
}

fn join_names(body: Option<&Value>, fallback: &str) -> String {
    body.and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .map(|item| item.get("name").and_then(Value::as_str).unwrap_or(fallback))
                .collect::<Vec<_>>()
                .join(", ")
        })
        .unwrap_or_default()
}

/// Decode one named property of a record, using the kind the record reports.
pub fn decode_property(properties: &Map<String, Value>, name: &str) -> String {
    let Some(property) = properties.get(name) else {
        return String::new();
    };
    property
        .get("type")
        .and_then(Value::as_str)
        .and_then(PropertyKind::from_store_type)
        .map(|kind| from_wire_value(&kind, property))
        .unwrap_or_default()
}

/// Encode a set of collected values against a schema.
///
/// Values whose property is not in the schema, or that fail to encode, are
/// skipped with a log line. Output follows the iteration order of `values`.
pub fn encode_properties(
    schema: &[PropertyDescriptor],
    values: &BTreeMap<String, FieldValue>,
    people: &PeopleDirectory,
) -> Map<String, Value> {
    let mut encoded = Map::new();
    for (name, value) in values {
        let Some(descriptor) = schema.iter().find(|d| &d.name == name) else {
            warn!(property = %name, "Property not found in schema, skipped");
            continue;
        };
        if let Some(wire) = to_store_value(&descriptor.kind, value, people) {
            encoded.insert(name.clone(), wire);
        }
    }
    encoded
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::people::Person;

    fn people() -> PeopleDirectory {
        PeopleDirectory::new(vec![
            Person::new("u-1", "Ana Souza").with_email("ana@example.com"),
            Person::new("u-2", "Bruno Lima"),
        ])
    }

    /// Encode and tag the result with its type, as the store echoes it back.
    fn round_trip(kind: PropertyKind, value: FieldValue) -> String {
        let mut wire = to_store_value(&kind, &value, &people()).unwrap();
        wire["type"] = json!(kind.store_type());
        from_wire_value(&kind, &wire)
    }

    #[test]
    fn test_date_formats_agree() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 7).unwrap();
        for input in ["07/03/2024", "07-03-2024", "07/03/24", "07-03-24", "2024-03-07"] {
            assert_eq!(parse_date(input), Some(expected), "{input}");
        }
    }

    #[test]
    fn test_unparseable_date_is_omitted() {
        assert_eq!(parse_date("not-a-date"), None);
        assert_eq!(parse_date("31/02/2024"), None);
        assert!(to_store_value(&PropertyKind::Date, &"not-a-date".into(), &people()).is_none());
    }

    #[test]
    fn test_encode_title_with_spans() {
        let wire = to_store_value(&PropertyKind::Title, &"Ship **it**".into(), &people()).unwrap();
        assert_eq!(wire["title"][0]["text"]["content"], "Ship ");
        assert_eq!(wire["title"][1]["text"]["content"], "it");
        assert_eq!(wire["title"][1]["annotations"]["bold"], true);
    }

    #[test]
    fn test_encode_select_takes_first_of_list() {
        let value = FieldValue::List(vec!["High".to_string(), "Low".to_string()]);
        let wire = to_store_value(&PropertyKind::Select, &value, &people()).unwrap();
        assert_eq!(wire, json!({"select": {"name": "High"}}));
    }

    #[test]
    fn test_encode_multi_select_from_string() {
        let wire =
            to_store_value(&PropertyKind::MultiSelect, &" a, ,b ,".into(), &people()).unwrap();
        assert_eq!(wire, json!({"multi_select": [{"name": "a"}, {"name": "b"}]}));
    }

    #[test]
    fn test_encode_people() {
        let ids = FieldValue::List(vec!["u-7".to_string()]);
        assert_eq!(
            to_store_value(&PropertyKind::People, &ids, &people()).unwrap(),
            json!({"people": [{"id": "u-7"}]})
        );
        assert_eq!(
            to_store_value(&PropertyKind::People, &"ana@example.com".into(), &people()).unwrap(),
            json!({"people": [{"id": "u-1"}]})
        );
        assert!(to_store_value(&PropertyKind::People, &"nobody".into(), &people()).is_none());
    }

    #[test]
    fn test_encode_number_and_unknown_kind() {
        assert_eq!(
            to_store_value(&PropertyKind::Number, &"42".into(), &people()).unwrap(),
            json!({"number": 42})
        );
        assert!(to_store_value(&PropertyKind::Number, &"forty".into(), &people()).is_none());
        assert!(to_store_value(
            &PropertyKind::Other("checkbox".to_string()),
            &"true".into(),
            &people()
        )
        .is_none());
    }

    #[test]
    fn test_round_trips() {
        assert_eq!(round_trip(PropertyKind::Title, "Ship it".into()), "Ship it");
        assert_eq!(round_trip(PropertyKind::Text, "some notes".into()), "some notes");
        assert_eq!(round_trip(PropertyKind::Url, "https://x.y".into()), "https://x.y");
        assert_eq!(round_trip(PropertyKind::Status, "Done".into()), "Done");
        assert_eq!(round_trip(PropertyKind::Select, "High".into()), "High");
        assert_eq!(
            round_trip(
                PropertyKind::MultiSelect,
                FieldValue::List(vec!["a".to_string(), "b".to_string()])
            ),
            "a, b"
        );
        assert_eq!(round_trip(PropertyKind::Date, "07/03/2024".into()), "07/03/2024");
        assert_eq!(round_trip(PropertyKind::Number, "3.5".into()), "3.5");
    }

    /// Encode people, then name each entry from the directory the way the
    /// store does when it echoes a record back.
    fn people_round_trip(value: FieldValue) -> String {
        let directory = people();
        let mut wire = to_store_value(&PropertyKind::People, &value, &directory).unwrap();
        wire["type"] = json!("people");
        if let Some(entries) = wire["people"].as_array_mut() {
            for entry in entries.iter_mut() {
                let name = entry["id"]
                    .as_str()
                    .and_then(|id| directory.get(id))
                    .and_then(|p| p.name.clone());
                if let Some(name) = name {
                    entry["name"] = json!(name);
                }
            }
        }
        from_wire_value(&PropertyKind::People, &wire)
    }

    #[test]
    fn test_people_round_trips() {
        assert_eq!(people_round_trip("bruno".into()), "Bruno Lima");
        assert_eq!(people_round_trip("ANA@example.com".into()), "Ana Souza");
        assert_eq!(
            people_round_trip(FieldValue::List(vec!["u-2".to_string(), "u-1".to_string()])),
            "Bruno Lima, Ana Souza"
        );
        assert_eq!(
            people_round_trip(FieldValue::List(vec!["u-9".to_string()])),
            UNKNOWN_PERSON
        );
    }

    #[test]
    fn test_decode_people_names_with_fallback() {
        let wire = json!({"type": "people", "people": [{"id": "u-1", "name": "Ana"}, {"id": "u-9"}]});
        assert_eq!(
            from_wire_value(&PropertyKind::People, &wire),
            format!("Ana, {}", UNKNOWN_PERSON)
        );
    }

    #[test]
    fn test_decode_is_total() {
        let garbage = json!({"type": "title", "title": "not an array"});
        assert_eq!(from_wire_value(&PropertyKind::Title, &garbage), "");
        assert_eq!(from_wire_value(&PropertyKind::Date, &json!({"date": null})), "");
        assert_eq!(from_wire_value(&PropertyKind::Url, &json!({"url": null})), "");
        assert_eq!(from_wire_value(&PropertyKind::Number, &json!({})), "");
        assert_eq!(from_wire_value(&PropertyKind::Select, &json!({"select": null})), "");
    }

    #[test]
    fn test_decode_prefers_plain_text() {
        let wire = json!({"type": "rich_text", "rich_text": [
            {"plain_text": "a", "text": {"content": "ignored"}},
            {"text": {"content": "b"}}
        ]});
        assert_eq!(from_wire_value(&PropertyKind::Text, &wire), "ab");
    }

    #[test]
    fn test_decode_property_uses_record_type() {
        let props = json!({"Status": {"type": "status", "status": {"name": "Done"}}})
            .as_object()
            .cloned()
            .unwrap();
        assert_eq!(decode_property(&props, "Status"), "Done");
        assert_eq!(decode_property(&props, "Missing"), "");
    }

    #[test]
    fn test_encode_properties_skips_unknown_and_failed() {
        let schema = vec![
            PropertyDescriptor::new("Name", PropertyKind::Title),
            PropertyDescriptor::new("Due", PropertyKind::Date),
        ];
        let mut values = BTreeMap::new();
        values.insert("Name".to_string(), FieldValue::from("Ship it"));
        values.insert("Due".to_string(), FieldValue::from("soon"));
        values.insert("Ghost".to_string(), FieldValue::from("boo"));

        let encoded = encode_properties(&schema, &values, &people());
        assert_eq!(encoded.len(), 1);
        assert!(encoded.contains_key("Name"));
    }
}
