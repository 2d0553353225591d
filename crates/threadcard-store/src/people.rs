//! The store workspace's people directory.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A user of the record store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl Person {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: Some(name.into()),
            email: None,
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Parse one entry of the store's user listing.
    ///
    /// The email sits under `person.email`; bot users have none.
    pub fn from_wire(value: &Value) -> Option<Self> {
        let id = value.get("id")?.as_str()?.to_string();
        let name = value.get("name").and_then(Value::as_str).map(str::to_string);
        let email = value
            .get("person")
            .and_then(|p| p.get("email"))
            .and_then(Value::as_str)
            .map(str::to_string);
        Some(Self { id, name, email })
    }
}

/// Snapshot of the store's user list, used to resolve typed names to ids.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PeopleDirectory {
    people: Vec<Person>,
}

impl PeopleDirectory {
    pub fn new(people: Vec<Person>) -> Self {
        Self { people }
    }

    pub fn people(&self) -> &[Person] {
        &self.people
    }

    pub fn is_empty(&self) -> bool {
        self.people.is_empty()
    }

    /// Resolve a search term to a person id.
    ///
    /// Matches a case-insensitive substring of the display name or the exact
    /// email (case-insensitive). The first match in directory order wins.
    pub fn resolve(&self, term: &str) -> Option<&str> {
        let term = term.trim().to_lowercase();
        if term.is_empty() {
            return None;
        }
        self.people
            .iter()
            .find(|person| {
                let by_name = person
                    .name
                    .as_deref()
                    .is_some_and(|n| n.to_lowercase().contains(&term));
                let by_email = person
                    .email
                    .as_deref()
                    .is_some_and(|e| e.to_lowercase() == term);
                by_name || by_email
            })
            .map(|person| person.id.as_str())
    }

    /// Look a person up by id.
    pub fn get(&self, id: &str) -> Option<&Person> {
        self.people.iter().find(|p| p.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn directory() -> PeopleDirectory {
        PeopleDirectory::new(vec![
            Person::new("u-1", "Ana Souza").with_email("ana@example.com"),
            Person::new("u-2", "Bruno Lima").with_email("bruno@example.com"),
            Person::new("u-3", "Anabela"),
        ])
    }

    #[test]
    fn test_resolve_by_name_substring() {
        let dir = directory();
        assert_eq!(dir.resolve("bruno"), Some("u-2"));
        assert_eq!(dir.resolve("LIMA"), Some("u-2"));
    }

    #[test]
    fn test_resolve_first_match_wins() {
        assert_eq!(directory().resolve("ana"), Some("u-1"));
    }

    #[test]
    fn test_resolve_by_exact_email() {
        let dir = directory();
        assert_eq!(dir.resolve("Bruno@Example.com"), Some("u-2"));
        assert_eq!(dir.resolve("bruno@example"), None);
    }

    #[test]
    fn test_resolve_no_match_or_empty() {
        let dir = directory();
        assert_eq!(dir.resolve("carla"), None);
        assert_eq!(dir.resolve("   "), None);
    }

    #[test]
    fn test_person_from_wire() {
        let person = Person::from_wire(&json!({
            "id": "u-9",
            "name": "Dana",
            "type": "person",
            "person": {"email": "dana@example.com"}
        }))
        .unwrap();
        assert_eq!(person.email.as_deref(), Some("dana@example.com"));

        let bot = Person::from_wire(&json!({"id": "b-1", "type": "bot", "bot": {}})).unwrap();
        assert!(bot.name.is_none());
        assert!(Person::from_wire(&json!({"name": "no id"})).is_none());
    }
}
