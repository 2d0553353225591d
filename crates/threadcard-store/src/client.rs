//! The record-store collaborator and its REST implementation.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde_json::{json, Map, Value};
use std::time::Duration;
use threadcard_core::config::StoreConfig;
use tracing::{debug, instrument};

use crate::blocks::ContentBlock;
use crate::error::StoreError;
use crate::people::{PeopleDirectory, Person};
use crate::record::{Record, RecordFilter};

/// Operations the interaction engine needs from the record store.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Records of a collection, optionally filtered on one property.
    async fn query(
        &self,
        collection_id: &str,
        filter: Option<&RecordFilter>,
    ) -> Result<Vec<Record>, StoreError>;

    /// Raw property schema of a collection: property name to property object.
    async fn retrieve_schema(&self, collection_id: &str) -> Result<Map<String, Value>, StoreError>;

    /// Create a record with encoded properties and optional body content.
    async fn create(
        &self,
        collection_id: &str,
        properties: Map<String, Value>,
        content: &[ContentBlock],
    ) -> Result<Record, StoreError>;

    /// Update some properties of a record.
    async fn update(&self, record_id: &str, properties: Map<String, Value>)
        -> Result<Record, StoreError>;

    /// Archive (soft-delete) a record.
    async fn archive(&self, record_id: &str) -> Result<Record, StoreError>;

    /// Fetch one record.
    async fn retrieve(&self, record_id: &str) -> Result<Record, StoreError>;

    /// The store workspace's users.
    async fn list_people(&self) -> Result<PeopleDirectory, StoreError>;
}

/// REST client for the record store.
#[derive(Clone)]
pub struct HttpRecordStore {
    client: Client,
    base_url: String,
    api_version: String,
    token: String,
}

impl HttpRecordStore {
    pub fn new(config: &StoreConfig, token: impl Into<String>) -> Result<Self, StoreError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_version: config.api_version.clone(),
            token: token.into(),
        })
    }

    fn request(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .bearer_auth(&self.token)
            .header("Notion-Version", &self.api_version)
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Value, StoreError> {
        let response = self.request(builder).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read store error body".to_string());
            return Err(map_http_error(status, body));
        }
        Ok(response.json().await?)
    }

    async fn send_record(&self, builder: RequestBuilder) -> Result<Record, StoreError> {
        let value = self.send(builder).await?;
        Ok(serde_json::from_value(value)?)
    }
}

fn map_http_error(status: StatusCode, body: String) -> StoreError {
    match status {
        StatusCode::NOT_FOUND => StoreError::NotFound(body),
        _ => StoreError::Unavailable(format!("{}: {}", status, body)),
    }
}

#[async_trait]
impl RecordStore for HttpRecordStore {
    #[instrument(skip(self, filter), fields(filtered = filter.is_some()))]
    async fn query(
        &self,
        collection_id: &str,
        filter: Option<&RecordFilter>,
    ) -> Result<Vec<Record>, StoreError> {
        let url = format!("{}/databases/{}/query", self.base_url, collection_id);
        let mut records = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let mut body = Map::new();
            if let Some(filter) = filter {
                body.insert("filter".to_string(), filter.to_wire());
            }
            if let Some(cursor) = &cursor {
                body.insert("start_cursor".to_string(), Value::String(cursor.clone()));
            }

            let page = self.send(self.client.post(&url).json(&body)).await?;
            if let Some(results) = page.get("results").and_then(Value::as_array) {
                for result in results {
                    records.push(serde_json::from_value(result.clone())?);
                }
            }

            let has_more = page.get("has_more").and_then(Value::as_bool).unwrap_or(false);
            cursor = page
                .get("next_cursor")
                .and_then(Value::as_str)
                .map(str::to_string);
            if !has_more || cursor.is_none() {
                break;
            }
        }

        debug!(count = records.len(), "Query complete");
        Ok(records)
    }

    async fn retrieve_schema(&self, collection_id: &str) -> Result<Map<String, Value>, StoreError> {
        let url = format!("{}/databases/{}", self.base_url, collection_id);
        let value = self.send(self.client.get(url)).await?;
        value
            .get("properties")
            .and_then(Value::as_object)
            .cloned()
            .ok_or_else(|| StoreError::Decode("schema has no properties".to_string()))
    }

    #[instrument(skip(self, properties, content), fields(blocks = content.len()))]
    async fn create(
        &self,
        collection_id: &str,
        properties: Map<String, Value>,
        content: &[ContentBlock],
    ) -> Result<Record, StoreError> {
        let mut body = json!({
            "parent": { "database_id": collection_id },
            "properties": properties,
        });
        if !content.is_empty() {
            body["children"] = Value::Array(content.iter().map(ContentBlock::to_wire).collect());
        }
        let url = format!("{}/pages", self.base_url);
        self.send_record(self.client.post(url).json(&body)).await
    }

    async fn update(
        &self,
        record_id: &str,
        properties: Map<String, Value>,
    ) -> Result<Record, StoreError> {
        let url = format!("{}/pages/{}", self.base_url, record_id);
        let body = json!({ "properties": properties });
        self.send_record(self.client.patch(url).json(&body)).await
    }

    async fn archive(&self, record_id: &str) -> Result<Record, StoreError> {
        let url = format!("{}/pages/{}", self.base_url, record_id);
        let body = json!({ "archived": true });
        self.send_record(self.client.patch(url).json(&body)).await
    }

    async fn retrieve(&self, record_id: &str) -> Result<Record, StoreError> {
        let url = format!("{}/pages/{}", self.base_url, record_id);
        self.send_record(self.client.get(url)).await
    }

    async fn list_people(&self) -> Result<PeopleDirectory, StoreError> {
        let url = format!("{}/users", self.base_url);
        let value = self.send(self.client.get(url)).await?;
        let people = value
            .get("results")
            .and_then(Value::as_array)
            .map(|results| results.iter().filter_map(Person::from_wire).collect())
            .unwrap_or_default();
        Ok(PeopleDirectory::new(people))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_http_error() {
        assert!(matches!(
            map_http_error(StatusCode::NOT_FOUND, "gone".to_string()),
            StoreError::NotFound(_)
        ));
        let err = map_http_error(StatusCode::UNAUTHORIZED, "bad token".to_string());
        assert!(err.is_unavailable());
        assert!(err.to_string().contains("401"));
    }

    #[test]
    fn test_new_trims_base_url() {
        let config = StoreConfig {
            base_url: "https://store.example/v1/".to_string(),
            ..StoreConfig::default()
        };
        let store = HttpRecordStore::new(&config, "secret").unwrap();
        assert_eq!(store.base_url, "https://store.example/v1");
        assert_eq!(store.api_version, config.api_version);
    }
}
