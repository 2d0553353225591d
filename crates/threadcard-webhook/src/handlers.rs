//! Route handlers of the inbound boundary.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, info, warn};

use crate::error::ApiError;
use crate::state::{RecordEvent, WebhookState};

/// Header carrying the store's endpoint verification challenge.
pub const CHALLENGE_HEADER: &str = "x-notion-webhook-challenge";

#[derive(Debug, Serialize, Deserialize)]
pub struct AckResponse {
    pub status: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Record id of a change payload: `page.id`, else `entity.id`.
pub fn record_id_of(payload: &Value) -> Option<&str> {
    ["page", "entity"]
        .iter()
        .find_map(|key| payload.get(*key)?.get("id")?.as_str())
        .filter(|id| !id.is_empty())
}

/// GET /health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// POST on the configured webhook path.
///
/// Echoes a verification challenge verbatim. Otherwise queues the record id
/// for the notification worker and acknowledges at once.
pub async fn receive(
    State(state): State<WebhookState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    if let Some(challenge) = headers.get(CHALLENGE_HEADER) {
        let challenge = challenge.to_str().unwrap_or_default().to_string();
        info!("Answering webhook verification challenge");
        return Ok((StatusCode::OK, challenge).into_response());
    }

    let payload: Value = serde_json::from_slice(&body)
        .map_err(|e| ApiError::BadRequest(format!("Invalid JSON payload: {}", e)))?;

    match record_id_of(&payload) {
        Some(record_id) => {
            let event = RecordEvent {
                record_id: record_id.to_string(),
            };
            match state.events.try_send(event) {
                Ok(()) => debug!(record_id, "Record event queued"),
                Err(TrySendError::Full(event)) => {
                    warn!(record_id = %event.record_id, "Event queue full, dropping event")
                }
                Err(TrySendError::Closed(_)) => {
                    return Err(ApiError::ServiceUnavailable(
                        "Notification worker is not running".to_string(),
                    ))
                }
            }
        }
        None => info!("Webhook payload without a record id, ignoring"),
    }

    Ok((
        StatusCode::OK,
        Json(AckResponse {
            status: "received".to_string(),
        }),
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_record_id_from_page() {
        let payload = json!({"page": {"id": "abc"}, "entity": {"id": "other"}});
        assert_eq!(record_id_of(&payload), Some("abc"));
    }

    #[test]
    fn test_record_id_from_entity() {
        let payload = json!({"type": "page.properties_updated", "entity": {"id": "def", "type": "page"}});
        assert_eq!(record_id_of(&payload), Some("def"));
    }

    #[test]
    fn test_record_id_missing() {
        assert_eq!(record_id_of(&json!({"page": {}})), None);
        assert_eq!(record_id_of(&json!({"page": {"id": ""}})), None);
        assert_eq!(record_id_of(&json!([1, 2])), None);
    }
}
