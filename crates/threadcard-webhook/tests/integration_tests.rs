//! Integration tests for the inbound webhook boundary.
//!
//! Each test builds its own router and event queue and drives it with
//! `tower::ServiceExt::oneshot`.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::Value;
use tower::ServiceExt;

use threadcard_webhook::handlers::{AckResponse, HealthResponse, CHALLENGE_HEADER};
use threadcard_webhook::{create_router, RecordEvent, WebhookState};

// =============================================================================
// Helpers
// =============================================================================

const PATH: &str = "/notion-webhook";

fn post_json(uri: &str, json: &str) -> Request<Body> {
    Request::post(uri)
        .header("content-type", "application/json")
        .body(Body::from(json.to_string()))
        .unwrap()
}

async fn body_bytes(resp: axum::response::Response) -> Vec<u8> {
    axum::body::to_bytes(resp.into_body(), 1024 * 1024)
        .await
        .unwrap()
        .to_vec()
}

async fn body_json<T: serde::de::DeserializeOwned>(resp: axum::response::Response) -> T {
    serde_json::from_slice(&body_bytes(resp).await).unwrap()
}

// =============================================================================
// Health
// =============================================================================

#[tokio::test]
async fn test_health() {
    let (state, _rx) = WebhookState::new(8);
    let resp = create_router(PATH, state)
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let health: HealthResponse = body_json(resp).await;
    assert_eq!(health.status, "ok");
}

// =============================================================================
// Webhook endpoint
// =============================================================================

#[tokio::test]
async fn test_challenge_is_echoed_verbatim() {
    let (state, mut rx) = WebhookState::new(8);
    let request = Request::post(PATH)
        .header(CHALLENGE_HEADER, "verify-me-123")
        .body(Body::empty())
        .unwrap();

    let resp = create_router(PATH, state).oneshot(request).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_bytes(resp).await, b"verify-me-123");
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn test_page_event_is_queued() {
    let (state, mut rx) = WebhookState::new(8);
    let resp = create_router(PATH, state)
        .oneshot(post_json(PATH, r#"{"page": {"id": "rec-42"}}"#))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let ack: AckResponse = body_json(resp).await;
    assert_eq!(ack.status, "received");
    assert_eq!(
        rx.try_recv().unwrap(),
        RecordEvent {
            record_id: "rec-42".to_string()
        }
    );
}

#[tokio::test]
async fn test_entity_event_is_queued() {
    let (state, mut rx) = WebhookState::new(8);
    let resp = create_router(PATH, state)
        .oneshot(post_json(
            PATH,
            r#"{"type": "page.properties_updated", "entity": {"id": "rec-7", "type": "page"}}"#,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(rx.try_recv().unwrap().record_id, "rec-7");
}

#[tokio::test]
async fn test_payload_without_id_is_acknowledged() {
    let (state, mut rx) = WebhookState::new(8);
    let resp = create_router(PATH, state)
        .oneshot(post_json(PATH, r#"{"type": "database.created"}"#))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn test_invalid_json_is_bad_request() {
    let (state, _rx) = WebhookState::new(8);
    let resp = create_router(PATH, state)
        .oneshot(post_json(PATH, "not json"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = body_json(resp).await;
    assert_eq!(body["error"], "bad_request");
}

#[tokio::test]
async fn test_closed_queue_is_unavailable() {
    let (state, rx) = WebhookState::new(8);
    drop(rx);
    let resp = create_router(PATH, state)
        .oneshot(post_json(PATH, r#"{"page": {"id": "rec-1"}}"#))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_path_without_leading_slash() {
    let (state, mut rx) = WebhookState::new(8);
    let resp = create_router("hooks/store", state)
        .oneshot(post_json("/hooks/store", r#"{"page": {"id": "rec-9"}}"#))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(rx.try_recv().unwrap().record_id, "rec-9");
}

#[tokio::test]
async fn test_get_on_webhook_path_not_allowed() {
    let (state, _rx) = WebhookState::new(8);
    let resp = create_router(PATH, state)
        .oneshot(Request::get(PATH).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
}
