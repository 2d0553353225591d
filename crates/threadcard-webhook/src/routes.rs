//! Router setup and the listener entry point.

use axum::routing::{get, post};
use axum::Router;
use threadcard_core::config::WebhookConfig;
use threadcard_core::ThreadcardError;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::WebhookState;

/// Build the router: the webhook endpoint at `path` plus `/health`.
pub fn create_router(path: &str, state: WebhookState) -> Router {
    let path = if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{}", path)
    };
    Router::new()
        .route("/health", get(handlers::health))
        .route(&path, post(handlers::receive))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind the configured address and serve until the process stops.
pub async fn start_server(config: &WebhookConfig, state: WebhookState) -> Result<(), ThreadcardError> {
    let addr = format!("{}:{}", config.host, config.port);
    let router = create_router(&config.path, state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| ThreadcardError::Webhook(format!("Failed to bind {}: {}", addr, e)))?;
    tracing::info!(addr = %addr, path = %config.path, "Webhook listener started");

    axum::serve(listener, router)
        .await
        .map_err(|e| ThreadcardError::Webhook(format!("Server error: {}", e)))?;
    Ok(())
}
