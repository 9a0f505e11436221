//! Route definitions for web server.

use axum::{
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::dispatch::Dispatcher;

use super::api;

/// Largest accepted request body.
pub const MAX_BODY_BYTES: usize = 64 * 1024;

/// Shared state for every handler.
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Dispatcher,
    pub http: reqwest::Client,
}

impl AppState {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self {
            dispatcher,
            http: reqwest::Client::new(),
        }
    }
}

/// Create the API router.
pub fn create_api_router() -> Router<AppState> {
    Router::new()
        // Inbound platforms
        .route("/webhook/:platform", post(api::receive_webhook))
        .route("/commands/slash", post(api::receive_slash_command))
        .route("/messages", post(api::send_message))
        // Introspection
        .route("/status", get(api::get_status))
        .route("/stats", get(api::get_stats))
}

/// Create the full app router.
pub fn create_app_router(state: AppState) -> Router {
    Router::new()
        .nest("/api", create_api_router())
        .route("/health", get(health_check))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods(Any)
                        .allow_headers(Any),
                ),
        )
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ConversationId, LockManager};
    use crate::error::Result;
    use crate::orchestrator::{Adapter, Orchestrator};
    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tower::ServiceExt;

    /// Replies "re: <text>" and remembers what it saw.
    #[derive(Default)]
    struct RecordingOrchestrator {
        seen: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Orchestrator for RecordingOrchestrator {
        async fn handle_message(
            &self,
            adapter: Arc<dyn Adapter>,
            conversation_id: &ConversationId,
            text: &str,
        ) -> Result<String> {
            self.seen
                .lock()
                .unwrap()
                .push(format!("{}|{}", conversation_id, text));
            let reply = format!("re: {}", text);
            adapter.send_reply(conversation_id, &reply).await?;
            Ok(reply)
        }
    }

    fn app() -> (Router, Arc<RecordingOrchestrator>) {
        let orchestrator = Arc::new(RecordingOrchestrator::default());
        let dispatcher = Dispatcher::new(LockManager::new(2).unwrap(), orchestrator.clone());
        (create_app_router(AppState::new(dispatcher)), orchestrator)
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn json_request(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let (app, _) = app();
        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_status() {
        let (app, _) = app();
        let response = app
            .oneshot(Request::builder().uri("/api/status").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["max_concurrent"], 2);
        assert_eq!(json["current_active"], 0);
        assert_eq!(json["queued_total"], 0);
    }

    #[tokio::test]
    async fn test_stats() {
        let (app, _) = app();
        let response = app
            .oneshot(Request::builder().uri("/api/stats").body(Body::empty()).unwrap())
            .await
            .unwrap();

        let json = body_json(response).await;
        assert_eq!(json["total_completed"], 0);
        assert!(json["per_conversation_queue_depths"].is_object());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_messages_awaits_reply() {
        let (app, orchestrator) = app();
        let response = app
            .oneshot(json_request(
                "/api/messages",
                serde_json::json!({"conversation_id": "test:1", "text": "hello"}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["reply"], "re: hello");
        assert_eq!(json["replies"][0], "re: hello");
        assert_eq!(*orchestrator.seen.lock().unwrap(), vec!["test:1|hello"]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_webhook_acks_then_runs() {
        let (app, orchestrator) = app();
        let response = app
            .oneshot(json_request(
                "/api/webhook/discord",
                serde_json::json!({"chat_id": "42", "text": "ping"}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::ACCEPTED);
        let json = body_json(response).await;
        assert_eq!(json["conversation_id"], "discord:42");

        let seen = tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                if let Some(s) = orchestrator.seen.lock().unwrap().first().cloned() {
                    return s;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();
        assert_eq!(seen, "discord:42|ping");
    }

    #[tokio::test]
    async fn test_webhook_rejects_empty_text() {
        let (app, _) = app();
        let response = app
            .oneshot(json_request(
                "/api/webhook/discord",
                serde_json::json!({"chat_id": "42", "text": "   "}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_slash_command_acks_immediately() {
        let (app, _) = app();
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/commands/slash")
                    .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                    .body(Body::from("channel_id=C1&user_id=U1&text=hello"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["response_type"], "ephemeral");
    }

    #[tokio::test]
    async fn test_body_limit() {
        let (app, _) = app();
        let body = "x".repeat(MAX_BODY_BYTES + 1);
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/messages")
                    .header(header::CONTENT_TYPE, "application/json")
                    .header(header::CONTENT_LENGTH, body.len())
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }
}
