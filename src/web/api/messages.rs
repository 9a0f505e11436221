//! Synchronous message endpoint: queue, wait, and return the reply.

use std::sync::Arc;

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::core::ConversationId;
use crate::orchestrator::BufferAdapter;
use crate::web::router::AppState;

use super::ApiError;

#[derive(Debug, Deserialize)]
pub struct MessageRequest {
    pub conversation_id: ConversationId,
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub conversation_id: ConversationId,
    pub reply: String,
    /// Everything the orchestrator sent through the adapter.
    pub replies: Vec<String>,
}

pub async fn send_message(
    State(state): State<AppState>,
    Json(request): Json<MessageRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    if request.text.trim().is_empty() {
        return Err(ApiError::bad_request("text must not be empty"));
    }
    if request.conversation_id.as_str().is_empty() {
        return Err(ApiError::bad_request("conversation_id must not be empty"));
    }

    let adapter = Arc::new(BufferAdapter::new("http"));
    let reply = state
        .dispatcher
        .dispatch_and_wait(adapter.clone(), request.conversation_id.clone(), request.text)
        .await?;

    Ok(Json(MessageResponse {
        conversation_id: request.conversation_id,
        reply,
        replies: adapter.take().await,
    }))
}
