//! Generic JSON webhook for chat platforms.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::core::{ConversationId, ConversationPhase};
use crate::orchestrator::Adapter;
use crate::web::router::AppState;

use super::callback::{CallbackAdapter, ReplyFormat};
use super::ApiError;

/// Inbound webhook message.
#[derive(Debug, Deserialize)]
pub struct WebhookMessage {
    pub chat_id: String,
    pub text: String,
    #[serde(default)]
    pub user: Option<String>,
    /// Where to POST the reply. Without one the reply is only logged.
    #[serde(default)]
    pub callback_url: Option<String>,
}

/// Acknowledgement sent before the message is processed.
#[derive(Debug, Serialize)]
pub struct WebhookAck {
    pub accepted: bool,
    pub conversation_id: ConversationId,
    pub phase: ConversationPhase,
}

/// Queue the message and acknowledge with 202.
pub async fn receive_webhook(
    State(state): State<AppState>,
    Path(platform): Path<String>,
    Json(message): Json<WebhookMessage>,
) -> Result<(StatusCode, Json<WebhookAck>), ApiError> {
    let text = message.text.trim();
    if text.is_empty() {
        return Err(ApiError::bad_request("text must not be empty"));
    }
    if message.chat_id.is_empty() {
        return Err(ApiError::bad_request("chat_id must not be empty"));
    }

    let conversation_id = ConversationId::for_chat(&platform, &message.chat_id);

    tracing::info!(
        conversation = %conversation_id,
        user = message.user.as_deref().unwrap_or("unknown"),
        "Webhook message received"
    );

    let adapter: Arc<dyn Adapter> = Arc::new(CallbackAdapter::new(
        platform,
        state.http.clone(),
        message.callback_url,
        ReplyFormat::Plain,
    ));

    let dispatcher = &state.dispatcher;
    dispatcher.dispatch(adapter, conversation_id.clone(), text.to_string());
    let phase = dispatcher.locks().phase(&conversation_id);

    Ok((
        StatusCode::ACCEPTED,
        Json(WebhookAck {
            accepted: true,
            conversation_id,
            phase,
        }),
    ))
}
