//! Slash-command endpoint.
//!
//! Slash commands must be acknowledged within a few seconds, so the reply
//! always goes to `response_url` later.

use std::sync::Arc;

use axum::{extract::State, Form, Json};
use serde::Deserialize;
use serde_json::json;

use crate::core::ConversationId;
use crate::orchestrator::Adapter;
use crate::web::router::AppState;

use super::callback::{CallbackAdapter, ReplyFormat};

pub const PLATFORM: &str = "slash";

#[derive(Debug, Deserialize)]
pub struct SlashCommand {
    pub channel_id: String,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub command: Option<String>,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub response_url: Option<String>,
}

pub async fn receive_slash_command(
    State(state): State<AppState>,
    Form(command): Form<SlashCommand>,
) -> Json<serde_json::Value> {
    let text = command.text.trim();
    if text.is_empty() {
        let usage = format!("Usage: {} <message>", command.command.as_deref().unwrap_or("/ask"));
        return Json(json!({ "response_type": "ephemeral", "text": usage }));
    }

    let conversation_id = ConversationId::for_chat(PLATFORM, &command.channel_id);

    tracing::info!(
        conversation = %conversation_id,
        user = command.user_id.as_deref().unwrap_or("unknown"),
        "Slash command received"
    );

    let adapter: Arc<dyn Adapter> = Arc::new(CallbackAdapter::new(
        PLATFORM,
        state.http.clone(),
        command.response_url,
        ReplyFormat::Slash,
    ));
    state
        .dispatcher
        .dispatch(adapter, conversation_id, text.to_string());

    let status = state.dispatcher.locks().status();
    Json(json!({
        "response_type": "ephemeral",
        "text": format!(
            "Working on it... ({} active, {} queued)",
            status.current_active, status.queued_total
        ),
    }))
}
