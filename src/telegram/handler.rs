//! Telegram message handling.

use std::sync::Arc;

use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::Message;

use crate::core::ConversationId;
use crate::dispatch::Dispatcher;
use crate::error::{Error, Result};
use crate::orchestrator::Adapter;

use super::commands::{handle_command, parse_command};

pub const PLATFORM: &str = "telegram";

/// Conversation key for a Telegram chat.
pub fn conversation_for(chat_id: ChatId) -> ConversationId {
    ConversationId::for_chat(PLATFORM, chat_id.0)
}

/// Sends replies back into one Telegram chat.
pub struct TelegramAdapter {
    bot: Bot,
    chat_id: ChatId,
}

impl TelegramAdapter {
    pub fn new(bot: Bot, chat_id: ChatId) -> Self {
        Self { bot, chat_id }
    }
}

#[async_trait]
impl Adapter for TelegramAdapter {
    fn platform(&self) -> &str {
        PLATFORM
    }

    async fn send_reply(&self, _conversation_id: &ConversationId, text: &str) -> Result<()> {
        self.bot
            .send_message(self.chat_id, text)
            .await
            .map_err(|e| Error::Telegram(e.to_string()))?;
        Ok(())
    }
}

/// Handle an incoming update: answer commands inline, queue everything else.
pub async fn handle_message(
    bot: Bot,
    msg: Message,
    dispatcher: Dispatcher,
) -> std::result::Result<(), teloxide::RequestError> {
    let text = msg.text().or_else(|| msg.caption()).unwrap_or("").trim();
    if text.is_empty() {
        return Ok(());
    }

    let conversation_id = conversation_for(msg.chat.id);

    if let Some(command) = parse_command(text) {
        return handle_command(bot, msg.chat.id, command, dispatcher.locks(), &conversation_id)
            .await;
    }

    let sender = msg
        .from
        .as_ref()
        .map(|u| u.full_name())
        .unwrap_or_else(|| "Unknown".to_string());

    tracing::info!(
        conversation = %conversation_id,
        "Received message {} from {}",
        msg.id.0,
        sender
    );

    let adapter: Arc<dyn Adapter> = Arc::new(TelegramAdapter::new(bot, msg.chat.id));
    dispatcher.dispatch(adapter, conversation_id, text.to_string());

    Ok(())
}
