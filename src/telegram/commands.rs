//! Telegram bot commands.
//!
//! Commands are answered inline by the polling loop; they never queue behind
//! the conversation's own messages.

use teloxide::prelude::*;

use crate::core::{ConversationId, LockManager};

pub const HELP_TEXT: &str = r#"chatgate Commands:

/help - Show this help
/status - Show queue and concurrency status

Direct Messages:
- Just send a message to chat with the AI
- Messages in one chat are answered one at a time, in order"#;

/// A recognised slash command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BotCommand {
    Help,
    Status,
}

/// Parse a slash command, tolerating the `/cmd@botname` form used in groups.
///
/// Unrecognised commands return `None` and go to the orchestrator as text.
pub fn parse_command(text: &str) -> Option<BotCommand> {
    let first = text.split_whitespace().next()?;
    let name = first.strip_prefix('/')?;
    let name = name.split('@').next().unwrap_or(name).to_lowercase();

    match name.as_str() {
        "help" | "start" => Some(BotCommand::Help),
        "status" => Some(BotCommand::Status),
        _ => None,
    }
}

/// Render the /status reply for a chat.
pub fn status_text(locks: &LockManager, conversation_id: &ConversationId) -> String {
    let status = locks.status();
    format!(
        "Status:\n• Active: {}/{}\n• Queued: {}\n• This chat: {}",
        status.current_active,
        status.max_concurrent,
        status.queued_total,
        locks.phase(conversation_id)
    )
}

/// Answer a command.
pub async fn handle_command(
    bot: Bot,
    chat_id: ChatId,
    command: BotCommand,
    locks: &LockManager,
    conversation_id: &ConversationId,
) -> ResponseResult<()> {
    match command {
        BotCommand::Help => {
            bot.send_message(chat_id, HELP_TEXT).await?;
        }
        BotCommand::Status => {
            bot.send_message(chat_id, status_text(locks, conversation_id))
                .await?;
        }
    }
    Ok(())
}
