//! Telegram bot client - long-polling loop.

use teloxide::prelude::*;

use crate::config::Settings;
use crate::dispatch::Dispatcher;
use crate::error::Error;

use super::handler::handle_message;

/// Run the Telegram bot until the process is interrupted.
pub async fn run_telegram_daemon(settings: &Settings, dispatcher: Dispatcher) -> Result<(), Error> {
    tracing::info!("Starting Telegram bot...");

    let token = settings
        .channels
        .telegram
        .bot_token
        .clone()
        .ok_or_else(|| Error::Telegram("No bot token configured".to_string()))?;

    let bot = Bot::new(token);

    if let Err(e) = bot
        .set_my_commands(vec![
            teloxide::types::BotCommand::new("help", "Show help"),
            teloxide::types::BotCommand::new("status", "Show queue status"),
        ])
        .await
    {
        tracing::warn!("Failed to set commands: {}", e);
    }

    tracing::info!("Telegram bot commands set");

    teloxide::repl(bot, move |bot: Bot, msg: Message| {
        let dispatcher = dispatcher.clone();
        async move { handle_message(bot, msg, dispatcher).await }
    })
    .await;

    tracing::info!("Telegram bot stopped");
    Ok(())
}
