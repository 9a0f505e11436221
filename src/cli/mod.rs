//! CLI commands for chatgate using clap.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::config::{self, Settings};
use crate::core::{ConversationId, LockManager, LockStats, LockStatus};
use crate::dispatch::Dispatcher;
use crate::orchestrator::{AgentOrchestrator, BufferAdapter, Orchestrator};
use crate::web::{run_server, AppState, WebServerConfig};

/// chatgate - per-conversation serialized, globally bounded chat agent gateway.
#[derive(Parser)]
#[command(name = "chatgate")]
#[command(version = "0.1.0")]
#[command(about = "chatgate - one reply at a time per chat, bounded overall", long_about = None)]
pub struct Commands {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Start the gateway (web server, plus Telegram when configured)
    Start {
        /// Port for the HTTP server
        #[arg(short, long)]
        port: Option<u16>,

        /// Maximum conversations processed at once
        #[arg(long, env = "CHATGATE_MAX_CONCURRENT")]
        max_concurrent: Option<usize>,

        /// Do not start the Telegram bot even if configured
        #[arg(long)]
        no_telegram: bool,
    },

    /// Show lock status of a running gateway
    Status {
        /// Port the gateway listens on
        #[arg(short, long)]
        port: Option<u16>,

        /// Include per-conversation queue depths and totals
        #[arg(long)]
        stats: bool,
    },

    /// Send one message through the lock manager and print the reply
    Send {
        /// Conversation id, e.g. "cli:me"
        conversation: String,

        /// Message to send
        message: String,
    },

    /// Print the effective settings
    Config,
}

impl Commands {
    /// Run the command.
    pub async fn run(&self) -> Result<()> {
        match &self.command {
            Command::Start {
                port,
                max_concurrent,
                no_telegram,
            } => cmd_start(*port, *max_concurrent, *no_telegram).await,
            Command::Status { port, stats } => cmd_status(*port, *stats).await,
            Command::Send {
                conversation,
                message,
            } => cmd_send(conversation, message).await,
            Command::Config => cmd_config().await,
        }
    }
}

/// Apply command-line overrides on top of the settings file.
fn apply_overrides(
    mut settings: Settings,
    port: Option<u16>,
    max_concurrent: Option<usize>,
) -> Result<Settings> {
    if let Some(port) = port {
        settings.web.port = port;
    }
    if let Some(max) = max_concurrent {
        settings.concurrency.max_concurrent_conversations = max;
    }
    config::validate_settings(&settings)?;
    Ok(settings)
}

/// Settings for `start`: the settings file (defaults if absent) plus overrides.
///
/// An invalid settings file is fatal.
fn startup_settings(
    path: &Path,
    port: Option<u16>,
    max_concurrent: Option<usize>,
) -> Result<Settings> {
    let settings = config::load_settings_or_default_from(path)
        .with_context(|| format!("Invalid settings file {}", path.display()))?;
    apply_overrides(settings, port, max_concurrent)
}

fn build_dispatcher(settings: &Settings) -> Result<(Dispatcher, Arc<AgentOrchestrator>)> {
    let locks = LockManager::from_settings(settings)?;
    let orchestrator = Arc::new(AgentOrchestrator::from_settings(settings));
    let dispatcher = Dispatcher::new(locks, orchestrator.clone() as Arc<dyn Orchestrator>);
    Ok((dispatcher, orchestrator))
}

fn telegram_wanted(settings: &Settings, no_telegram: bool) -> bool {
    !no_telegram
        && settings.channels.is_enabled("telegram")
        && settings.channels.telegram.bot_token.is_some()
}

// Command implementations

async fn cmd_start(port: Option<u16>, max_concurrent: Option<usize>, no_telegram: bool) -> Result<()> {
    let settings = startup_settings(&config::get_settings_path()?, port, max_concurrent)?;
    let (dispatcher, orchestrator) = build_dispatcher(&settings)?;

    if !orchestrator.provider().is_available().await {
        tracing::warn!(
            "Provider '{}' is not available; messages will fail until it is",
            orchestrator.provider().name()
        );
    }

    println!(
        "Starting chatgate (max {} concurrent conversations)...",
        settings.concurrency.max_concurrent_conversations
    );

    let telegram = if telegram_wanted(&settings, no_telegram) {
        let settings = settings.clone();
        let dispatcher = dispatcher.clone();
        Some(tokio::spawn(async move {
            if let Err(e) = crate::telegram::run_telegram_daemon(&settings, dispatcher).await {
                tracing::error!("Telegram daemon error: {}", e);
            }
        }))
    } else {
        tracing::info!("Telegram disabled");
        None
    };

    let port = settings.web.port;
    println!("API endpoints:");
    println!("  http://localhost:{}/api/webhook/:platform", port);
    println!("  http://localhost:{}/api/commands/slash", port);
    println!("  http://localhost:{}/api/messages", port);
    println!("  http://localhost:{}/api/status", port);
    println!("  http://localhost:{}/health", port);
    println!();
    println!("Press Ctrl+C to stop");

    let result = run_server(WebServerConfig::from(settings.web.clone()), AppState::new(dispatcher)).await;

    if let Some(handle) = telegram {
        handle.abort();
    }

    result.context("Web server error")
}

async fn cmd_status(port: Option<u16>, stats: bool) -> Result<()> {
    let settings = config::load_settings_or_default()?;
    let port = port.unwrap_or(settings.web.port);
    let base = format!("http://127.0.0.1:{}/api", port);
    let client = reqwest::Client::new();

    if stats {
        let stats: LockStats = client
            .get(format!("{}/stats", base))
            .send()
            .await
            .with_context(|| format!("chatgate does not appear to be running on port {}", port))?
            .error_for_status()?
            .json()
            .await?;
        println!("{}", stats);
    } else {
        let status: LockStatus = client
            .get(format!("{}/status", base))
            .send()
            .await
            .with_context(|| format!("chatgate does not appear to be running on port {}", port))?
            .error_for_status()?
            .json()
            .await?;
        println!("{}", status);
    }

    Ok(())
}

async fn cmd_send(conversation: &str, message: &str) -> Result<()> {
    let settings = startup_settings(&config::get_settings_path()?, None, None)?;
    let (dispatcher, _) = build_dispatcher(&settings)?;

    let adapter = Arc::new(BufferAdapter::new("cli"));
    let result = dispatcher
        .dispatch_and_wait(
            adapter.clone(),
            ConversationId::new(conversation),
            message.to_string(),
        )
        .await;

    for reply in adapter.take().await {
        println!("{}", reply);
    }

    result?;
    Ok(())
}

async fn cmd_config() -> Result<()> {
    let settings = config::load_settings_or_default()?;
    println!("{}", serde_json::to_string_pretty(&settings)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_start() {
        let args = Commands::try_parse_from([
            "chatgate",
            "start",
            "--port",
            "4000",
            "--max-concurrent",
            "3",
            "--no-telegram",
        ])
        .unwrap();

        match args.command {
            Command::Start {
                port,
                max_concurrent,
                no_telegram,
            } => {
                assert_eq!(port, Some(4000));
                assert_eq!(max_concurrent, Some(3));
                assert!(no_telegram);
            }
            _ => panic!("expected start"),
        }
    }

    #[test]
    fn test_parse_send() {
        let args = Commands::try_parse_from(["chatgate", "send", "cli:me", "hello there"]).unwrap();
        match args.command {
            Command::Send {
                conversation,
                message,
            } => {
                assert_eq!(conversation, "cli:me");
                assert_eq!(message, "hello there");
            }
            _ => panic!("expected send"),
        }
    }

    #[test]
    fn test_overrides() {
        let settings = apply_overrides(Settings::default(), Some(9000), Some(2)).unwrap();
        assert_eq!(settings.web.port, 9000);
        assert_eq!(settings.concurrency.max_concurrent_conversations, 2);

        assert!(apply_overrides(Settings::default(), None, Some(0)).is_err());
    }

    #[test]
    fn test_zero_capacity_file_fails_startup() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("settings.json");
        std::fs::write(&path, r#"{"concurrency": {"max_concurrent_conversations": 0}}"#).unwrap();

        assert!(startup_settings(&path, None, None).is_err());
        assert!(startup_settings(&path, None, Some(4)).is_err());
    }

    #[test]
    fn test_startup_without_file_uses_defaults() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("settings.json");

        let settings = startup_settings(&path, Some(4040), None).unwrap();
        assert_eq!(settings.concurrency.max_concurrent_conversations, 10);
        assert_eq!(settings.web.port, 4040);
    }

    #[test]
    fn test_telegram_wanted() {
        let mut settings = Settings::default();
        assert!(!telegram_wanted(&settings, false));

        settings.channels.enabled = vec!["telegram".to_string()];
        assert!(!telegram_wanted(&settings, false));

        settings.channels.telegram.bot_token = Some("123:abc".to_string());
        assert!(telegram_wanted(&settings, false));
        assert!(!telegram_wanted(&settings, true));
    }
}
