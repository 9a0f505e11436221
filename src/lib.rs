//! chatgate library root.

pub mod agent;
pub mod cli;
pub mod config;
pub mod core;
pub mod dispatch;
pub mod error;
pub mod logging;
pub mod orchestrator;
pub mod providers;
pub mod telegram;
pub mod web;

pub use cli::Commands;
pub use config::{load_settings, Settings};
pub use core::{ConversationId, ConversationPhase, LockManager, LockStats, LockStatus};
pub use dispatch::Dispatcher;
pub use error::{Error, Result};
pub use orchestrator::{Adapter, AgentOrchestrator, Orchestrator};
pub use providers::Provider;
pub use telegram::run_telegram_daemon;
pub use web::run_server;
