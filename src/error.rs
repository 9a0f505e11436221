//! Error types for chatgate.

use thiserror::Error;

use crate::core::ConversationId;
use crate::providers::provider::ProviderError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Telegram error: {0}")]
    Telegram(String),

    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// The work item was dropped before producing an outcome (it panicked or
    /// the runtime shut down underneath it).
    #[error("Work for conversation {0} was abandoned before completing")]
    WorkAbandoned(ConversationId),

    #[error("Web error: {0}")]
    Web(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    pub fn other(s: impl Into<String>) -> Self {
        Error::Other(s.into())
    }
}
