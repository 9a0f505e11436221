//! AI provider trait for chatgate.

use async_trait::async_trait;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Provider not available: {0}")]
    NotAvailable(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Empty response from {0}")]
    EmptyResponse(String),
}

pub type Result<T> = std::result::Result<T, ProviderError>;

/// AI provider trait.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Provider name.
    fn name(&self) -> &str;

    /// Check if the provider is available (CLI installed or API reachable).
    async fn is_available(&self) -> bool;

    /// Complete a prompt.
    async fn complete(
        &self,
        prompt: &str,
        model: Option<&str>,
        working_dir: Option<&Path>,
    ) -> Result<String>;

    /// Get the default model.
    fn default_model(&self) -> Option<&str>;
}
