//! Agent execution contract: timeout, retries, and failure codes.
//!
//! The lock manager never retries; retry and timeout policy for a single
//! message lives here, inside the unit of work.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::config::Orchestrator as OrchestratorSettings;
use crate::error::{Error, Result};
use crate::providers::{Provider, ProviderError};

#[derive(Debug, Clone)]
pub struct ExecutionContract {
    pub timeout: Duration,
    pub retries: u32,
    pub retry_backoff: Duration,
}

impl Default for ExecutionContract {
    fn default() -> Self {
        Self::from_settings(&OrchestratorSettings::default())
    }
}

impl ExecutionContract {
    pub fn from_settings(settings: &OrchestratorSettings) -> Self {
        Self {
            timeout: Duration::from_secs(settings.timeout_secs),
            retries: settings.retries,
            retry_backoff: Duration::from_millis(settings.retry_backoff_ms),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureCode {
    Timeout,
    Unauthorized,
    ProviderUnavailable,
    CliMissing,
    Unknown,
}

impl FailureCode {
    /// Classify an execution failure for the user-facing notice.
    pub fn of(error: &Error) -> Self {
        match error {
            Error::Timeout(_) => FailureCode::Timeout,
            Error::Provider(ProviderError::NotAvailable(_)) => FailureCode::ProviderUnavailable,
            Error::Provider(ProviderError::IoError(e))
                if e.kind() == std::io::ErrorKind::NotFound =>
            {
                FailureCode::CliMissing
            }
            other => classify_message(&other.to_string()),
        }
    }
}

impl std::fmt::Display for FailureCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureCode::Timeout => write!(f, "timeout"),
            FailureCode::Unauthorized => write!(f, "unauthorized"),
            FailureCode::ProviderUnavailable => write!(f, "provider_unavailable"),
            FailureCode::CliMissing => write!(f, "cli_missing"),
            FailureCode::Unknown => write!(f, "unknown"),
        }
    }
}

/// Run one completion under the contract's timeout, retrying failed
/// attempts with a fixed backoff. Returns the last failure.
pub async fn execute_with_contract(
    provider: Arc<dyn Provider>,
    prompt: &str,
    model: Option<&str>,
    working_dir: Option<&Path>,
    contract: &ExecutionContract,
) -> Result<String> {
    let attempts = contract.retries + 1;
    let mut last_error = None;

    for attempt in 1..=attempts {
        let result =
            tokio::time::timeout(contract.timeout, provider.complete(prompt, model, working_dir))
                .await;

        let err = match result {
            Ok(Ok(text)) => return Ok(text),
            Ok(Err(e)) => Error::from(e),
            Err(_) => Error::Timeout(contract.timeout),
        };

        tracing::warn!(
            "Execution attempt {}/{} on {} failed: {}",
            attempt,
            attempts,
            provider.name(),
            err
        );
        last_error = Some(err);

        if attempt < attempts {
            tokio::time::sleep(contract.retry_backoff).await;
        }
    }

    Err(last_error.unwrap_or_else(|| Error::other("execution failed for unknown reason")))
}

fn classify_message(message: &str) -> FailureCode {
    let m = message.to_lowercase();
    if m.contains("unauthorized")
        || m.contains("auth")
        || m.contains("sign in")
        || m.contains("forbidden")
    {
        FailureCode::Unauthorized
    } else if m.contains("command not found") || m.contains("no such file") {
        FailureCode::CliMissing
    } else if m.contains("not available")
        || m.contains("connection")
        || m.contains("failed to connect")
    {
        FailureCode::ProviderUnavailable
    } else {
        FailureCode::Unknown
    }
}
