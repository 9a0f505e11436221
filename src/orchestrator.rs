//! Message orchestration: the unit of work run under a conversation lock.
//!
//! Platform adapters own the outbound side of a chat (how a reply gets back to
//! the user). The orchestrator turns one inbound message into one reply and
//! hands it to the adapter. Neither knows about scheduling; the
//! [`Dispatcher`](crate::dispatch::Dispatcher) wraps every call in the lock
//! manager.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::agent::{execute_with_contract, ExecutionContract, FailureCode};
use crate::config::Settings;
use crate::core::ConversationId;
use crate::error::Result;
use crate::providers::{self, Provider};

/// Outbound side of a chat platform.
#[async_trait]
pub trait Adapter: Send + Sync {
    /// Platform name, e.g. "telegram".
    fn platform(&self) -> &str;

    /// Deliver a reply to the conversation.
    async fn send_reply(&self, conversation_id: &ConversationId, text: &str) -> Result<()>;
}

/// Handles a single inbound message end to end.
#[async_trait]
pub trait Orchestrator: Send + Sync {
    async fn handle_message(
        &self,
        adapter: Arc<dyn Adapter>,
        conversation_id: &ConversationId,
        text: &str,
    ) -> Result<String>;
}

/// Orchestrator backed by an AI provider.
pub struct AgentOrchestrator {
    provider: Arc<dyn Provider>,
    model: Option<String>,
    working_dir: Option<PathBuf>,
    contract: ExecutionContract,
}

impl AgentOrchestrator {
    pub fn new(provider: Arc<dyn Provider>, contract: ExecutionContract) -> Self {
        Self {
            provider,
            model: None,
            working_dir: None,
            contract,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            provider: providers::get_current_provider(settings),
            model: settings.models.model.clone(),
            working_dir: settings.orchestrator.working_directory.clone(),
            contract: ExecutionContract::from_settings(&settings.orchestrator),
        }
    }

    pub fn provider(&self) -> &Arc<dyn Provider> {
        &self.provider
    }
}

#[async_trait]
impl Orchestrator for AgentOrchestrator {
    async fn handle_message(
        &self,
        adapter: Arc<dyn Adapter>,
        conversation_id: &ConversationId,
        text: &str,
    ) -> Result<String> {
        tracing::info!(
            conversation = %conversation_id,
            platform = adapter.platform(),
            provider = self.provider.name(),
            "Handling message ({} chars)",
            text.len()
        );

        let result = execute_with_contract(
            Arc::clone(&self.provider),
            text,
            self.model.as_deref(),
            self.working_dir.as_deref(),
            &self.contract,
        )
        .await;

        match result {
            Ok(reply) => {
                adapter.send_reply(conversation_id, &reply).await?;
                Ok(reply)
            }
            Err(e) => {
                let notice = format!(
                    "Sorry, I couldn't finish that ({}). Please try again.",
                    FailureCode::of(&e)
                );
                if let Err(send_err) = adapter.send_reply(conversation_id, &notice).await {
                    tracing::warn!(
                        conversation = %conversation_id,
                        "Failed to send failure notice: {}",
                        send_err
                    );
                }
                Err(e)
            }
        }
    }
}

/// Adapter that keeps replies in memory, for callers that answer
/// synchronously (the HTTP harness and the CLI).
pub struct BufferAdapter {
    platform: String,
    replies: Mutex<Vec<String>>,
}

impl BufferAdapter {
    pub fn new(platform: impl Into<String>) -> Self {
        Self {
            platform: platform.into(),
            replies: Mutex::new(Vec::new()),
        }
    }

    /// Drain collected replies.
    pub async fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.replies.lock().await)
    }
}

#[async_trait]
impl Adapter for BufferAdapter {
    fn platform(&self) -> &str {
        &self.platform
    }

    async fn send_reply(&self, _conversation_id: &ConversationId, text: &str) -> Result<()> {
        self.replies.lock().await.push(text.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::providers::ProviderError;
    use std::path::Path;
    use std::time::Duration;

    struct EchoProvider {
        fail: bool,
    }

    #[async_trait]
    impl Provider for EchoProvider {
        fn name(&self) -> &str {
            "echo"
        }

        async fn is_available(&self) -> bool {
            true
        }

        async fn complete(
            &self,
            prompt: &str,
            _model: Option<&str>,
            _working_dir: Option<&Path>,
        ) -> crate::providers::Result<String> {
            if self.fail {
                Err(ProviderError::NotAvailable("echo".to_string()))
            } else {
                Ok(prompt.to_uppercase())
            }
        }

        fn default_model(&self) -> Option<&str> {
            None
        }
    }

    fn orchestrator(fail: bool) -> AgentOrchestrator {
        AgentOrchestrator::new(
            Arc::new(EchoProvider { fail }),
            ExecutionContract {
                timeout: Duration::from_secs(1),
                retries: 0,
                retry_backoff: Duration::from_millis(1),
            },
        )
    }

    #[tokio::test]
    async fn test_reply_goes_through_adapter() {
        let adapter = Arc::new(BufferAdapter::new("test"));
        let conversation = ConversationId::for_chat("test", 1);

        let reply = orchestrator(false)
            .handle_message(adapter.clone(), &conversation, "hello")
            .await
            .unwrap();

        assert_eq!(reply, "HELLO");
        assert_eq!(adapter.take().await, vec!["HELLO".to_string()]);
        assert!(adapter.take().await.is_empty());
    }

    #[tokio::test]
    async fn test_failure_notifies_user_and_propagates() {
        let adapter = Arc::new(BufferAdapter::new("test"));
        let conversation = ConversationId::for_chat("test", 1);

        let err = orchestrator(true)
            .handle_message(adapter.clone(), &conversation, "hello")
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Provider(ProviderError::NotAvailable(_))));
        let replies = adapter.take().await;
        assert_eq!(replies.len(), 1);
        assert!(replies[0].contains("provider_unavailable"));
    }

    #[test]
    fn test_from_settings_picks_provider() {
        let mut settings = Settings::default();
        settings.models.provider = "ollama".to_string();

        let orchestrator = AgentOrchestrator::from_settings(&settings);
        assert_eq!(orchestrator.provider().name(), "ollama");
    }
}
