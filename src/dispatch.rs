//! Routes inbound messages from every platform through the lock manager.
//!
//! Adapters hold a [`Dispatcher`], never the orchestrator itself, so every
//! message is serialized per conversation and counted against the global
//! limit no matter where it came from.

use std::sync::Arc;

use crate::core::{ConversationId, LockManager};
use crate::error::Result;
use crate::orchestrator::{Adapter, Orchestrator};

#[derive(Clone)]
pub struct Dispatcher {
    locks: LockManager,
    orchestrator: Arc<dyn Orchestrator>,
}

impl Dispatcher {
    pub fn new(locks: LockManager, orchestrator: Arc<dyn Orchestrator>) -> Self {
        Self {
            locks,
            orchestrator,
        }
    }

    pub fn locks(&self) -> &LockManager {
        &self.locks
    }

    /// Queue the message and return immediately.
    ///
    /// The default for webhook-style callers that must acknowledge fast.
    /// Failures are logged by the lock manager.
    pub fn dispatch(&self, adapter: Arc<dyn Adapter>, conversation_id: ConversationId, text: String) {
        let orchestrator = Arc::clone(&self.orchestrator);
        let id = conversation_id.clone();

        tracing::debug!(
            conversation = %conversation_id,
            platform = adapter.platform(),
            "Dispatching message"
        );

        self.locks.submit(conversation_id, move || async move {
            orchestrator.handle_message(adapter, &id, &text).await
        });
    }

    /// Queue the message and wait for the orchestrator's reply.
    pub async fn dispatch_and_wait(
        &self,
        adapter: Arc<dyn Adapter>,
        conversation_id: ConversationId,
        text: String,
    ) -> Result<String> {
        let orchestrator = Arc::clone(&self.orchestrator);
        let id = conversation_id.clone();

        self.locks
            .acquire_lock(conversation_id, move || async move {
                orchestrator.handle_message(adapter, &id, &text).await
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::orchestrator::BufferAdapter;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Tracks how many messages per conversation are in flight at once.
    #[derive(Default)]
    struct CountingOrchestrator {
        in_flight: Mutex<HashMap<String, usize>>,
        peak: Mutex<usize>,
    }

    #[async_trait]
    impl Orchestrator for CountingOrchestrator {
        async fn handle_message(
            &self,
            adapter: Arc<dyn Adapter>,
            conversation_id: &ConversationId,
            text: &str,
        ) -> Result<String> {
            {
                let mut in_flight = self.in_flight.lock().unwrap();
                let n = in_flight.entry(conversation_id.to_string()).or_default();
                *n += 1;
                let mut peak = self.peak.lock().unwrap();
                *peak = (*peak).max(*n);
            }

            tokio::time::sleep(Duration::from_millis(10)).await;

            *self
                .in_flight
                .lock()
                .unwrap()
                .get_mut(conversation_id.as_str())
                .unwrap() -= 1;

            if text == "fail" {
                return Err(Error::other("failed on purpose"));
            }

            let reply = format!("re: {}", text);
            adapter.send_reply(conversation_id, &reply).await?;
            Ok(reply)
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_dispatch_and_wait_returns_reply() {
        let dispatcher = Dispatcher::new(
            LockManager::new(2).unwrap(),
            Arc::new(CountingOrchestrator::default()),
        );
        let adapter = Arc::new(BufferAdapter::new("test"));

        let reply = dispatcher
            .dispatch_and_wait(adapter.clone(), "test:1".into(), "hi".to_string())
            .await
            .unwrap();

        assert_eq!(reply, "re: hi");
        assert_eq!(adapter.take().await, vec!["re: hi".to_string()]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_dispatch_serializes_per_conversation() {
        let orchestrator = Arc::new(CountingOrchestrator::default());
        let dispatcher = Dispatcher::new(LockManager::new(8).unwrap(), orchestrator.clone());
        let adapter = Arc::new(BufferAdapter::new("test"));

        for i in 0..5 {
            dispatcher.dispatch(adapter.clone(), "test:1".into(), format!("m{i}"));
        }

        // A waited call on the same conversation lands behind the others.
        let last = dispatcher
            .dispatch_and_wait(adapter.clone(), "test:1".into(), "last".to_string())
            .await
            .unwrap();

        assert_eq!(last, "re: last");
        assert_eq!(*orchestrator.peak.lock().unwrap(), 1);
        let replies = adapter.take().await;
        assert_eq!(
            replies,
            vec!["re: m0", "re: m1", "re: m2", "re: m3", "re: m4", "re: last"]
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_failed_message_does_not_wedge_conversation() {
        let dispatcher = Dispatcher::new(
            LockManager::new(1).unwrap(),
            Arc::new(CountingOrchestrator::default()),
        );
        let adapter = Arc::new(BufferAdapter::new("test"));

        let err = dispatcher
            .dispatch_and_wait(adapter.clone(), "test:1".into(), "fail".to_string())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Other(_)));

        let reply = dispatcher
            .dispatch_and_wait(adapter.clone(), "test:1".into(), "again".to_string())
            .await
            .unwrap();
        assert_eq!(reply, "re: again");
        assert_eq!(dispatcher.locks().status().current_active, 0);
    }
}
