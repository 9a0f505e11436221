//! Conversation lock manager.
//!
//! Every inbound message for a conversation goes through
//! [`LockManager::acquire_lock`]. The manager guarantees:
//! - at most one unit of work runs per conversation, in submission order
//! - at most `max_concurrent` units of work run across all conversations
//! - slots are given back when work finishes, fails or panics
//!
//! Admission and promotion are synchronous and happen under one short-lived
//! mutex; the work itself runs on its own Tokio task.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::oneshot;

use crate::config::Settings;
use crate::error::{Error, Result};

use super::conversation::{ConversationId, ConversationPhase};
use super::gate::ConcurrencyGate;
use super::queue::{boxed_work, ConversationQueues, Delivery, QueueEntry};
use super::stats::{LockCounters, LockStats, LockStatus};

/// Process-wide scheduler. Cheap to clone; all clones share one state.
#[derive(Clone)]
pub struct LockManager {
    shared: Arc<Shared>,
}

struct Shared {
    gate: ConcurrencyGate,
    queues: Mutex<ConversationQueues>,
    /// Mirror of `queues.queued_total()` for lock-free status reads.
    queued: AtomicUsize,
    counters: Arc<LockCounters>,
}

impl LockManager {
    /// Create a manager admitting at most `max_concurrent` units of work.
    pub fn new(max_concurrent: usize) -> Result<Self> {
        let gate = ConcurrencyGate::new(max_concurrent)?;

        tracing::info!("Lock manager ready: max {} concurrent conversations", max_concurrent);

        Ok(Self {
            shared: Arc::new(Shared {
                gate,
                queues: Mutex::new(ConversationQueues::new()),
                queued: AtomicUsize::new(0),
                counters: Arc::new(LockCounters::default()),
            }),
        })
    }

    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Self::new(settings.concurrency.max_concurrent_conversations)
    }

    /// Queue `work` under `conversation_id` and run it once the conversation
    /// is idle and a global slot is free.
    ///
    /// The work is queued immediately, before the returned future is polled,
    /// so submission order is call order. Dropping the returned future does not
    /// cancel the work. The future resolves with exactly the work's outcome, or
    /// [`Error::WorkAbandoned`] if the work panicked. By the time an outcome is
    /// delivered the conversation and its global slot have been released.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn acquire_lock<F, Fut, T>(
        &self,
        conversation_id: impl Into<ConversationId>,
        work: F,
    ) -> impl Future<Output = Result<T>> + Send + 'static
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
        T: Send + 'static,
    {
        let conversation_id = conversation_id.into();
        let (tx, rx) = oneshot::channel();
        let counters = Arc::clone(&self.shared.counters);

        let job = boxed_work(move || async move {
            let outcome = work().await;
            match &outcome {
                Ok(_) => counters.record_success(),
                Err(_) => counters.record_failure(),
            }
            let delivery: Delivery = Box::new(move || {
                // The caller may have stopped waiting; the outcome is dropped then.
                let _ = tx.send(outcome);
            });
            delivery
        });

        self.shared.enqueue(QueueEntry::new(conversation_id.clone(), job));

        async move {
            match rx.await {
                Ok(outcome) => outcome,
                Err(_) => Err(Error::WorkAbandoned(conversation_id)),
            }
        }
    }

    /// Fire-and-forget variant of [`acquire_lock`](Self::acquire_lock).
    ///
    /// Failures are logged instead of returned.
    pub fn submit<F, Fut, T>(&self, conversation_id: impl Into<ConversationId>, work: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
        T: Send + 'static,
    {
        let conversation_id = conversation_id.into();
        let outcome = self.acquire_lock(conversation_id.clone(), work);

        tokio::spawn(async move {
            if let Err(e) = outcome.await {
                tracing::error!(conversation = %conversation_id, "Work failed: {}", e);
            }
        });
    }

    /// Snapshot of the scheduler. Takes the queue lock briefly.
    pub fn stats(&self) -> LockStats {
        let queues = self.shared.lock_queues();

        LockStats {
            max_concurrent: self.shared.gate.capacity(),
            current_active: self.shared.gate.in_use(),
            queued_total: queues.queued_total(),
            per_conversation_queue_depths: queues.depths(),
            active_conversations: queues.active_count(),
            total_completed: self.shared.counters.completed(),
            total_failed: self.shared.counters.failed(),
        }
    }

    /// Liveness view. Never blocks.
    pub fn status(&self) -> LockStatus {
        LockStatus {
            max_concurrent: self.shared.gate.capacity(),
            current_active: self.shared.gate.in_use(),
            queued_total: self.shared.queued.load(Ordering::Acquire),
        }
    }

    pub fn phase(&self, conversation_id: &ConversationId) -> ConversationPhase {
        self.shared.lock_queues().phase(conversation_id)
    }

    pub fn max_concurrent(&self) -> usize {
        self.shared.gate.capacity()
    }
}

impl Shared {
    fn lock_queues(&self) -> MutexGuard<'_, ConversationQueues> {
        // Nothing panics while the lock is held, so a poisoned lock still
        // holds consistent state.
        self.queues.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn enqueue(self: &Arc<Self>, entry: QueueEntry) {
        let conversation_id = entry.conversation_id.clone();
        let task_id = entry.id.clone();

        let (depth, runnable) = {
            let mut queues = self.lock_queues();
            let depth = queues.enqueue(entry);
            (depth, self.take_runnable(&mut queues))
        };

        tracing::debug!(
            conversation = %conversation_id,
            task = %task_id,
            depth,
            "Enqueued work"
        );

        self.spawn_all(runnable);
    }

    /// Work finished (or was dropped): give back both slots and promote.
    fn finish(self: &Arc<Self>, conversation_id: &ConversationId) {
        let runnable = {
            let mut queues = self.lock_queues();
            self.gate.release();
            queues.mark_done(conversation_id);
            self.take_runnable(&mut queues)
        };

        self.spawn_all(runnable);
    }

    /// Pop every entry that may start now, longest-waiting conversation
    /// first, consuming one gate slot each.
    fn take_runnable(&self, queues: &mut ConversationQueues) -> Vec<QueueEntry> {
        let mut runnable = Vec::new();

        while let Some(conversation_id) = queues.next_ready().cloned() {
            if !self.gate.try_admit() {
                break;
            }

            match queues.dequeue_next_if_idle(&conversation_id) {
                Some(entry) => runnable.push(entry),
                None => {
                    // The ready index only holds idle conversations with work.
                    tracing::error!(conversation = %conversation_id, "Ready conversation had nothing to run");
                    self.gate.release();
                    break;
                }
            }
        }

        self.queued.store(queues.queued_total(), Ordering::Release);
        runnable
    }

    fn spawn_all(self: &Arc<Self>, runnable: Vec<QueueEntry>) {
        for entry in runnable {
            tracing::debug!(
                conversation = %entry.conversation_id,
                task = %entry.id,
                waited_ms = entry.waited_ms(),
                "Starting work"
            );

            let mut handle = CompletionHandle {
                shared: Arc::clone(self),
                conversation_id: entry.conversation_id.clone(),
                task_id: entry.id.clone(),
                finished: false,
            };

            tokio::spawn(async move {
                let delivery = entry.start().await;
                handle.finished = true;
                drop(handle);
                delivery();
            });
        }
    }
}

/// Held by running work - releases its slots when dropped.
struct CompletionHandle {
    shared: Arc<Shared>,
    conversation_id: ConversationId,
    task_id: String,
    finished: bool,
}

impl Drop for CompletionHandle {
    fn drop(&mut self) {
        if self.finished {
            tracing::debug!(
                conversation = %self.conversation_id,
                task = %self.task_id,
                "Work finished"
            );
        } else {
            self.shared.counters.record_failure();
            tracing::warn!(
                conversation = %self.conversation_id,
                task = %self.task_id,
                "Work abandoned before completing"
            );
        }

        self.shared.finish(&self.conversation_id);
    }
}
