//! Per-conversation FIFO queues.
//!
//! Each conversation owns a FIFO of pending entries and an active flag. A
//! conversation runs at most one entry at a time; different conversations
//! never block each other here. The only cross-conversation constraint is the
//! global [`ConcurrencyGate`](super::gate::ConcurrencyGate), applied by the
//! lock manager.
//!
//! Eligible conversations (idle with a non-empty queue) are kept in a ready
//! index ordered by the moment they became eligible, so the one that has
//! waited longest is promoted first:
//! - a conversation becomes eligible when work arrives while it is idle, or
//!   when its active entry finishes and more work is waiting
//! - a busy conversation that finishes goes to the back of the line behind
//!   conversations that were already waiting

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::future::Future;
use std::pin::Pin;

use chrono::{DateTime, Utc};

use super::conversation::{ConversationId, ConversationPhase, ConversationState};

/// Hands a finished unit of work's outcome to whoever is waiting for it.
///
/// Returned by the work instead of being run inline so the scheduler can free
/// the conversation and its global slot before the caller is woken.
pub type Delivery = Box<dyn FnOnce() + Send + 'static>;

pub type BoxedFuture = Pin<Box<dyn Future<Output = Delivery> + Send + 'static>>;

/// A zero-argument asynchronous unit of work, type-erased for queueing.
pub type BoxedWork = Box<dyn FnOnce() -> BoxedFuture + Send + 'static>;

/// Erase a closure returning a future into a [`BoxedWork`].
pub fn boxed_work<F, Fut>(work: F) -> BoxedWork
where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = Delivery> + Send + 'static,
{
    Box::new(move || -> BoxedFuture { Box::pin(work()) })
}

/// One pending unit of work.
pub struct QueueEntry {
    /// Unique task ID (ULID), used for log correlation.
    pub id: String,

    /// Conversation the work belongs to.
    pub conversation_id: ConversationId,

    /// When the work was submitted.
    pub enqueued_at: DateTime<Utc>,

    seq: u64,
    work: BoxedWork,
}

impl QueueEntry {
    /// Create a new entry stamped with the current time.
    pub fn new(conversation_id: ConversationId, work: BoxedWork) -> Self {
        Self {
            id: ulid::Ulid::new().to_string(),
            conversation_id,
            enqueued_at: Utc::now(),
            seq: 0,
            work,
        }
    }

    /// Milliseconds since the entry was submitted.
    pub fn waited_ms(&self) -> i64 {
        (Utc::now() - self.enqueued_at).num_milliseconds()
    }

    /// Consume the entry and produce the future that performs the work.
    pub fn start(self) -> BoxedFuture {
        (self.work)()
    }
}

impl fmt::Debug for QueueEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueueEntry")
            .field("id", &self.id)
            .field("conversation_id", &self.conversation_id)
            .field("enqueued_at", &self.enqueued_at)
            .field("seq", &self.seq)
            .finish_non_exhaustive()
    }
}

/// All conversation queues plus the ready index.
#[derive(Debug, Default)]
pub struct ConversationQueues {
    conversations: HashMap<ConversationId, ConversationState>,

    /// Eligible conversations keyed by the sequence number at which they
    /// became eligible.
    ready: BTreeMap<u64, ConversationId>,

    next_seq: u64,
    queued_total: usize,
}

impl ConversationQueues {
    pub fn new() -> Self {
        Self::default()
    }

    fn bump_seq(&mut self) -> u64 {
        self.next_seq += 1;
        self.next_seq
    }

    /// Append an entry to its conversation's FIFO.
    ///
    /// Returns the conversation's queue depth after the append. The caller is
    /// expected to run a promotion pass afterwards.
    pub fn enqueue(&mut self, mut entry: QueueEntry) -> usize {
        let seq = self.bump_seq();
        entry.seq = seq;

        let id = entry.conversation_id.clone();
        let state = self.conversations.entry(id.clone()).or_default();
        state.queue.push_back(entry);
        self.queued_total += 1;

        if !state.active && state.ready_key.is_none() {
            state.ready_key = Some(seq);
            self.ready.insert(seq, id);
        }

        state.queue.len()
    }

    /// The eligible conversation that has waited longest, if any.
    pub fn next_ready(&self) -> Option<&ConversationId> {
        self.ready.first_key_value().map(|(_, id)| id)
    }

    /// Pop the head of `id`'s queue if the conversation is idle, marking it
    /// active.
    pub fn dequeue_next_if_idle(&mut self, id: &ConversationId) -> Option<QueueEntry> {
        let state = self.conversations.get_mut(id)?;
        if state.active {
            return None;
        }

        let entry = state.queue.pop_front()?;
        state.active = true;
        if let Some(key) = state.ready_key.take() {
            self.ready.remove(&key);
        }
        self.queued_total -= 1;

        Some(entry)
    }

    /// Clear `id`'s active flag.
    ///
    /// If more work is waiting the conversation re-enters the ready index at
    /// the back; otherwise its state is pruned. The caller is expected to run
    /// a promotion pass afterwards.
    pub fn mark_done(&mut self, id: &ConversationId) {
        let seq = self.bump_seq();

        let Some(state) = self.conversations.get_mut(id) else {
            tracing::warn!(conversation = %id, "mark_done for unknown conversation");
            return;
        };
        state.active = false;

        if state.is_prunable() {
            self.conversations.remove(id);
        } else if state.ready_key.is_none() {
            state.ready_key = Some(seq);
            self.ready.insert(seq, id.clone());
        }
    }

    pub fn phase(&self, id: &ConversationId) -> ConversationPhase {
        self.conversations
            .get(id)
            .map_or(ConversationPhase::Idle, ConversationState::phase)
    }

    /// Queue depth per conversation, for conversations with waiting work.
    pub fn depths(&self) -> BTreeMap<String, usize> {
        self.conversations
            .iter()
            .filter(|(_, state)| state.depth() > 0)
            .map(|(id, state)| (id.to_string(), state.depth()))
            .collect()
    }

    /// Entries waiting across all conversations (excludes executing ones).
    pub fn queued_total(&self) -> usize {
        self.queued_total
    }

    pub fn active_count(&self) -> usize {
        self.conversations.values().filter(|s| s.is_active()).count()
    }

    /// Number of tracked (non-idle) conversations.
    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.conversations.len()
    }

    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.conversations.is_empty()
    }
}
