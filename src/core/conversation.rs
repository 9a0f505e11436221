//! Conversation identity and per-conversation scheduling state.

use std::collections::VecDeque;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::queue::QueueEntry;

/// Opaque key for one chat thread, unique per platform and chat.
///
/// The scheduler never looks inside it; adapters build it with
/// [`ConversationId::for_chat`] so ids from different platforms cannot
/// collide.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationId(String);

impl ConversationId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Build the id for a chat on a given platform, e.g. `telegram:42`.
    pub fn for_chat(platform: &str, chat: impl fmt::Display) -> Self {
        Self(format!("{}:{}", platform, chat))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ConversationId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for ConversationId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Where a conversation sits in its lifecycle.
///
/// `Idle -> Queued -> Active -> (Queued | Idle)`. Idle conversations hold no
/// state and are pruned from the queue map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationPhase {
    Idle,
    Queued,
    Active,
}

impl fmt::Display for ConversationPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConversationPhase::Idle => write!(f, "idle"),
            ConversationPhase::Queued => write!(f, "queued"),
            ConversationPhase::Active => write!(f, "active"),
        }
    }
}

/// Pending work and the active flag for one conversation.
#[derive(Debug, Default)]
pub struct ConversationState {
    /// Waiting entries, oldest first.
    pub(crate) queue: VecDeque<QueueEntry>,

    /// True while exactly one entry of this conversation is executing.
    pub(crate) active: bool,

    /// Key in the ready index while the conversation is eligible to run.
    pub(crate) ready_key: Option<u64>,
}

impl ConversationState {
    pub fn phase(&self) -> ConversationPhase {
        if self.active {
            ConversationPhase::Active
        } else if !self.queue.is_empty() {
            ConversationPhase::Queued
        } else {
            ConversationPhase::Idle
        }
    }

    pub fn depth(&self) -> usize {
        self.queue.len()
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Idle and nothing waiting: safe to drop.
    pub fn is_prunable(&self) -> bool {
        !self.active && self.queue.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversation_id() {
        let id = ConversationId::for_chat("telegram", 12345);
        assert_eq!(id.as_str(), "telegram:12345");
        assert_eq!(id.to_string(), "telegram:12345");

        let other: ConversationId = "telegram:12345".into();
        assert_eq!(id, other);
    }

    #[test]
    fn test_conversation_id_serializes_as_string() {
        let id = ConversationId::new("slack:C01");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"slack:C01\"");
    }

    #[test]
    fn test_fresh_state_is_idle() {
        let state = ConversationState::default();
        assert_eq!(state.phase(), ConversationPhase::Idle);
        assert!(state.is_prunable());
        assert_eq!(state.depth(), 0);
    }
}
