//! Core module - conversation concurrency coordination.
//!
//! This module contains the heart of chatgate's message processing:
//! - Global concurrency gate
//! - Per-conversation FIFO queues
//! - Lock manager tying both together

pub mod conversation;
pub mod gate;
pub mod lock;
pub mod queue;
pub mod stats;

pub use conversation::{ConversationId, ConversationPhase};
pub use gate::ConcurrencyGate;
pub use lock::LockManager;
pub use queue::{ConversationQueues, QueueEntry};
pub use stats::{LockStats, LockStatus};
