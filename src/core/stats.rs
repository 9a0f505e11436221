//! Live scheduler statistics.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Outcome counters, updated by running work without touching the queue lock.
#[derive(Debug, Default)]
pub struct LockCounters {
    completed: AtomicU64,
    failed: AtomicU64,
}

impl LockCounters {
    pub fn record_success(&self) {
        self.completed.fetch_add(1, Ordering::Relaxed);
    }

    /// Work that returned an error, panicked, or was dropped mid-flight.
    pub fn record_failure(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn completed(&self) -> u64 {
        self.completed.load(Ordering::Relaxed)
    }

    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }
}

/// Cheap liveness view, answerable without taking any lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockStatus {
    pub max_concurrent: usize,
    pub current_active: usize,
    pub queued_total: usize,
}

impl std::fmt::Display for LockStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "active {}/{}, queued {}",
            self.current_active, self.max_concurrent, self.queued_total
        )
    }
}

/// Point-in-time snapshot of the scheduler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockStats {
    pub max_concurrent: usize,
    pub current_active: usize,
    pub queued_total: usize,
    pub per_conversation_queue_depths: BTreeMap<String, usize>,
    pub active_conversations: usize,
    pub total_completed: u64,
    pub total_failed: u64,
}

impl std::fmt::Display for LockStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Lock Stats:")?;
        writeln!(f, "  Max concurrent: {}", self.max_concurrent)?;
        writeln!(f, "  Active:         {}", self.current_active)?;
        writeln!(f, "  Queued:         {}", self.queued_total)?;
        writeln!(f, "  Completed:      {}", self.total_completed)?;
        write!(f, "  Failed:         {}", self.total_failed)?;
        for (conversation, depth) in &self.per_conversation_queue_depths {
            write!(f, "\n    {}: {} waiting", conversation, depth)?;
        }
        Ok(())
    }
}
