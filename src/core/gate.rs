//! Global concurrency gate.
//!
//! A bounded counter shared by every conversation. A slot is held for the
//! whole time a unit of work executes.

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::Error;

/// Bounded counter admitting at most `capacity` executing tasks.
#[derive(Debug)]
pub struct ConcurrencyGate {
    capacity: usize,
    in_use: AtomicUsize,
}

impl ConcurrencyGate {
    /// Create a gate with a fixed capacity.
    ///
    /// A capacity of zero would never admit anything and wedge every
    /// conversation, so it is rejected here.
    pub fn new(capacity: usize) -> Result<Self, Error> {
        if capacity == 0 {
            return Err(Error::Config(
                "max_concurrent_conversations must be a positive integer".to_string(),
            ));
        }

        Ok(Self {
            capacity,
            in_use: AtomicUsize::new(0),
        })
    }

    /// Take a slot if one is free. Never blocks.
    pub fn try_admit(&self) -> bool {
        self.in_use
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                (n < self.capacity).then_some(n + 1)
            })
            .is_ok()
    }

    /// Return a slot. Saturates at zero.
    pub fn release(&self) {
        let released = self
            .in_use
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
            .is_ok();

        if !released {
            tracing::warn!("Concurrency gate released with no slot in use");
        }
    }

    pub fn in_use(&self) -> usize {
        self.in_use.load(Ordering::Acquire)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
