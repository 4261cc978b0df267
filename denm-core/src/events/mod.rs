//! ## denm-core::events
//! **Bounded event bus using crossbeam's segmented queue**
//!
//! Carries transport indications between the radio medium and the
//! stations. Producers see `QueueFull` instead of unbounded growth.

use crossbeam::queue::SegQueue;
use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum EventError {
    #[error("Event queue capacity exceeded")]
    QueueFull,
}

/// Event stamped with the virtual time it becomes deliverable.
#[derive(Clone, Debug)]
pub struct TimedEvent<T> {
    pub due_ns: u64,
    pub event: T,
}

pub struct EventBus<T> {
    queue: SegQueue<T>,
    capacity: usize,
}

impl<T> EventBus<T> {
    /// Create new event bus with fixed capacity
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            queue: SegQueue::new(),
            capacity,
        }
    }

    pub fn event_enqueue(&self, event: T) -> Result<(), EventError> {
        if self.queue.len() >= self.capacity {
            return Err(EventError::QueueFull);
        }
        self.queue.push(event);
        Ok(())
    }

    pub fn event_dequeue(&self) -> Option<T> {
        self.queue.pop()
    }

    /// Drain everything queued so far in FIFO order.
    pub fn event_drain(&self) -> Vec<T> {
        let mut drained = Vec::with_capacity(self.queue.len());
        while let Some(event) = self.queue.pop() {
            drained.push(event);
        }
        drained
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
