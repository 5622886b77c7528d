//! Bounded, lossy FIFO of failures captured off the caller's path.

use std::{
    collections::VecDeque,
    sync::{Mutex, PoisonError},
};

/// Default number of retained failures.
pub const DEFAULT_CAPACITY: usize = 10;

/// Capacity-bounded failure queue.
///
/// When full, `push` evicts the oldest entry: under a burst of failures
/// the most recent ones are kept and older ones are silently dropped.
pub struct BoundedFailureQueue<E> {
    inner: Mutex<VecDeque<E>>,
    capacity: usize,
}

impl<E> Default for BoundedFailureQueue<E> {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl<E> BoundedFailureQueue<E> {
    /// Create a queue holding at most `capacity` failures (minimum 1).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            inner: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    /// Append a failure, evicting the oldest while at capacity.
    pub fn push(&self, error: E) {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        while inner.len() >= self.capacity {
            if inner.pop_front().is_none() {
                break;
            }
        }
        inner.push_back(error);
    }

    /// Remove and return the oldest failure.
    pub fn pop(&self) -> Option<E> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
    }

    /// Number of queued failures.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Whether nothing is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Maximum number of retained failures.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }
}
