//! Drop-Oldest Hand-off Queue
//!
//! Bounded queue between the render thread and the encoder workers. A push
//! into a full queue evicts the oldest item; the newest always gets in.
//! Locks are held only for the deque operation itself.

use std::collections::VecDeque;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};

struct QueueState<T> {
    items: VecDeque<T>,
    closed: bool,
}

/// Bounded FIFO favouring recency over completeness.
pub struct DropOldestQueue<T> {
    capacity: usize,
    state: Mutex<QueueState<T>>,
    ready: Condvar,
}

/// Result of a push.
#[derive(Debug)]
pub enum PushOutcome<T> {
    /// Stored without eviction.
    Queued,
    /// Stored after evicting the returned oldest item.
    Evicted(T),
    /// Queue closed; the item is handed back.
    Closed(T),
}

impl<T> DropOldestQueue<T> {
    /// Create a queue holding at most `capacity` items (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            state: Mutex::new(QueueState {
                items: VecDeque::with_capacity(capacity),
                closed: false,
            }),
            ready: Condvar::new(),
        }
    }

    /// Maximum items held.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Push the newest item, evicting the oldest when full.
    pub fn push(&self, item: T) -> PushOutcome<T> {
        let outcome = {
            let mut state = self.state.lock();
            if state.closed {
                return PushOutcome::Closed(item);
            }
            let evicted = if state.items.len() >= self.capacity {
                state.items.pop_front()
            } else {
                None
            };
            state.items.push_back(item);
            match evicted {
                Some(old) => PushOutcome::Evicted(old),
                None => PushOutcome::Queued,
            }
        };
        self.ready.notify_one();
        outcome
    }

    /// Pop the oldest item, waiting up to `timeout`.
    ///
    /// Returns `None` on timeout, or once the queue is closed and empty.
    pub fn pop_timeout(&self, timeout: Duration) -> Option<T> {
        let mut state = self.state.lock();
        if state.items.is_empty() && !state.closed {
            self.ready.wait_for(&mut state, timeout);
        }
        state.items.pop_front()
    }

    /// Non-blocking pop.
    pub fn try_pop(&self) -> Option<T> {
        self.state.lock().items.pop_front()
    }

    /// Refuse further pushes and wake every waiter.
    ///
    /// Items already queued remain poppable.
    pub fn close(&self) {
        self.state.lock().closed = true;
        self.ready.notify_all();
    }

    /// Whether [`Self::close`] was called.
    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    /// Items currently queued.
    pub fn len(&self) -> usize {
        self.state.lock().items.len()
    }

    /// True when nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Discard every queued item.
    pub fn clear(&self) -> usize {
        let mut state = self.state.lock();
        let count = state.items.len();
        state.items.clear();
        count
    }
}
