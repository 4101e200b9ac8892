//! Mutex-guarded hand-off collection between worker threads and the owner.

use std::sync::{Arc, Mutex, PoisonError};

/// A shared, append-only collection that workers push into and the owning
/// thread empties in one step.
///
/// Appends and drains are serialized by the mutex, so a drain observes every
/// item pushed before it and none pushed after.
pub struct ResultQueue<T> {
    items: Arc<Mutex<Vec<T>>>,
}

impl<T> ResultQueue<T> {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self {
            items: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Appends one item.
    pub fn push(&self, item: T) {
        self.items
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(item);
    }

    /// Appends every item from `items` under a single lock acquisition.
    pub fn extend<I: IntoIterator<Item = T>>(&self, items: I) {
        self.items
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend(items);
    }

    /// Takes everything currently queued, in push order.
    pub fn drain(&self) -> Vec<T> {
        std::mem::take(&mut *self.items.lock().unwrap_or_else(PoisonError::into_inner))
    }

    /// Number of items waiting.
    pub fn len(&self) -> usize {
        self.items
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns `true` when nothing is waiting.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T> Default for ResultQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for ResultQueue<T> {
    fn clone(&self) -> Self {
        Self {
            items: self.items.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drain_empties_in_push_order() {
        let queue = ResultQueue::new();
        queue.push(1);
        queue.extend([2, 3]);
        assert_eq!(queue.len(), 3);
        assert_eq!(queue.drain(), vec![1, 2, 3]);
        assert!(queue.is_empty());
    }

    #[test]
    fn workers_append_concurrently() {
        let queue = ResultQueue::new();
        let handles: Vec<_> = (0..4)
            .map(|worker| {
                let queue = queue.clone();
                std::thread::spawn(move || {
                    for i in 0..100 {
                        queue.push(worker * 100 + i);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let mut drained = queue.drain();
        drained.sort_unstable();
        assert_eq!(drained, (0..400).collect::<Vec<_>>());
    }
}
