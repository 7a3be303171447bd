use std::collections::{HashSet, VecDeque};
use std::hash::Hash;

/// A FIFO queue in which every key can be enqueued at most once for the
/// lifetime of the queue.
///
/// Keys move from `pending` to `done` when dequeued; pushing a key that is in
/// either set is a no-op. This is what makes a worklist traversal over a
/// cyclic graph terminate.
///
/// # Example
///
/// ```
/// use promote_core::queue::DistinctQueue;
///
/// let mut queue: DistinctQueue<&str> = ["a", "b"].into_iter().collect();
/// assert!(!queue.push("a"));
/// assert_eq!(queue.pop(), Some("a"));
/// assert!(!queue.push("a")); // already processed
/// assert!(queue.push("c"));
/// assert_eq!(queue.pop(), Some("b"));
/// assert_eq!(queue.pop(), Some("c"));
/// assert_eq!(queue.pop(), None);
/// ```
#[derive(Debug, Clone)]
pub struct DistinctQueue<K> {
    order: VecDeque<K>,
    pending: HashSet<K>,
    done: HashSet<K>,
}

impl<K: Eq + Hash + Clone> DistinctQueue<K> {
    pub fn new() -> Self {
        Self {
            order: VecDeque::new(),
            pending: HashSet::new(),
            done: HashSet::new(),
        }
    }

    /// Enqueue `key` unless it has ever been enqueued before.
    /// Returns whether the key was accepted.
    pub fn push(&mut self, key: K) -> bool {
        if self.pending.contains(&key) || self.done.contains(&key) {
            return false;
        }
        self.pending.insert(key.clone());
        self.order.push_back(key);
        true
    }

    /// Dequeue the oldest pending key and mark it done.
    pub fn pop(&mut self) -> Option<K> {
        let key = self.order.pop_front()?;
        self.pending.remove(&key);
        self.done.insert(key.clone());
        Some(key)
    }

    /// Whether `key` has been dequeued.
    pub fn is_done(&self, key: &K) -> bool {
        self.done.contains(key)
    }

    /// Number of keys waiting to be dequeued.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Number of keys dequeued so far.
    pub fn processed(&self) -> usize {
        self.done.len()
    }
}

impl<K: Eq + Hash + Clone> Default for DistinctQueue<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Eq + Hash + Clone> FromIterator<K> for DistinctQueue<K> {
    fn from_iter<I: IntoIterator<Item = K>>(iter: I) -> Self {
        let mut queue = Self::new();
        for key in iter {
            queue.push(key);
        }
        queue
    }
}

impl<K: Eq + Hash + Clone> Extend<K> for DistinctQueue<K> {
    fn extend<I: IntoIterator<Item = K>>(&mut self, iter: I) {
        for key in iter {
            self.push(key);
        }
    }
}
