//! Typed FIFO queue used for every kernel container.
//!
//! Ready queues, the send/receive-blocked queues, semaphore wait queues and
//! the mailbox all share one shape: items join at the arrival end, leave from
//! the service end, and can be searched and removed by predicate.

use std::collections::VecDeque;

/// A first-in-first-out queue with predicate search and removal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FifoQueue<T> {
    inner: VecDeque<T>,
}

impl<T> FifoQueue<T> {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self {
            inner: VecDeque::new(),
        }
    }

    /// Append at the arrival end.
    pub fn push(&mut self, item: T) {
        self.inner.push_back(item);
    }

    /// Remove the item that has waited longest.
    pub fn pop(&mut self) -> Option<T> {
        self.inner.pop_front()
    }

    /// The item that would be popped next.
    pub fn peek(&self) -> Option<&T> {
        self.inner.front()
    }

    /// First item (in service order) matching `pred`.
    pub fn find(&self, pred: impl Fn(&T) -> bool) -> Option<&T> {
        self.inner.iter().find(|item| pred(item))
    }

    /// Remove and return the first item (in service order) matching `pred`.
    ///
    /// The relative order of the remaining items is preserved.
    pub fn remove_first(&mut self, pred: impl Fn(&T) -> bool) -> Option<T> {
        let idx = self.inner.iter().position(|item| pred(item))?;
        self.inner.remove(idx)
    }

    pub fn contains(&self, pred: impl Fn(&T) -> bool) -> bool {
        self.inner.iter().any(pred)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Iterate in service order (next to leave first).
    pub fn iter(&self) -> std::collections::vec_deque::Iter<'_, T> {
        self.inner.iter()
    }
}

impl<T> Default for FifoQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, T> IntoIterator for &'a FifoQueue<T> {
    type Item = &'a T;
    type IntoIter = std::collections::vec_deque::Iter<'a, T>;
    fn into_iter(self) -> Self::IntoIter {
        self.inner.iter()
    }
}

impl<T> FromIterator<T> for FifoQueue<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self {
            inner: iter.into_iter().collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
