//! Min-priority frontier for best-first search.
//!
//! Items are stored in a min-heap keyed by `(priority, insertion_order)`.
//! Lower priorities are popped first; ties are broken by insertion order
//! (FIFO), which keeps searches deterministic.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

#[derive(Debug)]
struct Entry<T> {
    item: T,
    priority: f32,
    seq: u64,
}

impl<T> PartialEq for Entry<T> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<T> Eq for Entry<T> {}

impl<T> PartialOrd for Entry<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Entry<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.priority
            .total_cmp(&other.priority)
            .then_with(|| self.seq.cmp(&other.seq))
    }
}

/// A priority queue supporting "enqueue with priority" and "dequeue
/// minimum". Duplicate items are allowed; callers skip stale ones.
#[derive(Debug)]
pub struct Frontier<T> {
    heap: BinaryHeap<Reverse<Entry<T>>>,
    seq: u64,
}

impl<T> Frontier<T> {
    /// An empty frontier.
    pub fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            seq: 0,
        }
    }

    /// Insert `item`; lower priorities pop first.
    pub fn push(&mut self, item: T, priority: f32) {
        let seq = self.seq;
        self.seq += 1;
        self.heap.push(Reverse(Entry {
            item,
            priority,
            seq,
        }));
    }

    /// Pop the item with the lowest priority (ties broken FIFO).
    pub fn pop(&mut self) -> Option<T> {
        self.heap.pop().map(|Reverse(entry)| entry.item)
    }

    /// Pop the lowest item, also returning its priority.
    pub fn pop_with_priority(&mut self) -> Option<(T, f32)> {
        self.heap
            .pop()
            .map(|Reverse(entry)| (entry.item, entry.priority))
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn clear(&mut self) {
        self.heap.clear();
        self.seq = 0;
    }
}

impl<T> Default for Frontier<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pops_in_priority_order() {
        let mut f = Frontier::new();
        f.push("a", 3.0);
        f.push("b", 0.5);
        f.push("c", 2.0);
        assert_eq!(f.len(), 3);
        assert_eq!(f.pop(), Some("b"));
        assert_eq!(f.pop(), Some("c"));
        assert_eq!(f.pop(), Some("a"));
        assert_eq!(f.pop(), None);
        assert!(f.is_empty());
    }

    #[test]
    fn ties_are_fifo() {
        let mut f = Frontier::new();
        for i in 0..5 {
            f.push(i, 1.0);
        }
        f.push(99, 0.0);
        assert_eq!(f.pop_with_priority(), Some((99, 0.0)));
        let rest: Vec<_> = std::iter::from_fn(|| f.pop()).collect();
        assert_eq!(rest, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn clear_resets() {
        let mut f = Frontier::new();
        f.push('x', 1.0);
        f.clear();
        assert!(f.is_empty());
        f.push('y', f32::INFINITY);
        f.push('z', 1e9);
        assert_eq!(f.pop(), Some('z'));
    }
}
