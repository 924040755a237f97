//! Bounded "most recent N" selection.
//!
//! [`RecentItems`] keeps the `capacity` items with the greatest keys seen so
//! far. Internally it is a min-heap so the oldest item is always the one
//! evicted; [`RecentItems::drain`] hands the survivors back newest first.
//!
//! ## Ties
//!
//! Items with equal keys are ordered by insertion: the earlier insertion
//! counts as older. It is evicted first and drained last.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

/// Bounded collector of the most recent items by key (usually a timestamp).
#[derive(Debug)]
pub struct RecentItems<K, T> {
    capacity: usize,
    heap: BinaryHeap<Reverse<Slot<K, T>>>,
    next_seq: u64,
}

#[derive(Debug)]
struct Slot<K, T> {
    key: K,
    seq: u64,
    item: T,
}

impl<K: Ord, T> PartialEq for Slot<K, T> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<K: Ord, T> Eq for Slot<K, T> {}

impl<K: Ord, T> PartialOrd for Slot<K, T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<K: Ord, T> Ord for Slot<K, T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key
            .cmp(&other.key)
            .then_with(|| self.seq.cmp(&other.seq))
    }
}

impl<K: Ord, T> RecentItems<K, T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            heap: BinaryHeap::with_capacity(capacity.saturating_add(1)),
            next_seq: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Insert an item, evicting the oldest one if the collector overflows.
    pub fn push(&mut self, key: K, item: T) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(Reverse(Slot { key, seq, item }));
        if self.heap.len() > self.capacity {
            self.pop_oldest();
        }
    }

    /// Remove and return the item with the smallest key.
    pub fn pop_oldest(&mut self) -> Option<T> {
        self.heap.pop().map(|Reverse(slot)| slot.item)
    }

    /// Empty the collector, returning its items most recent first.
    ///
    /// The collector is reusable afterwards; it starts out empty with the
    /// same capacity.
    pub fn drain(&mut self) -> Vec<T> {
        let heap = std::mem::take(&mut self.heap);
        // Ascending in `Reverse` order is descending by (key, seq).
        heap.into_sorted_vec()
            .into_iter()
            .map(|Reverse(slot)| slot.item)
            .collect()
    }
}

impl<K: Ord, T> Default for RecentItems<K, T> {
    fn default() -> Self {
        Self::new(0)
    }
}

impl<K: Ord, T> Extend<(K, T)> for RecentItems<K, T> {
    fn extend<I: IntoIterator<Item = (K, T)>>(&mut self, iter: I) {
        for (key, item) in iter {
            self.push(key, item);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_the_newest_n_items() {
        let mut recent = RecentItems::new(3);
        for (ts, name) in [(5, "e"), (1, "a"), (4, "d"), (2, "b"), (3, "c")] {
            recent.push(ts, name);
        }
        assert_eq!(recent.len(), 3);
        assert_eq!(recent.drain(), vec!["e", "d", "c"]);
    }

    #[test]
    fn drain_empties_the_collector() {
        let mut recent = RecentItems::new(2);
        recent.push(1, "a");
        recent.push(2, "b");
        assert_eq!(recent.drain(), vec!["b", "a"]);
        assert!(recent.is_empty());
        assert!(recent.drain().is_empty());

        // Reusable after draining
        recent.push(7, "z");
        assert_eq!(recent.drain(), vec!["z"]);
    }

    #[test]
    fn under_capacity_keeps_everything() {
        let mut recent = RecentItems::new(10);
        recent.push(3, "c");
        recent.push(1, "a");
        recent.push(2, "b");
        assert_eq!(recent.drain(), vec!["c", "b", "a"]);
    }

    #[test]
    fn zero_capacity_keeps_nothing() {
        let mut recent = RecentItems::new(0);
        recent.push(1, "a");
        assert!(recent.is_empty());
    }

    #[test]
    fn equal_keys_evict_earlier_insertion_first() {
        let mut recent = RecentItems::new(2);
        recent.push(1, "first");
        recent.push(1, "second");
        recent.push(1, "third");
        // "first" was evicted; later insertions drain first
        assert_eq!(recent.drain(), vec!["third", "second"]);
    }

    #[test]
    fn pop_oldest_returns_smallest_key() {
        let mut recent = RecentItems::new(5);
        recent.extend([(10, "x"), (3, "y"), (7, "z")]);
        assert_eq!(recent.pop_oldest(), Some("y"));
        assert_eq!(recent.pop_oldest(), Some("z"));
        assert_eq!(recent.pop_oldest(), Some("x"));
        assert_eq!(recent.pop_oldest(), None);
    }

    #[test]
    fn overflow_by_k_retains_greatest() {
        let mut recent = RecentItems::new(4);
        for ts in 0..20u32 {
            // interleave so the greatest keys are not simply the last pushed
            let key = (ts * 7) % 20;
            recent.push(key, key);
        }
        assert_eq!(recent.drain(), vec![19, 18, 17, 16]);
    }
}
