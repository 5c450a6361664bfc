//! Min-cost queue entries shared by the backward searches
//!
//! [`std::collections::BinaryHeap`] is a max-heap, so the ordering here is
//! reversed. Stale entries are not removed; searches skip an entry whose
//! cost is above the best known cost for its node.

use std::cmp::Ordering;

/// A node waiting in a search frontier
#[derive(Debug, Clone)]
pub(crate) struct QueueEntry<I> {
    pub cost: f64,
    pub node: I,
}

impl<I> QueueEntry<I> {
    pub fn new(cost: f64, node: I) -> Self {
        Self { cost, node }
    }
}

impl<I: Ord> Ord for QueueEntry<I> {
    fn cmp(&self, other: &Self) -> Ordering {
        // Lowest cost first, ties broken by the smaller node
        other
            .cost
            .total_cmp(&self.cost)
            .then_with(|| other.node.cmp(&self.node))
    }
}

impl<I: Ord> PartialOrd for QueueEntry<I> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<I: Ord> PartialEq for QueueEntry<I> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<I: Ord> Eq for QueueEntry<I> {}
