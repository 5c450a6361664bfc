//! Backward source search
//!
//! Given a candidate path the adversary reconstructed
//! (`previous_hop, adversary, next_hop, ..., destination`), the
//! [`Deanonymizer`] runs the base router's cost function as a Dijkstra
//! search backwards from the destination. Every node it finalizes gets its
//! optimal path to the destination; whenever that node also lies on the
//! observed path, the observed suffix must be explainable as hop injection
//! applied to the optimal path, or no sender could have produced what the
//! adversary saw.
//!
//! Once both the adversary and the previous hop have been finalized, every
//! further node whose optimal path runs through the previous hop makes its
//! other in-neighbors indistinguishable senders.

use std::collections::{BTreeSet, BinaryHeap, HashMap, HashSet};

use hopveil_core::{ChannelGraph, NodeIdentity};
use tracing::{debug, trace};

use crate::base::BaseRouter;
use crate::config::SenderCheck;
use crate::consistency::is_impossible_modification;
use crate::error::{RoutingError, RoutingResult};
use crate::queue::QueueEntry;

/// Best known way from a node to the destination
#[derive(Debug, Clone)]
struct Label<I> {
    /// Search cost
    dist: f64,
    /// Amount that must arrive at the node
    amount: f64,
    /// Timelock accumulated from the destination
    delay: i64,
    /// Optimal path from the node to the destination
    path: Vec<I>,
}

/// Backward search state for one query
struct Search<I> {
    labels: HashMap<I, Label<I>>,
    finalized: HashSet<I>,
    /// First path offered to each node, kept to spot dead-end detours
    first_seen: HashMap<I, Vec<I>>,
    heap: BinaryHeap<QueueEntry<I>>,
}

impl<I: NodeIdentity> Search<I> {
    fn new(destination: &I, amount: f64, delay: i64) -> Self {
        let mut labels = HashMap::new();
        labels.insert(
            destination.clone(),
            Label {
                dist: 0.0,
                amount,
                delay,
                path: vec![destination.clone()],
            },
        );
        let mut heap = BinaryHeap::new();
        heap.push(QueueEntry::new(0.0, destination.clone()));

        Self {
            labels,
            finalized: HashSet::new(),
            first_seen: HashMap::new(),
            heap,
        }
    }

    /// Pop the next node to finalize, skipping stale entries
    fn next_final(&mut self) -> Option<(I, Label<I>)> {
        while let Some(QueueEntry { cost, node }) = self.heap.pop() {
            let Some(label) = self.labels.get(&node) else {
                continue;
            };
            if cost > label.dist || self.finalized.contains(&node) {
                continue;
            }
            let label = label.clone();
            self.finalized.insert(node.clone());
            return Some((node, label));
        }
        None
    }

    fn dist(&self, node: &I) -> f64 {
        self.labels
            .get(node)
            .map(|label| label.dist)
            .unwrap_or(f64::INFINITY)
    }
}

/// Confirms candidate sources for a reconstructed payment path
pub struct Deanonymizer<'a, B> {
    base: &'a B,
    sender_check: SenderCheck,
}

impl<'a, B> Deanonymizer<'a, B> {
    /// Create a deanonymizer that scores links with `base`'s cost function
    pub fn new(base: &'a B, sender_check: SenderCheck) -> Self {
        Self { base, sender_check }
    }

    /// Find every node that could have sent a payment along `observed`
    ///
    /// `observed` starts with the previous hop and the adversary and ends
    /// at the candidate destination; `amount` and `delay` are what reaches
    /// the destination. Returns `Ok(None)` when no optimal path could have
    /// produced `observed` by hop injection. The returned set never holds
    /// the destination or the adversary.
    pub fn find_sources<I>(
        &self,
        graph: &dyn ChannelGraph<I>,
        observed: &[I],
        amount: f64,
        delay: i64,
    ) -> RoutingResult<Option<BTreeSet<I>>>
    where
        I: NodeIdentity,
        B: BaseRouter<I>,
    {
        if observed.len() < 3 {
            return Err(RoutingError::InvalidObservation(format!(
                "a candidate path needs at least 3 nodes, got {}",
                observed.len()
            )));
        }
        let previous_hop = &observed[0];
        let adversary = &observed[1];
        let destination = &observed[observed.len() - 1];

        let mut search = Search::new(destination, amount, delay);
        let mut sources: BTreeSet<I> = BTreeSet::new();
        let mut adversary_confirmed = false;
        let mut boundary_confirmed = false;

        while let Some((curr, label)) = search.next_final() {
            for v in graph.in_neighbors(&curr) {
                if search.finalized.contains(&v)
                    || graph.capacity_between(&v, &curr) < label.amount
                {
                    continue;
                }

                search
                    .first_seen
                    .entry(v.clone())
                    .or_insert_with(|| prepend(&v, &label.path));

                let candidate =
                    label.dist + self.base.cost_function(graph, label.amount, &curr, &v);
                if candidate < search.dist(&v) {
                    let policy = graph.require_channel(&v, &curr)?;
                    search.labels.insert(
                        v.clone(),
                        Label {
                            dist: candidate,
                            amount: policy.amount_with_fees(label.amount),
                            delay: label.delay + i64::from(policy.delay),
                            path: prepend(&v, &label.path),
                        },
                    );
                    search.heap.push(QueueEntry::new(candidate, v));
                }
            }

            if search
                .first_seen
                .get(&curr)
                .is_some_and(|first| first != &label.path)
            {
                trace!(node = %curr, "Optimal path replaced the first path offered");
            }

            if let Some(index) = observed[1..].iter().position(|n| n == &curr) {
                let suffix = &observed[index + 1..];
                if is_impossible_modification(suffix, &label.path) {
                    debug!(
                        node = %curr,
                        observed = suffix.len(),
                        optimal = label.path.len(),
                        "Observed path cannot come from this node's optimal path"
                    );
                    return Ok(None);
                }
                if &curr == adversary {
                    adversary_confirmed = true;
                }
            }

            if &curr == previous_hop {
                if self.sender_check == SenderCheck::Strict && label.path != observed {
                    trace!(node = %curr, "Previous hop is off its optimal path, so it is the sender");
                    return Ok(Some(BTreeSet::from([curr])));
                }
                sources.insert(curr.clone());
                boundary_confirmed = true;
            }

            if adversary_confirmed && boundary_confirmed && label.path.contains(previous_hop) {
                for v in graph.in_neighbors(&curr) {
                    if !label.path.contains(&v) && &v != adversary && &v != destination {
                        sources.insert(v);
                    }
                }
            }
        }

        debug!(
            destination = %destination,
            sources = sources.len(),
            finalized = search.finalized.len(),
            "Backward search finished"
        );
        Ok(Some(sources))
    }
}

fn prepend<I: Clone>(node: &I, path: &[I]) -> Vec<I> {
    let mut extended = Vec::with_capacity(path.len() + 1);
    extended.push(node.clone());
    extended.extend_from_slice(path);
    extended
}
