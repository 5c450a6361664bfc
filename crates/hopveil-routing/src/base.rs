//! Base routing strategies
//!
//! Hop injection starts from the route some "optimal" path finder would
//! pick, and the attack models the adversary re-running that same path
//! finder. [`BaseRouter`] is the seam where any such strategy plugs in.
//! [`CheapestPathRouter`] is the reference implementation.

use std::collections::{BinaryHeap, HashMap, HashSet};
use std::sync::Arc;

use hopveil_core::{ChannelGraph, NodeIdentity, Route};
use tracing::trace;

use crate::queue::QueueEntry;

/// A pluggable "optimal path" routing strategy
///
/// Implementations must be pure: the attack calls `route_path` for many
/// source/destination pairs and expects the same answer each time.
pub trait BaseRouter<I: NodeIdentity>: Send + Sync {
    /// Find a route carrying `amount` from `source` to `destination`
    ///
    /// Returns [`Route::unroutable`] when no route exists.
    fn route_path(
        &self,
        graph: &dyn ChannelGraph<I>,
        source: &I,
        destination: &I,
        amount: f64,
    ) -> Route<I>;

    /// Edge weight used when relaxing backwards from `u` to its predecessor `v`
    ///
    /// `u` is the node nearer the destination; the link priced is `v -> u`
    /// carrying `amount`.
    fn cost_function(&self, graph: &dyn ChannelGraph<I>, amount: f64, u: &I, v: &I) -> f64;

    /// Human readable name of the strategy
    fn name(&self) -> String;

    /// Implementation family the strategy models
    fn tech(&self) -> String;
}

impl<I: NodeIdentity, B: BaseRouter<I> + ?Sized> BaseRouter<I> for Arc<B> {
    fn route_path(
        &self,
        graph: &dyn ChannelGraph<I>,
        source: &I,
        destination: &I,
        amount: f64,
    ) -> Route<I> {
        (**self).route_path(graph, source, destination, amount)
    }

    fn cost_function(&self, graph: &dyn ChannelGraph<I>, amount: f64, u: &I, v: &I) -> f64 {
        (**self).cost_function(graph, amount, u, v)
    }

    fn name(&self) -> String {
        (**self).name()
    }

    fn tech(&self) -> String {
        (**self).tech()
    }
}

/// Default locked-funds risk per unit amount per delay unit
pub const DEFAULT_RISK_FACTOR: f64 = 15e-9;

/// Default flat cost per hop, so equal-fee routes prefer fewer hops
pub const DEFAULT_HOP_PENALTY: f64 = 1.0;

/// Fee- and timelock-weighted cheapest path finder
///
/// Searches backwards from the destination, as Lightning path finders do,
/// so fees accumulate onto the amount each upstream link must carry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CheapestPathRouter {
    /// Weight of `amount * delay` in the edge cost
    pub risk_factor: f64,
    /// Flat cost added per link
    pub hop_penalty: f64,
}

impl Default for CheapestPathRouter {
    fn default() -> Self {
        Self {
            risk_factor: DEFAULT_RISK_FACTOR,
            hop_penalty: DEFAULT_HOP_PENALTY,
        }
    }
}

impl CheapestPathRouter {
    /// Create a router with default weights
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a router with custom weights
    pub fn with_weights(risk_factor: f64, hop_penalty: f64) -> Self {
        Self {
            risk_factor,
            hop_penalty,
        }
    }
}

/// Per-node state of the backward search
struct Label<I> {
    dist: f64,
    /// Amount that has to arrive at this node
    amount: f64,
    /// Successor toward the destination
    next: Option<I>,
}

impl<I: NodeIdentity> BaseRouter<I> for CheapestPathRouter {
    fn route_path(
        &self,
        graph: &dyn ChannelGraph<I>,
        source: &I,
        destination: &I,
        amount: f64,
    ) -> Route<I> {
        if source == destination || !graph.contains(source) || !graph.contains(destination) {
            return Route::unroutable();
        }

        let mut labels: HashMap<I, Label<I>> = HashMap::new();
        let mut settled: HashSet<I> = HashSet::new();
        let mut heap = BinaryHeap::new();

        labels.insert(
            destination.clone(),
            Label {
                dist: 0.0,
                amount,
                next: None,
            },
        );
        heap.push(QueueEntry::new(0.0, destination.clone()));

        while let Some(QueueEntry { cost, node: curr }) = heap.pop() {
            let (curr_dist, curr_amount) = match labels.get(&curr) {
                Some(label) => (label.dist, label.amount),
                None => continue,
            };
            if cost > curr_dist || !settled.insert(curr.clone()) {
                continue;
            }
            if &curr == source {
                break;
            }

            for v in graph.in_neighbors(&curr) {
                if settled.contains(&v) || graph.capacity_between(&v, &curr) < curr_amount {
                    continue;
                }
                let Some(policy) = graph.channel(&v, &curr) else {
                    continue;
                };

                let candidate = curr_dist + self.cost_function(graph, curr_amount, &curr, &v);
                let improves = labels
                    .get(&v)
                    .map(|label| candidate < label.dist)
                    .unwrap_or(true);
                if improves {
                    labels.insert(
                        v.clone(),
                        Label {
                            dist: candidate,
                            amount: policy.amount_with_fees(curr_amount),
                            next: Some(curr.clone()),
                        },
                    );
                    heap.push(QueueEntry::new(candidate, v));
                }
            }
        }

        if !settled.contains(source) {
            trace!(source = %source, destination = %destination, "No route found");
            return Route::unroutable();
        }

        let mut path = vec![source.clone()];
        let mut delay: i64 = 0;
        let mut cursor = source.clone();
        while let Some(next) = labels.get(&cursor).and_then(|label| label.next.clone()) {
            if let Some(policy) = graph.channel(&cursor, &next) {
                delay += i64::from(policy.delay);
            }
            path.push(next.clone());
            cursor = next;
        }

        // The source does not pay itself a fee: the first hop carries what
        // the second node needs to receive.
        let first_hop_amount = labels
            .get(&path[1])
            .map(|label| label.amount)
            .unwrap_or(amount);
        let dist = labels.get(source).map(|label| label.dist).unwrap_or(0.0);

        Route::new(path, first_hop_amount, delay).with_dist(dist)
    }

    fn cost_function(&self, graph: &dyn ChannelGraph<I>, amount: f64, u: &I, v: &I) -> f64 {
        match graph.channel(v, u) {
            Some(policy) => {
                policy.fee_for(amount)
                    + amount * f64::from(policy.delay) * self.risk_factor
                    + self.hop_penalty
            }
            None => f64::INFINITY,
        }
    }

    fn name(&self) -> String {
        "Cheapest Path".to_string()
    }

    fn tech(&self) -> String {
        "LN".to_string()
    }
}
