//! Forward exploration from the adversary's vantage point
//!
//! An adversary relaying a payment sees its previous hop, its next hop, the
//! amount it forwards and the timelock left on the payment. The
//! [`ExplorationTree`] enumerates every continuation beyond the next hop
//! that fits those numbers: each link must have room for the amount left
//! after reversing the fee charged on it, and the timelock must not go
//! negative. Branches whose timelock is used up exactly are candidate
//! destinations.
//!
//! The tree is an arena: one `Vec` of [`Branch`] records per level, each
//! pointing at its parent by index in the level above.

use std::collections::BTreeSet;

use hopveil_core::{ChannelGraph, NodeIdentity};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

/// The hop an adversary observes: `previous_hop -> adversary -> next_hop`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(bound = "I: NodeIdentity")]
pub struct ObservedHop<I: NodeIdentity> {
    /// Node that handed the payment to the adversary
    pub previous_hop: I,
    /// The compromised intermediary
    pub adversary: I,
    /// Node the adversary forwards to
    pub next_hop: I,
}

impl<I: NodeIdentity> ObservedHop<I> {
    /// Create a new observed hop
    pub fn new(previous_hop: I, adversary: I, next_hop: I) -> Self {
        Self {
            previous_hop,
            adversary,
            next_hop,
        }
    }

    /// Check whether `node` is one of the three observed nodes
    pub fn involves(&self, node: &I) -> bool {
        node == &self.previous_hop || node == &self.adversary || node == &self.next_hop
    }
}

/// One continuation in the exploration tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound = "I: NodeIdentity")]
pub struct Branch<I: NodeIdentity> {
    /// Node this branch ends at
    pub node: I,
    /// Timelock left once the payment reaches `node`
    pub remaining_delay: i64,
    /// Index of the parent branch in the previous level
    pub parent: Option<usize>,
    /// Nodes this branch may not revisit
    pub visited: BTreeSet<I>,
    /// Amount that reaches `node`
    pub amount: f64,
}

impl<I: NodeIdentity> Branch<I> {
    /// Check whether the timelock is used up exactly here
    pub fn is_delay_exact(&self) -> bool {
        self.remaining_delay == 0
    }
}

/// Depth-bounded tree of feasible forward continuations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound = "I: NodeIdentity")]
pub struct ExplorationTree<I: NodeIdentity> {
    levels: Vec<Vec<Branch<I>>>,
    truncated: bool,
}

impl<I: NodeIdentity> ExplorationTree<I> {
    /// Explore continuations of `hop` up to `max_depth` levels
    ///
    /// Level 0 is the next hop itself, holding `delay` and `amount`.
    pub fn explore(
        graph: &dyn ChannelGraph<I>,
        hop: &ObservedHop<I>,
        delay: i64,
        amount: f64,
        max_depth: usize,
    ) -> Self {
        let root = Branch {
            node: hop.next_hop.clone(),
            remaining_delay: delay,
            parent: None,
            visited: [
                hop.previous_hop.clone(),
                hop.adversary.clone(),
                hop.next_hop.clone(),
            ]
            .into_iter()
            .collect(),
            amount,
        };

        let mut levels = vec![vec![root]];
        let mut truncated = false;

        loop {
            if levels.len() >= max_depth {
                truncated = true;
                break;
            }

            let frontier = &levels[levels.len() - 1];
            let next_level = extend_level(graph, hop, frontier);
            trace!(
                level = levels.len(),
                branches = next_level.len(),
                "Explored level"
            );
            if next_level.is_empty() {
                break;
            }
            levels.push(next_level);
        }

        let tree = Self { levels, truncated };
        debug!(
            next_hop = %hop.next_hop,
            depth = tree.depth(),
            branches = tree.branch_count(),
            leaves = tree.leaves().count(),
            truncated,
            "Forward exploration finished"
        );
        tree
    }

    /// All levels, shallowest first
    pub fn levels(&self) -> &[Vec<Branch<I>>] {
        &self.levels
    }

    /// Branches at one level
    pub fn level(&self, level: usize) -> Option<&[Branch<I>]> {
        self.levels.get(level).map(Vec::as_slice)
    }

    /// Number of non-empty levels
    pub fn depth(&self) -> usize {
        self.levels.len()
    }

    /// Total number of branches across all levels
    pub fn branch_count(&self) -> usize {
        self.levels.iter().map(Vec::len).sum()
    }

    /// Whether exploration hit the depth bound before running out of branches
    ///
    /// When set, anonymity sets built from this tree are a lower bound.
    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    /// Branches whose timelock is used up exactly, as `(level, index, branch)`
    pub fn leaves(&self) -> impl Iterator<Item = (usize, usize, &Branch<I>)> + '_ {
        self.levels.iter().enumerate().flat_map(|(level, branches)| {
            branches
                .iter()
                .enumerate()
                .filter(|(_, branch)| branch.is_delay_exact())
                .map(move |(index, branch)| (level, index, branch))
        })
    }

    /// Nodes from the next hop down to the branch at `(level, index)`
    pub fn branch_path(&self, level: usize, index: usize) -> Vec<I> {
        let mut path = Vec::with_capacity(level + 1);
        let mut cursor = Some(index);
        for branches in self.levels[..=level].iter().rev() {
            let Some(i) = cursor else {
                break;
            };
            let branch = &branches[i];
            path.push(branch.node.clone());
            cursor = branch.parent;
        }
        path.reverse();
        path
    }
}

/// Extend every branch of `frontier` by one feasible link
fn extend_level<I: NodeIdentity>(
    graph: &dyn ChannelGraph<I>,
    hop: &ObservedHop<I>,
    frontier: &[Branch<I>],
) -> Vec<Branch<I>> {
    let mut next_level = Vec::new();

    for (parent, branch) in frontier.iter().enumerate() {
        let u = &branch.node;
        for v in graph.out_neighbors(u) {
            if hop.involves(&v) || branch.visited.contains(&v) {
                continue;
            }
            let Some(policy) = graph.channel(u, &v) else {
                continue;
            };

            let remaining_delay = branch.remaining_delay - i64::from(policy.delay);
            if remaining_delay < 0 {
                continue;
            }

            let amount = policy.amount_before_fees(branch.amount);
            if graph.capacity_between(u, &v) < amount {
                trace!(from = %u, to = %v, amount, "Link cannot carry implied amount");
                continue;
            }

            let mut visited = branch.visited.clone();
            visited.insert(v.clone());
            next_level.push(Branch {
                node: v,
                remaining_delay,
                parent: Some(parent),
                visited,
                amount,
            });
        }
    }

    next_level
}
