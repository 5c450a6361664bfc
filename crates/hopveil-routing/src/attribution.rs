//! Turning exploration leaves into anonymity sets
//!
//! Every delay-exact leaf of an [`ExplorationTree`] is a candidate
//! destination. The [`SourceAttributor`] decides, per candidate, which
//! nodes could have sent the payment, using one of two strategies (see
//! [`AttributionStrategy`]).

use std::collections::{BTreeMap, BTreeSet};

use hopveil_core::{ChannelGraph, NodeIdentity};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::base::BaseRouter;
use crate::config::{AttackConfig, AttributionStrategy};
use crate::deanonymize::Deanonymizer;
use crate::error::RoutingResult;
use crate::exploration::{ExplorationTree, ObservedHop};

/// Candidate sources per candidate destination
///
/// Sets only grow: recording more sources for a destination unions them
/// with what is already there.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent, bound = "I: NodeIdentity")]
pub struct AnonymitySets<I: NodeIdentity>(BTreeMap<I, BTreeSet<I>>);

impl<I: NodeIdentity> Default for AnonymitySets<I> {
    fn default() -> Self {
        Self(BTreeMap::new())
    }
}

impl<I: NodeIdentity> AnonymitySets<I> {
    /// Create an empty mapping
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `sources` to the set of `destination`
    ///
    /// An empty `sources` leaves the mapping untouched, so destinations
    /// never map to an empty set.
    pub fn record(&mut self, destination: I, sources: impl IntoIterator<Item = I>) {
        let mut sources = sources.into_iter().peekable();
        if sources.peek().is_none() {
            return;
        }
        self.0.entry(destination).or_default().extend(sources);
    }

    /// Candidate sources for `destination`
    pub fn sources_for(&self, destination: &I) -> Option<&BTreeSet<I>> {
        self.0.get(destination)
    }

    /// Whether `source` is a candidate sender to `destination`
    pub fn contains(&self, destination: &I, source: &I) -> bool {
        self.0
            .get(destination)
            .is_some_and(|sources| sources.contains(source))
    }

    /// Candidate destinations, in order
    pub fn destinations(&self) -> impl Iterator<Item = &I> + '_ {
        self.0.keys()
    }

    /// Iterate `(destination, sources)` pairs
    pub fn iter(&self) -> impl Iterator<Item = (&I, &BTreeSet<I>)> + '_ {
        self.0.iter()
    }

    /// Number of candidate destinations
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no destination has been attributed
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Sum of set sizes over all destinations
    pub fn total_sources(&self) -> usize {
        self.0.values().map(BTreeSet::len).sum()
    }
}

impl<I: NodeIdentity> IntoIterator for AnonymitySets<I> {
    type Item = (I, BTreeSet<I>);
    type IntoIter = std::collections::btree_map::IntoIter<I, BTreeSet<I>>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Builds anonymity sets from an exploration tree
pub struct SourceAttributor<'a, I: NodeIdentity, B> {
    graph: &'a dyn ChannelGraph<I>,
    base: &'a B,
    config: AttackConfig,
}

impl<'a, I, B> SourceAttributor<'a, I, B>
where
    I: NodeIdentity,
    B: BaseRouter<I>,
{
    /// Create an attributor over `graph` that asks `base` for optimal paths
    pub fn new(graph: &'a dyn ChannelGraph<I>, base: &'a B, config: AttackConfig) -> Self {
        Self {
            graph,
            base,
            config,
        }
    }

    /// Attribute sources to every delay-exact leaf of `tree`
    pub fn attribute(
        &self,
        tree: &ExplorationTree<I>,
        hop: &ObservedHop<I>,
    ) -> RoutingResult<AnonymitySets<I>> {
        let sets = match self.config.strategy {
            AttributionStrategy::AllSources => self.all_sources(tree, hop),
            AttributionStrategy::FilteredSources => self.filtered_sources(tree, hop)?,
        };
        debug!(
            strategy = ?self.config.strategy,
            destinations = sets.len(),
            sources = sets.total_sources(),
            "Attributed sources"
        );
        Ok(sets)
    }

    /// Keep every node whose optimal path to a leaf crosses the observed hop
    fn all_sources(&self, tree: &ExplorationTree<I>, hop: &ObservedHop<I>) -> AnonymitySets<I> {
        let mut sets = AnonymitySets::new();
        let nodes = self.graph.nodes();

        for (_, _, leaf) in tree.leaves() {
            let destination = &leaf.node;
            let sources: Vec<I> = nodes
                .iter()
                .filter(|source| *source != destination && *source != &hop.adversary)
                .filter(|source| {
                    let route = self
                        .base
                        .route_path(self.graph, source, destination, leaf.amount);
                    route.is_found() && self.crosses_hop(&route.path, hop)
                })
                .cloned()
                .collect();

            trace!(destination = %destination, sources = sources.len(), "All-sources leaf");
            sets.record(destination.clone(), sources);
        }

        sets
    }

    /// Whether `path` passes the observed hop, or could have with the
    /// adversary spliced into its `previous_hop -> next_hop` link
    fn crosses_hop(&self, path: &[I], hop: &ObservedHop<I>) -> bool {
        let position = |node: &I| path.iter().position(|n| n == node);
        if let (Some(p), Some(a), Some(n)) = (
            position(&hop.previous_hop),
            position(&hop.adversary),
            position(&hop.next_hop),
        ) {
            if p < a && a < n {
                return true;
            }
        }

        path.windows(2).any(|link| {
            link[0] == hop.previous_hop
                && link[1] == hop.next_hop
                && self.graph.has_channel(&hop.previous_hop, &hop.adversary)
                && self.graph.has_channel(&hop.adversary, &hop.next_hop)
        })
    }

    /// Confirm sources per leaf with a backward search over the rebuilt path
    fn filtered_sources(
        &self,
        tree: &ExplorationTree<I>,
        hop: &ObservedHop<I>,
    ) -> RoutingResult<AnonymitySets<I>> {
        let deanonymizer = Deanonymizer::new(self.base, self.config.sender_check);
        let mut sets = AnonymitySets::new();

        for (level, index, leaf) in tree.leaves() {
            let mut path = vec![hop.previous_hop.clone(), hop.adversary.clone()];
            path.extend(tree.branch_path(level, index));

            let distinct: BTreeSet<&I> = path.iter().collect();
            if distinct.len() != path.len() {
                trace!(destination = %leaf.node, "Rebuilt path repeats a node");
                continue;
            }

            match deanonymizer.find_sources(self.graph, &path, leaf.amount, leaf.remaining_delay)? {
                Some(sources) => {
                    trace!(destination = %leaf.node, sources = sources.len(), "Filtered leaf");
                    sets.record(leaf.node.clone(), sources);
                }
                None => {
                    trace!(destination = %leaf.node, "No optimal path explains this leaf");
                }
            }
        }

        Ok(sets)
    }
}
