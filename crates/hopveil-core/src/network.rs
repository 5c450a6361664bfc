//! In-memory channel network
//!
//! [`ChannelNetwork`] is the snapshot every hopveil query runs against in
//! tests and simulations. Adjacency is kept in ordered maps so neighbor
//! enumeration, and with it every search, is reproducible.

use std::collections::{BTreeMap, BTreeSet};

use crate::channel::ChannelPolicy;
use crate::error::GraphError;
use crate::identity::NodeIdentity;
use crate::traits::ChannelGraph;

/// A directed, capacity-bearing channel graph
#[derive(Debug, Clone)]
pub struct ChannelNetwork<I: NodeIdentity> {
    /// Outbound links: from -> (to -> policy)
    outbound: BTreeMap<I, BTreeMap<I, ChannelPolicy>>,
    /// Inbound adjacency for quick reverse lookups
    inbound: BTreeMap<I, BTreeSet<I>>,
}

impl<I: NodeIdentity> ChannelNetwork<I> {
    /// Create an empty network
    pub fn new() -> Self {
        Self {
            outbound: BTreeMap::new(),
            inbound: BTreeMap::new(),
        }
    }

    /// Add a node with no links
    pub fn add_node(&mut self, node: I) {
        self.outbound.entry(node.clone()).or_default();
        self.inbound.entry(node).or_default();
    }

    /// Add (or replace) the directed link `from -> to`
    pub fn add_link(&mut self, from: I, to: I, policy: ChannelPolicy) -> Result<(), GraphError> {
        if from == to {
            return Err(GraphError::InvalidPolicy(format!(
                "self-loop on {} is not a channel",
                from
            )));
        }
        policy.validate()?;

        self.add_node(from.clone());
        self.add_node(to.clone());

        self.outbound
            .entry(from.clone())
            .or_default()
            .insert(to.clone(), policy);
        self.inbound.entry(to).or_default().insert(from);
        Ok(())
    }

    /// Open a channel: one link per direction
    pub fn open_channel(
        &mut self,
        a: I,
        b: I,
        a_to_b: ChannelPolicy,
        b_to_a: ChannelPolicy,
    ) -> Result<(), GraphError> {
        self.add_link(a.clone(), b.clone(), a_to_b)?;
        self.add_link(b, a, b_to_a)
    }

    /// Build a network from directed link records
    pub fn from_links<L>(links: L) -> Result<Self, GraphError>
    where
        L: IntoIterator<Item = (I, I, ChannelPolicy)>,
    {
        let mut network = Self::new();
        for (from, to, policy) in links {
            network.add_link(from, to, policy)?;
        }
        Ok(network)
    }

    /// Build a network where every pair gets the same policy both ways
    pub fn from_channels<C>(channels: C) -> Result<Self, GraphError>
    where
        C: IntoIterator<Item = (I, I, ChannelPolicy)>,
    {
        let mut network = Self::new();
        for (a, b, policy) in channels {
            network.open_channel(a, b, policy, policy)?;
        }
        Ok(network)
    }

    /// Get number of nodes
    pub fn node_count(&self) -> usize {
        self.outbound.len()
    }

    /// Get number of directed links
    pub fn link_count(&self) -> usize {
        self.outbound.values().map(BTreeMap::len).sum()
    }

    /// All directed links in deterministic order
    pub fn links(&self) -> Vec<(I, I, ChannelPolicy)> {
        self.outbound
            .iter()
            .flat_map(|(from, targets)| {
                targets
                    .iter()
                    .map(move |(to, policy)| (from.clone(), to.clone(), *policy))
            })
            .collect()
    }

    /// Print a simple ASCII view of the network
    pub fn visualize(&self) -> String {
        let mut output = String::new();
        output.push_str("Channel Network:\n");
        output.push_str(&format!("  Nodes: {}\n", self.node_count()));
        output.push_str(&format!("  Links: {}\n\n", self.link_count()));

        for (node, targets) in &self.outbound {
            let targets: Vec<String> = targets
                .iter()
                .map(|(to, p)| format!("{}({:.0}/{})", to, p.balance, p.delay))
                .collect();
            output.push_str(&format!("  {} -> [{}]\n", node, targets.join(", ")));
        }
        output
    }
}

impl<I: NodeIdentity> Default for ChannelNetwork<I> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I: NodeIdentity> ChannelGraph<I> for ChannelNetwork<I> {
    fn nodes(&self) -> Vec<I> {
        self.outbound.keys().cloned().collect()
    }

    fn channel(&self, from: &I, to: &I) -> Option<ChannelPolicy> {
        self.outbound.get(from)?.get(to).copied()
    }

    fn out_neighbors(&self, node: &I) -> Vec<I> {
        self.outbound
            .get(node)
            .map(|targets| targets.keys().cloned().collect())
            .unwrap_or_default()
    }

    fn in_neighbors(&self, node: &I) -> Vec<I> {
        self.inbound
            .get(node)
            .map(|sources| sources.iter().cloned().collect())
            .unwrap_or_default()
    }

    fn contains(&self, node: &I) -> bool {
        self.outbound.contains_key(node)
    }
}
