//! Channel network topologies for simulations
//!
//! Provides functions to create various network topologies:
//! - Line: Each node connected to the next
//! - Ring: A line closed back onto its first node
//! - Random: A random spanning tree plus chords, with random policies
//! - Custom: Build from a channel list

use hopveil_core::{ChannelGraph, ChannelNetwork, ChannelPolicy, GraphResult};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::config::SimulationConfig;
use crate::error::SimulationResult;

/// Kinds of generated topology
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum TopologyKind {
    Line,
    Ring,
    Random,
}

/// Builder for uniform topologies over nodes `0..nodes`
pub struct TopologyBuilder {
    nodes: u32,
    policy: ChannelPolicy,
}

impl TopologyBuilder {
    /// Create a builder for `nodes` nodes with a default policy
    pub fn new(nodes: u32) -> Self {
        Self {
            nodes,
            policy: ChannelPolicy::new(10_000.0, 1.0, 0.001, 10),
        }
    }

    /// Use `policy` for every link
    pub fn with_policy(mut self, policy: ChannelPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Build a line topology: 0 - 1 - 2 - ...
    pub fn line(self) -> GraphResult<ChannelNetwork<u32>> {
        let mut network = ChannelNetwork::new();
        for node in 0..self.nodes {
            network.add_node(node);
        }
        for node in 1..self.nodes {
            network.open_channel(node - 1, node, self.policy, self.policy)?;
        }
        Ok(network)
    }

    /// Build a ring topology: 0 - 1 - ... - (n-1) - 0
    ///
    /// Fewer than three nodes cannot close a ring and yield a line.
    pub fn ring(self) -> GraphResult<ChannelNetwork<u32>> {
        let (nodes, policy) = (self.nodes, self.policy);
        let mut network = self.line()?;
        if nodes >= 3 {
            network.open_channel(nodes - 1, 0, policy, policy)?;
        }
        Ok(network)
    }
}

/// Build a random connected network from `config`
///
/// Every node joins a random spanning tree, then each remaining pair gets a
/// channel with `config.channel_probability`. Each link direction draws its
/// own policy. The same config always yields the same network.
pub fn random(config: &SimulationConfig) -> SimulationResult<ChannelNetwork<u32>> {
    config.validate()?;
    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut network = ChannelNetwork::new();
    network.add_node(0);

    for node in 1..config.nodes {
        let anchor = rng.random_range(0..node);
        let (forward, backward) = (config.random_policy(&mut rng), config.random_policy(&mut rng));
        network.open_channel(anchor, node, forward, backward)?;
    }

    for a in 0..config.nodes {
        for b in (a + 1)..config.nodes {
            if network.has_channel(&a, &b) || !rng.random_bool(config.channel_probability) {
                continue;
            }
            let (forward, backward) = (config.random_policy(&mut rng), config.random_policy(&mut rng));
            network.open_channel(a, b, forward, backward)?;
        }
    }

    debug!(
        nodes = network.node_count(),
        links = network.link_count(),
        seed = config.seed,
        "Generated random network"
    );
    Ok(network)
}

/// Build a network of the given kind with `nodes` nodes
///
/// `Random` takes its remaining parameters from `config`.
pub fn build(
    kind: TopologyKind,
    nodes: u32,
    config: &SimulationConfig,
) -> SimulationResult<ChannelNetwork<u32>> {
    let network = match kind {
        TopologyKind::Line => TopologyBuilder::new(nodes).line()?,
        TopologyKind::Ring => TopologyBuilder::new(nodes).ring()?,
        TopologyKind::Random => random(&SimulationConfig {
            nodes,
            ..config.clone()
        })?,
    };
    Ok(network)
}

/// Create a custom network from a channel list, same policy both ways
pub fn from_channels(channels: &[(char, char, ChannelPolicy)]) -> GraphResult<ChannelNetwork<char>> {
    ChannelNetwork::from_channels(channels.iter().copied())
}
