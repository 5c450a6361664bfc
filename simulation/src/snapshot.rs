//! JSON topology snapshots
//!
//! A [`NetworkSnapshot`] is the on-disk form of a [`ChannelNetwork`]: the
//! node list plus one record per directed link. Nodes are listed separately
//! so isolated nodes survive a round trip.

use std::fs;
use std::path::Path;

use hopveil_core::{ChannelGraph, ChannelNetwork, ChannelPolicy, GraphResult, NodeIdentity};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::SimulationResult;

/// One directed link
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound = "I: NodeIdentity")]
pub struct LinkRecord<I: NodeIdentity> {
    pub from: I,
    pub to: I,
    #[serde(flatten)]
    pub policy: ChannelPolicy,
}

/// Serializable copy of a channel network
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound = "I: NodeIdentity")]
pub struct NetworkSnapshot<I: NodeIdentity> {
    pub nodes: Vec<I>,
    pub links: Vec<LinkRecord<I>>,
}

impl<I: NodeIdentity> NetworkSnapshot<I> {
    /// Capture `network`
    pub fn from_network(network: &ChannelNetwork<I>) -> Self {
        let links = network
            .links()
            .into_iter()
            .map(|(from, to, policy)| LinkRecord { from, to, policy })
            .collect();
        Self {
            nodes: network.nodes(),
            links,
        }
    }

    /// Rebuild the network, validating every policy
    pub fn to_network(&self) -> GraphResult<ChannelNetwork<I>> {
        let mut network = ChannelNetwork::new();
        for node in &self.nodes {
            network.add_node(node.clone());
        }
        for link in &self.links {
            network.add_link(link.from.clone(), link.to.clone(), link.policy)?;
        }
        Ok(network)
    }

    /// Read a snapshot from a JSON file
    pub fn load(path: impl AsRef<Path>) -> SimulationResult<Self> {
        let path = path.as_ref();
        let snapshot: Self = serde_json::from_str(&fs::read_to_string(path)?)?;
        debug!(
            path = %path.display(),
            nodes = snapshot.nodes.len(),
            links = snapshot.links.len(),
            "Loaded network snapshot"
        );
        Ok(snapshot)
    }

    /// Write the snapshot as pretty-printed JSON
    pub fn save(&self, path: impl AsRef<Path>) -> SimulationResult<()> {
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SimulationError;
    use crate::topology::TopologyBuilder;
    use hopveil_core::GraphError;

    #[test]
    fn test_snapshot_roundtrip_keeps_isolated_nodes() {
        let mut network = TopologyBuilder::new(3)
            .with_policy(ChannelPolicy::new(500.0, 1.0, 0.01, 12))
            .line()
            .unwrap();
        network.add_node(7);

        let snapshot = NetworkSnapshot::from_network(&network);
        assert_eq!(snapshot.nodes, vec![0, 1, 2, 7]);
        let json = serde_json::to_string(&snapshot).unwrap();
        let back: NetworkSnapshot<u32> = serde_json::from_str(&json).unwrap();
        let rebuilt = back.to_network().unwrap();

        assert_eq!(rebuilt.links(), network.links());
        assert!(rebuilt.contains(&7));
    }

    #[test]
    fn test_link_records_are_flat() {
        let json = r#"{
            "nodes": ["A", "B"],
            "links": [
                {"from": "A", "to": "B", "balance": 50.0, "base_fee": 1.0, "fee_rate": 0.0, "delay": 6}
            ]
        }"#;
        let snapshot: NetworkSnapshot<char> = serde_json::from_str(json).unwrap();
        let network = snapshot.to_network().unwrap();
        assert_eq!(network.channel(&'A', &'B').map(|p| p.delay), Some(6));
        assert!(!network.has_channel(&'B', &'A'));
    }

    #[test]
    fn test_invalid_policy_rejected() {
        let snapshot = NetworkSnapshot {
            nodes: vec!['A', 'B'],
            links: vec![LinkRecord {
                from: 'A',
                to: 'B',
                policy: ChannelPolicy::new(-5.0, 0.0, 0.0, 1),
            }],
        };
        assert!(matches!(
            snapshot.to_network(),
            Err(GraphError::InvalidPolicy(_))
        ));
    }

    #[test]
    fn test_load_missing_file() {
        let result = NetworkSnapshot::<u32>::load("/nonexistent/hopveil/snapshot.json");
        assert!(matches!(result, Err(SimulationError::Io(_))));
    }
}
