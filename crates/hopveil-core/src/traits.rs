//! Core traits for hopveil
//!
//! ## Key Traits
//!
//! - [`ChannelGraph`]: Abstraction over a payment-channel topology snapshot

use crate::channel::ChannelPolicy;
use crate::error::GraphError;
use crate::identity::NodeIdentity;

/// Abstraction over a payment-channel topology
///
/// Links are directed: `channel(u, v)` describes payments flowing from `u`
/// to `v`. A payment channel between two participants appears as two links,
/// one per direction. Implementations are read-only snapshots; nothing in
/// hopveil mutates balances.
pub trait ChannelGraph<I: NodeIdentity>: Send + Sync {
    /// Get all nodes in the graph
    fn nodes(&self) -> Vec<I>;

    /// Get the policy of the link `from -> to`, if one exists
    fn channel(&self, from: &I, to: &I) -> Option<ChannelPolicy>;

    /// Nodes reachable over a single outbound link
    fn out_neighbors(&self, node: &I) -> Vec<I>;

    /// Nodes with a link into `node`
    fn in_neighbors(&self, node: &I) -> Vec<I>;

    /// Check if the link `from -> to` exists
    fn has_channel(&self, from: &I, to: &I) -> bool {
        self.channel(from, to).is_some()
    }

    /// Get the policy of `from -> to`, failing if the link is absent
    fn require_channel(&self, from: &I, to: &I) -> Result<ChannelPolicy, GraphError> {
        self.channel(from, to)
            .ok_or_else(|| GraphError::missing_channel(from, to))
    }

    /// Check if a node is part of the graph
    fn contains(&self, node: &I) -> bool {
        self.nodes().contains(node)
    }

    /// Combined balance of both directions between `a` and `b`
    ///
    /// A missing direction contributes nothing.
    fn capacity_between(&self, a: &I, b: &I) -> f64 {
        let forward = self.channel(a, b).map(|p| p.balance).unwrap_or(0.0);
        let backward = self.channel(b, a).map(|p| p.balance).unwrap_or(0.0);
        forward + backward
    }
}
