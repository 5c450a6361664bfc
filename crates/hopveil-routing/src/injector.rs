//! Random hop injection
//!
//! The [`HopInjector`] takes an optimal payment path and splices extra
//! intermediaries into it so an observer on the path cannot read the
//! distance to the sender or receiver off its position.
//!
//! ## Algorithm
//!
//! The path is walked from the destination toward the source. For each
//! consecutive pair `(current, next)` an extra hop `h` may be placed between
//! them, turning `next -> current` into `next -> h -> current`, when:
//!
//! 1. `next` has a link into `h` and `h` has a link into `current`
//! 2. `h` is neither on the original path nor already injected
//! 3. both new links have combined two-way balance for the running amount
//!
//! At most one hop is placed per pair, chosen uniformly among candidates,
//! until the randomly drawn quota is met. Fees are added to the running
//! amount for every traversed link except the source's own.
//!
//! Hop selection must be unpredictable to the adversary, so the injector
//! only accepts cryptographically secure generators.

use std::collections::HashSet;

use hopveil_core::{ChannelGraph, NodeIdentity, Route};
use rand::seq::IndexedRandom;
use rand::{CryptoRng, Rng};
use tracing::{debug, trace};

use crate::config::InjectionConfig;
use crate::error::RoutingResult;

/// Splices random intermediaries into optimal paths
#[derive(Debug, Clone, Copy, Default)]
pub struct HopInjector {
    config: InjectionConfig,
}

impl HopInjector {
    /// Create an injector with the given configuration
    pub fn new(config: InjectionConfig) -> Self {
        Self { config }
    }

    /// Get the injector configuration
    pub fn config(&self) -> &InjectionConfig {
        &self.config
    }

    /// Obfuscate `path`, which must carry `amount` to its last node
    ///
    /// A two-node path is a direct channel and is returned unchanged. A
    /// shorter path means no route was found and yields
    /// [`Route::unroutable`]. Fails only if `path` names a link the graph
    /// does not have.
    pub fn inject<I, R>(
        &self,
        graph: &dyn ChannelGraph<I>,
        path: &[I],
        amount: f64,
        rng: &mut R,
    ) -> RoutingResult<Route<I>>
    where
        I: NodeIdentity,
        R: Rng + CryptoRng + ?Sized,
    {
        match path.len() {
            0 | 1 => return Ok(Route::unroutable()),
            2 => {
                let policy = graph.require_channel(&path[0], &path[1])?;
                return Ok(Route::new(path.to_vec(), amount, i64::from(policy.delay)));
            }
            _ => {}
        }

        let quota = self.extra_hop_quota(path.len(), rng);
        let on_path: HashSet<&I> = path.iter().collect();
        let reversed: Vec<I> = path.iter().rev().cloned().collect();

        let mut modified: Vec<I> = Vec::with_capacity(path.len() + quota);
        let mut injected = 0usize;
        let mut amount = amount;

        for pair in reversed.windows(2) {
            let (current, next) = (&pair[0], &pair[1]);

            let candidates: Vec<I> = graph
                .in_neighbors(current)
                .into_iter()
                .filter(|hop| {
                    hop != next
                        && graph.has_channel(next, hop)
                        && !modified.contains(hop)
                        && !on_path.contains(hop)
                        && graph.capacity_between(hop, current) >= amount
                        && graph.capacity_between(hop, next) >= amount
                })
                .collect();

            modified.push(current.clone());
            if modified.len() > 1 {
                amount = charge_last_link(graph, &modified, amount)?;
            }

            if injected < quota {
                if let Some(hop) = candidates.choose(rng) {
                    trace!(
                        hop = %hop,
                        between = %next,
                        and = %current,
                        candidates = candidates.len(),
                        "Injecting hop"
                    );
                    modified.push(hop.clone());
                    injected += 1;
                    amount = charge_last_link(graph, &modified, amount)?;
                }
            }
        }
        modified.push(reversed[reversed.len() - 1].clone());

        let mut delay: i64 = 0;
        for link in modified.windows(2) {
            delay += i64::from(graph.require_channel(&link[1], &link[0])?.delay);
        }

        modified.reverse();
        debug!(
            optimal_len = path.len(),
            obfuscated = modified.len(),
            quota,
            injected,
            delay,
            "Injected random hops"
        );

        Ok(Route::new(modified, amount, delay))
    }

    /// Draw how many hops to add to a path of `len` nodes
    ///
    /// Uniform in `[min_extra_hops, len - 2]` for paths longer than
    /// `min_extra_hops + 1`, otherwise exactly `min_extra_hops`, then
    /// clamped so the result stays under the path-length cap.
    pub fn extra_hop_quota<R>(&self, len: usize, rng: &mut R) -> usize
    where
        R: Rng + CryptoRng + ?Sized,
    {
        let min = self.config.min_extra_hops;
        let drawn = if len > min + 1 {
            rng.random_range(min..=len - 2)
        } else {
            min
        };

        if drawn + len > self.config.max_path_length {
            self.config.max_path_length.saturating_sub(len)
        } else {
            drawn
        }
    }
}

/// Add the fee of the link into the last emitted node
///
/// `modified` runs destination-first, so the payment flows from the last
/// element to the one before it.
fn charge_last_link<I: NodeIdentity>(
    graph: &dyn ChannelGraph<I>,
    modified: &[I],
    amount: f64,
) -> RoutingResult<f64> {
    let n = modified.len();
    let policy = graph.require_channel(&modified[n - 1], &modified[n - 2])?;
    Ok(policy.amount_with_fees(amount))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RoutingError;
    use hopveil_core::{ChannelNetwork, ChannelPolicy, GraphError};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn ample() -> ChannelPolicy {
        ChannelPolicy::new(1_000.0, 1.0, 0.01, 10)
    }

    /// A - B - C - D with a spare X linked to both B and C
    fn spare_hop_network() -> ChannelNetwork<char> {
        ChannelNetwork::from_channels(vec![
            ('A', 'B', ample()),
            ('B', 'C', ample()),
            ('C', 'D', ample()),
            ('B', 'X', ChannelPolicy::new(1_000.0, 1.0, 0.01, 0)),
            ('X', 'C', ChannelPolicy::new(1_000.0, 1.0, 0.01, 0)),
        ])
        .unwrap()
    }

    #[test]
    fn test_direct_link_unchanged() {
        let network = ChannelNetwork::from_channels(vec![(
            'A',
            'B',
            ChannelPolicy::new(100.0, 0.0, 0.0, 42),
        )])
        .unwrap();
        let injector = HopInjector::default();
        let mut rng = StdRng::seed_from_u64(7);

        let route = injector
            .inject(&network, &['A', 'B'], 25.0, &mut rng)
            .unwrap();
        assert_eq!(route.path, vec!['A', 'B']);
        assert_eq!(route.delay, 42);
        assert_eq!(route.amount, 25.0);
    }

    #[test]
    fn test_short_path_is_unroutable() {
        let network = spare_hop_network();
        let injector = HopInjector::default();
        let mut rng = StdRng::seed_from_u64(7);

        let empty: [char; 0] = [];
        let route = injector.inject(&network, &empty, 25.0, &mut rng).unwrap();
        assert_eq!(route, Route::unroutable());

        let route = injector.inject(&network, &['A'], 25.0, &mut rng).unwrap();
        assert!(route.path.is_empty());
        assert_eq!(route.delay, -1);
        assert_eq!(route.amount, -1.0);
    }

    #[test]
    fn test_spare_hop_is_injected() {
        let network = spare_hop_network();
        let injector = HopInjector::default();

        for seed in 0..16 {
            let mut rng = StdRng::seed_from_u64(seed);
            let route = injector
                .inject(&network, &['A', 'B', 'C', 'D'], 100.0, &mut rng)
                .unwrap();
            assert_eq!(route.path, vec!['A', 'B', 'X', 'C', 'D']);
            // A->B 10, B->X 0, X->C 0, C->D 10
            assert_eq!(route.delay, 20);
        }
    }

    #[test]
    fn test_fees_accumulate_per_traversed_link() {
        let network = spare_hop_network();
        let injector = HopInjector::default();
        let mut rng = StdRng::seed_from_u64(1);

        let route = injector
            .inject(&network, &['A', 'B', 'C', 'D'], 100.0, &mut rng)
            .unwrap();

        // C->D, X->C and B->X each add 1 + 1% of the running amount
        let mut expected = 100.0;
        for _ in 0..3 {
            expected = expected + 1.0 + expected * 0.01;
        }
        assert!((route.amount - expected).abs() < 1e-9);
    }

    #[test]
    fn test_no_candidates_keeps_path() {
        let network = ChannelNetwork::from_channels(vec![
            ('A', 'B', ample()),
            ('B', 'C', ample()),
            ('C', 'D', ample()),
        ])
        .unwrap();
        let injector = HopInjector::default();
        let mut rng = StdRng::seed_from_u64(3);

        let route = injector
            .inject(&network, &['A', 'B', 'C', 'D'], 10.0, &mut rng)
            .unwrap();
        assert_eq!(route.path, vec!['A', 'B', 'C', 'D']);
        assert_eq!(route.delay, 30);
    }

    #[test]
    fn test_insufficient_capacity_blocks_hop() {
        let network = ChannelNetwork::from_channels(vec![
            ('A', 'B', ample()),
            ('B', 'C', ample()),
            ('C', 'D', ample()),
            ('B', 'X', ChannelPolicy::new(10.0, 0.0, 0.0, 0)),
            ('X', 'C', ChannelPolicy::new(10.0, 0.0, 0.0, 0)),
        ])
        .unwrap();
        let injector = HopInjector::default();
        let mut rng = StdRng::seed_from_u64(3);

        // X offers 20 in combined balance, the payment needs 100
        let route = injector
            .inject(&network, &['A', 'B', 'C', 'D'], 100.0, &mut rng)
            .unwrap();
        assert!(!route.path.contains(&'X'));
    }

    #[test]
    fn test_one_way_spare_is_skipped() {
        // X only links out to B and C, so no payment can reach it from C or B
        let network = ChannelNetwork::from_links(vec![
            ('A', 'B', ample()),
            ('B', 'A', ample()),
            ('B', 'C', ample()),
            ('C', 'B', ample()),
            ('C', 'D', ample()),
            ('D', 'C', ample()),
            ('X', 'C', ample()),
            ('X', 'B', ample()),
        ])
        .unwrap();
        let injector = HopInjector::default();

        for seed in 0..8 {
            let mut rng = StdRng::seed_from_u64(seed);
            let route = injector
                .inject(&network, &['A', 'B', 'C', 'D'], 10.0, &mut rng)
                .unwrap();
            assert_eq!(route.path, vec!['A', 'B', 'C', 'D']);
            assert_eq!(route.delay, 30);
        }
    }

    #[test]
    fn test_missing_link_is_an_error() {
        let network = spare_hop_network();
        let injector = HopInjector::default();
        let mut rng = StdRng::seed_from_u64(3);

        let result = injector.inject(&network, &['A', 'D'], 10.0, &mut rng);
        assert_eq!(
            result,
            Err(RoutingError::Graph(GraphError::missing_channel('A', 'D')))
        );
    }

    #[test]
    fn test_quota_bounds() {
        let injector = HopInjector::default();
        let mut rng = StdRng::seed_from_u64(11);

        assert_eq!(injector.extra_hop_quota(3, &mut rng), 2);
        for _ in 0..64 {
            let quota = injector.extra_hop_quota(8, &mut rng);
            assert!((2..=6).contains(&quota));
        }
        // 15 nodes draw up to 13 hops but only 5 fit under the cap of 20
        for _ in 0..64 {
            assert!(injector.extra_hop_quota(15, &mut rng) <= 5);
        }
        assert_eq!(injector.extra_hop_quota(25, &mut rng), 0);
    }
}
