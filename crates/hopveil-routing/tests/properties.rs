//! Seeded property sweeps over random channel networks
//!
//! Every case is driven by a `StdRng` seeded from the case number, so a
//! failure reproduces from its seed alone.

use std::sync::Arc;
use std::thread;

use hopveil_core::{ChannelGraph, ChannelNetwork, ChannelPolicy};
use hopveil_routing::{
    AttackObservation, AttributionStrategy, BaseRouter, CheapestPathRouter, ExplorationTree,
    RandomHopsRouter, could_be_modification, is_impossible_modification,
};
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};

const CASES: u64 = 24;

/// Ring of `nodes` nodes plus random chords, with random policies
fn random_network(nodes: u32, chords: usize, rng: &mut StdRng) -> ChannelNetwork<u32> {
    let mut network = ChannelNetwork::new();
    let policy = |rng: &mut StdRng| {
        ChannelPolicy::new(
            rng.random_range(500.0..5_000.0),
            rng.random_range(0.0..3.0),
            rng.random_range(0.0..0.01),
            *[0u32, 5, 10, 20].choose(rng).unwrap_or(&10),
        )
    };

    for node in 0..nodes {
        let next = (node + 1) % nodes;
        let (forward, backward) = (policy(rng), policy(rng));
        network.open_channel(node, next, forward, backward).unwrap();
    }
    for _ in 0..chords {
        let a = rng.random_range(0..nodes);
        let b = rng.random_range(0..nodes);
        if a == b || network.has_channel(&a, &b) {
            continue;
        }
        let (forward, backward) = (policy(rng), policy(rng));
        network.open_channel(a, b, forward, backward).unwrap();
    }
    network
}

fn endpoints(nodes: u32, rng: &mut StdRng) -> (u32, u32) {
    let source = rng.random_range(0..nodes);
    let mut destination = rng.random_range(0..nodes);
    while destination == source {
        destination = rng.random_range(0..nodes);
    }
    (source, destination)
}

fn path_delay(network: &ChannelNetwork<u32>, path: &[u32]) -> i64 {
    path.windows(2)
        .map(|link| i64::from(network.channel(&link[0], &link[1]).unwrap().delay))
        .sum()
}

#[test]
fn test_injected_routes_are_sound() {
    let router = RandomHopsRouter::new(CheapestPathRouter::new(), AttributionStrategy::default());

    for case in 0..CASES {
        let mut rng = StdRng::seed_from_u64(case);
        let network = random_network(14, 20, &mut rng);
        let (source, destination) = endpoints(14, &mut rng);

        let optimal = router.base().route_path(&network, &source, &destination, 100.0);
        let route = router
            .route_path_with_rng(&network, &source, &destination, 100.0, &mut rng)
            .unwrap();

        assert!(route.is_found(), "case {case}: ring keeps every pair connected");
        assert!(route.is_loop_free(), "case {case}: {:?}", route.path);
        assert!(route.path.len() <= 20, "case {case}");
        assert!(route.path.len() >= optimal.path.len(), "case {case}");
        let added = route.path.len() - optimal.path.len();
        assert!(added <= optimal.path.len().saturating_sub(2).max(2), "case {case}");
        assert_eq!(route.source(), Some(&source));
        assert_eq!(route.destination(), Some(&destination));
        assert_eq!(route.delay, path_delay(&network, &route.path), "case {case}");
        assert_eq!(route.dist, 0.0);
        assert!(
            could_be_modification(&route.path, &optimal.path),
            "case {case}: {:?} from {:?}",
            route.path,
            optimal.path
        );
    }
}

/// Ring of `nodes` nodes where every ring link `i - i+1` has its own spare
/// `nodes + i` linked to both ends. Spares charge enough that the cheapest
/// path never uses them.
fn spared_ring(nodes: u32) -> ChannelNetwork<u32> {
    let ring = ChannelPolicy::new(10_000.0, 1.0, 0.001, 10);
    let spare = ChannelPolicy::new(10_000.0, 50.0, 0.001, 10);
    let mut network = ChannelNetwork::new();
    for node in 0..nodes {
        let next = (node + 1) % nodes;
        network.open_channel(node, next, ring, ring).unwrap();
        network.open_channel(node, nodes + node, spare, spare).unwrap();
        network.open_channel(nodes + node, next, spare, spare).unwrap();
    }
    network
}

#[test]
fn test_spares_always_meet_the_hop_quota() {
    let nodes = 12;
    let network = spared_ring(nodes);
    let router = RandomHopsRouter::new(CheapestPathRouter::new(), AttributionStrategy::default());

    for case in 0..CASES {
        let mut rng = StdRng::seed_from_u64(2_000 + case);
        let (source, destination) = endpoints(nodes, &mut rng);

        let optimal = router.base().route_path(&network, &source, &destination, 100.0);
        assert!(
            optimal.path.iter().all(|n| *n < nodes),
            "case {case}: {:?}",
            optimal.path
        );
        let route = router
            .route_path_with_rng(&network, &source, &destination, 100.0, &mut rng)
            .unwrap();

        let len = optimal.path.len();
        if len == 2 {
            assert_eq!(route.path, optimal.path, "case {case}");
            continue;
        }
        // One dedicated spare per link, so the drawn quota is always met
        let added = route.path.len() - len;
        assert!(added >= 2, "case {case}: {:?}", route.path);
        assert!(added <= (len - 2).max(2), "case {case}: {:?}", route.path);
        assert!(could_be_modification(&route.path, &optimal.path), "case {case}");
    }
}

#[test]
fn test_mutilated_paths_are_rejected() {
    let base = CheapestPathRouter::new();

    for case in 0..CASES {
        let mut rng = StdRng::seed_from_u64(1_000 + case);
        let network = random_network(14, 20, &mut rng);
        let (source, destination) = endpoints(14, &mut rng);
        let optimal = base.route_path(&network, &source, &destination, 100.0).path;
        if optimal.len() < 3 {
            continue;
        }

        let mut removed = optimal.clone();
        removed.remove(rng.random_range(1..optimal.len() - 1));
        assert!(is_impossible_modification(&removed, &optimal), "case {case}");

        let mut reordered = optimal.clone();
        let i = rng.random_range(0..optimal.len() - 1);
        reordered.swap(i, i + 1);
        assert!(is_impossible_modification(&reordered, &optimal), "case {case}");
    }
}

#[test]
fn test_exploration_depth_is_bounded() {
    for case in 0..CASES {
        let mut rng = StdRng::seed_from_u64(2_000 + case);
        // Dense networks with a generous timelock explore as deep as allowed
        let network = random_network(12, 40, &mut rng);
        let (previous_hop, adversary) = endpoints(12, &mut rng);
        let Some(next_hop) = network
            .out_neighbors(&adversary)
            .into_iter()
            .find(|n| *n != previous_hop)
        else {
            continue;
        };
        let observation = AttackObservation::new(adversary, previous_hop, next_hop, 40, 50.0);

        let tree = ExplorationTree::explore(&network, &observation.hop(), 40, 50.0, 4);
        assert!(tree.depth() <= 4, "case {case}");
        assert!(tree.level(4).is_none());
        if tree.depth() < 4 {
            assert!(!tree.is_truncated(), "case {case}");
        }
        for (level, index, leaf) in tree.leaves() {
            let path = tree.branch_path(level, index);
            assert_eq!(path.first(), Some(&next_hop));
            assert_eq!(path.last(), Some(&leaf.node));
            assert!(!path.contains(&adversary) && !path.contains(&previous_hop));
        }
    }
}

#[test]
fn test_anonymity_sets_exclude_destination_and_adversary() {
    let strategies = [AttributionStrategy::FilteredSources, AttributionStrategy::AllSources];

    for case in 0..CASES / 2 {
        let mut rng = StdRng::seed_from_u64(3_000 + case);
        let network = random_network(10, 12, &mut rng);
        let (source, destination) = endpoints(10, &mut rng);

        for strategy in strategies {
            let router = RandomHopsRouter::new(CheapestPathRouter::new(), strategy);
            let route = router
                .route_path_with_rng(&network, &source, &destination, 100.0, &mut rng)
                .unwrap();

            for position in 1..route.path.len().saturating_sub(1) {
                let observation =
                    AttackObservation::from_route(&network, &route.path, 100.0, position).unwrap();
                let outcome = router.adversarial_attack(&network, &observation).unwrap();
                for (candidate, sources) in outcome.anonymity_sets.iter() {
                    assert!(!sources.is_empty(), "case {case}");
                    assert!(!sources.contains(candidate), "case {case}");
                    assert!(!sources.contains(&observation.adversary), "case {case}");
                }
            }
        }
    }
}

#[test]
fn test_concurrent_attacks_agree() {
    let mut rng = StdRng::seed_from_u64(4_242);
    let network = Arc::new(random_network(12, 16, &mut rng));
    let router = Arc::new(RandomHopsRouter::new(
        CheapestPathRouter::new(),
        AttributionStrategy::FilteredSources,
    ));

    let route = router
        .route_path_with_rng(network.as_ref(), &0, &6, 100.0, &mut rng)
        .unwrap();
    let observations: Vec<AttackObservation<u32>> = (1..route.path.len() - 1)
        .map(|position| {
            AttackObservation::from_route(network.as_ref(), &route.path, 100.0, position).unwrap()
        })
        .collect();
    let expected: Vec<_> = observations
        .iter()
        .map(|o| router.adversarial_attack(network.as_ref(), o).unwrap())
        .collect();

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let network = Arc::clone(&network);
            let router = Arc::clone(&router);
            let observations = observations.clone();
            thread::spawn(move || {
                observations
                    .iter()
                    .map(|o| router.adversarial_attack(network.as_ref(), o).unwrap())
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), expected);
    }
}
