//! Pre-defined simulation scenarios for hopveil
//!
//! A sweep obfuscates one payment and then replays the attack from every
//! intermediary on the obfuscated route, recording how well each position
//! hides the true endpoints.

use std::fmt;

use hopveil_core::{ChannelGraph, ChannelNetwork, ChannelPolicy, NodeIdentity, Route};
use hopveil_routing::{
    AttackObservation, AttributionStrategy, BaseRouter, CheapestPathRouter, RandomHopsRouter,
};
use rand::rngs::StdRng;
use rand::{CryptoRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::SimulationConfig;
use crate::error::{SimulationError, SimulationResult};
use crate::topology::{self, from_channels};

/// What the adversary at one route position learned
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound = "I: NodeIdentity")]
pub struct PositionReport<I: NodeIdentity> {
    /// Index of the adversary on the obfuscated route
    pub position: usize,
    pub adversary: I,
    /// Number of candidate destinations
    pub destinations: usize,
    /// Sum of anonymity-set sizes
    pub total_sources: usize,
    /// Largest single anonymity set
    pub largest_set: usize,
    pub truncated: bool,
    /// Whether the true destination is a candidate
    pub destination_found: bool,
    /// Whether the true source is in the true destination's set
    pub source_found: bool,
}

/// Outcome of attacking one payment from every position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound = "I: NodeIdentity")]
pub struct SweepReport<I: NodeIdentity> {
    /// Route the base router chose
    pub optimal: Route<I>,
    /// Route after hop injection
    pub obfuscated: Route<I>,
    pub positions: Vec<PositionReport<I>>,
}

impl<I: NodeIdentity> SweepReport<I> {
    /// Fraction of positions whose anonymity sets contain the true source
    pub fn source_hit_rate(&self) -> f64 {
        if self.positions.is_empty() {
            return 0.0;
        }
        let hits = self.positions.iter().filter(|p| p.source_found).count();
        hits as f64 / self.positions.len() as f64
    }
}

impl<I: NodeIdentity> fmt::Display for SweepReport<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let render = |path: &[I]| {
            path.iter()
                .map(|n| n.short_id())
                .collect::<Vec<_>>()
                .join(" -> ")
        };
        writeln!(f, "Optimal:    {}", render(&self.optimal.path))?;
        writeln!(
            f,
            "Obfuscated: {} (delay {}, amount {:.3})",
            render(&self.obfuscated.path),
            self.obfuscated.delay,
            self.obfuscated.amount
        )?;
        writeln!(f)?;
        writeln!(
            f,
            "  {:>3}  {:>9}  {:>5}  {:>7}  {:>7}  {:>5}  {:>5}  {:>9}",
            "pos", "adversary", "dests", "sources", "largest", "dest?", "src?", "truncated"
        )?;
        for p in &self.positions {
            writeln!(
                f,
                "  {:>3}  {:>9}  {:>5}  {:>7}  {:>7}  {:>5}  {:>5}  {:>9}",
                p.position,
                p.adversary.short_id(),
                p.destinations,
                p.total_sources,
                p.largest_set,
                p.destination_found,
                p.source_found,
                p.truncated
            )?;
        }
        write!(f, "Source hit rate: {:.2}", self.source_hit_rate())
    }
}

/// Obfuscate one payment and attack it from every intermediary
///
/// `amount` is what `destination` receives. An unroutable payment yields a
/// report with no positions. A position whose attack fails is logged and
/// skipped so the rest of the sweep still runs.
pub fn run_position_sweep<I, B, R>(
    network: &dyn ChannelGraph<I>,
    router: &RandomHopsRouter<B>,
    source: &I,
    destination: &I,
    amount: f64,
    rng: &mut R,
) -> SimulationResult<SweepReport<I>>
where
    I: NodeIdentity,
    B: BaseRouter<I>,
    R: Rng + CryptoRng + ?Sized,
{
    for node in [source, destination] {
        if !network.contains(node) {
            return Err(hopveil_core::GraphError::UnknownNode(node.to_string()).into());
        }
    }

    let optimal = router.base().route_path(network, source, destination, amount);
    let obfuscated = router.route_path_with_rng(network, source, destination, amount, rng)?;
    let mut positions = Vec::new();

    if !obfuscated.is_found() {
        warn!(source = %source, destination = %destination, "Payment is unroutable");
        return Ok(SweepReport {
            optimal,
            obfuscated,
            positions,
        });
    }

    for position in 1..obfuscated.path.len() - 1 {
        let observation =
            AttackObservation::from_route(network, &obfuscated.path, amount, position)?;
        let outcome = match router.adversarial_attack(network, &observation) {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(position, error = %e, "Attack failed");
                continue;
            }
        };

        let sets = &outcome.anonymity_sets;
        let report = PositionReport {
            position,
            adversary: observation.adversary.clone(),
            destinations: sets.len(),
            total_sources: sets.total_sources(),
            largest_set: sets.iter().map(|(_, s)| s.len()).max().unwrap_or(0),
            truncated: outcome.truncated,
            destination_found: sets.sources_for(destination).is_some(),
            source_found: sets.contains(destination, source),
        };
        debug!(
            position,
            adversary = %report.adversary,
            destinations = report.destinations,
            source_found = report.source_found,
            "Position attacked"
        );
        positions.push(report);
    }

    Ok(SweepReport {
        optimal,
        obfuscated,
        positions,
    })
}

/// Sweep a payment across a network generated from `config`
pub fn run_random_sweep(
    config: &SimulationConfig,
    source: u32,
    destination: u32,
) -> SimulationResult<SweepReport<u32>> {
    let network = topology::random(config)?;
    run_config_sweep(&network, config, source, destination)
}

/// Sweep a payment across `network` with the router `config` describes
pub fn run_config_sweep<I: NodeIdentity>(
    network: &ChannelNetwork<I>,
    config: &SimulationConfig,
    source: I,
    destination: I,
) -> SimulationResult<SweepReport<I>> {
    let router =
        RandomHopsRouter::with_config(CheapestPathRouter::new(), config.injection, config.attack)?;

    info!(
        source = %source,
        destination = %destination,
        strategy = ?config.attack.strategy,
        seeded_hops = config.seeded_hops,
        "Running position sweep"
    );
    let amount = config.payment_amount;
    if config.seeded_hops {
        // Predictable to anyone who knows the seed; for repeatable experiments only
        let mut rng = StdRng::seed_from_u64(config.seed.wrapping_add(1));
        run_position_sweep(network, &router, &source, &destination, amount, &mut rng)
    } else {
        let mut rng = rand::rng();
        run_position_sweep(network, &router, &source, &destination, amount, &mut rng)
    }
}

/// The letter network used by the demo
///
/// ```text
///   A - B - C - D - E
///        \ /     \ /
///         X       Y
/// ```
///
/// X and Y are zero-delay spares an injector can splice into
/// B - C and D - E.
pub fn demo_network() -> SimulationResult<ChannelNetwork<char>> {
    let hop = ChannelPolicy::new(1_000.0, 1.0, 0.01, 10);
    let spare = ChannelPolicy::new(1_000.0, 1.0, 0.01, 0);
    Ok(from_channels(&[
        ('A', 'B', hop),
        ('B', 'C', hop),
        ('C', 'D', hop),
        ('D', 'E', hop),
        ('B', 'X', spare),
        ('X', 'C', spare),
        ('D', 'Y', spare),
        ('Y', 'E', spare),
    ])?)
}

/// Run the demo: pay A -> E and attack from every position with both strategies
pub fn run_demo() -> SimulationResult<Vec<(AttributionStrategy, SweepReport<char>)>> {
    info!("=== Running demo scenario ===");
    let network = demo_network()?;
    println!("{}", network.visualize());

    let mut reports = Vec::new();
    for strategy in [AttributionStrategy::FilteredSources, AttributionStrategy::AllSources] {
        let config = SimulationConfig {
            attack: hopveil_routing::AttackConfig {
                strategy,
                ..hopveil_routing::AttackConfig::default()
            },
            ..SimulationConfig::default()
        };
        let report = run_config_sweep(&network, &config, 'A', 'E')?;
        println!("\n--- Strategy: {strategy:?} ---");
        println!("{report}");
        reports.push((strategy, report));
    }

    if reports.iter().all(|(_, r)| r.positions.is_empty()) {
        return Err(SimulationError::Config(
            "demo payment found no intermediaries".to_string(),
        ));
    }
    Ok(reports)
}
