//! Random hops router
//!
//! The [`RandomHopsRouter`] wraps a [`BaseRouter`] and exposes both halves
//! of the system behind one type:
//!
//! - **Obfuscation**: `route_path` asks the base router for its optimal path
//!   and runs it through the [`HopInjector`]
//! - **Attack**: `adversarial_attack` models a compromised intermediary on
//!   such a route and returns the anonymity sets it can derive
//!
//! The router itself implements [`BaseRouter`], so it can be used anywhere a
//! plain path finder is expected.

use hopveil_core::{ChannelGraph, GraphError, NodeIdentity, Route};
use rand::{CryptoRng, Rng};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::attribution::{AnonymitySets, SourceAttributor};
use crate::base::BaseRouter;
use crate::config::{AttackConfig, AttributionStrategy, InjectionConfig};
use crate::error::{RoutingError, RoutingResult};
use crate::exploration::{ExplorationTree, ObservedHop};
use crate::injector::HopInjector;

/// What a compromised intermediary sees of one payment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound = "I: NodeIdentity")]
pub struct AttackObservation<I: NodeIdentity> {
    /// The compromised node
    pub adversary: I,
    /// Node the payment came from
    pub previous_hop: I,
    /// Node the payment goes to
    pub next_hop: I,
    /// Timelock left once the payment reaches `next_hop`
    pub delay: i64,
    /// Amount forwarded to `next_hop`
    pub amount: f64,
    /// Index of the adversary on the route, when known
    ///
    /// Carried for reporting; the attack itself does not use it.
    pub position: Option<usize>,
}

impl<I: NodeIdentity> AttackObservation<I> {
    pub fn new(adversary: I, previous_hop: I, next_hop: I, delay: i64, amount: f64) -> Self {
        Self {
            adversary,
            previous_hop,
            next_hop,
            delay,
            amount,
            position: None,
        }
    }

    /// Set the adversary's position on the route
    pub fn at_position(mut self, position: usize) -> Self {
        self.position = Some(position);
        self
    }

    /// Derive what the node at `position` on `path` observes
    ///
    /// `payment_amount` is what the last node of `path` receives. The
    /// returned delay covers the links beyond `next_hop`, and the amount is
    /// what `next_hop` must receive to pay every fee after it.
    pub fn from_route(
        graph: &dyn ChannelGraph<I>,
        path: &[I],
        payment_amount: f64,
        position: usize,
    ) -> RoutingResult<Self> {
        if position == 0 || position + 1 >= path.len() {
            return Err(RoutingError::InvalidObservation(format!(
                "position {position} is not an intermediary of a {}-node path",
                path.len()
            )));
        }

        let mut delay: i64 = 0;
        let mut amount = payment_amount;
        for link in path[position + 1..].windows(2).rev() {
            let policy = graph.require_channel(&link[0], &link[1])?;
            delay += i64::from(policy.delay);
            amount = policy.amount_with_fees(amount);
        }

        Ok(Self {
            adversary: path[position].clone(),
            previous_hop: path[position - 1].clone(),
            next_hop: path[position + 1].clone(),
            delay,
            amount,
            position: Some(position),
        })
    }

    /// The three observed nodes
    pub fn hop(&self) -> ObservedHop<I> {
        ObservedHop::new(
            self.previous_hop.clone(),
            self.adversary.clone(),
            self.next_hop.clone(),
        )
    }
}

/// Result of one adversarial attack
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound = "I: NodeIdentity")]
pub struct AttackOutcome<I: NodeIdentity> {
    /// Candidate sources per candidate destination
    pub anonymity_sets: AnonymitySets<I>,
    /// Whether forward exploration hit its depth bound
    ///
    /// When set, destinations further away were not considered and the
    /// sets are a lower bound.
    pub truncated: bool,
}

/// Router that obfuscates its base router's paths with random extra hops
#[derive(Debug, Clone)]
pub struct RandomHopsRouter<B> {
    base: B,
    injector: HopInjector,
    attack: AttackConfig,
}

impl<B> RandomHopsRouter<B> {
    /// Create a router with default injection settings
    pub fn new(base: B, strategy: AttributionStrategy) -> Self {
        Self {
            base,
            injector: HopInjector::default(),
            attack: AttackConfig {
                strategy,
                ..AttackConfig::default()
            },
        }
    }

    /// Create a router with explicit configuration
    pub fn with_config(
        base: B,
        injection: InjectionConfig,
        attack: AttackConfig,
    ) -> RoutingResult<Self> {
        injection.validate()?;
        attack.validate()?;
        Ok(Self {
            base,
            injector: HopInjector::new(injection),
            attack,
        })
    }

    /// Get the wrapped base router
    pub fn base(&self) -> &B {
        &self.base
    }

    /// Get the hop injector
    pub fn injector(&self) -> &HopInjector {
        &self.injector
    }

    /// Get the attack configuration
    pub fn attack_config(&self) -> &AttackConfig {
        &self.attack
    }

    /// Route a payment and inject random hops, drawing from `rng`
    ///
    /// Returns [`Route::unroutable`] when the base router finds no path.
    /// The returned `dist` is always 0: costs are not tracked once hops
    /// have been injected.
    pub fn route_path_with_rng<I, R>(
        &self,
        graph: &dyn ChannelGraph<I>,
        source: &I,
        destination: &I,
        amount: f64,
        rng: &mut R,
    ) -> RoutingResult<Route<I>>
    where
        I: NodeIdentity,
        B: BaseRouter<I>,
        R: Rng + CryptoRng + ?Sized,
    {
        let optimal = self.base.route_path(graph, source, destination, amount);
        debug!(
            source = %source,
            destination = %destination,
            optimal_hops = optimal.hop_count(),
            "Base route computed"
        );
        self.injector.inject(graph, &optimal.path, amount, rng)
    }

    /// Run the adversarial attack for one observation
    ///
    /// Fails if an observed node is unknown, the three observed nodes are
    /// not distinct, or the observed hop is not backed by channels.
    #[instrument(
        skip(self, graph, observation),
        fields(adversary = %observation.adversary, position = ?observation.position)
    )]
    pub fn adversarial_attack<I>(
        &self,
        graph: &dyn ChannelGraph<I>,
        observation: &AttackObservation<I>,
    ) -> RoutingResult<AttackOutcome<I>>
    where
        I: NodeIdentity,
        B: BaseRouter<I>,
    {
        validate_observation(graph, observation)?;

        let hop = observation.hop();
        let tree = ExplorationTree::explore(
            graph,
            &hop,
            observation.delay,
            observation.amount,
            self.attack.max_depth,
        );
        let anonymity_sets = SourceAttributor::new(graph, &self.base, self.attack)
            .attribute(&tree, &hop)?;

        debug!(
            destinations = anonymity_sets.len(),
            sources = anonymity_sets.total_sources(),
            truncated = tree.is_truncated(),
            "Attack finished"
        );

        Ok(AttackOutcome {
            anonymity_sets,
            truncated: tree.is_truncated(),
        })
    }
}

fn validate_observation<I: NodeIdentity>(
    graph: &dyn ChannelGraph<I>,
    observation: &AttackObservation<I>,
) -> RoutingResult<()> {
    for node in [
        &observation.previous_hop,
        &observation.adversary,
        &observation.next_hop,
    ] {
        if !graph.contains(node) {
            return Err(GraphError::UnknownNode(node.to_string()).into());
        }
    }

    if observation.previous_hop == observation.adversary
        || observation.adversary == observation.next_hop
        || observation.previous_hop == observation.next_hop
    {
        return Err(RoutingError::InvalidObservation(
            "previous hop, adversary and next hop must be distinct".to_string(),
        ));
    }

    if observation.delay < 0 || !observation.amount.is_finite() || observation.amount < 0.0 {
        return Err(RoutingError::InvalidObservation(format!(
            "delay {} and amount {} must both be non-negative",
            observation.delay, observation.amount
        )));
    }

    graph.require_channel(&observation.previous_hop, &observation.adversary)?;
    graph.require_channel(&observation.adversary, &observation.next_hop)?;
    Ok(())
}

impl<I, B> BaseRouter<I> for RandomHopsRouter<B>
where
    I: NodeIdentity,
    B: BaseRouter<I>,
{
    fn route_path(
        &self,
        graph: &dyn ChannelGraph<I>,
        source: &I,
        destination: &I,
        amount: f64,
    ) -> Route<I> {
        let mut rng = rand::rng();
        match self.route_path_with_rng(graph, source, destination, amount, &mut rng) {
            Ok(route) => route,
            Err(e) => {
                warn!(source = %source, destination = %destination, error = %e, "Base route is not backed by channels");
                Route::unroutable()
            }
        }
    }

    fn cost_function(&self, graph: &dyn ChannelGraph<I>, amount: f64, u: &I, v: &I) -> f64 {
        self.base.cost_function(graph, amount, u, v)
    }

    fn name(&self) -> String {
        format!("Random Hops + {}", self.base.name())
    }

    fn tech(&self) -> String {
        self.base.tech()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::CheapestPathRouter;
    use crate::config::SenderCheck;
    use crate::error::ConfigError;
    use hopveil_core::{ChannelNetwork, ChannelPolicy};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn ample() -> ChannelPolicy {
        ChannelPolicy::new(1_000.0, 1.0, 0.01, 10)
    }

    fn line() -> ChannelNetwork<char> {
        ChannelNetwork::from_channels(vec![
            ('A', 'B', ample()),
            ('B', 'C', ample()),
            ('C', 'D', ample()),
            ('D', 'E', ample()),
        ])
        .unwrap()
    }

    #[test]
    fn test_names() {
        let router = RandomHopsRouter::new(CheapestPathRouter::new(), AttributionStrategy::default());
        assert_eq!(
            BaseRouter::<char>::name(&router),
            "Random Hops + Cheapest Path"
        );
        assert_eq!(BaseRouter::<char>::tech(&router), "LN");
    }

    #[test]
    fn test_invalid_config_rejected() {
        let result = RandomHopsRouter::with_config(
            CheapestPathRouter::new(),
            InjectionConfig::default(),
            AttackConfig {
                max_depth: 0,
                ..AttackConfig::default()
            },
        );
        assert!(matches!(
            result,
            Err(RoutingError::Config(ConfigError::ZeroDepth))
        ));
    }

    #[test]
    fn test_route_without_spare_nodes() {
        let network = line();
        let router = RandomHopsRouter::new(CheapestPathRouter::new(), AttributionStrategy::default());
        let mut rng = StdRng::seed_from_u64(5);

        let route = router
            .route_path_with_rng(&network, &'A', &'E', 10.0, &mut rng)
            .unwrap();
        assert_eq!(route.path, vec!['A', 'B', 'C', 'D', 'E']);
        assert_eq!(route.delay, 40);
        assert_eq!(route.dist, 0.0);
    }

    #[test]
    fn test_route_unroutable() {
        let mut network = line();
        network.add_node('Z');
        let router = RandomHopsRouter::new(CheapestPathRouter::new(), AttributionStrategy::default());

        let route = router.route_path(&network, &'A', &'Z', 10.0);
        assert_eq!(route, Route::unroutable());
    }

    #[test]
    fn test_observation_from_route() {
        let network = line();
        let path = ['A', 'B', 'C', 'D', 'E'];

        let observation = AttackObservation::from_route(&network, &path, 100.0, 1).unwrap();
        assert_eq!(observation.adversary, 'B');
        assert_eq!(observation.previous_hop, 'A');
        assert_eq!(observation.next_hop, 'C');
        // C -> D and D -> E remain
        assert_eq!(observation.delay, 20);
        let expected = ample().amount_with_fees(ample().amount_with_fees(100.0));
        assert!((observation.amount - expected).abs() < 1e-9);
        assert_eq!(observation.position, Some(1));

        assert!(AttackObservation::from_route(&network, &path, 100.0, 0).is_err());
        assert!(AttackObservation::from_route(&network, &path, 100.0, 4).is_err());
    }

    #[test]
    fn test_attack_recovers_true_endpoints() {
        let network = line();
        let path = ['A', 'B', 'C', 'D', 'E'];
        let router = RandomHopsRouter::new(CheapestPathRouter::new(), AttributionStrategy::FilteredSources);

        let observation = AttackObservation::from_route(&network, &path, 100.0, 2).unwrap();
        let outcome = router.adversarial_attack(&network, &observation).unwrap();
        assert!(!outcome.truncated);
        assert!(outcome.anonymity_sets.contains(&'E', &'A'));
        assert!(outcome.anonymity_sets.contains(&'E', &'B'));
    }

    #[test]
    fn test_strict_router_attack() {
        let network = line();
        let router = RandomHopsRouter::with_config(
            CheapestPathRouter::new(),
            InjectionConfig::default(),
            AttackConfig::filtered().with_sender_check(SenderCheck::Strict),
        )
        .unwrap();

        let observation = AttackObservation::from_route(&network, &['A', 'B', 'C', 'D', 'E'], 100.0, 2).unwrap();
        let outcome = router.adversarial_attack(&network, &observation).unwrap();
        assert!(outcome.anonymity_sets.contains(&'E', &'B'));
    }

    #[test]
    fn test_malformed_observations() {
        let network = line();
        let router = RandomHopsRouter::new(CheapestPathRouter::new(), AttributionStrategy::default());

        let unknown = AttackObservation::new('B', 'A', 'Q', 0, 10.0);
        assert_eq!(
            router.adversarial_attack(&network, &unknown),
            Err(RoutingError::Graph(GraphError::UnknownNode("Q".to_string())))
        );

        let repeated = AttackObservation::new('B', 'A', 'A', 0, 10.0);
        assert!(matches!(
            router.adversarial_attack(&network, &repeated),
            Err(RoutingError::InvalidObservation(_))
        ));

        let negative = AttackObservation::new('B', 'A', 'C', -1, 10.0);
        assert!(matches!(
            router.adversarial_attack(&network, &negative),
            Err(RoutingError::InvalidObservation(_))
        ));

        let no_channel = AttackObservation::new('B', 'A', 'D', 0, 10.0);
        assert!(matches!(
            router.adversarial_attack(&network, &no_channel),
            Err(RoutingError::Graph(GraphError::MissingChannel { .. }))
        ));
    }
}
