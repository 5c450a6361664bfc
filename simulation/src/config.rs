//! Configuration for generated networks and sweeps

use std::fs;
use std::path::Path;

use hopveil_core::ChannelPolicy;
use hopveil_routing::{AttackConfig, InjectionConfig, RoutingError};
use rand::Rng;
use rand::seq::IndexedRandom;
use serde::{Deserialize, Serialize};

use crate::error::{SimulationError, SimulationResult};

/// Parameters for a randomly generated network and the payments routed on it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Number of nodes, labelled `0..nodes`
    /// Default: 20
    pub nodes: u32,

    /// Chance that any pair of nodes gets a channel beyond the spanning tree
    /// Default: 0.15
    pub channel_probability: f64,

    /// Smallest per-direction balance
    /// Default: 1000.0
    pub min_balance: f64,

    /// Largest per-direction balance
    /// Default: 10000.0
    pub max_balance: f64,

    /// Largest base fee
    /// Default: 2.0
    pub max_base_fee: f64,

    /// Largest proportional fee
    /// Default: 0.005
    pub max_fee_rate: f64,

    /// Timelock values links draw from
    /// Default: [10, 20, 40]
    pub delays: Vec<u32>,

    /// Amount delivered to the destination
    /// Default: 100.0
    pub payment_amount: f64,

    /// Seed for topology generation and hop selection
    /// Default: 42
    pub seed: u64,

    /// Draw injected hops from a generator seeded with `seed + 1` so sweeps
    /// repeat exactly. When false, hops come from the thread-local CSPRNG as
    /// they would for a real sender.
    /// Default: true
    pub seeded_hops: bool,

    pub injection: InjectionConfig,

    pub attack: AttackConfig,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            nodes: 20,
            channel_probability: 0.15,
            min_balance: 1_000.0,
            max_balance: 10_000.0,
            max_base_fee: 2.0,
            max_fee_rate: 0.005,
            delays: vec![10, 20, 40],
            payment_amount: 100.0,
            seed: 42,
            seeded_hops: true,
            injection: InjectionConfig::default(),
            attack: AttackConfig::default(),
        }
    }
}

impl SimulationConfig {
    /// A small, sparse network for quick experiments
    pub fn small() -> Self {
        Self {
            nodes: 10,
            channel_probability: 0.2,
            ..Self::default()
        }
    }

    /// A larger, denser network
    pub fn dense() -> Self {
        Self {
            nodes: 40,
            channel_probability: 0.25,
            ..Self::default()
        }
    }

    /// Load a configuration from a JSON file
    ///
    /// Missing fields take their default values.
    pub fn from_file(path: impl AsRef<Path>) -> SimulationResult<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Check every parameter is in range
    pub fn validate(&self) -> SimulationResult<()> {
        if self.nodes < 2 {
            return Err(SimulationError::Config(format!(
                "need at least 2 nodes, got {}",
                self.nodes
            )));
        }
        if !(0.0..=1.0).contains(&self.channel_probability) {
            return Err(SimulationError::Config(format!(
                "channel probability {} is not in [0, 1]",
                self.channel_probability
            )));
        }
        if self.min_balance < 0.0 || self.min_balance > self.max_balance {
            return Err(SimulationError::Config(format!(
                "balance range {}..{} is empty",
                self.min_balance, self.max_balance
            )));
        }
        if self.max_base_fee < 0.0 || self.max_fee_rate < 0.0 {
            return Err(SimulationError::Config("fees cannot be negative".to_string()));
        }
        if self.delays.is_empty() {
            return Err(SimulationError::Config("no delay values to draw from".to_string()));
        }
        if self.payment_amount.is_nan() || self.payment_amount <= 0.0 {
            return Err(SimulationError::Config(format!(
                "payment amount {} must be positive",
                self.payment_amount
            )));
        }
        self.injection.validate().map_err(RoutingError::from)?;
        self.attack.validate().map_err(RoutingError::from)?;
        Ok(())
    }

    /// Draw one link policy within the configured ranges
    pub fn random_policy<R: Rng + ?Sized>(&self, rng: &mut R) -> ChannelPolicy {
        let balance = if self.max_balance > self.min_balance {
            rng.random_range(self.min_balance..=self.max_balance)
        } else {
            self.min_balance
        };
        let base_fee = rng.random_range(0.0..=self.max_base_fee);
        let fee_rate = rng.random_range(0.0..=self.max_fee_rate);
        let delay = self.delays.choose(rng).copied().unwrap_or_default();
        ChannelPolicy::new(balance, base_fee, fee_rate, delay)
    }
}
