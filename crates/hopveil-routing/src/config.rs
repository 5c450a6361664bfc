//! Configuration for hop injection and the adversarial attack

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Longest path (original plus injected nodes) the injector will emit
pub const DEFAULT_MAX_PATH_LENGTH: usize = 20;

/// Fewest extra hops the injector aims to add
pub const DEFAULT_MIN_EXTRA_HOPS: usize = 2;

/// Number of exploration levels beyond the adversary (levels 0..=3)
pub const DEFAULT_MAX_DEPTH: usize = 4;

/// Hop injection configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InjectionConfig {
    /// Lower bound of the random extra-hop draw
    /// Default: 2
    pub min_extra_hops: usize,

    /// Cap on the total node count of an obfuscated path
    /// Default: 20
    pub max_path_length: usize,
}

impl Default for InjectionConfig {
    fn default() -> Self {
        Self {
            min_extra_hops: DEFAULT_MIN_EXTRA_HOPS,
            max_path_length: DEFAULT_MAX_PATH_LENGTH,
        }
    }
}

impl InjectionConfig {
    /// Check the configuration is usable
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_path_length < 3 {
            return Err(ConfigError::PathLengthTooShort(self.max_path_length));
        }
        if self.min_extra_hops + 2 > self.max_path_length {
            return Err(ConfigError::HopsExceedCap {
                min: self.min_extra_hops,
                max: self.max_path_length,
            });
        }
        Ok(())
    }
}

/// How exploration leaves are turned into anonymity sets
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributionStrategy {
    /// Ask the base router for every node's optimal path to each candidate
    /// destination and keep the nodes whose path crosses the observed hop
    ///
    /// Exhaustive in routing calls, blind to injection feasibility.
    AllSources,

    /// Rebuild each candidate path and keep only sources a backward search
    /// confirms could have produced it by hop injection
    #[default]
    FilteredSources,
}

/// How the backward search treats the node just before the adversary
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SenderCheck {
    /// The previous hop is always a candidate source once reached
    ///
    /// Admits senders that chose a suboptimal path, for example because of
    /// low outbound balance on their cheapest channel.
    #[default]
    Relaxed,

    /// If the previous hop's optimal path differs from the observed path,
    /// the previous hop must be the sender and is returned alone
    Strict,
}

/// Adversarial attack configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttackConfig {
    /// Attribution strategy
    /// Default: FilteredSources
    pub strategy: AttributionStrategy,

    /// Number of forward exploration levels
    /// Default: 4
    pub max_depth: usize,

    /// Previous-hop handling in the backward search
    /// Default: Relaxed
    pub sender_check: SenderCheck,
}

impl Default for AttackConfig {
    fn default() -> Self {
        Self {
            strategy: AttributionStrategy::default(),
            max_depth: DEFAULT_MAX_DEPTH,
            sender_check: SenderCheck::default(),
        }
    }
}

impl AttackConfig {
    /// Attack using the filtered-sources strategy
    pub fn filtered() -> Self {
        Self::default()
    }

    /// Attack using the all-sources strategy
    pub fn all_sources() -> Self {
        Self {
            strategy: AttributionStrategy::AllSources,
            ..Self::default()
        }
    }

    /// Replace the sender check
    pub fn with_sender_check(mut self, sender_check: SenderCheck) -> Self {
        self.sender_check = sender_check;
        self
    }

    /// Check the configuration is usable
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_depth == 0 {
            return Err(ConfigError::ZeroDepth);
        }
        Ok(())
    }
}
