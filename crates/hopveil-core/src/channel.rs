//! Channel policies and routes

use serde::{Deserialize, Serialize};

use crate::error::GraphError;
use crate::identity::NodeIdentity;

/// Forwarding policy of one direction of a payment channel
///
/// A channel between `u` and `v` is two independent policies: one for
/// payments flowing `u -> v` and one for `v -> u`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChannelPolicy {
    /// Amount currently forwardable in this direction
    pub balance: f64,
    /// Fixed fee charged for forwarding
    pub base_fee: f64,
    /// Proportional fee charged per unit forwarded
    pub fee_rate: f64,
    /// Timelock units this hop adds
    pub delay: u32,
}

impl ChannelPolicy {
    /// Create a new policy
    pub fn new(balance: f64, base_fee: f64, fee_rate: f64, delay: u32) -> Self {
        Self {
            balance,
            base_fee,
            fee_rate,
            delay,
        }
    }

    /// A fee-free policy with the given balance and delay
    pub fn free(balance: f64, delay: u32) -> Self {
        Self::new(balance, 0.0, 0.0, delay)
    }

    /// Fee charged for forwarding `amount` over this direction
    pub fn fee_for(&self, amount: f64) -> f64 {
        self.base_fee + amount * self.fee_rate
    }

    /// Amount that must enter this hop so that `amount` leaves it
    pub fn amount_with_fees(&self, amount: f64) -> f64 {
        amount + self.fee_for(amount)
    }

    /// Inverse of [`ChannelPolicy::amount_with_fees`]
    ///
    /// Recovers the amount delivered past this hop from the amount that
    /// entered it.
    pub fn amount_before_fees(&self, amount: f64) -> f64 {
        (amount - self.base_fee) / (1.0 + self.fee_rate)
    }

    /// Check that the policy describes a usable link
    pub fn validate(&self) -> Result<(), GraphError> {
        if !self.balance.is_finite() || self.balance < 0.0 {
            return Err(GraphError::InvalidPolicy(format!(
                "balance must be a non-negative number, got {}",
                self.balance
            )));
        }
        if !self.base_fee.is_finite() || self.base_fee < 0.0 {
            return Err(GraphError::InvalidPolicy(format!(
                "base fee must be a non-negative number, got {}",
                self.base_fee
            )));
        }
        // fee_rate of -1 would make amount_before_fees divide by zero
        if !self.fee_rate.is_finite() || self.fee_rate < 0.0 {
            return Err(GraphError::InvalidPolicy(format!(
                "fee rate must be a non-negative number, got {}",
                self.fee_rate
            )));
        }
        Ok(())
    }
}

/// A payment route
///
/// `amount` is what the first hop must forward once every downstream fee
/// has been added; `delay` is the sum of per-link timelocks along `path`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound = "I: NodeIdentity")]
pub struct Route<I: NodeIdentity> {
    /// Nodes from source to destination
    pub path: Vec<I>,
    /// Amount the first hop forwards
    pub amount: f64,
    /// Total timelock along the path
    pub delay: i64,
    /// Path-finding cost, when the producer tracks one
    pub dist: f64,
}

impl<I: NodeIdentity> Route<I> {
    /// Create a new route
    pub fn new(path: Vec<I>, amount: f64, delay: i64) -> Self {
        Self {
            path,
            amount,
            delay,
            dist: 0.0,
        }
    }

    /// Attach a path-finding cost
    pub fn with_dist(mut self, dist: f64) -> Self {
        self.dist = dist;
        self
    }

    /// The "no route found" sentinel: empty path, delay and amount of -1
    pub fn unroutable() -> Self {
        Self {
            path: Vec::new(),
            amount: -1.0,
            delay: -1,
            dist: 0.0,
        }
    }

    /// Check whether this route connects a source to a destination
    pub fn is_found(&self) -> bool {
        self.path.len() >= 2
    }

    /// Number of links in the route
    pub fn hop_count(&self) -> usize {
        self.path.len().saturating_sub(1)
    }

    /// First node of the path
    pub fn source(&self) -> Option<&I> {
        self.path.first()
    }

    /// Last node of the path
    pub fn destination(&self) -> Option<&I> {
        self.path.last()
    }

    /// Check that no node appears twice
    pub fn is_loop_free(&self) -> bool {
        let mut seen = std::collections::HashSet::with_capacity(self.path.len());
        self.path.iter().all(|node| seen.insert(node))
    }
}
