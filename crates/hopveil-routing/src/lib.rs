//! # Hopveil Routing
//!
//! Route obfuscation by random hop injection, and the adversarial attack
//! that measures how much anonymity it buys.
//!
//! ## Core Components
//!
//! - [`RandomHopsRouter`]: Wraps a base router; obfuscates its paths and runs attacks
//! - [`HopInjector`]: Splices random intermediaries into an optimal path
//! - [`ExplorationTree`]: Forward continuations consistent with an adversary's view
//! - [`SourceAttributor`]: Turns exploration leaves into [`AnonymitySets`]
//! - [`Deanonymizer`]: Backward search confirming candidate sources
//! - [`CheapestPathRouter`]: Reference fee- and timelock-weighted base router
//!
//! ## Attack Model
//!
//! A compromised intermediary sees its previous hop, its next hop, the
//! amount it forwards and the timelock left. It enumerates every
//! continuation that uses up that timelock exactly, treats the end of each
//! as a candidate destination, and then decides which nodes could have
//! sent the payment there. The resulting destination-to-sources mapping is
//! the anonymity set.
//!
//! ## Example
//!
//! ```rust,ignore
//! use hopveil_core::{ChannelNetwork, ChannelPolicy};
//! use hopveil_routing::{AttackObservation, AttributionStrategy, BaseRouter, CheapestPathRouter, RandomHopsRouter};
//!
//! let router = RandomHopsRouter::new(CheapestPathRouter::new(), AttributionStrategy::FilteredSources);
//!
//! // Obfuscate a payment
//! let route = router.route_path(&network, &'A', &'D', 100.0);
//!
//! // Attack it from the second intermediary
//! let observation = AttackObservation::from_route(&network, &route.path, 100.0, 2)?;
//! let outcome = router.adversarial_attack(&network, &observation)?;
//! for (destination, sources) in outcome.anonymity_sets.iter() {
//!     println!("{destination}: {sources:?}");
//! }
//! ```

pub mod attribution;
pub mod base;
pub mod config;
pub mod consistency;
pub mod deanonymize;
pub mod error;
pub mod exploration;
pub mod injector;
mod queue;
pub mod router;

// Re-export main types
pub use attribution::{AnonymitySets, SourceAttributor};
pub use base::{BaseRouter, CheapestPathRouter};
pub use config::{AttackConfig, AttributionStrategy, InjectionConfig, SenderCheck};
pub use consistency::{could_be_modification, is_impossible_modification};
pub use deanonymize::Deanonymizer;
pub use error::{ConfigError, RoutingError, RoutingResult};
pub use exploration::{Branch, ExplorationTree, ObservedHop};
pub use injector::HopInjector;
pub use router::{AttackObservation, AttackOutcome, RandomHopsRouter};

// Re-export core types for convenience
pub use hopveil_core::{ChannelGraph, ChannelNetwork, ChannelPolicy, GraphError, Route};
