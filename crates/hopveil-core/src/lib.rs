//! # Hopveil Core
//!
//! Core traits, types, and errors for analysing payment privacy in a
//! payment-channel network.
//!
//! The routing and attack logic in `hopveil-routing` is written against the
//! abstractions in this crate so it can run over any read-only topology
//! snapshot: an in-memory [`ChannelNetwork`] for tests and simulations, or a
//! graph loaded from a real network dump.
//!
//! ## Key Traits
//!
//! - [`NodeIdentity`]: Abstraction over node identifiers (`char` for letter scenarios, integers for generated graphs)
//! - [`ChannelGraph`]: Read-only view of directed, capacity-bearing links
//!
//! ## Key Types
//!
//! - [`ChannelPolicy`]: Balance, fees and delay of one link direction
//! - [`Route`]: A payment path with the amount its first hop forwards and its total delay
//! - [`ChannelNetwork`]: Deterministic in-memory topology snapshot

pub mod channel;
pub mod error;
pub mod identity;
pub mod network;
pub mod traits;

// Re-export main types
pub use channel::*;
pub use error::*;
pub use identity::*;
pub use network::*;
pub use traits::*;
