//! Routing error types
//!
//! Re-exports core graph errors and adds routing-specific errors.
//!
//! Per-query degradations (no route found, an observation no optimal path
//! explains, a truncated exploration) are ordinary return values, not
//! errors. These types cover malformed input only.

use thiserror::Error;

// Re-export core graph errors
pub use hopveil_core::GraphError;

/// Invalid configuration values
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    /// Exploration must cover at least the adversary's next hop
    #[error("Exploration depth must be at least 1")]
    ZeroDepth,

    /// The path-length cap leaves no room for an intermediary
    #[error("Maximum path length must be at least 3, got {0}")]
    PathLengthTooShort(usize),

    /// Injection would always exceed the path-length cap
    #[error("Minimum extra hops ({min}) cannot fit under a path-length cap of {max}")]
    HopsExceedCap { min: usize, max: usize },
}

/// Extended routing errors for the routing crate
#[derive(Debug, Error, PartialEq)]
pub enum RoutingError {
    /// Topology error
    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The adversary's observation cannot come from this topology
    #[error("Invalid observation: {0}")]
    InvalidObservation(String),
}

/// Result type for routing operations
pub type RoutingResult<T> = Result<T, RoutingError>;
