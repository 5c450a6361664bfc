//! Simulation error types

use thiserror::Error;

use hopveil_core::GraphError;
use hopveil_routing::RoutingError;

/// Errors raised while building topologies or running sweeps
#[derive(Debug, Error)]
pub enum SimulationError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    #[error("Routing error: {0}")]
    Routing(#[from] RoutingError),

    /// A simulation parameter is out of range
    #[error("Invalid simulation config: {0}")]
    Config(String),
}

/// Result type for simulation operations
pub type SimulationResult<T> = Result<T, SimulationError>;
