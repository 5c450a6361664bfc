//! Error types for hopveil

use thiserror::Error;

/// Errors raised when a topology or path does not describe a usable graph
#[derive(Debug, Error, PartialEq)]
pub enum GraphError {
    #[error("Unknown node: {0}")]
    UnknownNode(String),

    #[error("No channel from {from} to {to}")]
    MissingChannel { from: String, to: String },

    #[error("Invalid channel policy: {0}")]
    InvalidPolicy(String),
}

impl GraphError {
    /// Build a [`GraphError::MissingChannel`] from any displayable node pair
    pub fn missing_channel(from: impl std::fmt::Display, to: impl std::fmt::Display) -> Self {
        Self::MissingChannel {
            from: from.to_string(),
            to: to.to_string(),
        }
    }
}

/// Result type for graph operations
pub type GraphResult<T> = Result<T, GraphError>;
