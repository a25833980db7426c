//! Error types for the simulation engine

use thiserror::Error;

/// Simulation result type
pub type Result<T> = std::result::Result<T, SimulationError>;

/// Errors that can occur while configuring or running a simulation.
///
/// Capacity shortfalls (no spot for the queue head, too few spots to
/// reclassify) are not errors; they surface as ordinary return values.
#[derive(Error, Debug)]
pub enum SimulationError {
    /// Invalid configuration, rejected at construction
    #[error("Configuration error: {0}")]
    Config(String),

    /// Policy name that doesn't map to a known variant
    #[error("Unknown allocation policy: {0}")]
    UnknownPolicy(String),

    /// Arrival probabilities must form a distribution
    #[error("Arrival probabilities must sum to 1 (got {sum})")]
    InvalidProbabilities { sum: f64 },

    /// The allocation algorithm broke one of its own invariants
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SimulationError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an invariant violation
    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    pub fn is_invariant_violation(&self) -> bool {
        matches!(self, Self::InvariantViolation(_))
    }
}
