//! error.rs — Error types for the simulation core
//!
//! Construction and argument checks fail eagerly with `InvalidArgument`;
//! nothing is silently clamped. Detection-internal failures live in
//! `DetectionError` and never cross the detector boundary.

use thiserror::Error;

use crate::attack::AttackType;

pub type Result<T> = std::result::Result<T, SimError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("attack type {0:?} is not supported by the phantom injector")]
    UnsupportedAttack(AttackType),
    #[error("UAV {uav_id} cannot broadcast at t={requested} after t={last}")]
    NonMonotonicTimestamp { uav_id: String, last: f64, requested: f64 },
    #[error("identity {0} already present in the swarm")]
    DuplicateIdentity(String),
}

impl SimError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }
}

/// Failures inside the embedding/scoring pipeline.
/// Detectors convert these into an empty `DetectionResult`.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DetectionError {
    #[error("no embeddings could be produced")]
    EmptyEmbedding,
    #[error("non-finite anomaly score for node {0}")]
    NonFiniteScore(String),
    #[error("embedding dimension {got} does not match trained dimension {expected}")]
    DimensionMismatch { expected: usize, got: usize },
}

/// Reject NaN/inf and values below `min` (inclusive bound).
pub(crate) fn ensure_at_least(name: &str, value: f64, min: f64) -> Result<f64> {
    if !value.is_finite() || value < min {
        return Err(SimError::invalid(format!("{name} must be finite and >= {min}, got {value}")));
    }
    Ok(value)
}

/// Reject NaN/inf and values that are not strictly positive.
pub(crate) fn ensure_positive(name: &str, value: f64) -> Result<f64> {
    if !value.is_finite() || value <= 0.0 {
        return Err(SimError::invalid(format!("{name} must be finite and > 0, got {value}")));
    }
    Ok(value)
}
