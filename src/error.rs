//! Error taxonomy for network construction, configuration, and persistence.
//!
//! Everything here indicates a configuration or programming error discovered
//! at construction time, not a runtime transient: no operation in this crate
//! is retried, and errors propagate to whatever orchestrates training.
//! Tensor-arithmetic shape mismatches are assertion failures, not values of
//! this type; they abort the process fast instead of being recovered from.

use crate::tensor::Dimension;
use thiserror::Error;

/// Errors surfaced by network construction, config loading, and persistence.
#[derive(Debug, Error)]
pub enum NetError {
    /// A layer's input contract cannot be satisfied by its predecessor's
    /// output shape. Always surfaced to the caller, never silently coerced:
    /// it means the architecture itself is misconfigured.
    #[error("{layer} is incompatible with input dimension {input}: {reason}")]
    IncompatibleShape {
        /// Name of the offending layer.
        layer: &'static str,
        /// The input dimension that violated the layer's contract.
        input: Dimension,
        reason: String,
    },

    /// An architecture or training configuration failed validation.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// A serialized model stream is malformed or truncated.
    #[error("malformed model stream: {0}")]
    Persistence(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl NetError {
    /// Shorthand for the shape-negotiation failure used by `Layer::prepare`.
    pub fn incompatible(layer: &'static str, input: Dimension, reason: impl Into<String>) -> Self {
        NetError::IncompatibleShape {
            layer,
            input,
            reason: reason.into(),
        }
    }
}
