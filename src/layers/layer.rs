//! The core contract every layer variant implements.

use crate::error::NetError;
use crate::rng::XorShiftRng;
use crate::tensor::{Dimension, Tensor};

/// State a layer's forward pass hands to the paired backward pass.
///
/// Instead of hidden mutable cache fields, `forward` returns whatever it
/// needs later as an explicit value and `backprop` consumes it. The pairing
/// becomes a compile-time contract: a context cannot be reused, and a
/// backward pass cannot run without the forward pass that produced it.
pub enum FeedContext {
    /// The (possibly flattened) input the layer consumed.
    Input(Tensor),
    /// The pre-activation input to a pointwise activation.
    PreActivation(Tensor),
    /// Winning slice index per (row, col) position of a max-pool pass.
    Winners(Vec<usize>),
    /// Multiplicative dropout mask, one factor per entry.
    Mask(Vec<f64>),
    /// The layer needs nothing from the forward pass.
    None,
}

/// A single layer of a network.
///
/// The network drives each layer through `prepare` once at construction,
/// then `forward`/`backprop` pairs per sample, with `reset_gradients` at
/// batch start and `apply_gradients` at batch end. Backward passes must run
/// in exact reverse order of the forward passes that produced their
/// contexts.
pub trait Layer {
    /// Validate the input shape, allocate parameters (on the first call
    /// only) and any reusable buffers, and return the shape this layer will
    /// emit.
    ///
    /// # Errors
    ///
    /// [`NetError::IncompatibleShape`] when the input dimension cannot be
    /// satisfied, e.g. a computed output extent below 1, or a flattened
    /// length that doesn't match the weight matrix.
    fn prepare(&mut self, input: Dimension, rng: &mut XorShiftRng)
        -> Result<Dimension, NetError>;

    /// Run the input forward, returning the output and the context the
    /// paired `backprop` call will need.
    fn forward(&mut self, x: Tensor) -> (Tensor, FeedContext);

    /// Consume the upstream gradient (errors w.r.t. this layer's output),
    /// add this sample's contribution to the layer's gradient accumulator,
    /// and return the gradient w.r.t. this layer's input.
    ///
    /// # Panics
    ///
    /// If `ctx` was produced by a different layer kind.
    fn backprop(&mut self, ctx: FeedContext, delta: Tensor) -> Tensor;

    /// Zero the gradient accumulator. Layers with momentum first roll the
    /// previous accumulator into their momentum term.
    fn reset_gradients(&mut self);

    /// Apply the accumulated gradients to the parameters: scale parameters
    /// by `reg_term` (L2 weight decay; skipped entirely when `reg_term` is
    /// 0), add `accumulator * (-scale)`, then add any pending momentum term.
    /// A no-op for parameterless layers.
    fn apply_gradients(&mut self, reg_term: f64, scale: f64);

    /// Total count of trainable weights and biases (0 for parameterless
    /// layers, and before `prepare` has allocated anything).
    fn parameter_count(&self) -> usize {
        0
    }

    /// Switch between training and inference behavior. Only dropout cares.
    fn set_training(&mut self, _training: bool) {}

    /// Downcast hook used by the serializer, which only understands
    /// fully-connected parameters.
    fn as_fully_connected(&self) -> Option<&crate::layers::FullyConnectedLayer> {
        None
    }

    /// Layer name for shape-negotiation errors and logging.
    fn name(&self) -> &'static str;
}
