//! The network: an ordered stack of layers behind one train/feed surface.

use tracing::debug;

use crate::error::NetError;
use crate::layers::{Layer, SigmoidLayer};
use crate::rng::XorShiftRng;
use crate::tensor::{Dimension, Tensor};
use crate::train::Sample;

/// A feed-forward network over an ordered stack of layers.
///
/// Construction appends a terminal sigmoid and negotiates shapes through the
/// whole stack, so a `Network` value always has a consistent geometry. The
/// terminal sigmoid pairs with the cross-entropy delta used in training: the
/// output-layer gradient is simply `prediction - target`, and the terminal
/// activation's backward pass is skipped.
pub struct Network {
    input_dim: Dimension,
    output_dim: Dimension,
    layers: Vec<Box<dyn Layer>>,
}

impl std::fmt::Debug for Network {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Network")
            .field("input_dim", &self.input_dim)
            .field("output_dim", &self.output_dim)
            .field(
                "layers",
                &self.layers.iter().map(|l| l.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl Network {
    /// Build a network from the given hidden/output stack. A terminal
    /// [`SigmoidLayer`] is appended automatically, then every layer is
    /// prepared in order, each consuming the output shape of the previous.
    ///
    /// # Errors
    ///
    /// [`NetError::IncompatibleShape`] if any layer rejects the shape it is
    /// offered.
    pub fn new(
        input_dim: Dimension,
        mut layers: Vec<Box<dyn Layer>>,
        rng: &mut XorShiftRng,
    ) -> Result<Self, NetError> {
        layers.push(Box::new(SigmoidLayer::new()));

        let mut dim = input_dim;
        for layer in layers.iter_mut() {
            dim = layer.prepare(dim, rng)?;
            debug!(layer = layer.name(), output = %dim, "prepared layer");
        }

        Ok(Self {
            input_dim,
            output_dim: dim,
            layers,
        })
    }

    pub fn input_dimension(&self) -> Dimension {
        self.input_dim
    }

    pub fn output_dimension(&self) -> Dimension {
        self.output_dim
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    pub fn layers(&self) -> &[Box<dyn Layer>] {
        &self.layers
    }

    /// Total trainable parameters across all layers.
    pub fn parameter_count(&self) -> usize {
        self.layers.iter().map(|l| l.parameter_count()).sum()
    }

    /// Run one input through the network in inference mode.
    pub fn feed(&mut self, input: &Tensor) -> Tensor {
        self.set_training(false);
        let mut x = input.clone();
        for layer in self.layers.iter_mut() {
            let (y, _) = layer.forward(x);
            x = y;
        }
        x
    }

    fn set_training(&mut self, training: bool) {
        for layer in self.layers.iter_mut() {
            layer.set_training(training);
        }
    }

    /// Accumulate gradients over one mini-batch and apply them once.
    ///
    /// `reg_term` is the precomputed L2 decay factor (0 disables decay
    /// entirely); the per-sample learning rate is `eta / batch.len()`.
    pub fn train_one_batch(&mut self, batch: &[Sample], reg_term: f64, eta: f64) {
        if batch.is_empty() {
            return;
        }
        self.set_training(true);
        for layer in self.layers.iter_mut() {
            layer.reset_gradients();
        }

        for sample in batch {
            let mut contexts = Vec::with_capacity(self.layers.len());
            let mut x = sample.input.clone();
            for layer in self.layers.iter_mut() {
                let (y, ctx) = layer.forward(x);
                contexts.push(ctx);
                x = y;
            }

            // Cross-entropy loss against a sigmoid output collapses the
            // output-layer gradient to prediction minus target, which
            // already includes the terminal sigmoid's derivative. Its
            // backward pass is therefore skipped.
            let mut delta = x.minus(&sample.target);
            contexts.pop();

            let last = self.layers.len() - 1;
            for layer in self.layers[..last].iter_mut().rev() {
                let ctx = contexts.pop().expect("one context per forward pass");
                delta = layer.backprop(ctx, delta);
            }
        }

        let scale = eta / batch.len() as f64;
        for layer in self.layers.iter_mut() {
            layer.apply_gradients(reg_term, scale);
        }
    }

    /// Fraction of samples the network classifies correctly: a sample is
    /// correct when the target value at the index of the network's strongest
    /// output exceeds 0.99. An empty data set evaluates to 0.
    pub fn evaluate(&mut self, data: &[Sample]) -> f64 {
        if data.is_empty() {
            return 0.0;
        }
        let correct = data
            .iter()
            .filter(|sample| {
                let out = self.feed(&sample.input);
                sample.target.data()[out.argmax()] > 0.99
            })
            .count();
        correct as f64 / data.len() as f64
    }
}
