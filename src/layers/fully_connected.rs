//! Fully-connected (dense) layer.
//!
//! Each neuron's output is a linear function of all the inputs to the layer:
//! `y = W*x + B`, with `W` of shape (neurons x input_len) and `B` a column
//! vector of per-neuron biases.

use crate::error::NetError;
use crate::layers::{FeedContext, Layer};
use crate::rng::XorShiftRng;
use crate::tensor::{Dimension, Tensor};

/// Parameter and gradient state, allocated on the first `prepare` call.
struct Params {
    weights: Tensor,
    biases: Tensor,
    d_w: Tensor,
    d_b: Tensor,
    old_d_w: Tensor,
    old_d_b: Tensor,
}

/// Fully-connected layer with an optional momentum term.
///
/// Accepts only a column input of exactly `input_len` entries; spatial
/// shapes must go through a [`FlatteningLayer`](crate::layers::FlatteningLayer)
/// first.
pub struct FullyConnectedLayer {
    input_len: usize,
    neurons: usize,
    /// How much of the previous batch's gradient is conserved.
    momentum: f64,
    params: Option<Params>,
}

impl FullyConnectedLayer {
    /// Create a layer with `neurons` outputs over `input_len` inputs and no
    /// momentum. Parameters are allocated at `prepare` time.
    pub fn new(input_len: usize, neurons: usize) -> Self {
        Self::with_momentum(input_len, neurons, 0.0)
    }

    /// Create a layer that conserves `momentum` of the previous batch
    /// gradient on each reset.
    pub fn with_momentum(input_len: usize, neurons: usize, momentum: f64) -> Self {
        assert!(input_len > 0 && neurons > 0, "layer sizes must be positive");
        Self {
            input_len,
            neurons,
            momentum,
            params: None,
        }
    }

    /// Reconstruct a prepared layer from stored parameters (persistence).
    ///
    /// # Panics
    ///
    /// If the weight and bias shapes disagree.
    pub fn from_parameters(weights: Tensor, biases: Tensor) -> Self {
        assert_eq!(
            biases.dimension(),
            Dimension::column(weights.rows()),
            "bias shape does not match weight rows"
        );
        assert_eq!(weights.slices(), 1, "weights must be a depth-1 matrix");
        let (rows, cols) = (weights.rows(), weights.cols());
        Self {
            input_len: cols,
            neurons: rows,
            momentum: 0.0,
            params: Some(Params {
                d_w: Tensor::zeros(rows, cols, 1),
                d_b: Tensor::zeros(rows, 1, 1),
                old_d_w: Tensor::zeros(rows, cols, 1),
                old_d_b: Tensor::zeros(rows, 1, 1),
                weights,
                biases,
            }),
        }
    }

    pub fn input_len(&self) -> usize {
        self.input_len
    }

    pub fn neurons(&self) -> usize {
        self.neurons
    }

    /// The weight matrix. Panics before `prepare`.
    pub fn weights(&self) -> &Tensor {
        &self.require_params().weights
    }

    /// The bias vector. Panics before `prepare`.
    pub fn biases(&self) -> &Tensor {
        &self.require_params().biases
    }

    /// The accumulated weight gradient. Panics before `prepare`.
    pub fn weight_gradient(&self) -> &Tensor {
        &self.require_params().d_w
    }

    fn require_params(&self) -> &Params {
        self.params
            .as_ref()
            .expect("layer must be prepared before use")
    }

    fn require_params_mut(&mut self) -> &mut Params {
        self.params
            .as_mut()
            .expect("layer must be prepared before use")
    }
}

impl Layer for FullyConnectedLayer {
    fn prepare(
        &mut self,
        input: Dimension,
        rng: &mut XorShiftRng,
    ) -> Result<Dimension, NetError> {
        if !input.is_column() || input.rows != self.input_len {
            return Err(NetError::incompatible(
                self.name(),
                input,
                format!("expected a single column of {} entries", self.input_len),
            ));
        }

        if self.params.is_none() {
            self.params = Some(Params {
                weights: Tensor::random(self.neurons, self.input_len, 1, rng),
                biases: Tensor::random(self.neurons, 1, 1, rng),
                d_w: Tensor::zeros(self.neurons, self.input_len, 1),
                d_b: Tensor::zeros(self.neurons, 1, 1),
                old_d_w: Tensor::zeros(self.neurons, self.input_len, 1),
                old_d_b: Tensor::zeros(self.neurons, 1, 1),
            });
        }

        Ok(Dimension::column(self.neurons))
    }

    fn forward(&mut self, x: Tensor) -> (Tensor, FeedContext) {
        let p = self.require_params();

        let mut y = Tensor::zeros(self.neurons, 1, 1);
        p.weights.mul(&x, &mut y);
        y.plus_equals(&p.biases);

        (y, FeedContext::Input(x))
    }

    fn backprop(&mut self, ctx: FeedContext, delta: Tensor) -> Tensor {
        let FeedContext::Input(x) = ctx else {
            panic!("FullyConnectedLayer given a foreign forward context");
        };
        let input_len = self.input_len;
        let p = self.require_params_mut();

        // Two jobs: accumulate dW/dB for this sample, and translate the
        // deltas into the previous layer's coordinates.
        p.d_b.plus_equals(&delta);
        p.d_w.add_mul_transpose(&delta, &x);

        let mut prev = Tensor::zeros(input_len, 1, 1);
        p.weights.transpose_mul(&delta, &mut prev);
        prev
    }

    fn reset_gradients(&mut self) {
        let momentum = self.momentum;
        let p = self.require_params_mut();
        // Roll the previous accumulator into the momentum term, then zero
        // the live accumulator for the coming batch.
        p.d_w.times_equals(momentum);
        std::mem::swap(&mut p.d_w, &mut p.old_d_w);
        p.d_w.fill_zero();
        p.d_b.times_equals(momentum);
        std::mem::swap(&mut p.d_b, &mut p.old_d_b);
        p.d_b.fill_zero();
    }

    fn apply_gradients(&mut self, reg_term: f64, scale: f64) {
        let p = self.require_params_mut();
        // reg_term == 0 must skip the scaling entirely, not multiply by 1.0.
        if reg_term != 0.0 {
            p.weights.times_equals(reg_term);
        }
        p.d_w.times_equals(-scale);
        p.weights.plus_equals(&p.d_w);
        p.d_b.times_equals(-scale);
        p.biases.plus_equals(&p.d_b);
        p.weights.plus_equals(&p.old_d_w);
        p.biases.plus_equals(&p.old_d_b);
    }

    fn parameter_count(&self) -> usize {
        match &self.params {
            Some(p) => p.weights.data().len() + p.biases.data().len(),
            None => 0,
        }
    }

    fn as_fully_connected(&self) -> Option<&FullyConnectedLayer> {
        Some(self)
    }

    fn name(&self) -> &'static str {
        "FullyConnectedLayer"
    }
}
