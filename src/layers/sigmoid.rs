//! Logistic sigmoid activation.

use crate::error::NetError;
use crate::layers::{FeedContext, Layer};
use crate::rng::XorShiftRng;
use crate::tensor::{Dimension, Tensor};

/// The logistic function `1 / (1 + e^-z)`.
#[inline]
pub fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

/// Derivative of [`sigmoid`] expressed in terms of the pre-activation.
#[inline]
pub fn sigmoid_prime(z: f64) -> f64 {
    let s = sigmoid(z);
    s * (1.0 - s)
}

/// Elementwise sigmoid activation. Shape-preserving and parameterless; the
/// pre-activation input is kept in the forward context for the backward
/// derivative product.
pub struct SigmoidLayer;

impl SigmoidLayer {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SigmoidLayer {
    fn default() -> Self {
        Self::new()
    }
}

impl Layer for SigmoidLayer {
    fn prepare(
        &mut self,
        input: Dimension,
        _rng: &mut XorShiftRng,
    ) -> Result<Dimension, NetError> {
        Ok(input)
    }

    fn forward(&mut self, x: Tensor) -> (Tensor, FeedContext) {
        let mut y = x.clone();
        for v in y.data_mut() {
            *v = sigmoid(*v);
        }
        (y, FeedContext::PreActivation(x))
    }

    fn backprop(&mut self, ctx: FeedContext, mut delta: Tensor) -> Tensor {
        let FeedContext::PreActivation(x) = ctx else {
            panic!("SigmoidLayer given a foreign forward context");
        };
        for (d, z) in delta.data_mut().iter_mut().zip(x.data()) {
            *d *= sigmoid_prime(*z);
        }
        delta
    }

    fn reset_gradients(&mut self) {}

    fn apply_gradients(&mut self, _reg_term: f64, _scale: f64) {}

    fn name(&self) -> &'static str {
        "SigmoidLayer"
    }
}
