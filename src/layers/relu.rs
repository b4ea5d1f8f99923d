//! Rectified linear activation.

use crate::error::NetError;
use crate::layers::{FeedContext, Layer};
use crate::rng::XorShiftRng;
use crate::tensor::{Dimension, Tensor};

/// Elementwise `max(0, z)`. The pre-activation is kept so the backward pass
/// can zero the gradient wherever the unit was inactive.
pub struct ReluLayer;

impl ReluLayer {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ReluLayer {
    fn default() -> Self {
        Self::new()
    }
}

impl Layer for ReluLayer {
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
            *v = v.max(0.0);
        }
        (y, FeedContext::PreActivation(x))
    }

    fn backprop(&mut self, ctx: FeedContext, mut delta: Tensor) -> Tensor {
        let FeedContext::PreActivation(x) = ctx else {
            panic!("ReluLayer given a foreign forward context");
        };
        for (d, z) in delta.data_mut().iter_mut().zip(x.data()) {
            if *z <= 0.0 {
                *d = 0.0;
            }
        }
        delta
    }

    fn reset_gradients(&mut self) {}

    fn apply_gradients(&mut self, _reg_term: f64, _scale: f64) {}

    fn name(&self) -> &'static str {
        "ReluLayer"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_forward_clamps_negatives() {
        let mut layer = ReluLayer::new();
        let x = Tensor::column(vec![-2.0, 0.0, 3.0]);
        let (y, _) = layer.forward(x);
        assert_relative_eq!(y.at(0, 0, 0), 0.0);
        assert_relative_eq!(y.at(1, 0, 0), 0.0);
        assert_relative_eq!(y.at(2, 0, 0), 3.0);
    }

    #[test]
    fn test_backprop_gates_on_pre_activation() {
        let mut layer = ReluLayer::new();
        let x = Tensor::column(vec![-2.0, 0.0, 3.0]);
        let (_, ctx) = layer.forward(x);

        let delta = Tensor::column(vec![5.0, 5.0, 5.0]);
        let back = layer.backprop(ctx, delta);
        assert_relative_eq!(back.at(0, 0, 0), 0.0);
        // exactly zero counts as inactive
        assert_relative_eq!(back.at(1, 0, 0), 0.0);
        assert_relative_eq!(back.at(2, 0, 0), 5.0);
    }
}
