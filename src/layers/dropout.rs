//! Inverted dropout regularization.

use crate::error::NetError;
use crate::layers::{FeedContext, Layer};
use crate::rng::XorShiftRng;
use crate::tensor::{Dimension, Tensor};

/// Randomly zeroes each element with probability `rate` during training,
/// scaling survivors by `1 / (1 - rate)` so the expected activation is
/// unchanged and inference needs no rescaling. Outside of training the
/// layer is a no-op.
///
/// The forward pass samples a fresh mask per call and stores it in the
/// forward context; the backward pass applies the same mask to the delta.
pub struct DropoutLayer {
    rate: f64,
    training: bool,
    rng: XorShiftRng,
}

impl DropoutLayer {
    /// `rate` is the drop probability and must lie in `[0, 1)`.
    pub fn new(rate: f64, rng: XorShiftRng) -> Self {
        assert!((0.0..1.0).contains(&rate), "dropout rate must be in [0, 1)");
        Self {
            rate,
            training: false,
            rng,
        }
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }
}

impl Layer for DropoutLayer {
    fn prepare(
        &mut self,
        input: Dimension,
        _rng: &mut XorShiftRng,
    ) -> Result<Dimension, NetError> {
        Ok(input)
    }

    fn forward(&mut self, x: Tensor) -> (Tensor, FeedContext) {
        if !self.training || self.rate == 0.0 {
            return (x, FeedContext::None);
        }
        let keep_scale = 1.0 / (1.0 - self.rate);
        let mask: Vec<f64> = (0..x.data().len())
            .map(|_| {
                if self.rng.next_f64() < self.rate {
                    0.0
                } else {
                    keep_scale
                }
            })
            .collect();

        let mut y = x;
        for (v, m) in y.data_mut().iter_mut().zip(&mask) {
            *v *= m;
        }
        (y, FeedContext::Mask(mask))
    }

    fn backprop(&mut self, ctx: FeedContext, mut delta: Tensor) -> Tensor {
        match ctx {
            FeedContext::Mask(mask) => {
                for (d, m) in delta.data_mut().iter_mut().zip(&mask) {
                    *d *= m;
                }
                delta
            }
            FeedContext::None => delta,
            _ => panic!("DropoutLayer given a foreign forward context"),
        }
    }

    fn reset_gradients(&mut self) {}

    fn apply_gradients(&mut self, _reg_term: f64, _scale: f64) {}

    fn set_training(&mut self, training: bool) {
        self.training = training;
    }

    fn name(&self) -> &'static str {
        "DropoutLayer"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_inference_is_identity() {
        let mut layer = DropoutLayer::new(0.5, XorShiftRng::new(7));
        let x = Tensor::column(vec![1.0, 2.0, 3.0]);
        let (y, ctx) = layer.forward(x.clone());
        assert_eq!(y, x);
        assert!(matches!(ctx, FeedContext::None));
    }

    #[test]
    fn test_training_drops_and_rescales() {
        let mut layer = DropoutLayer::new(0.5, XorShiftRng::new(7));
        layer.set_training(true);

        let x = Tensor::column(vec![1.0; 64]);
        let (y, ctx) = layer.forward(x);
        let FeedContext::Mask(mask) = ctx else {
            panic!("expected a dropout mask");
        };

        let mut dropped = 0;
        for (v, m) in y.data().iter().zip(&mask) {
            assert_relative_eq!(*v, *m);
            if *m == 0.0 {
                dropped += 1;
            } else {
                assert_relative_eq!(*m, 2.0);
            }
        }
        // with 64 elements at rate 0.5 both outcomes must occur
        assert!(dropped > 0 && dropped < 64);
    }

    #[test]
    fn test_backprop_applies_same_mask() {
        let mut layer = DropoutLayer::new(0.5, XorShiftRng::new(7));
        layer.set_training(true);

        let x = Tensor::column(vec![1.0; 16]);
        let (y, ctx) = layer.forward(x);
        let delta = Tensor::column(vec![1.0; 16]);
        let back = layer.backprop(ctx, delta);

        // the delta is gated exactly where the activation was gated
        for (b, v) in back.data().iter().zip(y.data()) {
            assert_relative_eq!(*b, *v);
        }
    }
}
