//! Depth-reducing max pooling.

use crate::error::NetError;
use crate::layers::{FeedContext, Layer};
use crate::rng::XorShiftRng;
use crate::tensor::{Dimension, Tensor};

/// Pools across the depth axis: each output pixel is the maximum of the
/// input values at the same (row, col) position over all slices. The output
/// always has exactly one slice.
///
/// Ties go to the lowest slice index, and the winning slice per pixel is
/// recorded in the forward context so backpropagation can route each delta
/// to the slice that produced the maximum.
pub struct MaxPoolingLayer {
    input_dim: Dimension,
}

impl MaxPoolingLayer {
    pub fn new() -> Self {
        Self {
            input_dim: Dimension::new(0, 0, 0),
        }
    }
}

impl Default for MaxPoolingLayer {
    fn default() -> Self {
        Self::new()
    }
}

impl Layer for MaxPoolingLayer {
    fn prepare(
        &mut self,
        input: Dimension,
        _rng: &mut XorShiftRng,
    ) -> Result<Dimension, NetError> {
        self.input_dim = input;
        Ok(Dimension::new(input.rows, input.cols, 1))
    }

    fn forward(&mut self, x: Tensor) -> (Tensor, FeedContext) {
        let mut y = Tensor::zeros(x.rows(), x.cols(), 1);
        let mut winners = Vec::with_capacity(x.rows() * x.cols());

        for r in 0..x.rows() {
            for c in 0..x.cols() {
                let mut best = f64::NEG_INFINITY;
                let mut winner = 0;
                for s in 0..x.slices() {
                    let v = x.at(r, c, s);
                    if v > best {
                        best = v;
                        winner = s;
                    }
                }
                y.set(r, c, 0, best);
                winners.push(winner);
            }
        }

        (y, FeedContext::Winners(winners))
    }

    fn backprop(&mut self, ctx: FeedContext, delta: Tensor) -> Tensor {
        let FeedContext::Winners(winners) = ctx else {
            panic!("MaxPoolingLayer given a foreign forward context");
        };
        let mut back = Tensor::from_dim(self.input_dim);
        for r in 0..self.input_dim.rows {
            for c in 0..self.input_dim.cols {
                let winner = winners[r * self.input_dim.cols + c];
                back.set(r, c, winner, delta.at(r, c, 0));
            }
        }
        back
    }

    fn reset_gradients(&mut self) {}

    fn apply_gradients(&mut self, _reg_term: f64, _scale: f64) {}

    fn name(&self) -> &'static str {
        "MaxPoolingLayer"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[rustfmt::skip]
    fn two_slice_input() -> Tensor {
        Tensor::from_vec(3, 3, 2, vec![
            1.0, 2.0, 3.0,
            4.0, 5.0, 6.0,
            7.0, 8.0, 9.0,

            9.0, 8.0, 7.0,
            6.0, 5.0, 4.0,
            3.0, 2.0, 1.0,
        ])
    }

    #[test]
    fn test_forward_takes_elementwise_max_over_slices() {
        let mut rng = XorShiftRng::new(1);
        let mut layer = MaxPoolingLayer::new();
        let out = layer.prepare(Dimension::new(3, 3, 2), &mut rng).unwrap();
        assert_eq!(out, Dimension::new(3, 3, 1));

        let (y, _) = layer.forward(two_slice_input());
        let expected = [9.0, 8.0, 7.0, 6.0, 5.0, 6.0, 7.0, 8.0, 9.0];
        for (i, want) in expected.iter().enumerate() {
            assert_relative_eq!(y.at(i / 3, i % 3, 0), *want);
        }
    }

    #[test]
    fn test_ties_go_to_lowest_slice() {
        let mut rng = XorShiftRng::new(1);
        let mut layer = MaxPoolingLayer::new();
        layer.prepare(Dimension::new(1, 1, 3), &mut rng).unwrap();

        let x = Tensor::from_vec(1, 1, 3, vec![5.0, 5.0, 5.0]);
        let (_, ctx) = layer.forward(x);
        let FeedContext::Winners(winners) = ctx else {
            panic!("expected winner indices");
        };
        assert_eq!(winners, vec![0]);
    }

    #[test]
    fn test_negative_values_still_pool() {
        let mut rng = XorShiftRng::new(1);
        let mut layer = MaxPoolingLayer::new();
        layer.prepare(Dimension::new(1, 1, 2), &mut rng).unwrap();

        let x = Tensor::from_vec(1, 1, 2, vec![-3.0, -7.0]);
        let (y, _) = layer.forward(x);
        assert_relative_eq!(y.at(0, 0, 0), -3.0);
    }

    #[test]
    fn test_backprop_routes_delta_to_winning_slice() {
        let mut rng = XorShiftRng::new(1);
        let mut layer = MaxPoolingLayer::new();
        layer.prepare(Dimension::new(3, 3, 2), &mut rng).unwrap();

        let (_, ctx) = layer.forward(two_slice_input());
        let delta = Tensor::from_vec(3, 3, 1, (1..=9).map(f64::from).collect());
        let back = layer.backprop(ctx, delta);

        // top-left max came from slice 1, bottom-right from slice 0
        assert_relative_eq!(back.at(0, 0, 1), 1.0);
        assert_relative_eq!(back.at(0, 0, 0), 0.0);
        assert_relative_eq!(back.at(2, 2, 0), 9.0);
        assert_relative_eq!(back.at(2, 2, 1), 0.0);
        // the center is a tie, won by slice 0
        assert_relative_eq!(back.at(1, 1, 0), 5.0);
        assert_relative_eq!(back.at(1, 1, 1), 0.0);
    }
}
