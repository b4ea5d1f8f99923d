//! Flattening layer, the bridge between spatial and fully-connected stages.

use crate::error::NetError;
use crate::layers::{FeedContext, Layer};
use crate::rng::XorShiftRng;
use crate::tensor::{Dimension, Tensor};

/// Reshapes any input into a single column, preserving the linear element
/// order. Backpropagation reshapes the incoming column back to the recorded
/// input dimensions, so both directions are pure moves of the same buffer.
pub struct FlatteningLayer {
    input_dim: Dimension,
}

impl FlatteningLayer {
    pub fn new() -> Self {
        Self {
            input_dim: Dimension::new(0, 0, 0),
        }
    }
}

impl Default for FlatteningLayer {
    fn default() -> Self {
        Self::new()
    }
}

impl Layer for FlatteningLayer {
    fn prepare(
        &mut self,
        input: Dimension,
        _rng: &mut XorShiftRng,
    ) -> Result<Dimension, NetError> {
        self.input_dim = input;
        Ok(Dimension::column(input.flat_len()))
    }

    fn forward(&mut self, x: Tensor) -> (Tensor, FeedContext) {
        (x.into_column(), FeedContext::None)
    }

    fn backprop(&mut self, _ctx: FeedContext, delta: Tensor) -> Tensor {
        delta.reshape(self.input_dim.rows, self.input_dim.cols, self.input_dim.slices)
    }

    fn reset_gradients(&mut self) {}

    fn apply_gradients(&mut self, _reg_term: f64, _scale: f64) {}

    fn name(&self) -> &'static str {
        "FlatteningLayer"
    }
}
