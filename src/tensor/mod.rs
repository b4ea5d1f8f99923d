//! Rank-3 tensor primitive and shape types.
//!
//! A `Tensor` is a dense (rows x cols x slices) buffer of f64 values,
//! row-major within each slice. `TensorView` is a non-owning window into a
//! parent tensor's buffer, used to address receptive fields without copying.

pub mod dimension;
#[allow(clippy::module_inception)]
pub mod tensor;
pub mod view;

pub use dimension::Dimension;
pub use tensor::Tensor;
pub use view::TensorView;
