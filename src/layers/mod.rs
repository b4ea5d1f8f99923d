//! Layer trait and implementations.
//!
//! Each layer is a self-contained forward/backward numeric kernel behind the
//! common [`Layer`] contract: shape negotiation at `prepare` time, a forward
//! pass that yields an explicit context for the paired backward pass, and
//! gradient accumulate/apply/reset for the parameterized variants.

pub mod conv;
pub mod dropout;
pub mod flatten;
pub mod fully_connected;
pub mod layer;
pub mod max_pool;
pub mod relu;
pub mod sigmoid;

pub use conv::ConvolutionalLayer;
pub use dropout::DropoutLayer;
pub use flatten::FlatteningLayer;
pub use fully_connected::FullyConnectedLayer;
pub use layer::{FeedContext, Layer};
pub use max_pool::MaxPoolingLayer;
pub use relu::ReluLayer;
pub use sigmoid::SigmoidLayer;
