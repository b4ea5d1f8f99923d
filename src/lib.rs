//! tensornet: a from-scratch convolutional neural network training engine.
//!
//! Dense feed-forward and convolutional networks are composed from
//! independently pluggable layers and trained with mini-batch stochastic
//! gradient descent. Everything is built on a rank-3 tensor primitive with
//! explicit strided indexing; there is no autodiff and no GPU path.
//!
//! # Modules
//!
//! - `tensor`: rank-3 tensor, sub-region views, and shape negotiation types
//! - `layers`: Layer trait and implementations (FullyConnected, Convolutional, etc.)
//! - `network`: layer sequencing, batch training, and evaluation
//! - `train`: the SGD epoch/batch driver
//! - `serialize`: binary persistence of trained parameters
//! - `config`: JSON architecture and training configuration
//! - `rng`: seedable RNG for reproducible parameter initialization

pub mod config;
pub mod error;
pub mod layers;
pub mod network;
pub mod rng;
pub mod serialize;
pub mod tensor;
pub mod train;

pub use error::NetError;
pub use network::Network;
pub use tensor::{Dimension, Tensor};
