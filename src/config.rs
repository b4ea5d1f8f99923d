//! JSON-described network architectures and training runs.
//!
//! A config file pairs an input shape with an ordered layer list, so the
//! same binary can train differently shaped networks without recompiling:
//!
//! ```json
//! {
//!   "input": { "rows": 28, "cols": 28 },
//!   "layers": [
//!     { "type": "convolutional", "kernels": 8, "kernel_rows": 5, "kernel_cols": 5 },
//!     { "type": "max_pooling" },
//!     { "type": "flattening" },
//!     { "type": "fully_connected", "inputs": 576, "neurons": 10 }
//!   ]
//! }
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::NetError;
use crate::layers::{
    ConvolutionalLayer, DropoutLayer, FlatteningLayer, FullyConnectedLayer, Layer,
    MaxPoolingLayer, ReluLayer, SigmoidLayer,
};
use crate::network::Network;
use crate::rng::XorShiftRng;
use crate::tensor::Dimension;
use crate::train::TrainOptions;

fn one() -> usize {
    1
}

/// Input shape; `cols` and `slices` default to 1 so column inputs can be
/// written as just `{ "rows": n }`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ShapeConfig {
    pub rows: usize,
    #[serde(default = "one")]
    pub cols: usize,
    #[serde(default = "one")]
    pub slices: usize,
}

impl From<ShapeConfig> for Dimension {
    fn from(s: ShapeConfig) -> Self {
        Dimension::new(s.rows, s.cols, s.slices)
    }
}

/// One layer of the architecture, tagged by `type`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LayerConfig {
    FullyConnected {
        inputs: usize,
        neurons: usize,
        #[serde(default)]
        momentum: f64,
    },
    Convolutional {
        kernels: usize,
        kernel_rows: usize,
        kernel_cols: usize,
        #[serde(default = "one")]
        stride_rows: usize,
        #[serde(default = "one")]
        stride_cols: usize,
    },
    MaxPooling,
    Flattening,
    Sigmoid,
    Relu,
    Dropout {
        rate: f64,
    },
}

/// A network architecture: input shape plus ordered layers. The terminal
/// sigmoid is implicit and never listed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchitectureConfig {
    pub input: ShapeConfig,
    pub layers: Vec<LayerConfig>,
}

/// Hyperparameters as stored in a config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingConfig {
    pub epochs: usize,
    pub batch_size: usize,
    pub eta: f64,
    #[serde(default)]
    pub lambda: f64,
}

impl From<TrainingConfig> for TrainOptions {
    fn from(c: TrainingConfig) -> Self {
        TrainOptions::new(c.epochs, c.batch_size, c.eta).with_lambda(c.lambda)
    }
}

impl ArchitectureConfig {
    /// Parse an architecture from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, NetError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read an architecture from a JSON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, NetError> {
        Self::from_json(&fs::read_to_string(path)?)
    }

    /// Instantiate the described network, preparing every layer.
    ///
    /// # Errors
    ///
    /// [`NetError::Config`] for invalid layer parameters (e.g. a dropout
    /// rate outside `[0, 1)` or a zero-sized layer),
    /// [`NetError::IncompatibleShape`] if the listed layers do not fit
    /// together.
    pub fn build(&self, rng: &mut XorShiftRng) -> Result<Network, NetError> {
        if self.input.rows == 0 || self.input.cols == 0 || self.input.slices == 0 {
            return Err(NetError::Config(format!(
                "input shape has a zero extent: {:?}",
                self.input
            )));
        }

        let mut layers: Vec<Box<dyn Layer>> = Vec::with_capacity(self.layers.len());
        for layer in &self.layers {
            layers.push(build_layer(layer, rng)?);
        }
        Network::new(self.input.into(), layers, rng)
    }
}

fn build_layer(config: &LayerConfig, rng: &mut XorShiftRng) -> Result<Box<dyn Layer>, NetError> {
    match *config {
        LayerConfig::FullyConnected {
            inputs,
            neurons,
            momentum,
        } => {
            if inputs == 0 || neurons == 0 {
                return Err(NetError::Config(
                    "fully_connected sizes must be positive".into(),
                ));
            }
            if !(0.0..1.0).contains(&momentum) {
                return Err(NetError::Config(format!(
                    "momentum must be in [0, 1), got {momentum}"
                )));
            }
            Ok(Box::new(FullyConnectedLayer::with_momentum(
                inputs, neurons, momentum,
            )))
        }
        LayerConfig::Convolutional {
            kernels,
            kernel_rows,
            kernel_cols,
            stride_rows,
            stride_cols,
        } => {
            if kernels == 0 || kernel_rows == 0 || kernel_cols == 0 {
                return Err(NetError::Config(
                    "convolutional kernel configuration must be positive".into(),
                ));
            }
            if stride_rows == 0 || stride_cols == 0 {
                return Err(NetError::Config("stride must be positive".into()));
            }
            Ok(Box::new(ConvolutionalLayer::new(
                kernels,
                kernel_rows,
                kernel_cols,
                stride_rows,
                stride_cols,
            )))
        }
        LayerConfig::MaxPooling => Ok(Box::new(MaxPoolingLayer::new())),
        LayerConfig::Flattening => Ok(Box::new(FlatteningLayer::new())),
        LayerConfig::Sigmoid => Ok(Box::new(SigmoidLayer::new())),
        LayerConfig::Relu => Ok(Box::new(ReluLayer::new())),
        LayerConfig::Dropout { rate } => {
            if !(0.0..1.0).contains(&rate) {
                return Err(NetError::Config(format!(
                    "dropout rate must be in [0, 1), got {rate}"
                )));
            }
            // Each dropout layer gets an independent stream split off the
            // construction generator.
            Ok(Box::new(DropoutLayer::new(
                rate,
                XorShiftRng::new(rng.next_u64()),
            )))
        }
    }
}

impl TrainingConfig {
    pub fn from_json(json: &str) -> Result<Self, NetError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, NetError> {
        Self::from_json(&fs::read_to_string(path)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_dense_architecture() {
        let config = ArchitectureConfig::from_json(
            r#"{
                "input": { "rows": 4 },
                "layers": [
                    { "type": "fully_connected", "inputs": 4, "neurons": 8 },
                    { "type": "sigmoid" },
                    { "type": "fully_connected", "inputs": 8, "neurons": 2 }
                ]
            }"#,
        )
        .unwrap();

        let mut rng = XorShiftRng::new(9);
        let net = config.build(&mut rng).unwrap();
        // listed layers plus the implicit terminal sigmoid
        assert_eq!(net.layer_count(), 4);
        assert_eq!(net.output_dimension(), Dimension::column(2));
    }

    #[test]
    fn test_build_convolutional_architecture() {
        let config = ArchitectureConfig::from_json(
            r#"{
                "input": { "rows": 6, "cols": 6 },
                "layers": [
                    { "type": "convolutional", "kernels": 3, "kernel_rows": 3, "kernel_cols": 3 },
                    { "type": "max_pooling" },
                    { "type": "flattening" },
                    { "type": "fully_connected", "inputs": 16, "neurons": 2 }
                ]
            }"#,
        )
        .unwrap();

        let mut rng = XorShiftRng::new(9);
        let net = config.build(&mut rng).unwrap();
        assert_eq!(net.output_dimension(), Dimension::column(2));
    }

    #[test]
    fn test_malformed_json_is_a_json_error() {
        let err = ArchitectureConfig::from_json("{ not json").unwrap_err();
        assert!(matches!(err, NetError::Json(_)));

        let err = ArchitectureConfig::from_json(
            r#"{ "input": { "rows": 4 }, "layers": [ { "type": "unknown" } ] }"#,
        )
        .unwrap_err();
        assert!(matches!(err, NetError::Json(_)));
    }

    #[test]
    fn test_invalid_parameters_are_config_errors() {
        let config = ArchitectureConfig::from_json(
            r#"{
                "input": { "rows": 4 },
                "layers": [ { "type": "dropout", "rate": 1.5 } ]
            }"#,
        )
        .unwrap();
        let mut rng = XorShiftRng::new(9);
        assert!(matches!(
            config.build(&mut rng).unwrap_err(),
            NetError::Config(_)
        ));
    }

    #[test]
    fn test_mismatched_layers_are_shape_errors() {
        let config = ArchitectureConfig::from_json(
            r#"{
                "input": { "rows": 4 },
                "layers": [ { "type": "fully_connected", "inputs": 5, "neurons": 2 } ]
            }"#,
        )
        .unwrap();
        let mut rng = XorShiftRng::new(9);
        assert!(matches!(
            config.build(&mut rng).unwrap_err(),
            NetError::IncompatibleShape { .. }
        ));
    }

    #[test]
    fn test_training_config_defaults() {
        let config =
            TrainingConfig::from_json(r#"{ "epochs": 30, "batch_size": 10, "eta": 3.0 }"#)
                .unwrap();
        assert_eq!(config.lambda, 0.0);
        let opts: TrainOptions = config.into();
        assert_eq!(opts.epochs, 30);
        assert_eq!(opts.batch_size, 10);
    }
}
