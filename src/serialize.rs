//! Saving and loading trained networks.
//!
//! The on-disk format is a flat big-endian stream and only covers networks
//! whose trainable layers are all fully connected (the usual shape after
//! training a plain multilayer perceptron):
//!
//! ```text
//! u32  layer count, including the input layer (weight layers + 1)
//! u32  flattened input size of the first layer
//! per weight layer:
//!   u32  output size
//!   f64* weights, row-major (output x input)
//!   f64* biases (output)
//! ```
//!
//! Loading rebuilds the conventional stack: the stored layers interleaved
//! with sigmoid activations, plus the terminal sigmoid the network always
//! carries.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use tracing::debug;

use crate::error::NetError;
use crate::layers::{FullyConnectedLayer, Layer, SigmoidLayer};
use crate::network::Network;
use crate::rng::XorShiftRng;
use crate::tensor::{Dimension, Tensor};

/// Write `net` to `writer` in the format above.
///
/// # Errors
///
/// [`NetError::Persistence`] if the network contains a trainable layer that
/// is not fully connected, or has no fully-connected layers at all;
/// [`NetError::Io`] on write failure.
pub fn write_network<W: Write>(net: &Network, writer: &mut W) -> Result<(), NetError> {
    let mut dense = Vec::new();
    for layer in net.layers() {
        match layer.as_fully_connected() {
            Some(fc) => dense.push(fc),
            None if layer.parameter_count() > 0 => {
                return Err(NetError::Persistence(format!(
                    "cannot store a network containing a trainable {}",
                    layer.name()
                )));
            }
            None => {}
        }
    }
    let first = dense
        .first()
        .ok_or_else(|| NetError::Persistence("network has no trainable layers".into()))?;

    // The header counts the input layer too, so a stack of N weight
    // layers is stored as N + 1.
    write_u32(writer, dense.len() as u32 + 1)?;
    write_u32(writer, first.input_len() as u32)?;
    for fc in &dense {
        write_u32(writer, fc.neurons() as u32)?;
        for v in fc.weights().data() {
            writer.write_all(&v.to_be_bytes())?;
        }
        for v in fc.biases().data() {
            writer.write_all(&v.to_be_bytes())?;
        }
    }
    Ok(())
}

/// Read a network written by [`write_network`], rebuilding the stored
/// layers interleaved with sigmoid activations.
///
/// # Errors
///
/// [`NetError::Persistence`] for a malformed header; [`NetError::Io`] on
/// read failure, including truncated data.
pub fn read_network<R: Read>(reader: &mut R, rng: &mut XorShiftRng) -> Result<Network, NetError> {
    let count = read_u32(reader)? as usize;
    if count < 2 {
        return Err(NetError::Persistence(
            "stored network has no weight layers".into(),
        ));
    }
    let count = count - 1;
    let mut input_len = read_u32(reader)? as usize;
    if input_len == 0 {
        return Err(NetError::Persistence("stored input size is zero".into()));
    }
    let input_dim = Dimension::column(input_len);

    let mut layers: Vec<Box<dyn Layer>> = Vec::with_capacity(2 * count - 1);
    for i in 0..count {
        let neurons = read_u32(reader)? as usize;
        if neurons == 0 {
            return Err(NetError::Persistence(format!(
                "stored layer {i} has zero outputs"
            )));
        }

        let mut weights = vec![0.0; neurons * input_len];
        for v in &mut weights {
            *v = read_f64(reader)?;
        }
        let mut biases = vec![0.0; neurons];
        for v in &mut biases {
            *v = read_f64(reader)?;
        }

        if i > 0 {
            layers.push(Box::new(SigmoidLayer::new()));
        }
        layers.push(Box::new(FullyConnectedLayer::from_parameters(
            Tensor::from_vec(neurons, input_len, 1, weights),
            Tensor::column(biases),
        )));
        input_len = neurons;
    }

    Network::new(input_dim, layers, rng)
}

/// Save `net` to a file. See [`write_network`].
pub fn save<P: AsRef<Path>>(net: &Network, path: P) -> Result<(), NetError> {
    let mut writer = BufWriter::new(File::create(path.as_ref())?);
    write_network(net, &mut writer)?;
    writer.flush()?;
    debug!(path = %path.as_ref().display(), "saved network");
    Ok(())
}

/// Load a network from a file. See [`read_network`].
pub fn load<P: AsRef<Path>>(path: P, rng: &mut XorShiftRng) -> Result<Network, NetError> {
    let mut reader = BufReader::new(File::open(path.as_ref())?);
    let net = read_network(&mut reader, rng)?;
    debug!(path = %path.as_ref().display(), "loaded network");
    Ok(net)
}

fn write_u32<W: Write>(writer: &mut W, value: u32) -> Result<(), NetError> {
    writer.write_all(&value.to_be_bytes())?;
    Ok(())
}

fn read_u32<R: Read>(reader: &mut R) -> Result<u32, NetError> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf)?;
    Ok(u32::from_be_bytes(buf))
}

fn read_f64<R: Read>(reader: &mut R) -> Result<f64, NetError> {
    let mut buf = [0u8; 8];
    reader.read_exact(&mut buf)?;
    Ok(f64::from_be_bytes(buf))
}
