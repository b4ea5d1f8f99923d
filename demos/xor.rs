//! Train a small network on XOR and print its predictions.
//!
//! Run with `cargo run --example xor`.

use tensornet::layers::{FullyConnectedLayer, Layer, SigmoidLayer};
use tensornet::network::Network;
use tensornet::rng::XorShiftRng;
use tensornet::tensor::{Dimension, Tensor};
use tensornet::train::{sgd, Sample, TrainOptions};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    // optional seed argument; without one, seed from the clock
    let mut rng = match std::env::args().nth(1).and_then(|s| s.parse().ok()) {
        Some(seed) => XorShiftRng::new(seed),
        None => {
            let mut rng = XorShiftRng::new(0);
            rng.reseed_from_time();
            rng
        }
    };
    let mut net = Network::new(
        Dimension::column(2),
        vec![
            Box::new(FullyConnectedLayer::new(2, 4)) as Box<dyn Layer>,
            Box::new(SigmoidLayer::new()),
            Box::new(FullyConnectedLayer::new(4, 2)),
        ],
        &mut rng,
    )
    .expect("layer stack is consistent");

    // class 0: inputs agree, class 1: inputs differ
    let data = vec![
        Sample::with_one_hot(Tensor::column(vec![0.0, 0.0]), 0, 2),
        Sample::with_one_hot(Tensor::column(vec![0.0, 1.0]), 1, 2),
        Sample::with_one_hot(Tensor::column(vec![1.0, 0.0]), 1, 2),
        Sample::with_one_hot(Tensor::column(vec![1.0, 1.0]), 0, 2),
    ];

    let opts = TrainOptions::new(5000, 4, 3.0);
    sgd(&mut net, &data, None, &opts).expect("valid hyperparameters");

    for sample in &data {
        let out = net.feed(&sample.input);
        println!(
            "{} xor {} -> {} (p = {:.4})",
            sample.input.at(0, 0, 0),
            sample.input.at(1, 0, 0),
            out.argmax(),
            out.at(out.argmax(), 0, 0)
        );
    }
    println!("accuracy: {:.0}%", net.evaluate(&data) * 100.0);
}
