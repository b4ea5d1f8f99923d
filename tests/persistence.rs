//! Save/load through real files.

use tensornet::layers::{FullyConnectedLayer, Layer, SigmoidLayer};
use tensornet::network::Network;
use tensornet::rng::XorShiftRng;
use tensornet::serialize::{load, save};
use tensornet::tensor::{Dimension, Tensor};
use tensornet::train::{sgd, Sample, TrainOptions};

fn trained_net(rng: &mut XorShiftRng) -> Network {
    let mut net = Network::new(
        Dimension::column(2),
        vec![
            Box::new(FullyConnectedLayer::new(2, 5)) as Box<dyn Layer>,
            Box::new(SigmoidLayer::new()),
            Box::new(FullyConnectedLayer::new(5, 2)),
        ],
        rng,
    )
    .unwrap();

    let data = vec![
        Sample::with_one_hot(Tensor::column(vec![1.0, 0.0]), 0, 2),
        Sample::with_one_hot(Tensor::column(vec![0.0, 1.0]), 1, 2),
    ];
    sgd(&mut net, &data, None, &TrainOptions::new(50, 2, 3.0)).unwrap();
    net
}

#[test]
fn test_file_round_trip_preserves_behavior_exactly() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.bin");

    let mut rng = XorShiftRng::new(77);
    let mut net = trained_net(&mut rng);
    save(&net, &path).unwrap();

    let mut restored = load(&path, &mut rng).unwrap();
    assert_eq!(restored.layer_count(), net.layer_count());
    assert_eq!(restored.input_dimension(), net.input_dimension());
    assert_eq!(restored.output_dimension(), net.output_dimension());

    // exact equality, not approximate: the stored bytes are the exact bit
    // patterns of the trained parameters
    for probe in [
        Tensor::column(vec![1.0, 0.0]),
        Tensor::column(vec![0.0, 1.0]),
        Tensor::column(vec![0.25, -0.75]),
    ] {
        assert_eq!(restored.feed(&probe), net.feed(&probe));
    }
}

#[test]
fn test_loaded_network_keeps_training() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.bin");

    let mut rng = XorShiftRng::new(77);
    let net = trained_net(&mut rng);
    save(&net, &path).unwrap();

    let mut restored = load(&path, &mut rng).unwrap();
    let data = vec![
        Sample::with_one_hot(Tensor::column(vec![1.0, 0.0]), 0, 2),
        Sample::with_one_hot(Tensor::column(vec![0.0, 1.0]), 1, 2),
    ];
    sgd(&mut restored, &data, None, &TrainOptions::new(200, 2, 3.0)).unwrap();
    assert_eq!(restored.evaluate(&data), 1.0);
}

#[test]
fn test_missing_file_is_an_io_error() {
    let mut rng = XorShiftRng::new(77);
    let err = load("/nonexistent/model.bin", &mut rng).unwrap_err();
    assert!(matches!(err, tensornet::NetError::Io(_)));
}
