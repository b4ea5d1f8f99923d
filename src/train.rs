//! Mini-batch stochastic gradient descent.

use std::time::Instant;

use tracing::info;

use crate::error::NetError;
use crate::network::Network;
use crate::tensor::Tensor;

/// One training or evaluation example.
#[derive(Debug, Clone)]
pub struct Sample {
    pub input: Tensor,
    /// Desired network output, usually a one-hot column.
    pub target: Tensor,
    /// The class index, carried along for reporting.
    pub label: usize,
}

impl Sample {
    /// Build a sample with a one-hot target column of `classes` entries.
    pub fn with_one_hot(input: Tensor, label: usize, classes: usize) -> Self {
        assert!(label < classes, "label out of range");
        let mut target = vec![0.0; classes];
        target[label] = 1.0;
        Self {
            input,
            target: Tensor::column(target),
            label,
        }
    }
}

/// Hyperparameters for [`sgd`].
#[derive(Debug, Clone)]
pub struct TrainOptions {
    pub epochs: usize,
    pub batch_size: usize,
    /// Learning rate.
    pub eta: f64,
    /// L2 regularization strength; 0 disables weight decay.
    pub lambda: f64,
}

impl TrainOptions {
    pub fn new(epochs: usize, batch_size: usize, eta: f64) -> Self {
        Self {
            epochs,
            batch_size,
            eta,
            lambda: 0.0,
        }
    }

    pub fn with_lambda(mut self, lambda: f64) -> Self {
        self.lambda = lambda;
        self
    }

    fn validate(&self) -> Result<(), NetError> {
        if self.batch_size == 0 {
            return Err(NetError::Config("batch size must be positive".into()));
        }
        if self.eta <= 0.0 {
            return Err(NetError::Config(format!(
                "learning rate must be positive, got {}",
                self.eta
            )));
        }
        if self.lambda < 0.0 {
            return Err(NetError::Config(format!(
                "lambda must be non-negative, got {}",
                self.lambda
            )));
        }
        Ok(())
    }
}

/// Train `net` on `data` with mini-batch SGD.
///
/// Samples are consumed in order, sliced into consecutive batches of
/// `batch_size`; a trailing partial batch is skipped, and a data set smaller
/// than one batch trains nothing. When `test` data is given the network is
/// evaluated after every epoch and the per-epoch accuracies are returned.
///
/// # Errors
///
/// [`NetError::Config`] for a zero batch size, a non-positive learning
/// rate, or a negative lambda.
pub fn sgd(
    net: &mut Network,
    data: &[Sample],
    test: Option<&[Sample]>,
    opts: &TrainOptions,
) -> Result<Vec<f64>, NetError> {
    opts.validate()?;

    let n = data.len();
    // The decay factor is fixed by eta, lambda and the data set size, so it
    // is computed once. Exactly 0 means "no decay" downstream.
    let reg_term = if opts.lambda == 0.0 {
        0.0
    } else {
        1.0 - opts.eta * opts.lambda / n as f64
    };

    info!(
        samples = n,
        epochs = opts.epochs,
        batch_size = opts.batch_size,
        eta = opts.eta,
        lambda = opts.lambda,
        parameters = net.parameter_count(),
        "starting training"
    );

    let mut scores = Vec::new();
    for epoch in 0..opts.epochs {
        let start_time = Instant::now();
        if n >= opts.batch_size {
            let mut start = 0;
            while start <= n - opts.batch_size {
                net.train_one_batch(&data[start..start + opts.batch_size], reg_term, opts.eta);
                start += opts.batch_size;
            }
        }

        match test {
            Some(test) => {
                let accuracy = net.evaluate(test);
                scores.push(accuracy);
                info!(
                    epoch,
                    accuracy,
                    total = test.len(),
                    elapsed_ms = start_time.elapsed().as_millis() as u64,
                    "epoch finished"
                );
            }
            None => {
                info!(
                    epoch,
                    elapsed_ms = start_time.elapsed().as_millis() as u64,
                    "epoch finished"
                );
            }
        }
    }

    Ok(scores)
}
