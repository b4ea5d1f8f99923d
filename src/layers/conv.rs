//! Convolutional layer.
//!
//! A convolutional layer is composed of one or more kernels. Each kernel is
//! a small weight cube spanning the full input depth, applied repeatedly
//! across the input like a single fully-connected neuron sliding over
//! receptive fields. One output feature map is produced per kernel.

use crate::error::NetError;
use crate::layers::{FeedContext, Layer};
use crate::rng::XorShiftRng;
use crate::tensor::{Dimension, Tensor};

/// Convolutional layer: K kernels of shape (kernel_rows x kernel_cols x
/// input_depth), one scalar bias per kernel, and a row/column stride.
///
/// Output shape is `(floor((rows-kr)/sr)+1, floor((cols-kc)/sc)+1, K)`; a
/// configuration that would produce fewer than one output row or column is
/// rejected at `prepare` time.
pub struct ConvolutionalLayer {
    num_kernels: usize,
    kernel_rows: usize,
    kernel_cols: usize,
    stride_rows: usize,
    stride_cols: usize,
    kernels: Vec<Tensor>,
    biases: Tensor,
    d_k: Vec<Tensor>,
    d_b: Tensor,
    input_dim: Dimension,
    out_rows: usize,
    out_cols: usize,
    /// How many receptive fields cover each input pixel, precomputed at
    /// `prepare` time. Zero-coverage pixels are clamped to 1 so the backward
    /// division is always defined (those pixels receive gradient 0 anyway).
    coverage: Tensor,
}

impl ConvolutionalLayer {
    /// Create a layer with `num_kernels` kernels of the given size, stepped
    /// by the given strides. Kernel cubes are allocated at `prepare` time,
    /// once the input depth is known.
    pub fn new(
        num_kernels: usize,
        kernel_rows: usize,
        kernel_cols: usize,
        stride_rows: usize,
        stride_cols: usize,
    ) -> Self {
        assert!(
            num_kernels > 0 && kernel_rows > 0 && kernel_cols > 0,
            "kernel configuration must be positive"
        );
        assert!(stride_rows > 0 && stride_cols > 0, "stride must be positive");
        Self {
            num_kernels,
            kernel_rows,
            kernel_cols,
            stride_rows,
            stride_cols,
            kernels: Vec::new(),
            biases: Tensor::zeros(num_kernels, 1, 1),
            d_k: Vec::new(),
            d_b: Tensor::zeros(num_kernels, 1, 1),
            input_dim: Dimension::new(0, 0, 0),
            out_rows: 0,
            out_cols: 0,
            coverage: Tensor::zeros(1, 1, 1),
        }
    }

    pub fn num_kernels(&self) -> usize {
        self.num_kernels
    }

    /// Number of rows in an output feature map (0 before `prepare`).
    pub fn output_rows(&self) -> usize {
        self.out_rows
    }

    /// Number of columns in an output feature map (0 before `prepare`).
    pub fn output_cols(&self) -> usize {
        self.out_cols
    }

    pub fn kernels(&self) -> &[Tensor] {
        &self.kernels
    }

    pub fn biases(&self) -> &Tensor {
        &self.biases
    }

    /// Receptive-field coverage counts, exposed for tests.
    pub fn coverage(&self) -> &Tensor {
        &self.coverage
    }
}

impl Layer for ConvolutionalLayer {
    fn prepare(
        &mut self,
        input: Dimension,
        rng: &mut XorShiftRng,
    ) -> Result<Dimension, NetError> {
        if input.rows < self.kernel_rows {
            return Err(NetError::incompatible(
                self.name(),
                input,
                format!(
                    "a {}x{} kernel would produce fewer than one output row",
                    self.kernel_rows, self.kernel_cols
                ),
            ));
        }
        if input.cols < self.kernel_cols {
            return Err(NetError::incompatible(
                self.name(),
                input,
                format!(
                    "a {}x{} kernel would produce fewer than one output column",
                    self.kernel_rows, self.kernel_cols
                ),
            ));
        }

        if self.kernels.is_empty() {
            for _ in 0..self.num_kernels {
                self.kernels.push(Tensor::random(
                    self.kernel_rows,
                    self.kernel_cols,
                    input.slices,
                    rng,
                ));
                self.d_k
                    .push(Tensor::zeros(self.kernel_rows, self.kernel_cols, input.slices));
            }
            self.biases = Tensor::random(self.num_kernels, 1, 1, rng);
        } else if self.kernels[0].slices() != input.slices {
            return Err(NetError::incompatible(
                self.name(),
                input,
                format!(
                    "kernels span {} input slices, got {}",
                    self.kernels[0].slices(),
                    input.slices
                ),
            ));
        }

        self.input_dim = input;
        self.out_rows = (input.rows - self.kernel_rows) / self.stride_rows + 1;
        self.out_cols = (input.cols - self.kernel_cols) / self.stride_cols + 1;

        // Count how many receptive fields touch each (row, col) position.
        // The count is the same across slices, so one slice suffices.
        let mut coverage = Tensor::zeros(input.rows, input.cols, 1);
        for or in 0..self.out_rows {
            for oc in 0..self.out_cols {
                for r in 0..self.kernel_rows {
                    for c in 0..self.kernel_cols {
                        let row = or * self.stride_rows + r;
                        let col = oc * self.stride_cols + c;
                        let v = coverage.at(row, col, 0);
                        coverage.set(row, col, 0, v + 1.0);
                    }
                }
            }
        }
        for v in coverage.data_mut() {
            if *v == 0.0 {
                *v = 1.0;
            }
        }
        self.coverage = coverage;

        Ok(Dimension::new(self.out_rows, self.out_cols, self.num_kernels))
    }

    fn forward(&mut self, x: Tensor) -> (Tensor, FeedContext) {
        let depth = self.input_dim.slices;
        let mut y = Tensor::zeros(self.out_rows, self.out_cols, self.num_kernels);

        for (k, kernel) in self.kernels.iter().enumerate() {
            let bias = self.biases.at(k, 0, 0);
            for or in 0..self.out_rows {
                for oc in 0..self.out_cols {
                    let field = x.view(
                        or * self.stride_rows,
                        oc * self.stride_cols,
                        0,
                        self.kernel_rows,
                        self.kernel_cols,
                        depth,
                    );
                    y.set(or, oc, k, field.inner_product(kernel) + bias);
                }
            }
        }

        (y, FeedContext::Input(x))
    }

    fn backprop(&mut self, ctx: FeedContext, delta: Tensor) -> Tensor {
        let FeedContext::Input(x) = ctx else {
            panic!("ConvolutionalLayer given a foreign forward context");
        };
        let depth = self.input_dim.slices;
        let mut back = Tensor::from_dim(self.input_dim);

        // Repeat the forward loops to pair each kernel with the receptive
        // field it was applied to. Each scalar delta feeds the kernel's bias
        // gradient, scales the input sub-cube into the kernel gradient, and
        // scales the kernel itself into the returned input gradient.
        for (k, kernel) in self.kernels.iter().enumerate() {
            for or in 0..self.out_rows {
                for oc in 0..self.out_cols {
                    let d = delta.at(or, oc, k);
                    let row = or * self.stride_rows;
                    let col = oc * self.stride_cols;

                    let bias = self.d_b.at(k, 0, 0);
                    self.d_b.set(k, 0, 0, bias + d);

                    let field = x.view(row, col, 0, self.kernel_rows, self.kernel_cols, depth);
                    self.d_k[k].add_view_scaled(&field, d);

                    back.add_at_scaled(row, col, 0, kernel, d);
                }
            }
        }

        // Overlapping receptive fields accumulated additively above; divide
        // each pixel by the number of fields that covered it.
        for s in 0..depth {
            for r in 0..self.input_dim.rows {
                for c in 0..self.input_dim.cols {
                    let v = back.at(r, c, s) / self.coverage.at(r, c, 0);
                    back.set(r, c, s, v);
                }
            }
        }

        back
    }

    fn reset_gradients(&mut self) {
        self.d_b.fill_zero();
        for dk in &mut self.d_k {
            dk.fill_zero();
        }
    }

    fn apply_gradients(&mut self, reg_term: f64, scale: f64) {
        // Each kernel was applied out_rows*out_cols times per sample, so the
        // accumulated gradients are scaled down by that factor to keep the
        // effective learning rate per kernel weight consistent.
        let scale = -scale / (self.out_rows * self.out_cols) as f64;
        self.d_b.times_equals(scale);
        self.biases.plus_equals(&self.d_b);

        for (kernel, dk) in self.kernels.iter_mut().zip(&mut self.d_k) {
            if reg_term != 0.0 {
                kernel.times_equals(reg_term);
            }
            dk.times_equals(scale);
            kernel.plus_equals(dk);
        }
    }

    fn parameter_count(&self) -> usize {
        let kernel_weights: usize = self.kernels.iter().map(|k| k.data().len()).sum();
        if self.kernels.is_empty() {
            0
        } else {
            kernel_weights + self.biases.data().len()
        }
    }

    fn name(&self) -> &'static str {
        "ConvolutionalLayer"
    }
}
