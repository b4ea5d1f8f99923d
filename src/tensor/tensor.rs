//! Dense rank-3 tensor with the arithmetic the layer kernels need.
//!
//! Layout: `data[slice*rows*cols + row*cols + col]`, row-major within each
//! slice, slices concatenated. Element access skips bounds checks in release
//! builds; out-of-range indices are the caller's bug. Shape mismatches in the
//! arithmetic operations are programmer errors and fail fast with a panic.

use crate::rng::XorShiftRng;
use crate::tensor::{Dimension, TensorView};

/// Dense (rows x cols x slices) array of f64 values.
///
/// The shape is immutable; the contents are not. A tensor exclusively owns
/// its backing buffer; windows into it are expressed as [`TensorView`]
/// borrows, whose lifetime the borrow checker bounds by the parent's.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
    rows: usize,
    cols: usize,
    slices: usize,
    data: Vec<f64>,
}

impl Tensor {
    /// Create a tensor with all entries 0.
    pub fn zeros(rows: usize, cols: usize, slices: usize) -> Self {
        Self {
            rows,
            cols,
            slices,
            data: vec![0.0; rows * cols * slices],
        }
    }

    /// Create a zero tensor shaped like `dim`.
    pub fn from_dim(dim: Dimension) -> Self {
        Self::zeros(dim.rows, dim.cols, dim.slices)
    }

    /// Wrap an existing buffer. Panics if the length doesn't match the shape.
    pub fn from_vec(rows: usize, cols: usize, slices: usize, data: Vec<f64>) -> Self {
        assert_eq!(
            data.len(),
            rows * cols * slices,
            "buffer length {} does not match shape {}x{}x{}",
            data.len(),
            rows,
            cols,
            slices
        );
        Self {
            rows,
            cols,
            slices,
            data,
        }
    }

    /// Create a column vector.
    pub fn column(vector: Vec<f64>) -> Self {
        let len = vector.len();
        Self::from_vec(len, 1, 1, vector)
    }

    /// Fill a new tensor with uniform values symmetric about 0 (the
    /// difference of two uniform draws). Used for parameter initialization.
    pub fn random(rows: usize, cols: usize, slices: usize, rng: &mut XorShiftRng) -> Self {
        let mut t = Self::zeros(rows, cols, slices);
        for value in &mut t.data {
            *value = rng.next_symmetric();
        }
        t
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn slices(&self) -> usize {
        self.slices
    }

    pub fn dimension(&self) -> Dimension {
        Dimension::new(self.rows, self.cols, self.slices)
    }

    pub fn data(&self) -> &[f64] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [f64] {
        &mut self.data
    }

    /// Linear index of an entry. Bounds are the caller's responsibility.
    #[inline]
    pub fn index(&self, row: usize, col: usize, slice: usize) -> usize {
        debug_assert!(row < self.rows && col < self.cols && slice < self.slices);
        slice * self.rows * self.cols + row * self.cols + col
    }

    #[inline]
    pub fn at(&self, row: usize, col: usize, slice: usize) -> f64 {
        self.data[self.index(row, col, slice)]
    }

    #[inline]
    pub fn set(&mut self, row: usize, col: usize, slice: usize, value: f64) {
        let i = self.index(row, col, slice);
        self.data[i] = value;
    }

    fn assert_same_shape(&self, t: &Tensor, op: &str) {
        assert!(
            self.rows == t.rows && self.cols == t.cols && self.slices == t.slices,
            "{op}: incompatible dimensions, self is {} but argument is {}",
            self.dimension(),
            t.dimension()
        );
    }

    /// Set `self = self + t`.
    pub fn plus_equals(&mut self, t: &Tensor) {
        self.assert_same_shape(t, "plus_equals");
        for (a, b) in self.data.iter_mut().zip(&t.data) {
            *a += b;
        }
    }

    /// Set `self = self * d` for each entry.
    pub fn times_equals(&mut self, d: f64) {
        for value in &mut self.data {
            *value *= d;
        }
    }

    /// Elementwise multiplication with the given tensor.
    pub fn dot_times_equals(&mut self, t: &Tensor) {
        self.assert_same_shape(t, "dot_times_equals");
        for (a, b) in self.data.iter_mut().zip(&t.data) {
            *a *= b;
        }
    }

    /// Get a new tensor equal to `self - t`.
    pub fn minus(&self, t: &Tensor) -> Tensor {
        self.assert_same_shape(t, "minus");
        let mut result = Tensor::zeros(self.rows, self.cols, self.slices);
        for (r, (a, b)) in result.data.iter_mut().zip(self.data.iter().zip(&t.data)) {
            *r = a - b;
        }
        result
    }

    /// Reset every entry to 0 without reallocating.
    pub fn fill_zero(&mut self) {
        self.data.fill(0.0);
    }

    /// For each slice i, compute `self[i] * t[i]` into `out`.
    ///
    /// Inner dimensions must match per slice; `out` provides the storage so
    /// the hot path never reallocates.
    pub fn mul(&self, t: &Tensor, out: &mut Tensor) {
        assert!(
            self.slices == t.slices && self.cols == t.rows,
            "mul: incompatible dimensions, self is {} but argument is {}",
            self.dimension(),
            t.dimension()
        );
        assert!(
            out.rows == self.rows && out.cols == t.cols && out.slices == self.slices,
            "mul: bad result dimension {}",
            out.dimension()
        );

        for s in 0..self.slices {
            for r in 0..self.rows {
                for c in 0..t.cols {
                    // self.row[r] . t.col[c]
                    let mut rc = 0.0;
                    for i in 0..self.cols {
                        rc += self.at(r, i, s) * t.at(i, c, s);
                    }
                    out.set(r, c, s, rc);
                }
            }
        }
    }

    /// For each slice i, compute `transpose(self[i]) * t[i]` into `out`.
    pub fn transpose_mul(&self, t: &Tensor, out: &mut Tensor) {
        assert!(
            self.slices == t.slices && self.rows == t.rows,
            "transpose_mul: incompatible dimensions, self is {} but argument is {}",
            self.dimension(),
            t.dimension()
        );
        assert!(
            out.rows == self.cols && out.cols == t.cols && out.slices == self.slices,
            "transpose_mul: bad result dimension {}",
            out.dimension()
        );

        for s in 0..self.slices {
            for r in 0..self.cols {
                for c in 0..t.cols {
                    // self.col[r] . t.col[c]
                    let mut rc = 0.0;
                    for i in 0..self.rows {
                        rc += self.at(i, r, s) * t.at(i, c, s);
                    }
                    out.set(r, c, s, rc);
                }
            }
        }
    }

    /// For each slice i, compute `self[i] * transpose(t[i])` into `out`.
    pub fn mul_transpose(&self, t: &Tensor, out: &mut Tensor) {
        assert!(
            self.slices == t.slices && self.cols == t.cols,
            "mul_transpose: incompatible dimensions, self is {} but argument is {}",
            self.dimension(),
            t.dimension()
        );
        assert!(
            out.rows == self.rows && out.cols == t.rows && out.slices == self.slices,
            "mul_transpose: bad result dimension {}",
            out.dimension()
        );

        for s in 0..self.slices {
            for r in 0..self.rows {
                for c in 0..t.rows {
                    // self.row[r] . t.row[c]
                    let mut rc = 0.0;
                    for i in 0..self.cols {
                        rc += self.at(r, i, s) * t.at(c, i, s);
                    }
                    out.set(r, c, s, rc);
                }
            }
        }
    }

    /// Accumulate `self += a * transpose(b)` per slice.
    ///
    /// This is the gradient-accumulation form of [`Tensor::mul_transpose`]:
    /// the fully-connected backward pass adds `delta * x^T` straight into its
    /// running weight gradient without a temporary.
    pub fn add_mul_transpose(&mut self, a: &Tensor, b: &Tensor) {
        assert!(
            a.slices == b.slices && a.cols == b.cols,
            "add_mul_transpose: incompatible dimensions, a is {} but b is {}",
            a.dimension(),
            b.dimension()
        );
        assert!(
            self.rows == a.rows && self.cols == b.rows && self.slices == a.slices,
            "add_mul_transpose: bad accumulator dimension {}",
            self.dimension()
        );

        for s in 0..a.slices {
            for r in 0..a.rows {
                for c in 0..b.rows {
                    let mut rc = 0.0;
                    for i in 0..a.cols {
                        rc += a.at(r, i, s) * b.at(c, i, s);
                    }
                    let idx = self.index(r, c, s);
                    self.data[idx] += rc;
                }
            }
        }
    }

    /// Window into this tensor's buffer. The view must not outlive `self`,
    /// which the borrow enforces.
    pub fn view(
        &self,
        row_off: usize,
        col_off: usize,
        slice_off: usize,
        rows: usize,
        cols: usize,
        slices: usize,
    ) -> TensorView<'_> {
        debug_assert!(
            row_off + rows <= self.rows
                && col_off + cols <= self.cols
                && slice_off + slices <= self.slices
        );
        TensorView::new(self, row_off, col_off, slice_off, rows, cols, slices)
    }

    /// Accumulate `self += view * d`, shapes matching exactly.
    pub fn add_view_scaled(&mut self, v: &TensorView<'_>, d: f64) {
        assert!(
            self.rows == v.rows() && self.cols == v.cols() && self.slices == v.slices(),
            "add_view_scaled: incompatible dimensions"
        );
        for s in 0..self.slices {
            for r in 0..self.rows {
                for c in 0..self.cols {
                    let idx = self.index(r, c, s);
                    self.data[idx] += v.at(r, c, s) * d;
                }
            }
        }
    }

    /// Accumulate `t * d` into the window of `self` starting at
    /// `(row_off, col_off, slice_off)`.
    ///
    /// Overlapping windows accumulate additively across calls, which is
    /// exactly what the convolutional backward pass relies on.
    pub fn add_at_scaled(&mut self, row_off: usize, col_off: usize, slice_off: usize, t: &Tensor, d: f64) {
        assert!(
            row_off + t.rows <= self.rows
                && col_off + t.cols <= self.cols
                && slice_off + t.slices <= self.slices,
            "add_at_scaled: window {} at ({row_off},{col_off},{slice_off}) exceeds parent {}",
            t.dimension(),
            self.dimension()
        );
        for s in 0..t.slices {
            for r in 0..t.rows {
                for c in 0..t.cols {
                    let idx = self.index(r + row_off, c + col_off, s + slice_off);
                    self.data[idx] += t.at(r, c, s) * d;
                }
            }
        }
    }

    /// Euclidean norm over the full flat buffer.
    pub fn norm(&self) -> f64 {
        self.data.iter().map(|d| d * d).sum::<f64>().sqrt()
    }

    /// Index of the largest entry in the flat buffer (first wins on ties).
    pub fn argmax(&self) -> usize {
        let mut best = 0;
        let mut max = self.data[0];
        for (i, &d) in self.data.iter().enumerate().skip(1) {
            if d > max {
                max = d;
                best = i;
            }
        }
        best
    }

    /// Reinterpret the buffer with a new shape of the same total length.
    /// The data is not moved or copied.
    pub fn reshape(self, rows: usize, cols: usize, slices: usize) -> Tensor {
        assert_eq!(
            self.data.len(),
            rows * cols * slices,
            "reshape: {} entries cannot become {}x{}x{}",
            self.data.len(),
            rows,
            cols,
            slices
        );
        Tensor {
            rows,
            cols,
            slices,
            data: self.data,
        }
    }

    /// Flatten into a column vector, reusing the buffer.
    pub fn into_column(self) -> Tensor {
        let len = self.data.len();
        self.reshape(len, 1, 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// Square identity matrix as a depth-1 tensor.
    fn id(dim: usize) -> Tensor {
        let mut t = Tensor::zeros(dim, dim, 1);
        for i in 0..dim {
            t.set(i, i, 0, 1.0);
        }
        t
    }

    #[test]
    fn test_basics() {
        let m = Tensor::zeros(10, 20, 1);
        assert_eq!(m.rows(), 10);
        assert_eq!(m.cols(), 20);
        assert_eq!(m.slices(), 1);
        assert_eq!(m.data().len(), 200);
    }

    #[test]
    fn test_index_layout() {
        // slice-major, then row-major within the slice
        let t = Tensor::zeros(3, 4, 2);
        assert_eq!(t.index(0, 0, 0), 0);
        assert_eq!(t.index(0, 1, 0), 1);
        assert_eq!(t.index(1, 0, 0), 4);
        assert_eq!(t.index(0, 0, 1), 12);
        assert_eq!(t.index(2, 3, 1), 12 + 11);
    }

    #[test]
    fn test_equality() {
        let mut rng = XorShiftRng::new(42);
        let m = Tensor::random(10, 20, 1, &mut rng);
        let mut copy = m.clone();
        assert_eq!(m, copy);
        copy.data_mut()[2] += 3.0;
        assert_ne!(m, copy);
    }

    #[test]
    fn test_plus_equals() {
        let mut rng = XorShiftRng::new(7);
        let mut m = Tensor::random(5, 1, 1, &mut rng);
        let copy = m.clone();
        let other = m.clone();
        m.plus_equals(&other);
        for i in 0..m.data().len() {
            assert_relative_eq!(m.data()[i], copy.data()[i] * 2.0);
        }
    }

    #[test]
    fn test_times_equals() {
        let factor = -1.23;
        let mut rng = XorShiftRng::new(7);
        let m = Tensor::random(3, 1, 1, &mut rng);
        let mut n = m.clone();
        n.times_equals(factor);
        for i in 0..m.data().len() {
            assert_relative_eq!(n.data()[i], m.data()[i] * factor);
        }
    }

    #[test]
    fn test_dot_times_equals() {
        let mut rng = XorShiftRng::new(7);
        let m = Tensor::random(2, 3, 1, &mut rng);
        let mut n = Tensor::random(2, 3, 1, &mut rng);
        let n_copy = n.clone();
        n.dot_times_equals(&m);
        for i in 0..n.data().len() {
            assert_relative_eq!(n.data()[i], m.data()[i] * n_copy.data()[i]);
        }
    }

    #[test]
    fn test_minus() {
        let mut rng = XorShiftRng::new(7);
        let m = Tensor::random(3, 5, 1, &mut rng);
        let n = Tensor::random(3, 5, 1, &mut rng);
        let minus = m.minus(&n);
        for i in 0..m.data().len() {
            assert_relative_eq!(minus.data()[i], m.data()[i] - n.data()[i]);
        }
    }

    #[test]
    #[should_panic(expected = "minus: incompatible dimensions")]
    fn test_minus_shape_mismatch_panics() {
        let m = Tensor::zeros(3, 5, 1);
        let n = Tensor::zeros(5, 3, 1);
        let _ = m.minus(&n);
    }

    #[test]
    fn test_mul_identity() {
        let mut rng = XorShiftRng::new(7);
        let m = Tensor::random(3, 10, 1, &mut rng);
        let mut out = Tensor::zeros(3, 10, 1);
        m.mul(&id(10), &mut out);
        assert_eq!(out, m);
        id(3).mul(&m, &mut out);
        assert_eq!(out, m);
    }

    #[test]
    fn test_transpose_mul_and_mul_transpose() {
        // m is 2x3 counting up; n is its transpose
        let mut m = Tensor::zeros(2, 3, 1);
        let mut n = Tensor::zeros(3, 2, 1);
        let mut i = 0.0;
        for r in 0..2 {
            for c in 0..3 {
                m.set(r, c, 0, i);
                n.set(c, r, 0, i);
                i += 1.0;
            }
        }

        let mut t3x2 = Tensor::zeros(3, 2, 1);
        let mut t2x3 = Tensor::zeros(2, 3, 1);
        m.transpose_mul(&id(2), &mut t3x2);
        assert_eq!(t3x2, n);
        n.transpose_mul(&id(3), &mut t2x3);
        assert_eq!(t2x3, m);

        id(2).mul_transpose(&n, &mut t2x3);
        assert_eq!(t2x3, m);
        id(3).mul_transpose(&m, &mut t3x2);
        assert_eq!(t3x2, n);
    }

    #[test]
    fn test_add_mul_transpose_accumulates() {
        let delta = Tensor::column(vec![1.0, 2.0]);
        let x = Tensor::column(vec![3.0, 4.0, 5.0]);
        let mut acc = Tensor::zeros(2, 3, 1);
        acc.add_mul_transpose(&delta, &x);
        acc.add_mul_transpose(&delta, &x);
        // acc = 2 * delta x^T
        assert_relative_eq!(acc.at(0, 0, 0), 6.0);
        assert_relative_eq!(acc.at(0, 2, 0), 10.0);
        assert_relative_eq!(acc.at(1, 0, 0), 12.0);
        assert_relative_eq!(acc.at(1, 2, 0), 20.0);
    }

    #[test]
    fn test_norm() {
        for i in 1..10 {
            assert_relative_eq!(id(i).norm(), (i as f64).sqrt());
        }
    }

    #[test]
    fn test_argmax_first_wins() {
        let t = Tensor::column(vec![1.0, 5.0, 5.0, 2.0]);
        assert_eq!(t.argmax(), 1);
    }

    #[test]
    fn test_reshape_preserves_buffer() {
        let t = Tensor::from_vec(2, 3, 1, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let col = t.into_column();
        assert_eq!(col.dimension(), Dimension::column(6));
        assert_eq!(col.data(), &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn test_add_at_scaled_overlap() {
        let mut base = Tensor::zeros(3, 3, 1);
        let block = Tensor::from_vec(2, 2, 1, vec![1.0; 4]);
        base.add_at_scaled(0, 0, 0, &block, 1.0);
        base.add_at_scaled(1, 1, 0, &block, 1.0);
        // center entry covered by both windows
        assert_relative_eq!(base.at(1, 1, 0), 2.0);
        assert_relative_eq!(base.at(0, 0, 0), 1.0);
        assert_relative_eq!(base.at(2, 2, 0), 1.0);
        assert_relative_eq!(base.at(0, 2, 0), 0.0);
    }

    #[test]
    fn test_random_symmetric_range() {
        let mut rng = XorShiftRng::new(99);
        let t = Tensor::random(10, 10, 2, &mut rng);
        for &v in t.data() {
            assert!(v > -1.0 && v < 1.0);
        }
    }
}
