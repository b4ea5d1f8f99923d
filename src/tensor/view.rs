//! Non-owning windows into a parent tensor's buffer.

use crate::tensor::Tensor;

/// A read-only window over a sub-region of a parent [`Tensor`].
///
/// All accesses translate through the stored offsets into the parent's
/// buffer; nothing is copied. The borrow ties the view's lifetime to the
/// parent, so a view can never outlive or alias a resized buffer. Views are
/// transient: created for one receptive-field expression and dropped.
pub struct TensorView<'a> {
    source: &'a Tensor,
    row_off: usize,
    col_off: usize,
    slice_off: usize,
    rows: usize,
    cols: usize,
    slices: usize,
}

impl<'a> TensorView<'a> {
    pub(crate) fn new(
        source: &'a Tensor,
        row_off: usize,
        col_off: usize,
        slice_off: usize,
        rows: usize,
        cols: usize,
        slices: usize,
    ) -> Self {
        Self {
            source,
            row_off,
            col_off,
            slice_off,
            rows,
            cols,
            slices,
        }
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

    #[inline]
    pub fn at(&self, row: usize, col: usize, slice: usize) -> f64 {
        self.source
            .at(row + self.row_off, col + self.col_off, slice + self.slice_off)
    }

    /// Inner product of this window with an equally-shaped tensor: the sum
    /// of the products of corresponding entries across the full cube.
    ///
    /// This is the convolution kernel application: one call per receptive
    /// field, summing over every slice inside the window.
    pub fn inner_product(&self, kernel: &Tensor) -> f64 {
        assert!(
            kernel.rows() == self.rows
                && kernel.cols() == self.cols
                && kernel.slices() == self.slices,
            "inner_product: incompatible dimensions"
        );

        let mut sum = 0.0;
        let kdata = kernel.data();
        let mut ki = 0;
        for s in 0..self.slices {
            for r in 0..self.rows {
                for c in 0..self.cols {
                    sum += self.at(r, c, s) * kdata[ki];
                    ki += 1;
                }
            }
        }
        sum
    }
}
