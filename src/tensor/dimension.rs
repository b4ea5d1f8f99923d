//! Shape descriptor used for layer input/output negotiation.

use std::fmt;

/// The dimension of the input or output of a layer.
///
/// A value type, structurally compared. `slices` is the depth of the tensor
/// (the number of feature maps).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimension {
    pub rows: usize,
    pub cols: usize,
    pub slices: usize,
}

impl Dimension {
    pub fn new(rows: usize, cols: usize, slices: usize) -> Self {
        Self { rows, cols, slices }
    }

    /// Shape of a column vector with `len` entries.
    pub fn column(len: usize) -> Self {
        Self::new(len, 1, 1)
    }

    /// Total number of entries a tensor of this dimension holds.
    pub fn flat_len(&self) -> usize {
        self.rows * self.cols * self.slices
    }

    /// Whether this shape already is a single column vector.
    pub fn is_column(&self) -> bool {
        self.cols == 1 && self.slices == 1
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "rows={} cols={} slices={}",
            self.rows, self.cols, self.slices
        )
    }
}
