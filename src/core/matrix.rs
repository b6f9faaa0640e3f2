//! A dense, row-major matrix of `f64` and the handful of vector routines the classifier needs.
//!
//! All cells live in a single contiguous vec. Row `r` occupies the subrange
//! `r * ncols .. (r + 1) * ncols`, so a row can be handed out as a plain slice and
//! added into a likelihood vector without copying.
//!
//! Resizing keeps every existing cell at its `(row, col)` position and zero-fills the rest.
//! The classifier only ever grows its matrices.

use std::ops::Range;

/// Dense 2D array of reals, indexed `[row][col]`.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Matrix {
    data: Vec<f64>,
    nrows: usize,
    ncols: usize,
}

impl Matrix {
    /// Creates a zero-filled matrix with `nrows` rows and `ncols` columns.
    pub fn new(nrows: usize, ncols: usize) -> Self {
        Self {
            data: vec![0.0; nrows * ncols],
            nrows,
            ncols,
        }
    }

    /// Builds a matrix from row-major data. Returns `None` if the length does not match.
    pub fn from_row_major(nrows: usize, ncols: usize, data: Vec<f64>) -> Option<Self> {
        (nrows.checked_mul(ncols) == Some(data.len())).then_some(Self { data, nrows, ncols })
    }

    /// Number of rows.
    #[inline]
    pub fn rows(&self) -> usize {
        self.nrows
    }

    /// Number of columns.
    #[inline]
    pub fn cols(&self) -> usize {
        self.ncols
    }

    /// Resizes to `nrows` x `ncols`, preserving existing cells and zero-padding new ones.
    pub fn resize(&mut self, nrows: usize, ncols: usize) {
        if nrows == self.nrows && ncols == self.ncols {
            return;
        }

        if ncols == self.ncols {
            self.data.resize(nrows * ncols, 0.0);
        } else {
            let mut data = vec![0.0; nrows * ncols];
            let keep_rows = self.nrows.min(nrows);
            let keep_cols = self.ncols.min(ncols);

            for row in 0..keep_rows {
                let src = row * self.ncols;
                let dst = row * ncols;
                data[dst..dst + keep_cols].copy_from_slice(&self.data[src..src + keep_cols]);
            }

            self.data = data;
        }

        self.nrows = nrows;
        self.ncols = ncols;
    }

    #[inline]
    fn row_range(&self, row: usize) -> Range<usize> {
        let start = row * self.ncols;
        start..start + self.ncols
    }

    /// Returns the cell at `(row, col)`.
    #[inline]
    pub fn at(&self, row: usize, col: usize) -> f64 {
        debug_assert!(col < self.ncols);
        self.data[row * self.ncols + col]
    }

    /// Returns a mutable reference to the cell at `(row, col)`.
    #[inline]
    pub fn at_mut(&mut self, row: usize, col: usize) -> &mut f64 {
        debug_assert!(col < self.ncols);
        &mut self.data[row * self.ncols + col]
    }

    /// Returns an immutable slice over one row.
    #[inline]
    pub fn row(&self, row: usize) -> &[f64] {
        &self.data[self.row_range(row)]
    }

    /// Returns a mutable slice over one row.
    #[inline]
    pub fn row_mut(&mut self, row: usize) -> &mut [f64] {
        let range = self.row_range(row);
        &mut self.data[range]
    }

    /// All cells in row-major order.
    #[inline]
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }
}

/// Adds `from` into `into` elementwise over their common length.
#[inline]
pub fn add(into: &mut [f64], from: &[f64]) {
    for (a, &b) in into.iter_mut().zip(from) {
        *a += b;
    }
}

/// Replaces every value `x` with `exp(k * x)`.
#[inline]
pub fn range_exp(k: f64, values: &mut [f64]) {
    for val in values.iter_mut() {
        *val = (k * *val).exp();
    }
}

/// Scales `values` so that they sum to `target`. Leaves them untouched if the sum is zero.
#[inline]
pub fn normalize(values: &mut [f64], target: f64) {
    let total: f64 = values.iter().sum();

    if total != 0.0 {
        for val in values.iter_mut() {
            *val = *val / total * target;
        }
    }
}

/// Computes `x = a * x + b * y` elementwise.
#[inline]
pub fn axby(a: f64, x: &mut [f64], b: f64, y: &[f64]) {
    for (xi, &yi) in x.iter_mut().zip(y) {
        *xi = a * *xi + b * yi;
    }
}
