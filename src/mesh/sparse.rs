//! CPU-side sparse matrices in coordinate (COO) form.
//!
//! Mesh bundles store their geometric operators as row/column/value
//! triples. This is the layout the bundle file uses and the layout the
//! device-side gather/scatter multiply consumes, so no CSR/CSC conversion
//! is ever needed.

use faer::Mat;
use serde::{Deserialize, Serialize};

/// Sparse matrix stored as coordinate triples.
///
/// Duplicate `(row, col)` entries are allowed and are summed, matching the
/// usual COO convention.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CooMatrix {
    /// `[n_rows, n_cols]`
    pub shape: [usize; 2],
    /// Row index of each stored entry
    pub row: Vec<usize>,
    /// Column index of each stored entry
    pub col: Vec<usize>,
    /// Value of each stored entry
    pub data: Vec<f32>,
}

impl CooMatrix {
    /// Create an empty matrix of the given shape.
    pub fn new(n_rows: usize, n_cols: usize) -> Self {
        Self {
            shape: [n_rows, n_cols],
            row: Vec::new(),
            col: Vec::new(),
            data: Vec::new(),
        }
    }

    /// Build a matrix from `(row, col, value)` triples.
    pub fn from_triplets(n_rows: usize, n_cols: usize, triplets: &[(usize, usize, f32)]) -> Self {
        let mut m = Self::new(n_rows, n_cols);
        for &(r, c, v) in triplets {
            m.push(r, c, v);
        }
        m
    }

    /// Append one entry.
    pub fn push(&mut self, row: usize, col: usize, value: f32) {
        self.row.push(row);
        self.col.push(col);
        self.data.push(value);
    }

    #[inline]
    pub fn n_rows(&self) -> usize {
        self.shape[0]
    }

    #[inline]
    pub fn n_cols(&self) -> usize {
        self.shape[1]
    }

    /// Number of stored entries.
    #[inline]
    pub fn nnz(&self) -> usize {
        self.data.len()
    }

    /// Keep only the first `n_rows` rows.
    ///
    /// Used to restrict a fine-level operator to the vertex prefix that
    /// forms the next coarser level. Entry order is preserved.
    pub fn truncate_rows(&self, n_rows: usize) -> Self {
        let n_rows = n_rows.min(self.n_rows());
        let mut out = Self::new(n_rows, self.n_cols());
        for ((&r, &c), &v) in self.row.iter().zip(&self.col).zip(&self.data) {
            if r < n_rows {
                out.push(r, c, v);
            }
        }
        out
    }

    /// Check that the triple arrays agree in length and every index is in bounds.
    pub fn check(&self) -> Result<(), String> {
        if self.row.len() != self.data.len() || self.col.len() != self.data.len() {
            return Err(format!(
                "row/col/data lengths differ ({}, {}, {})",
                self.row.len(),
                self.col.len(),
                self.data.len()
            ));
        }
        if let Some(&r) = self.row.iter().find(|&&r| r >= self.n_rows()) {
            return Err(format!("row index {} out of bounds for {} rows", r, self.n_rows()));
        }
        if let Some(&c) = self.col.iter().find(|&&c| c >= self.n_cols()) {
            return Err(format!("column index {} out of bounds for {} columns", c, self.n_cols()));
        }
        Ok(())
    }

    /// Dense copy of the matrix, duplicates summed.
    ///
    /// Only meant for small meshes (reference computations and debugging).
    pub fn to_dense(&self) -> Mat<f64> {
        let mut dense = Mat::<f64>::zeros(self.n_rows(), self.n_cols());
        for ((&r, &c), &v) in self.row.iter().zip(&self.col).zip(&self.data) {
            dense[(r, c)] += v as f64;
        }
        dense
    }
}
