//! Device-resident mesh operators.
//!
//! The CPU bundle is uploaded once when a layer is built and reused for
//! every forward pass. Sparse matrices stay sparse on the device: a
//! product is a gather of input columns followed by a scatter-add into
//! output rows, both of which burn differentiates on every backend.

use burn::prelude::*;

use super::bundle::{row_major_f32, ResolvedBundle};
use super::sparse::CooMatrix;
use crate::backend::{float_tensor, index_tensor};

/// Sparse matrix on the device, in COO form.
#[derive(Module, Debug)]
pub struct SparseOperator<B: Backend> {
    /// Row index per stored entry: [nnz]
    rows: Tensor<B, 1, Int>,
    /// Column index per stored entry: [nnz]
    cols: Tensor<B, 1, Int>,
    /// Entry values: [nnz]
    values: Tensor<B, 1>,
    n_rows: usize,
    n_cols: usize,
    nnz: usize,
}

impl<B: Backend> SparseOperator<B> {
    /// Upload a CPU sparse matrix.
    pub fn from_coo(m: &CooMatrix, device: &B::Device) -> Self {
        Self {
            rows: index_tensor(&m.row, device),
            cols: index_tensor(&m.col, device),
            values: float_tensor(m.data.clone(), [m.nnz()], device),
            n_rows: m.n_rows(),
            n_cols: m.n_cols(),
            nnz: m.nnz(),
        }
    }

    #[inline]
    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    #[inline]
    pub fn n_cols(&self) -> usize {
        self.n_cols
    }

    #[inline]
    pub fn nnz(&self) -> usize {
        self.nnz
    }

    /// Apply the matrix along the last axis.
    ///
    /// Computes `out[b, c, r] = Σ_j A[r, j] · x[b, c, j]`, i.e. `x @ Aᵀ` for
    /// every (batch, channel) row.
    ///
    /// # Arguments
    /// * `x` - Input [batch, channels, n_cols]
    ///
    /// # Returns
    /// Output [batch, channels, n_rows]
    pub fn apply(&self, x: Tensor<B, 3>) -> Tensor<B, 3> {
        let [batch, channels, _] = x.dims();
        let device = x.device();
        let out = Tensor::zeros([batch, channels, self.n_rows], &device);
        if self.nnz == 0 {
            return out;
        }

        // Gather the column each entry reads: [B, C, nnz]
        let gathered = x.select(2, self.cols.clone());
        let weighted = gathered.mul(self.values.clone().reshape([1, 1, self.nnz]));

        // Scatter-add into the row each entry writes
        out.select_assign(2, self.rows.clone(), weighted)
    }
}

/// All operators of one resolved bundle, on the device.
#[derive(Module, Debug)]
pub struct MeshOperators<B: Backend> {
    /// Gradient: [3·nf, nv]
    pub grad: SparseOperator<B>,
    /// Laplacian: [nv_out, nv]
    pub laplacian: SparseOperator<B>,
    /// Face-to-vertex averaging: [nv_out, nf]
    pub face_to_vertex: SparseOperator<B>,
    /// North-south direction per face: [nf, 3]
    pub ns: Tensor<B, 2>,
    /// East-west direction per face: [nf, 3]
    pub ew: Tensor<B, 2>,
    /// Vertex count of the bundle level
    pub nv: usize,
    /// Face count of the bundle level
    pub nf: usize,
    /// Vertex count expected at the input
    pub nv_in: usize,
    /// Vertex count produced
    pub nv_out: usize,
}

impl<B: Backend> MeshOperators<B> {
    /// Upload a resolved bundle to the device.
    ///
    /// This is a one-time transfer done when a layer is built.
    pub fn from_resolved(bundle: &ResolvedBundle, device: &B::Device) -> Self {
        let nf = bundle.nf;
        Self {
            grad: SparseOperator::from_coo(&bundle.grad, device),
            laplacian: SparseOperator::from_coo(&bundle.laplacian, device),
            face_to_vertex: SparseOperator::from_coo(&bundle.face_to_vertex, device),
            ns: float_tensor(row_major_f32(&bundle.ns), [nf, 3], device),
            ew: float_tensor(row_major_f32(&bundle.ew), [nf, 3], device),
            nv: bundle.nv,
            nf,
            nv_in: bundle.nv_in,
            nv_out: bundle.nv_out,
        }
    }

    /// Number of vertices the input is padded with before the operators run.
    #[inline]
    pub fn n_pad(&self) -> usize {
        self.nv - self.nv_in
    }
}
