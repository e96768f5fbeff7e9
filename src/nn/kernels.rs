//! Batched tensor kernels shared by the mesh layers.
//!
//! This module provides:
//! - PDO term evaluation: identity, Laplacian and the two directional
//!   vertex gradients of a feature tensor
//! - The learned combination of those terms
//! - Vertex-axis truncation (coarsening) and padding (refinement)
//!
//! All kernels take the operators they need as explicit arguments and work
//! on every (batch, channel) row at once.

use burn::prelude::*;

use crate::mesh::{MeshOperators, SparseOperator};

/// Number of PDO basis terms: identity, Laplacian, EW gradient, NS gradient.
pub const N_PDO_TERMS: usize = 4;

/// Keep the first `nv` vertices.
///
/// Coarse vertices are the prefix of the fine ordering, so this is the
/// whole of coarsening.
pub fn truncate_vertices<B: Backend>(x: Tensor<B, 3>, nv: usize) -> Tensor<B, 3> {
    let [batch, channels, n] = x.dims();
    if nv == n {
        return x;
    }
    x.slice([0..batch, 0..channels, 0..nv])
}

/// Append `n_pad` vertices filled with `value`.
pub fn pad_vertices<B: Backend>(x: Tensor<B, 3>, n_pad: usize, value: f32) -> Tensor<B, 3> {
    if n_pad == 0 {
        return x;
    }
    let [batch, channels, _] = x.dims();
    let pad = Tensor::<B, 3>::ones([batch, channels, n_pad], &x.device()).mul_scalar(value);
    Tensor::cat(vec![x, pad], 2)
}

/// Per-face gradient of every channel.
///
/// # Arguments
/// * `grad` - Gradient operator [3·nf, nv]
/// * `x` - Vertex features [batch, channels, nv]
///
/// # Returns
/// Face gradients [batch, channels, nf, 3]
pub fn face_gradients<B: Backend>(grad: &SparseOperator<B>, x: Tensor<B, 3>) -> Tensor<B, 4> {
    let [batch, channels, _] = x.dims();
    let nf = grad.n_rows() / 3;

    // Rows are laid out component-major: [3, nf]
    grad.apply(x)
        .reshape([batch, channels, 3, nf])
        .swap_dims(2, 3)
}

/// Component of each face gradient along a per-face unit direction.
///
/// # Arguments
/// * `grad_face` - Face gradients [batch, channels, nf, 3]
/// * `direction` - Unit vectors [nf, 3]
///
/// # Returns
/// Directional derivative per face [batch, channels, nf]
pub fn project_onto_direction<B: Backend>(grad_face: Tensor<B, 4>, direction: &Tensor<B, 2>) -> Tensor<B, 3> {
    let [batch, channels, nf, _] = grad_face.dims();
    let dir = direction.clone().reshape([1, 1, nf, 3]);
    grad_face.mul(dir).sum_dim(3).reshape([batch, channels, nf])
}

/// Evaluate the four PDO terms of a feature tensor.
///
/// The input must already live on the operator's full level (`ops.nv`
/// vertices); padding for refinement happens before this call. Terms are
/// evaluated at the first `ops.nv_out` vertices.
///
/// # Arguments
/// * `ops` - Resolved operators of one mesh level
/// * `x` - Vertex features [batch, channels, nv]
///
/// # Returns
/// Stacked terms [batch, channels, nv_out, 4] in the order
/// (identity, Laplacian, EW gradient, NS gradient)
pub fn pdo_terms<B: Backend>(ops: &MeshOperators<B>, x: Tensor<B, 3>) -> Tensor<B, 4> {
    let grad_face = face_gradients(&ops.grad, x.clone());
    let laplacian = ops.laplacian.apply(x.clone());
    let identity = truncate_vertices(x, ops.nv_out);

    let grad_face_ew = project_onto_direction(grad_face.clone(), &ops.ew);
    let grad_face_ns = project_onto_direction(grad_face, &ops.ns);

    // Area-weighted average of the face values around each vertex
    let grad_vert_ew = ops.face_to_vertex.apply(grad_face_ew);
    let grad_vert_ns = ops.face_to_vertex.apply(grad_face_ns);

    Tensor::stack(vec![identity, laplacian, grad_vert_ew, grad_vert_ns], 3)
}

/// Combine PDO terms with learned coefficients.
///
/// Computes `out[b, o, v] = Σ_i Σ_k coeffs[o, i, k] · terms[b, i, v, k] + bias[o]`
/// as one matrix product over the flattened (channel, term) axis.
///
/// # Arguments
/// * `terms` - Stacked terms [batch, in_channels, nv, 4]
/// * `coeffs` - Coefficients [out_channels, in_channels, 4]
/// * `bias` - Optional bias [out_channels]
///
/// # Returns
/// Output features [batch, out_channels, nv]
pub fn combine_pdo_terms<B: Backend>(
    terms: Tensor<B, 4>,
    coeffs: Tensor<B, 3>,
    bias: Option<Tensor<B, 1>>,
) -> Tensor<B, 3> {
    let [batch, in_channels, nv, n_terms] = terms.dims();
    let [out_channels, _, _] = coeffs.dims();
    let width = in_channels * n_terms;

    // [B, C, V, K] -> [B·V, C·K]
    let features = terms.swap_dims(1, 2).reshape([batch * nv, width]);
    // [O, C, K] -> [C·K, O]
    let weights = coeffs.reshape([out_channels, width]).transpose();

    let out = features
        .matmul(weights)
        .reshape([batch, nv, out_channels])
        .swap_dims(1, 2);

    match bias {
        Some(bias) => out.add(bias.reshape([1, out_channels, 1])),
        None => out,
    }
}
