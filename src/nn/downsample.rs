//! Vertex truncation to a coarser level.

use burn::prelude::*;

use super::error::LayerError;
use super::kernels::truncate_vertices;

/// Keeps the first `nv_prev` vertices of a feature tensor.
///
/// Stateless and parameter-free.
#[derive(Module, Clone, Debug)]
pub struct DownSamp {
    nv_prev: usize,
}

impl DownSamp {
    pub fn new(nv_prev: usize) -> Self {
        Self { nv_prev }
    }

    /// Target vertex count.
    pub fn nv_prev(&self) -> usize {
        self.nv_prev
    }

    pub fn try_forward<B: Backend>(&self, x: Tensor<B, 3>) -> Result<Tensor<B, 3>, LayerError> {
        let [_, _, nv] = x.dims();
        if nv < self.nv_prev {
            return Err(LayerError::shape_mismatch(
                "DownSamp",
                format!("at least {} vertices", self.nv_prev),
                format!("{} vertices", nv),
            ));
        }
        Ok(truncate_vertices(x, self.nv_prev))
    }

    /// # Panics
    /// If the input has fewer than `nv_prev` vertices.
    pub fn forward<B: Backend>(&self, x: Tensor<B, 3>) -> Tensor<B, 3> {
        match self.try_forward(x) {
            Ok(out) => out,
            Err(err) => panic!("{}", err),
        }
    }
}
