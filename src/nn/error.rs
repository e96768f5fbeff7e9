//! Error types for building and running mesh layers.

use thiserror::Error;

use crate::mesh::BundleError;
use crate::types::MeshLevel;

/// Errors raised while constructing or evaluating mesh layers.
#[derive(Error, Debug)]
pub enum LayerError {
    /// The layer's mesh bundle could not be loaded or restricted.
    #[error(transparent)]
    Bundle(#[from] BundleError),

    /// Stride outside what the operator supports.
    #[error("unsupported stride {stride} for {operator} (supported: {supported})")]
    UnsupportedStride {
        stride: usize,
        operator: &'static str,
        supported: &'static str,
    },

    /// Input tensor disagrees with the layer's channels or mesh level.
    #[error("shape mismatch in {layer}: expected {expected}, got {actual}")]
    ShapeMismatch {
        layer: String,
        expected: String,
        actual: String,
    },

    /// Inconsistent layer or network configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl LayerError {
    /// Create a shape mismatch error.
    pub fn shape_mismatch(
        layer: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self::ShapeMismatch {
            layer: layer.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Input vertex count that does not belong to the layer's mesh level.
    pub(crate) fn wrong_level(layer: &str, level: MeshLevel, expected_nv: usize, actual_nv: usize) -> Self {
        Self::shape_mismatch(
            format!("{} at {}", layer, level),
            format!("{} vertices", expected_nv),
            format!("{} vertices (input belongs to a different mesh level)", actual_nv),
        )
    }
}
