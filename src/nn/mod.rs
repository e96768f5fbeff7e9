//! Mesh network layers.
//!
//! This module provides:
//! - [`MeshConv`]: PDO convolution, forward (stride 1/2) and transposed
//! - [`DownSamp`]: vertex truncation to a coarser level
//! - [`ResBlock`]: bottleneck residual block around a mesh convolution
//! - [`SphericalFpn`]: encoder / feature-pyramid / detection network
//!
//! Layers follow burn conventions: a `*Config` type builds the module and
//! `forward` evaluates it. Mesh layers also offer `try_forward`, which
//! reports a mismatched input as a [`LayerError`] instead of panicking.

mod downsample;
mod error;
mod fpn;
pub mod kernels;
mod mesh_conv;
mod res_block;

pub use downsample::DownSamp;
pub use error::LayerError;
pub use fpn::{
    Down, PyramidPlan, SphericalFpn, SphericalFpnConfig, StageSpec, Up, UpsamplePath, UpsampleSpec,
    MAX_UP_STAGES,
};
pub use mesh_conv::{MeshConv, MeshConvConfig, PdoDirection, TRANSPOSE_PAD_VALUE};
pub use res_block::{ResBlock, ResBlockConfig, SkipProjection};
