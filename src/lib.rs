//! # uscnn-rs
//!
//! Spherical CNN layers on icosahedral meshes.
//!
//! This crate provides the building blocks for convolutional networks on
//! signals sampled at the vertices of a subdivided icosahedron:
//! - Per-level geometric operator bundles (gradient, Laplacian,
//!   face-to-vertex averaging, direction fields) and their file format
//! - Sparse operators on any Burn backend
//! - PDO mesh convolution, forward and transposed
//! - Vertex downsampling and bottleneck residual blocks
//! - A spherical feature-pyramid network
//!
//! Operator bundles are precomputed offline, one file per mesh level, and
//! handed to layer constructors through a [`MeshRegistry`].
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use burn_ndarray::NdArray;
//! use uscnn_rs::{MeshBackend, MeshLevel, MeshRegistry, SphericalFpnConfig};
//!
//! let registry = MeshRegistry::from_dir(
//!     Path::new("meshes"),
//!     MeshLevel::range_inclusive(MeshLevel::new(0), MeshLevel::new(5)),
//! );
//! let device = <NdArray as MeshBackend>::default_device();
//! let model = SphericalFpnConfig::new(4, 15)
//!     .init::<NdArray>(&registry, &device)
//!     .expect("mesh bundles");
//! ```

pub mod backend;
pub mod mesh;
pub mod nn;
pub mod types;

pub use backend::MeshBackend;
pub use mesh::{
    read_mesh_bundle, write_mesh_bundle, BundleError, CooMatrix, MeshBundle, MeshOperators,
    MeshRegistry, Resolution, ResolvedBundle, SparseOperator,
};
pub use nn::{
    DownSamp, LayerError, MeshConv, MeshConvConfig, PdoDirection, PyramidPlan, ResBlock,
    ResBlockConfig, SphericalFpn, SphericalFpnConfig,
};
pub use types::MeshLevel;
