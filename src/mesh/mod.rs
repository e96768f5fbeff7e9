//! Mesh operator bundles.
//!
//! Provides the per-level geometric operators the PDO convolution runs on:
//! - CPU-side bundles (`MeshBundle`) and their restriction to a resolution change
//! - Bundle file I/O
//! - A level → bundle registry injected into layer constructors
//! - Device-resident sparse operators

pub(crate) mod bundle;
pub mod io;
mod operators;
mod registry;
mod sparse;

pub use bundle::{mat_from_rows, row_major_f32, rows_from_mat, MeshBundle, Resolution, ResolvedBundle};
pub use io::{bundle_file_name, read_mesh_bundle, write_mesh_bundle, BundleError};
pub use operators::{MeshOperators, SparseOperator};
pub use registry::{BundleSource, MeshRegistry};
pub use sparse::CooMatrix;
