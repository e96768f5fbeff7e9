//! Mesh bundle file I/O.
//!
//! One JSON document per mesh level:
//!
//! ```text
//! {
//!   "level": 1, "nv": 42, "nf": 80, "nv_prev": 12,
//!   "V":   [[x, y, z], ...],                       (optional)
//!   "G":   {"shape": [240, 42], "row": [...], "col": [...], "data": [...]},
//!   "L":   {"shape": [42, 42], ...},
//!   "F2V": {"shape": [42, 80], ...},
//!   "NS":  [[x, y, z], ...],
//!   "EW":  [[x, y, z], ...]
//! }
//! ```
//!
//! Files are named `icosphere_<level>.json`; see [`bundle_file_name`].
//!
//! ## Example
//! ```no_run
//! use uscnn_rs::mesh::read_mesh_bundle;
//! use std::path::Path;
//!
//! let bundle = read_mesh_bundle(Path::new("meshes/icosphere_3.json")).expect("Failed to read bundle");
//! println!("level {} has {} vertices", bundle.level, bundle.nv);
//! ```

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::bundle::{mat_from_rows, rows_from_mat, MeshBundle};
use super::sparse::CooMatrix;
use crate::types::MeshLevel;

/// Error type for mesh bundle loading and restriction.
#[derive(Debug, Error)]
pub enum BundleError {
    /// File missing, unreadable or unwritable.
    #[error("I/O error on mesh bundle {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// File is not a valid bundle document.
    #[error("malformed mesh bundle {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Document parsed but its operators disagree with each other.
    #[error("inconsistent mesh bundle for level {level}: {reason}")]
    Invalid { level: MeshLevel, reason: String },

    /// A resolution change was requested at the coarsest level.
    #[error("mesh level {level} has no coarser level to restrict to")]
    NoCoarserLevel { level: MeshLevel },

    /// The registry has no entry for the level.
    #[error("no mesh bundle registered for level {0}")]
    UnknownLevel(MeshLevel),
}

/// On-disk layout of a bundle.
#[derive(Debug, Serialize, Deserialize)]
struct BundleRecord {
    level: MeshLevel,
    nv: usize,
    nf: usize,
    #[serde(default)]
    nv_prev: Option<usize>,
    #[serde(rename = "V", default, skip_serializing_if = "Option::is_none")]
    vertices: Option<Vec<[f32; 3]>>,
    #[serde(rename = "G")]
    grad: CooMatrix,
    #[serde(rename = "L")]
    laplacian: CooMatrix,
    #[serde(rename = "F2V")]
    face_to_vertex: CooMatrix,
    #[serde(rename = "NS")]
    ns: Vec<[f32; 3]>,
    #[serde(rename = "EW")]
    ew: Vec<[f32; 3]>,
}

impl From<BundleRecord> for MeshBundle {
    fn from(r: BundleRecord) -> Self {
        MeshBundle {
            level: r.level,
            nv: r.nv,
            nf: r.nf,
            nv_prev: r.nv_prev,
            vertices: r.vertices.as_deref().map(mat_from_rows),
            grad: r.grad,
            laplacian: r.laplacian,
            face_to_vertex: r.face_to_vertex,
            ns: mat_from_rows(&r.ns),
            ew: mat_from_rows(&r.ew),
        }
    }
}

impl From<&MeshBundle> for BundleRecord {
    fn from(b: &MeshBundle) -> Self {
        BundleRecord {
            level: b.level,
            nv: b.nv,
            nf: b.nf,
            nv_prev: b.nv_prev,
            vertices: b.vertices.as_ref().map(rows_from_mat),
            grad: b.grad.clone(),
            laplacian: b.laplacian.clone(),
            face_to_vertex: b.face_to_vertex.clone(),
            ns: rows_from_mat(&b.ns),
            ew: rows_from_mat(&b.ew),
        }
    }
}

/// Conventional file name for a level's bundle.
pub fn bundle_file_name(level: MeshLevel) -> String {
    format!("icosphere_{}.json", level.get())
}

/// Read and validate a mesh bundle file.
///
/// # Returns
/// * `Ok(MeshBundle)` - The parsed, internally consistent bundle
/// * `Err(BundleError)` - If the file is missing, malformed or inconsistent
pub fn read_mesh_bundle(path: &Path) -> Result<MeshBundle, BundleError> {
    let file = File::open(path).map_err(|source| BundleError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let record: BundleRecord =
        serde_json::from_reader(BufReader::new(file)).map_err(|source| BundleError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

    let bundle = MeshBundle::from(record);
    bundle.validate()?;
    Ok(bundle)
}

/// Write a mesh bundle file.
pub fn write_mesh_bundle(path: &Path, bundle: &MeshBundle) -> Result<(), BundleError> {
    let io_err = |source| BundleError::Io {
        path: path.to_path_buf(),
        source,
    };

    let file = File::create(path).map_err(io_err)?;
    let mut writer = BufWriter::new(file);
    // Only the writer can fail here
    serde_json::to_writer(&mut writer, &BundleRecord::from(bundle))
        .map_err(|source| io_err(source.into()))?;
    writer.flush().map_err(io_err)?;

    Ok(())
}
