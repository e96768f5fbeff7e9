//! Per-level geometric operator bundle.
//!
//! A bundle holds everything the PDO convolution needs to know about one
//! mesh resolution:
//! - `G`: per-face gradient of a vertex field, shape (3·nf, nv)
//! - `L`: vertex Laplacian, shape (nv, nv)
//! - `F2V`: area-weighted face-to-vertex averaging, shape (nv, nf)
//! - `NS`, `EW`: unit tangent directions per face, shape (nf, 3)
//!
//! Row `k·nf + f` of `G` holds gradient component `k` of face `f`, so the
//! gradient output splits into three contiguous blocks of `nf` values.
//!
//! Bundles are precomputed offline. Vertices of level `i-1` are the first
//! `nv_prev` vertices of level `i`, which is what makes coarsening a pure
//! row truncation.

use faer::Mat;

use super::io::BundleError;
use super::sparse::CooMatrix;
use crate::types::MeshLevel;

/// How an operator moves between mesh levels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Resolution {
    /// Input and output live on the bundle's own level.
    Same,
    /// Input on the bundle's level, output on the next coarser level.
    Coarsen,
    /// Input on the next coarser level, output on the bundle's level.
    Refine,
}

/// All geometric operators for one mesh level, CPU-resident.
#[derive(Clone, Debug)]
pub struct MeshBundle {
    /// Level this bundle was built for
    pub level: MeshLevel,

    /// Number of vertices
    pub nv: usize,

    /// Number of triangular faces
    pub nf: usize,

    /// Vertex count of the next coarser level (`None` at the coarsest level)
    pub nv_prev: Option<usize>,

    /// Vertex positions on the unit sphere, if the producer stored them
    /// Shape: (nv, 3)
    pub vertices: Option<Mat<f64>>,

    /// Gradient operator, shape (3·nf, nv)
    pub grad: CooMatrix,

    /// Laplacian, shape (nv, nv)
    pub laplacian: CooMatrix,

    /// Face-to-vertex averaging, shape (nv, nf)
    pub face_to_vertex: CooMatrix,

    /// North-south unit vector per face, shape (nf, 3)
    pub ns: Mat<f64>,

    /// East-west unit vector per face, shape (nf, 3)
    pub ew: Mat<f64>,
}

/// Operators restricted for one [`Resolution`], ready to upload.
///
/// `laplacian` and `face_to_vertex` have exactly `nv_out` rows; `grad`
/// always acts on the full `nv` vertices of the bundle level.
#[derive(Clone, Debug)]
pub struct ResolvedBundle {
    pub level: MeshLevel,
    pub resolution: Resolution,

    /// Vertex count of the bundle level (what G, L and F2V act on)
    pub nv: usize,

    /// Face count of the bundle level
    pub nf: usize,

    /// Vertex count the operator expects at its input
    pub nv_in: usize,

    /// Vertex count the operator produces
    pub nv_out: usize,

    pub grad: CooMatrix,
    pub laplacian: CooMatrix,
    pub face_to_vertex: CooMatrix,
    pub ns: Mat<f64>,
    pub ew: Mat<f64>,
}

impl ResolvedBundle {
    /// Number of vertices appended by padding before the operators run.
    pub fn n_pad(&self) -> usize {
        self.nv - self.nv_in
    }
}

impl MeshBundle {
    /// Check that every operator agrees with `nv` and `nf`.
    ///
    /// A bundle that fails here would only surface later as an opaque shape
    /// error inside a forward pass, so the loader runs it on every file.
    pub fn validate(&self) -> Result<(), BundleError> {
        let invalid = |reason: String| BundleError::Invalid {
            level: self.level,
            reason,
        };

        let expected = [
            ("G", &self.grad, [3 * self.nf, self.nv]),
            ("L", &self.laplacian, [self.nv, self.nv]),
            ("F2V", &self.face_to_vertex, [self.nv, self.nf]),
        ];
        for (name, matrix, shape) in expected {
            if matrix.shape != shape {
                return Err(invalid(format!(
                    "{} has shape {:?}, expected {:?}",
                    name, matrix.shape, shape
                )));
            }
            matrix.check().map_err(|e| invalid(format!("{}: {}", name, e)))?;
        }

        for (name, field) in [("NS", &self.ns), ("EW", &self.ew)] {
            if field.nrows() != self.nf || field.ncols() != 3 {
                return Err(invalid(format!(
                    "{} has shape [{}, {}], expected [{}, 3]",
                    name,
                    field.nrows(),
                    field.ncols(),
                    self.nf
                )));
            }
        }

        if let Some(v) = &self.vertices {
            if v.nrows() != self.nv || v.ncols() != 3 {
                return Err(invalid(format!(
                    "V has shape [{}, {}], expected [{}, 3]",
                    v.nrows(),
                    v.ncols(),
                    self.nv
                )));
            }
        }

        if let Some(nv_prev) = self.nv_prev {
            if nv_prev == 0 || nv_prev >= self.nv {
                return Err(invalid(format!(
                    "nv_prev = {} must lie in [1, nv = {})",
                    nv_prev, self.nv
                )));
            }
        }

        Ok(())
    }

    /// Vertex count of the coarser level, or an error at the coarsest level.
    pub fn require_nv_prev(&self) -> Result<usize, BundleError> {
        self.nv_prev
            .ok_or(BundleError::NoCoarserLevel { level: self.level })
    }

    /// Restrict the operators for the given resolution change.
    ///
    /// Coarsening truncates `L` and `F2V` to the first `nv_prev` rows: the
    /// coarse vertices are the prefix of the fine ordering, so those rows are
    /// exactly the coarse-level outputs.
    pub fn resolve(&self, resolution: Resolution) -> Result<ResolvedBundle, BundleError> {
        let (nv_in, nv_out) = match resolution {
            Resolution::Same => (self.nv, self.nv),
            Resolution::Coarsen => (self.nv, self.require_nv_prev()?),
            Resolution::Refine => (self.require_nv_prev()?, self.nv),
        };

        let (laplacian, face_to_vertex) = if nv_out < self.nv {
            (
                self.laplacian.truncate_rows(nv_out),
                self.face_to_vertex.truncate_rows(nv_out),
            )
        } else {
            (self.laplacian.clone(), self.face_to_vertex.clone())
        };

        Ok(ResolvedBundle {
            level: self.level,
            resolution,
            nv: self.nv,
            nf: self.nf,
            nv_in,
            nv_out,
            grad: self.grad.clone(),
            laplacian,
            face_to_vertex,
            ns: self.ns.clone(),
            ew: self.ew.clone(),
        })
    }
}

/// Flatten a dense matrix in row-major order, narrowing to `f32`.
pub fn row_major_f32(m: &Mat<f64>) -> Vec<f32> {
    let mut out = Vec::with_capacity(m.nrows() * m.ncols());
    for i in 0..m.nrows() {
        for j in 0..m.ncols() {
            out.push(m[(i, j)] as f32);
        }
    }
    out
}

/// Build an (n, 3) matrix from per-row triples.
pub fn mat_from_rows(rows: &[[f32; 3]]) -> Mat<f64> {
    Mat::from_fn(rows.len(), 3, |i, j| rows[i][j] as f64)
}

/// Inverse of [`mat_from_rows`].
pub fn rows_from_mat(m: &Mat<f64>) -> Vec<[f32; 3]> {
    (0..m.nrows())
        .map(|i| [m[(i, 0)] as f32, m[(i, 1)] as f32, m[(i, 2)] as f32])
        .collect()
}
