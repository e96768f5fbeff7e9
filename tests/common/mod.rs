//! Shared test fixtures: icosphere operator bundles.
//!
//! Builds small but geometrically valid bundles for levels 0..=n by
//! midpoint subdivision of the icosahedron. New vertices are appended, so
//! every level's vertices are a prefix of the next level's.
//!
//! Operators:
//! - `G`: exact gradient of the piecewise-linear interpolant per face
//! - `L`: uniform (umbrella) graph Laplacian
//! - `F2V`: area-weighted average over the faces around each vertex
//! - `EW`/`NS`: local east and north unit vectors at face centroids
//!
//! Both `G` and `L` annihilate constant fields.

#![allow(dead_code)]

use std::collections::{BTreeSet, HashMap};
use std::path::Path;

use uscnn_rs::mesh::{bundle_file_name, mat_from_rows, write_mesh_bundle};
use uscnn_rs::{CooMatrix, MeshBackend, MeshBundle, MeshLevel, MeshRegistry};

pub type TestBackend = burn_ndarray::NdArray<f32>;

pub fn device() -> burn_ndarray::NdArrayDevice {
    <TestBackend as MeshBackend>::default_device()
}

type Vec3 = [f64; 3];

fn sub(a: Vec3, b: Vec3) -> Vec3 {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

fn cross(a: Vec3, b: Vec3) -> Vec3 {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

fn norm(a: Vec3) -> f64 {
    (a[0] * a[0] + a[1] * a[1] + a[2] * a[2]).sqrt()
}

fn scale(a: Vec3, s: f64) -> Vec3 {
    [a[0] * s, a[1] * s, a[2] * s]
}

fn normalize(a: Vec3) -> Vec3 {
    scale(a, 1.0 / norm(a))
}

/// Vertices and faces of one subdivision level.
#[derive(Clone, Debug)]
pub struct Icosphere {
    pub vertices: Vec<Vec3>,
    pub faces: Vec<[usize; 3]>,
}

impl Icosphere {
    pub fn icosahedron() -> Self {
        let t = (1.0 + 5f64.sqrt()) / 2.0;
        let raw = [
            [-1.0, t, 0.0],
            [1.0, t, 0.0],
            [-1.0, -t, 0.0],
            [1.0, -t, 0.0],
            [0.0, -1.0, t],
            [0.0, 1.0, t],
            [0.0, -1.0, -t],
            [0.0, 1.0, -t],
            [t, 0.0, -1.0],
            [t, 0.0, 1.0],
            [-t, 0.0, -1.0],
            [-t, 0.0, 1.0],
        ];
        let faces = vec![
            [0, 11, 5],
            [0, 5, 1],
            [0, 1, 7],
            [0, 7, 10],
            [0, 10, 11],
            [1, 5, 9],
            [5, 11, 4],
            [11, 10, 2],
            [10, 7, 6],
            [7, 1, 8],
            [3, 9, 4],
            [3, 4, 2],
            [3, 2, 6],
            [3, 6, 8],
            [3, 8, 9],
            [4, 9, 5],
            [2, 4, 11],
            [6, 2, 10],
            [8, 6, 7],
            [9, 8, 1],
        ];
        Self {
            vertices: raw.iter().map(|&v| normalize(v)).collect(),
            faces,
        }
    }

    /// Split every face into four; new vertices go to the end.
    pub fn subdivide(&self) -> Self {
        let mut vertices = self.vertices.clone();
        let mut midpoints: HashMap<(usize, usize), usize> = HashMap::new();
        let mut midpoint = |a: usize, b: usize, vertices: &mut Vec<Vec3>| -> usize {
            let key = (a.min(b), a.max(b));
            *midpoints.entry(key).or_insert_with(|| {
                let m = scale([
                    vertices[a][0] + vertices[b][0],
                    vertices[a][1] + vertices[b][1],
                    vertices[a][2] + vertices[b][2],
                ], 0.5);
                vertices.push(normalize(m));
                vertices.len() - 1
            })
        };

        let mut faces = Vec::with_capacity(self.faces.len() * 4);
        for &[a, b, c] in &self.faces {
            let ab = midpoint(a, b, &mut vertices);
            let bc = midpoint(b, c, &mut vertices);
            let ca = midpoint(c, a, &mut vertices);
            faces.push([a, ab, ca]);
            faces.push([b, bc, ab]);
            faces.push([c, ca, bc]);
            faces.push([ab, bc, ca]);
        }
        Self { vertices, faces }
    }

    /// Precompute the operator bundle of this mesh.
    pub fn bundle(&self, level: usize, nv_prev: Option<usize>) -> MeshBundle {
        let nv = self.vertices.len();
        let nf = self.faces.len();

        let mut grad = CooMatrix::new(3 * nf, nv);
        let mut areas = Vec::with_capacity(nf);
        let mut ns = Vec::with_capacity(nf);
        let mut ew = Vec::with_capacity(nf);

        for (f, &[a, b, c]) in self.faces.iter().enumerate() {
            let (pa, pb, pc) = (self.vertices[a], self.vertices[b], self.vertices[c]);
            let n2 = cross(sub(pb, pa), sub(pc, pa));
            let double_area = norm(n2);
            let n = scale(n2, 1.0 / double_area);
            areas.push(0.5 * double_area);

            // Hat-function gradients: n × (opposite edge) / 2A
            for (vertex, edge) in [(a, sub(pc, pb)), (b, sub(pa, pc)), (c, sub(pb, pa))] {
                let g = scale(cross(n, edge), 1.0 / double_area);
                for (k, &gk) in g.iter().enumerate() {
                    grad.push(k * nf + f, vertex, gk as f32);
                }
            }

            let centroid = normalize([
                (pa[0] + pb[0] + pc[0]) / 3.0,
                (pa[1] + pb[1] + pc[1]) / 3.0,
                (pa[2] + pb[2] + pc[2]) / 3.0,
            ]);
            let east = normalize([-centroid[1], centroid[0], 0.0]);
            let north = cross(centroid, east);
            ew.push([east[0] as f32, east[1] as f32, east[2] as f32]);
            ns.push([north[0] as f32, north[1] as f32, north[2] as f32]);
        }

        let mut neighbours = vec![BTreeSet::new(); nv];
        let mut incident_area = vec![0.0; nv];
        for (f, &[a, b, c]) in self.faces.iter().enumerate() {
            for (i, j) in [(a, b), (b, c), (c, a)] {
                neighbours[i].insert(j);
                neighbours[j].insert(i);
            }
            for v in [a, b, c] {
                incident_area[v] += areas[f];
            }
        }

        let mut laplacian = CooMatrix::new(nv, nv);
        for (i, nbrs) in neighbours.iter().enumerate() {
            let w = 1.0 / nbrs.len() as f32;
            laplacian.push(i, i, -1.0);
            for &j in nbrs {
                laplacian.push(i, j, w);
            }
        }

        let mut face_to_vertex = CooMatrix::new(nv, nf);
        for (f, &[a, b, c]) in self.faces.iter().enumerate() {
            for v in [a, b, c] {
                face_to_vertex.push(v, f, (areas[f] / incident_area[v]) as f32);
            }
        }

        let vertices: Vec<[f32; 3]> = self
            .vertices
            .iter()
            .map(|v| [v[0] as f32, v[1] as f32, v[2] as f32])
            .collect();

        MeshBundle {
            level: MeshLevel::new(level),
            nv,
            nf,
            nv_prev,
            vertices: Some(mat_from_rows(&vertices)),
            grad,
            laplacian,
            face_to_vertex,
            ns: mat_from_rows(&ns),
            ew: mat_from_rows(&ew),
        }
    }
}

/// Bundles for levels `0..=max_level`.
pub fn icosphere_bundles(max_level: usize) -> Vec<MeshBundle> {
    let mut mesh = Icosphere::icosahedron();
    let mut bundles = vec![mesh.bundle(0, None)];
    for level in 1..=max_level {
        let nv_prev = mesh.vertices.len();
        mesh = mesh.subdivide();
        bundles.push(mesh.bundle(level, Some(nv_prev)));
    }
    bundles
}

/// In-memory registry for levels `0..=max_level`.
pub fn icosphere_registry(max_level: usize) -> MeshRegistry {
    let mut registry = MeshRegistry::new();
    for bundle in icosphere_bundles(max_level) {
        registry.insert_bundle(bundle);
    }
    registry
}

/// Write `icosphere_<level>.json` files for levels `0..=max_level`.
pub fn write_icosphere_dir(dir: &Path, max_level: usize) {
    for bundle in icosphere_bundles(max_level) {
        write_mesh_bundle(&dir.join(bundle_file_name(bundle.level)), &bundle).unwrap();
    }
}

/// Icosphere vertex count at `level`.
pub fn nv_at(level: usize) -> usize {
    10 * 4usize.pow(level as u32) + 2
}

/// Deterministic pseudo-random values in [-1, 1).
pub fn random_vec(n: usize, seed: u64) -> Vec<f32> {
    let mut x = seed;
    (0..n)
        .map(|_| {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            ((x >> 11) as f64 / (1u64 << 53) as f64 * 2.0 - 1.0) as f32
        })
        .collect()
}

pub fn assert_close(actual: &[f32], expected: &[f32], tol: f32) {
    assert_eq!(actual.len(), expected.len(), "length mismatch");
    for (i, (a, e)) in actual.iter().zip(expected).enumerate() {
        assert!(
            (a - e).abs() <= tol * (1.0 + e.abs()),
            "index {}: {} vs {}",
            i,
            a,
            e
        );
    }
}
