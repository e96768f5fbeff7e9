//! Benchmarks for the PDO mesh convolution.
//!
//! Run with: `cargo bench --bench mesh_conv_bench`
//!
//! Measures forward cost per mesh level and direction on the NdArray backend.

#[path = "../tests/common/mod.rs"]
mod common;

use burn::prelude::*;
use common::{device, icosphere_registry, nv_at, random_vec, TestBackend};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use uscnn_rs::backend::float_tensor;
use uscnn_rs::{MeshConvConfig, MeshLevel, SphericalFpnConfig};

const MAX_LEVEL: usize = 3;
const CHANNELS: usize = 16;

fn input(channels: usize, level: usize) -> Tensor<TestBackend, 3> {
    let nv = nv_at(level);
    float_tensor(random_vec(channels * nv, 42), [1, channels, nv], &device())
}

/// Stride-1 convolution across levels.
fn bench_forward_by_level(c: &mut Criterion) {
    let mut group = c.benchmark_group("mesh_conv_forward");
    let registry = icosphere_registry(MAX_LEVEL);

    for level in 1..=MAX_LEVEL {
        let conv = MeshConvConfig::new(CHANNELS, CHANNELS)
            .init::<TestBackend>(&registry, MeshLevel::new(level), &device())
            .unwrap();
        let x = input(CHANNELS, level);

        group.bench_with_input(BenchmarkId::new("stride1", nv_at(level)), &level, |b, _| {
            b.iter(|| conv.forward(black_box(x.clone())))
        });
    }

    group.finish();
}

/// Coarsening and refining at the finest level.
fn bench_directions(c: &mut Criterion) {
    let mut group = c.benchmark_group("mesh_conv_direction");
    let registry = icosphere_registry(MAX_LEVEL);
    let level = MeshLevel::new(MAX_LEVEL);

    let down = MeshConvConfig::new(CHANNELS, CHANNELS)
        .with_stride(2)
        .init::<TestBackend>(&registry, level, &device())
        .unwrap();
    let fine = input(CHANNELS, MAX_LEVEL);
    group.bench_function("coarsen", |b| b.iter(|| down.forward(black_box(fine.clone()))));

    let up = MeshConvConfig::transpose(CHANNELS, CHANNELS)
        .init::<TestBackend>(&registry, level, &device())
        .unwrap();
    let coarse = input(CHANNELS, MAX_LEVEL - 1);
    group.bench_function("refine", |b| b.iter(|| up.forward(black_box(coarse.clone()))));

    group.finish();
}

/// Full network forward pass on a small hierarchy.
fn bench_fpn(c: &mut Criterion) {
    let registry = icosphere_registry(MAX_LEVEL);
    let model = SphericalFpnConfig::new(4, 4)
        .with_max_level(MAX_LEVEL)
        .with_fdim(8)
        .with_fpn_dim(32)
        .with_det_dim(16)
        .init::<TestBackend>(&registry, &device())
        .unwrap();
    let x = input(4, MAX_LEVEL);

    c.bench_function("fpn_forward", |b| b.iter(|| model.forward(black_box(x.clone()))));
}

criterion_group!(benches, bench_forward_by_level, bench_directions, bench_fpn);
criterion_main!(benches);
