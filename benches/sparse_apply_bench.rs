//! Benchmarks for sparse operator products.
//!
//! Run with: `cargo bench --bench sparse_apply_bench`
//!
//! Compares the device gather/scatter product with a dense faer product
//! for the gradient and Laplacian operators.

#[path = "../tests/common/mod.rs"]
mod common;

use common::{device, icosphere_bundles, random_vec, TestBackend};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use faer::Mat;
use uscnn_rs::backend::float_tensor;
use uscnn_rs::SparseOperator;

const MAX_LEVEL: usize = 3;
const CHANNELS: usize = 8;

fn bench_sparse_vs_dense(c: &mut Criterion) {
    let mut group = c.benchmark_group("sparse_apply");

    for bundle in icosphere_bundles(MAX_LEVEL).iter().skip(1) {
        let nv = bundle.nv;
        let x = float_tensor::<TestBackend, 3>(random_vec(CHANNELS * nv, 7), [1, CHANNELS, nv], &device());

        for (name, coo) in [("grad", &bundle.grad), ("laplacian", &bundle.laplacian)] {
            let op = SparseOperator::<TestBackend>::from_coo(coo, &device());
            group.bench_with_input(BenchmarkId::new(format!("{}_device", name), nv), &nv, |b, _| {
                b.iter(|| op.apply(black_box(x.clone())))
            });

            let dense = coo.to_dense();
            let x_dense = Mat::<f64>::from_fn(nv, CHANNELS, |i, j| ((i * CHANNELS + j) % 17) as f64 * 0.1);
            group.bench_with_input(BenchmarkId::new(format!("{}_dense", name), nv), &nv, |b, _| {
                b.iter(|| black_box(&dense) * black_box(&x_dense))
            });
        }
    }

    group.finish();
}

criterion_group!(benches, bench_sparse_vs_dense);
criterion_main!(benches);
