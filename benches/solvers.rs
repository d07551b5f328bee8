use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use optitrace::{lbfgs, newton, AlgorithmOptions};

#[path = "common/mod.rs"]
mod common;
use common::*;

const ITERATIONS: usize = 5;

fn options(n: usize) -> AlgorithmOptions<f64> {
    AlgorithmOptions {
        initial_point: make_input(n),
        max_iter: ITERATIONS,
        ..Default::default()
    }
}

// ─── Fixed iteration budget ────────────────────────────────────────────────
// Newton pays O(n³) per step for the solve; L-BFGS pays O(m·n).

fn bench_per_iteration(c: &mut Criterion) {
    let mut group = c.benchmark_group("per_iteration");
    for n in [2, 10, 50, 100] {
        let obj = Rosenbrock { n };
        let opts = options(n);

        group.bench_with_input(BenchmarkId::new("newton", n), &opts, |b, opts| {
            b.iter(|| black_box(newton(&obj, black_box(opts))))
        });

        group.bench_with_input(BenchmarkId::new("lbfgs", n), &opts, |b, opts| {
            b.iter(|| black_box(lbfgs(&obj, black_box(opts))))
        });
    }
    group.finish();
}

// ─── L-BFGS memory size ────────────────────────────────────────────────────

fn bench_lbfgs_memory(c: &mut Criterion) {
    let mut group = c.benchmark_group("lbfgs_memory");
    let n = 100;
    let obj = Rosenbrock { n };
    for m in [1, 5, 20] {
        let opts = AlgorithmOptions {
            memory: m,
            max_iter: 20,
            ..options(n)
        };
        group.bench_with_input(BenchmarkId::new("lbfgs", m), &opts, |b, opts| {
            b.iter(|| black_box(lbfgs(&obj, black_box(opts))))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_per_iteration, bench_lbfgs_memory);
criterion_main!(benches);
