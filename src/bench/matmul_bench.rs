use std::hint::black_box;

use cachemat::{MatrixBuffer, multiply_block, multiply_line, multiply_standard};
use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const SIZES: &[usize] = &[64, 128, 256, 512];
const BLOCK_SIZES: &[usize] = &[16, 32, 64, 128];

fn random_matrix(n: usize, rng: &mut StdRng) -> MatrixBuffer {
    let mut m = MatrixBuffer::new(n).unwrap();
    m.fill(|_, _| rng.random_range(-1.0..1.0));
    m
}

fn bench_strategies(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(42);

    for &n in SIZES {
        let mut group = c.benchmark_group(format!("matmul {n}x{n}"));
        group.throughput(Throughput::Elements((2 * n * n * n) as u64));
        if n >= 256 {
            group.sample_size(10);
        }

        let a = random_matrix(n, &mut rng);
        let b = random_matrix(n, &mut rng);

        group.bench_function("standard", |bench| {
            bench.iter(|| multiply_standard(black_box(&a), black_box(&b)).unwrap())
        });
        group.bench_function("line", |bench| {
            bench.iter(|| multiply_line(black_box(&a), black_box(&b)).unwrap())
        });
        for &bs in BLOCK_SIZES.iter().filter(|&&bs| bs < n) {
            group.bench_with_input(BenchmarkId::new("block", bs), &bs, |bench, &bs| {
                bench.iter(|| multiply_block(black_box(&a), black_box(&b), bs).unwrap())
            });
        }

        group.finish();
    }
}

criterion_group!(benches, bench_strategies);
criterion_main!(benches);
