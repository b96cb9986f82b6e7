//! Draw-path throughput benchmarks.
//!
//! Measures the three hot paths: single-word draws (buffer read + post-mix),
//! bulk fills (amortized refill steps), and bounded-range draws (rejection
//! sampling on top of the word path).

use criterion::{Criterion, Throughput, black_box, criterion_group, criterion_main};
use qrng_core::QuantumRng;

fn bench_next_u64(c: &mut Criterion) {
    let mut group = c.benchmark_group("next_u64");
    group.throughput(Throughput::Bytes(8));
    group.bench_function("draw", |b| {
        let mut rng = QuantumRng::new(Some(b"bench".as_slice()));
        b.iter(|| black_box(rng.next_u64()));
    });
    group.finish();
}

fn bench_fill(c: &mut Criterion) {
    let mut group = c.benchmark_group("fill");
    for size in [128usize, 1024, 8192] {
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_function(format!("{size}B"), |b| {
            let mut rng = QuantumRng::new(Some(b"bench".as_slice()));
            let mut buf = vec![0u8; size];
            b.iter(|| {
                rng.fill(black_box(&mut buf)).unwrap();
            });
        });
    }
    group.finish();
}

fn bench_range_u64(c: &mut Criterion) {
    c.bench_function("range_u64/1..=6", |b| {
        let mut rng = QuantumRng::new(Some(b"bench".as_slice()));
        b.iter(|| black_box(rng.range_u64(1, 6)));
    });
}

criterion_group!(benches, bench_next_u64, bench_fill, bench_range_u64);
criterion_main!(benches);
