//! Benchmarks for the nonce search

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use ppow_core::{Miner, MiningRequest, SearchControl, SearchOptions, meets_difficulty, mine};

fn bench_attempt(c: &mut Criterion) {
    let mut miner = Miner::new("benchmark prefix");

    c.bench_function("attempt_single", |b| {
        let mut nonce: u64 = 0;
        b.iter(|| {
            let digest = miner.attempt(black_box(nonce));
            nonce = nonce.wrapping_add(1);
            meets_difficulty(&digest, 4)
        })
    });
}

fn bench_mine(c: &mut Criterion) {
    // Known to stop at nonce 1322
    c.bench_function("mine_abc_3", |b| b.iter(|| mine(black_box("abc"), 3)));
}

#[cfg(feature = "parallel")]
fn bench_mine_parallel(c: &mut Criterion) {
    let request = MiningRequest::new("果糖酱", 4);

    c.bench_function("mine_parallel_4_threads", |b| {
        b.iter(|| {
            ppow_core::mine_parallel(
                black_box(&request),
                4,
                &SearchOptions::default(),
                &SearchControl::new(),
            )
        })
    });
}

#[cfg(not(feature = "parallel"))]
fn bench_mine_parallel(c: &mut Criterion) {
    let request = MiningRequest::new("果糖酱", 4);

    c.bench_function("mine_sequential_fallback", |b| {
        b.iter(|| {
            ppow_core::mine_with(
                black_box(&request),
                &SearchOptions::default(),
                &SearchControl::new(),
            )
        })
    });
}

criterion_group!(benches, bench_attempt, bench_mine, bench_mine_parallel);
criterion_main!(benches);
