//! Benchmarks for forest construction and approximate search
//!
//! Uses a deterministic pseudo-random embedding set so runs are comparable

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use discogs_rec::{
    ForestBuilder, ForestParams, ItemIndex, ReleaseId, SearchEngine, VectorDimension, VectorStore,
};

const DIMENSION: usize = 64;

fn create_store(count: usize) -> VectorStore {
    let items = (0..count)
        .map(|i| {
            let vector = (0..DIMENSION)
                .map(|j| {
                    let x = (i * DIMENSION + j) as f32;
                    ((x * 12.9898).sin() * 43758.547).fract()
                })
                .collect();
            (ReleaseId::new(i as u64 + 1).unwrap(), vector)
        })
        .collect();
    VectorStore::from_items(VectorDimension::new(DIMENSION).unwrap(), items).unwrap()
}

fn bench_build(c: &mut Criterion) {
    let store = create_store(5_000);
    let mut group = c.benchmark_group("forest_build");
    group.sample_size(10);
    for trees in [10, 50] {
        let params = ForestParams::new(trees, 32).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(trees), &params, |b, &params| {
            b.iter(|| {
                ForestBuilder::new(params)
                    .build_seeded(black_box(&store), 42)
                    .unwrap()
            });
        });
    }
    group.finish();
}

fn bench_search(c: &mut Criterion) {
    let store = create_store(20_000);
    let forest = ForestBuilder::new(ForestParams::new(50, 32).unwrap())
        .build_seeded(&store, 42)
        .unwrap();
    let engine = SearchEngine::new(&forest, &store).unwrap();

    let mut group = c.benchmark_group("forest_search");
    for k in [5, 30, 100] {
        group.bench_with_input(BenchmarkId::from_parameter(k), &k, |b, &k| {
            let mut row = 0u32;
            b.iter(|| {
                row = (row + 7919) % 20_000;
                black_box(engine.search_item(ItemIndex::new(row), k).unwrap())
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_build, bench_search);
criterion_main!(benches);
