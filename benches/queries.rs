//! Benchmarks for store queries on benchmark-shaped item sets.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use packfit::{ItemStore, Multiset, PackingMode, QueryOptions, StoreConfig};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const K: usize = 40;
const SUM: usize = 200;

/// Sizes are the minimum of three uniform draws, accumulated up to `sum`.
fn gen_items(rng: &mut StdRng, n: usize, k: usize, sum: usize) -> Vec<Multiset> {
    (0..n)
        .map(|_| {
            let mut counts = vec![0u32; k];
            let mut total = 0;
            loop {
                let size = (0..3).map(|_| rng.gen_range(1..k)).min().unwrap_or(1);
                if total + size > sum {
                    break;
                }
                total += size;
                counts[size] += 1;
            }
            Multiset::new(counts)
        })
        .collect()
}

fn volume_store(rng: &mut StdRng, n: usize) -> ItemStore {
    let config = StoreConfig::default().with_mode(PackingMode::Volume);
    ItemStore::with_config(gen_items(rng, n, K, SUM), config).unwrap()
}

fn bench_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("build");
    let mut rng = StdRng::seed_from_u64(1);

    for n in [100, 1000, 10000] {
        let items = gen_items(&mut rng, n, K, SUM);
        group.throughput(Throughput::Elements(n as u64));
        group.bench_with_input(BenchmarkId::new("store", n), &n, |bench, _| {
            bench.iter(|| ItemStore::new(black_box(items.clone())).unwrap())
        });
    }

    group.finish();
}

fn bench_any_fits(c: &mut Criterion) {
    let mut group = c.benchmark_group("any_item_fits_into");
    let mut rng = StdRng::seed_from_u64(2);
    let store = volume_store(&mut rng, 1000);
    let tests = gen_items(&mut rng, 100, K, SUM);

    group.throughput(Throughput::Elements((store.len() * tests.len()) as u64));
    for (name, parallel) in [("sequential", false), ("parallel", true)] {
        for limit in [1, 2] {
            let opts = QueryOptions::default()
                .with_branching_limit(limit)
                .with_parallel(parallel);
            group.bench_with_input(BenchmarkId::new(name, limit), &limit, |bench, _| {
                bench.iter(|| {
                    tests
                        .iter()
                        .filter(|t| store.any_item_fits_into(black_box(t), &opts).unwrap())
                        .count()
                })
            });
        }
    }

    group.finish();
}

fn bench_filter_stage(c: &mut Criterion) {
    let mut group = c.benchmark_group("filter_stage");
    let mut rng = StdRng::seed_from_u64(3);
    let store = volume_store(&mut rng, 1000);
    let tests = gen_items(&mut rng, 100, K, SUM);

    group.throughput(Throughput::Elements((store.len() * tests.len()) as u64));
    for (name, use_filter) in [("filtered", true), ("exact_only", false)] {
        let opts = QueryOptions::default().with_filter(use_filter);
        group.bench_function(name, |bench| {
            bench.iter(|| {
                tests
                    .iter()
                    .map(|t| store.count_items_fit_into(black_box(t), &opts).unwrap())
                    .sum::<usize>()
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_build, bench_any_fits, bench_filter_stage);
criterion_main!(benches);
