//! Collection reconciliation benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use ledgersync_bench::generate_keywords;
use ledgersync_core::{DurableMirror, WorkingSet};
use ledgersync_engine::CollectionReconciler;
use ledgersync_storage::InMemoryBackend;
use ledgersync_testkit::Keyword;

/// Benchmark a cold refresh into an empty working set.
fn bench_cold_refresh(c: &mut Criterion) {
    let mut group = c.benchmark_group("reconcile_cold");

    for size in [10, 100, 1000].iter() {
        group.throughput(Throughput::Elements(*size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            b.iter_batched(
                || {
                    (
                        generate_keywords(0, size),
                        WorkingSet::<Keyword>::new(),
                        DurableMirror::open(InMemoryBackend::new()).unwrap(),
                    )
                },
                |(fetched, mut set, mirror)| {
                    let report = CollectionReconciler::new()
                        .run(fetched, &mut set, &mirror)
                        .unwrap();
                    black_box(report);
                },
                criterion::BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

/// Benchmark a refresh where half the collection was removed remotely.
fn bench_half_removed(c: &mut Criterion) {
    let mut group = c.benchmark_group("reconcile_half_removed");

    for size in [100, 1000].iter() {
        group.throughput(Throughput::Elements(*size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            b.iter_batched(
                || {
                    let mut set = WorkingSet::<Keyword>::new();
                    let mirror = DurableMirror::open(InMemoryBackend::new()).unwrap();
                    CollectionReconciler::new()
                        .run(generate_keywords(0, size), &mut set, &mirror)
                        .unwrap();
                    (generate_keywords(0, size / 2), set, mirror)
                },
                |(fetched, mut set, mirror)| {
                    let report = CollectionReconciler::new()
                        .run(fetched, &mut set, &mirror)
                        .unwrap();
                    black_box(report);
                },
                criterion::BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

criterion_group!(benches, bench_cold_refresh, bench_half_removed);
criterion_main!(benches);
