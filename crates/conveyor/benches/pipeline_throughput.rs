//! Throughput benchmarks for linear pipelines

use conveyor::aggregation::{sort_values, sum_all_1d};
use conveyor::pipeline::{filter, map};
use conveyor::sink::DiscardSink;
use conveyor::source::IterSource;
use conveyor::window::window_by_size;
use conveyor::Stream;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use tokio::runtime::Runtime;
use tokio_util::sync::CancellationToken;

const ITEMS: u64 = 10_000;

/// Map + filter chain with one and several workers per operator
fn bench_map_filter(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();

    let mut group = c.benchmark_group("map_filter");
    group.throughput(Throughput::Elements(ITEMS));

    for workers in [1usize, 4] {
        group.bench_with_input(BenchmarkId::from_parameter(workers), &workers, |b, &workers| {
            b.to_async(&rt).iter(|| async move {
                Stream::from_source(IterSource::new(0..ITEMS))
                    .run(map(|n: u64| n.wrapping_mul(31)).with_concurrency(workers))
                    .run(filter(|n: &u64| n % 3 != 0).with_concurrency(workers))
                    .into_sink(DiscardSink::new())
                    .execute(&CancellationToken::new())
                    .await
                    .unwrap();
            });
        });
    }

    group.finish();
}

/// Size windows feeding a sum kernel
fn bench_window_sum(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();

    let mut group = c.benchmark_group("window_sum");
    group.throughput(Throughput::Elements(ITEMS));

    for size in [16u64, 256] {
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            b.to_async(&rt).iter(|| async move {
                Stream::from_source(IterSource::new(0..ITEMS))
                    .run(window_by_size::<u64>(size))
                    .run(sum_all_1d::<u64>())
                    .into_sink(DiscardSink::new())
                    .execute(&CancellationToken::new())
                    .await
                    .unwrap();
            });
        });
    }

    group.finish();
}

fn bench_sort_values(c: &mut Criterion) {
    let values: Vec<f64> = (0..ITEMS).map(|n| ((n * 7919) % 1000) as f64).collect();

    c.bench_function("sort_values", |b| {
        b.iter(|| {
            let mut batch = values.clone();
            sort_values(&mut batch);
            black_box(batch);
        });
    });
}

criterion_group!(benches, bench_map_filter, bench_window_sum, bench_sort_values);
criterion_main!(benches);
