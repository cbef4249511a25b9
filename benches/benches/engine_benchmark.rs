//! Engine benchmarks: series maintenance, indicators and export.
//!
//! Run with: `cargo bench --package candlesync-bench`

use candlesync_bench::{
    START, aggregate_ticks, backfill_pages, compute_bands, export_to_temp, live_updates,
    synthetic_bars, synthetic_ticks,
};
use candlesync_format::OutputFormat;
use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;

fn series_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("series");

    for size in [1_000usize, 10_000, 100_000] {
        let bars = synthetic_bars(size, START);
        group.throughput(Throughput::Elements(1_000));
        group.bench_with_input(BenchmarkId::new("live_updates", size), &bars, |b, bars| {
            b.iter(|| live_updates(black_box(bars), 1_000));
        });
    }

    for pages in [10usize, 50] {
        group.throughput(Throughput::Elements((pages * 1_000) as u64));
        group.bench_with_input(BenchmarkId::new("backfill", pages), &pages, |b, &pages| {
            b.iter(|| backfill_pages(black_box(pages), 1_000));
        });
    }

    group.finish();
}

fn indicator_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("bollinger");

    for size in [1_000usize, 10_000, 100_000] {
        let bars = synthetic_bars(size, START);
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &bars, |b, bars| {
            b.iter(|| compute_bands(black_box(bars)));
        });
    }

    group.finish();
}

fn aggregate_benchmark(c: &mut Criterion) {
    let ticks = synthetic_ticks(100_000, 10);
    let mut group = c.benchmark_group("minute_aggregator");
    group.throughput(Throughput::Elements(ticks.len() as u64));
    group.bench_function("100k_ticks", |b| b.iter(|| aggregate_ticks(black_box(&ticks))));
    group.finish();
}

fn export_benchmark(c: &mut Criterion) {
    let bars = synthetic_bars(100_000, START);
    let mut group = c.benchmark_group("export");
    group.sample_size(10);
    group.throughput(Throughput::Elements(bars.len() as u64));

    for format in OutputFormat::all() {
        group.bench_with_input(BenchmarkId::from_parameter(format), format, |b, &format| {
            b.iter(|| export_to_temp(black_box(&bars), format));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    series_benchmark,
    indicator_benchmark,
    aggregate_benchmark,
    export_benchmark
);
criterion_main!(benches);
