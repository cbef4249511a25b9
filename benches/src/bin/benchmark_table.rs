//! Benchmark runner that outputs a markdown table for the README.
//!
//! Run with: `cargo run --package candlesync-bench --bin benchmark_table --release`

use candlesync_bench::{
    BenchmarkResult, START, aggregate_ticks, backfill_pages, compute_bands, export_to_temp,
    format_duration, format_rate, live_updates, synthetic_bars, synthetic_ticks, time_workload,
};
use candlesync_format::OutputFormat;
use std::io::Write;

/// Number of iterations per workload.
const ITERATIONS: usize = 5;

fn main() {
    println!("candlesync engine benchmarks");
    println!("============================\n");
    println!("Running workloads ({ITERATIONS} iterations each)...\n");

    let bars = synthetic_bars(100_000, START);
    let ticks = synthetic_ticks(100_000, 10);

    let mut results: Vec<BenchmarkResult> = Vec::new();
    let mut run = |result: BenchmarkResult| {
        print!(".");
        let _ = std::io::stdout().flush();
        results.push(result);
    };

    run(time_workload("live upsert (100k series, 1k updates)", 1_000, ITERATIONS, || {
        live_updates(&bars, 1_000)
    }));
    run(time_workload("backfill (50 pages x 1000)", 50_000, ITERATIONS, || {
        backfill_pages(50, 1_000)
    }));
    run(time_workload("bollinger fast+slow (100k bars)", 100_000, ITERATIONS, || {
        compute_bands(&bars)
    }));
    run(time_workload("minute aggregation (100k ticks)", 100_000, ITERATIONS, || {
        aggregate_ticks(&ticks)
    }));
    for format in OutputFormat::all() {
        let name = format!("export {format} (100k bars)");
        run(time_workload(&name, 100_000, ITERATIONS, || {
            export_to_temp(&bars, *format)
        }));
    }
    println!("\n");

    println!("| Workload | Mean | Throughput |");
    println!("|----------|------|------------|");
    for result in &results {
        println!(
            "| {} | {} | {} |",
            result.name,
            format_duration(result.mean),
            format_rate(result.elements_per_sec())
        );
    }
}
