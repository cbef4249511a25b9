//! Benchmark workloads for candlesync.
//!
//! Each workload builds its input up front and exposes a `run` step so the
//! criterion benches and the table runner measure the same thing.

use candlesync_aggregate::MinuteAggregator;
use candlesync_engine::Series;
use candlesync_format::{OutputFormat, export_bars};
use candlesync_indicators::{BandSettings, Bands};
use candlesync_types::Bar;
use std::time::{Duration, Instant};

/// Start of the synthetic series, aligned to a minute.
pub const START: i64 = 1_700_000_040;

/// Generates `count` one-minute bars with a deterministic sawtooth close.
pub fn synthetic_bars(count: usize, start: i64) -> Vec<Bar> {
    (0..count)
        .map(|i| {
            let close = 100.0 + (i % 37) as f64 * 0.25 - (i % 11) as f64 * 0.5;
            Bar::new(
                start + i as i64 * 60,
                close - 0.1,
                close + 0.5,
                close - 0.5,
                close,
                (i % 100) as f64,
            )
        })
        .collect()
}

/// Generates `count` ticks, `per_minute` to each minute.
pub fn synthetic_ticks(count: usize, per_minute: usize) -> Vec<(f64, i64)> {
    let step = 60 / per_minute.clamp(1, 60) as i64;
    (0..count)
        .map(|i| (100.0 + (i % 29) as f64 * 0.1, START + i as i64 * step))
        .collect()
}

/// Loads `bars` into a fresh series, then replaces the last bar
/// `updates` times, as a live feed does.
pub fn live_updates(bars: &[Bar], updates: usize) -> Series {
    let mut series = Series::default();
    series.set_all(bars.iter().copied());
    let Some(mut last) = series.last().copied() else {
        return series;
    };
    for i in 0..updates {
        last.close += if i % 2 == 0 { 0.25 } else { -0.25 };
        series.upsert_many(&[last]);
    }
    series
}

/// Loads `pages` pages of `page_size` bars, newest first.
pub fn backfill_pages(pages: usize, page_size: usize) -> Series {
    let total = pages * page_size;
    let all = synthetic_bars(total, START);
    let mut series = Series::default();
    for page in all.rchunks(page_size) {
        if series.is_empty() {
            series.set_all(page.iter().copied());
        } else {
            series.prepend_older(page);
        }
    }
    series
}

/// Computes both bands over `bars`.
pub fn compute_bands(bars: &[Bar]) -> Bands {
    BandSettings::default().compute(bars)
}

/// Feeds ticks through the minute aggregator. Returns completed bars.
pub fn aggregate_ticks(ticks: &[(f64, i64)]) -> usize {
    let mut aggregator = MinuteAggregator::new();
    ticks
        .iter()
        .filter(|(price, time)| aggregator.on_tick(*price, *time).flushed().is_some())
        .count()
}

/// Writes `bars` to a temporary file. Returns the file size in bytes.
pub fn export_to_temp(bars: &[Bar], format: OutputFormat) -> u64 {
    let Ok(dir) = tempfile::tempdir() else {
        return 0;
    };
    let path = dir.path().join(format!("bench.{}", format.extension()));
    if export_bars(&path, format, bars).is_err() {
        return 0;
    }
    std::fs::metadata(&path).map_or(0, |m| m.len())
}

/// Result of timing one workload.
#[derive(Debug, Clone)]
pub struct BenchmarkResult {
    /// Workload name.
    pub name: String,
    /// Elements processed per iteration.
    pub elements: u64,
    /// Mean duration per iteration.
    pub mean: Duration,
}

impl BenchmarkResult {
    /// Elements processed per second.
    pub fn elements_per_sec(&self) -> f64 {
        let secs = self.mean.as_secs_f64();
        if secs > 0.0 {
            self.elements as f64 / secs
        } else {
            0.0
        }
    }
}

/// Times `f` over `iterations` runs.
pub fn time_workload<F, T>(name: &str, elements: u64, iterations: usize, mut f: F) -> BenchmarkResult
where
    F: FnMut() -> T,
{
    let iterations = iterations.max(1);
    let start = Instant::now();
    for _ in 0..iterations {
        std::hint::black_box(f());
    }
    BenchmarkResult {
        name: name.to_string(),
        elements,
        mean: start.elapsed() / iterations as u32,
    }
}

/// Format a duration for display.
pub fn format_duration(d: Duration) -> String {
    let micros = d.as_micros();
    if micros >= 1_000_000 {
        format!("{:.2}s", d.as_secs_f64())
    } else if micros >= 1_000 {
        format!("{:.2}ms", micros as f64 / 1_000.0)
    } else {
        format!("{micros}µs")
    }
}

/// Format a rate for display.
pub fn format_rate(per_sec: f64) -> String {
    if per_sec >= 1_000_000.0 {
        format!("{:.1}M/s", per_sec / 1_000_000.0)
    } else if per_sec >= 1_000.0 {
        format!("{:.1}K/s", per_sec / 1_000.0)
    } else {
        format!("{per_sec:.0}/s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workloads_produce_expected_shapes() {
        assert_eq!(backfill_pages(3, 100).len(), 300);
        assert_eq!(live_updates(&synthetic_bars(50, START), 10).len(), 50);
        assert_eq!(compute_bands(&synthetic_bars(150, START)).fast.len(), 51);
        assert_eq!(aggregate_ticks(&synthetic_ticks(600, 6)), 99);
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_micros(500)), "500µs");
        assert_eq!(format_duration(Duration::from_millis(5)), "5.00ms");
        assert_eq!(format_duration(Duration::from_secs(2)), "2.00s");
    }
}
