//! Display utilities and output formatting for the candlesync CLI.

use anyhow::{Context, Result};
use candlesync_lib::prelude::*;
use candlesync_lib::BandPoint;
use chrono::DateTime;
use clap::ValueEnum;
use std::path::{Path, PathBuf};

/// Output format for exported data.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub(crate) enum Format {
    Csv,
    Json,
    Ndjson,
    Parquet,
}

impl From<Format> for OutputFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Csv => Self::Csv,
            Format::Json => Self::Json,
            Format::Ndjson => Self::Ndjson,
            Format::Parquet => Self::Parquet,
        }
    }
}

/// Default export path: `<symbol>_<timeframe>.<ext>`, lowercased.
pub(crate) fn default_output(symbol: &Symbol, timeframe: Timeframe, format: Format) -> PathBuf {
    let format = OutputFormat::from(format);
    PathBuf::from(format!(
        "{}_{}.{}",
        symbol.as_str().to_lowercase(),
        timeframe.interval(),
        format.extension()
    ))
}

/// Sibling path for one band: `bars.csv` with `fast` becomes
/// `bars.fast.csv`.
pub(crate) fn band_path(output: &Path, band: &str) -> PathBuf {
    let stem = output
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match output.extension() {
        Some(ext) => format!("{stem}.{band}.{}", ext.to_string_lossy()),
        None => format!("{stem}.{band}"),
    };
    output.with_file_name(name)
}

/// Writes bars to `output` and, if given, each band to its sibling path.
/// Returns the paths written.
pub(crate) fn write_snapshot(
    output: &Path,
    format: Format,
    bars: &[Bar],
    bands: Option<&Bands>,
) -> Result<Vec<PathBuf>> {
    let format = OutputFormat::from(format);
    export_bars(output, format, bars)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    let mut written = vec![output.to_path_buf()];

    if let Some(bands) = bands {
        for (label, points) in [("fast", &bands.fast), ("slow", &bands.slow)] {
            let path = band_path(output, label);
            export_bands(&path, format, points)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            written.push(path);
        }
    }

    Ok(written)
}

/// Formats an epoch-seconds time for the terminal.
pub(crate) fn format_time(time: i64) -> String {
    DateTime::from_timestamp(time, 0).map_or_else(
        || time.to_string(),
        |dt| dt.format("%Y-%m-%d %H:%M:%S").to_string(),
    )
}

/// One-line rendering of a bar.
pub(crate) fn format_bar(bar: &Bar) -> String {
    format!(
        "{}  O {:<10} H {:<10} L {:<10} C {:<10} V {}",
        format_time(bar.time),
        bar.open,
        bar.high,
        bar.low,
        bar.close,
        bar.volume
    )
}

fn format_band(label: &str, point: Option<&BandPoint>) -> String {
    point.map_or_else(
        || format!("{label}: warming up"),
        |p| format!("{label}: {:.2} / {:.2} / {:.2}", p.upper, p.middle, p.lower),
    )
}

/// Renders an engine event for watch output, or `None` for events that
/// are not shown.
pub(crate) fn describe(event: &EngineEvent, latest: Option<&Bar>) -> Option<String> {
    match event {
        EngineEvent::Subscribed {
            symbol,
            timeframe,
            bars,
            ..
        } => Some(format!("Subscribed {symbol} {timeframe}: {bars} bars")),
        EngineEvent::SubscribeFailed {
            symbol,
            timeframe,
            reason,
        } => Some(format!("Subscribe {symbol} {timeframe} failed: {reason}")),
        EngineEvent::Unsubscribed { symbol } => Some(format!("Unsubscribed {symbol}")),
        EngineEvent::CandlesChanged { count, .. } => Some(match latest {
            Some(bar) => format!("{}  ({count} changed)", format_bar(bar)),
            None => format!("{count} candles changed"),
        }),
        EngineEvent::BandsUpdated { bands, .. } => Some(format!(
            "{}  |  {}",
            format_band("fast", bands.fast.last()),
            format_band("slow", bands.slow.last())
        )),
        EngineEvent::BackfillLoaded {
            inserted, earliest, ..
        } => Some(format!(
            "Loaded {inserted} older bars, earliest {}",
            earliest.map_or_else(|| "-".to_string(), format_time)
        )),
        EngineEvent::BackfillExhausted { .. } => Some("No older data".to_string()),
        EngineEvent::BackfillFailed { reason, .. } => {
            Some(format!("Loading older data failed: {reason}"))
        }
        EngineEvent::DataPull { enabled } => Some(format!(
            "Data pull {}",
            if *enabled { "enabled" } else { "disabled" }
        )),
        EngineEvent::SeriesUpdated { .. }
        | EngineEvent::PendingBar { .. }
        | EngineEvent::Ltp { .. }
        | EngineEvent::Push(_) => None,
    }
}

/// Prints a symbol table.
pub(crate) fn print_symbols(symbols: &[Symbol]) {
    println!("{:<28} {:<20} {:<14}", "SYMBOL", "NAME", "EXCHANGE");
    println!("{}", "-".repeat(62));

    for symbol in symbols {
        println!(
            "{:<28} {:<20} {:<14}",
            symbol.as_str(),
            symbol.display_name(),
            format!("{:?}", symbol.exchange())
        );
    }

    println!("\nTotal: {} symbols", symbols.len());
}

#[cfg(test)]
mod tests {
    use super::*;
    use candlesync_lib::{BandPoint, SessionId};

    #[test]
    fn test_default_output() {
        let path = default_output(&Symbol::new("NSE_TCS"), Timeframe::Minute5, Format::Parquet);
        assert_eq!(path, PathBuf::from("nse_tcs_5m.parquet"));
    }

    #[test]
    fn test_band_path() {
        assert_eq!(
            band_path(Path::new("out/tcs.csv"), "fast"),
            PathBuf::from("out/tcs.fast.csv")
        );
        assert_eq!(band_path(Path::new("tcs"), "slow"), PathBuf::from("tcs.slow"));
    }

    #[test]
    fn test_describe_changed_uses_latest_bar() {
        let bar = Bar::new(1_700_000_040, 1.0, 2.0, 0.5, 1.5, 10.0);
        let event = EngineEvent::CandlesChanged {
            session: SessionId::nil(),
            count: 1,
        };
        let line = describe(&event, Some(&bar)).unwrap();
        assert!(line.starts_with("2023-11-14 22:14:00"));
        assert!(line.ends_with("(1 changed)"));
    }

    #[test]
    fn test_describe_bands() {
        let point = BandPoint {
            time: 60,
            upper: 3.0,
            middle: 2.0,
            lower: 1.0,
        };
        let event = EngineEvent::BandsUpdated {
            session: SessionId::nil(),
            bands: Bands {
                fast: vec![point],
                slow: Vec::new(),
            },
        };
        assert_eq!(
            describe(&event, None).unwrap(),
            "fast: 3.00 / 2.00 / 1.00  |  slow: warming up"
        );
    }

    #[test]
    fn test_write_snapshot_with_bands() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("tcs.json");
        let bars: Vec<_> = (0..120).map(|i| Bar::flat(i * 60, 100.0 + (i % 5) as f64)).collect();
        let bands = BandSettings::default().compute(&bars);

        let written = write_snapshot(&output, Format::Json, &bars, Some(&bands)).unwrap();
        assert_eq!(written.len(), 3);
        assert!(written.iter().all(|p| p.exists()));
        assert_eq!(written[1], dir.path().join("tcs.fast.json"));
    }

    #[test]
    fn test_hidden_events() {
        let event = EngineEvent::Ltp {
            symbol: Symbol::new("NSE_TCS"),
            price: 1.0,
            time: 0,
        };
        assert!(describe(&event, None).is_none());
    }
}
