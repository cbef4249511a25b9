//! Fetch command implementation.
//!
//! Pages history for one symbol from the data service, newest first, merges
//! the pages into a series and exports it.

use crate::display::{Format, default_output, format_time, write_snapshot};
use crate::settings::Settings;
use anyhow::{Context, Result, bail};
use candlesync_lib::prelude::*;
use candlesync_lib::{BackfillCursor, BackfillOutcome, PageRequest, Series, normalize_batch};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use tracing::{debug, warn};

/// Options for [`fetch`].
#[derive(Debug)]
pub(crate) struct FetchArgs {
    pub(crate) symbol: Symbol,
    pub(crate) timeframe: Timeframe,
    pub(crate) pages: usize,
    pub(crate) output: Option<PathBuf>,
    pub(crate) format: Format,
    pub(crate) bands: bool,
}

/// Downloads up to `pages` pages and writes them to a file.
pub(crate) async fn fetch(settings: &Settings, args: FetchArgs, quiet: bool) -> Result<()> {
    let FetchArgs {
        symbol,
        timeframe,
        pages,
        output,
        format,
        bands,
    } = args;
    let client = OhlcvClient::new(settings.client_config())?;
    let page_size = settings.page_size;

    let progress = if quiet {
        ProgressBar::hidden()
    } else {
        let pb = ProgressBar::new(pages as u64);
        pb.set_style(
            ProgressStyle::with_template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} pages {msg}",
            )?
            .progress_chars("=>-"),
        );
        pb.set_message(format!("{symbol} {timeframe}"));
        pb
    };

    let first = client
        .fetch_page(&PageRequest::latest(symbol.clone(), timeframe, page_size))
        .await
        .with_context(|| format!("Failed to fetch {symbol} {timeframe}"))?;

    let mut series = Series::new(settings.max_retained);
    series.set_all(normalize_batch(&first));
    if series.is_empty() {
        progress.abandon();
        bail!("No data for {symbol} {timeframe}");
    }
    progress.inc(1);

    let mut cursor = BackfillCursor::for_series(&series);
    for _ in 1..pages {
        let Some(offset) = cursor.begin(series.len(), page_size) else {
            break;
        };
        let request = PageRequest::new(symbol.clone(), timeframe, page_size, offset);
        let page = match client.fetch_page(&request).await {
            Ok(page) => page,
            Err(e) => {
                warn!(offset, error = %e, "page failed, stopping");
                cursor.fail();
                break;
            }
        };

        match cursor.apply(&mut series, &page) {
            BackfillOutcome::Exhausted => {
                progress.set_message(format!("{symbol} {timeframe} (no older data)"));
                break;
            }
            BackfillOutcome::Rejected { records } => {
                debug!(offset, records, "page had no valid bars");
            }
            BackfillOutcome::Loaded(outcome) => {
                debug!(offset, inserted = outcome.inserted, "page merged");
                if outcome.inserted == 0 {
                    break;
                }
            }
        }
        progress.inc(1);
    }

    progress.finish_with_message(format!(
        "{} bars, {} -> {}",
        series.len(),
        series.earliest_time().map_or_else(String::new, format_time),
        series.latest_time().map_or_else(String::new, format_time),
    ));

    let band_values = if bands {
        Some(settings.band_settings()?.compute(series.bars()))
    } else {
        None
    };
    let output = output.unwrap_or_else(|| default_output(&symbol, timeframe, format));
    let written = write_snapshot(&output, format, series.bars(), band_values.as_ref())?;

    if !quiet {
        for path in written {
            println!("Output written to: {}", path.display());
        }
    }

    Ok(())
}
