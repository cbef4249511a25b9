//! Watch command implementation.
//!
//! Subscribes the engine to one symbol and prints reconciled bars and band
//! values as they change, until interrupted.

use crate::display::{Format, default_output, describe, write_snapshot};
use crate::settings::Settings;
use anyhow::{Context, Result, bail};
use candlesync_lib::prelude::*;
use indicatif::{ProgressBar, ProgressStyle};
use inquire::Select;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Options for [`watch`].
#[derive(Debug)]
pub(crate) struct WatchArgs {
    pub(crate) symbol: Option<Symbol>,
    pub(crate) timeframe: Timeframe,
    pub(crate) history_pages: usize,
    pub(crate) no_push: bool,
    /// `Some(None)` exports to the default path on exit.
    pub(crate) export: Option<Option<PathBuf>>,
    pub(crate) format: Format,
}

#[derive(Debug, Default)]
struct Snapshot {
    bars: Arc<[Bar]>,
    bands: Option<Bands>,
}

/// Runs the engine for one symbol until Ctrl-C.
pub(crate) async fn watch(settings: &Settings, args: WatchArgs, quiet: bool) -> Result<()> {
    let source = Arc::new(OhlcvClient::new(settings.client_config())?);

    let symbol = match args.symbol {
        Some(symbol) => symbol,
        None => pick_symbol(&source).await?,
    };
    let timeframe = args.timeframe;

    let push = (!args.no_push).then(|| PushClient::new(settings.push_config()).start());
    let shutdown = CancellationToken::new();
    let mut engine = EngineRuntime::new(settings.engine_config()?, source)
        .spawn(push, shutdown.clone());

    let spinner = if quiet {
        ProgressBar::hidden()
    } else {
        let pb = ProgressBar::new_spinner();
        pb.set_style(ProgressStyle::with_template("{spinner:.green} {msg}")?);
        pb.set_message(format!("Loading {symbol} {timeframe}"));
        pb.enable_steady_tick(Duration::from_millis(100));
        pb
    };

    engine
        .commands
        .send(EngineCommand::Subscribe {
            symbol: symbol.clone(),
            timeframe,
        })
        .await
        .context("Engine stopped before subscribing")?;

    let mut remaining_pages = args.history_pages;
    let mut snapshot = Snapshot::default();
    let mut failure = None;

    loop {
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                result.context("Failed to listen for Ctrl-C")?;
                info!("interrupted");
                break;
            }
            event = engine.events.recv() => {
                let Some(event) = event else { break };

                match &event {
                    EngineEvent::Subscribed { .. } => spinner.finish_and_clear(),
                    EngineEvent::SubscribeFailed { reason, .. } => {
                        spinner.finish_and_clear();
                        failure = Some(reason.clone());
                        break;
                    }
                    EngineEvent::SeriesUpdated { bars, .. } => snapshot.bars = Arc::clone(bars),
                    EngineEvent::BandsUpdated { bands, .. } => snapshot.bands = Some(bands.clone()),
                    _ => {}
                }

                let wants_page = matches!(
                    event,
                    EngineEvent::Subscribed { .. } | EngineEvent::BackfillLoaded { .. }
                );
                if wants_page && remaining_pages > 0 {
                    remaining_pages -= 1;
                    engine.commands.send(EngineCommand::LoadMore).await?;
                }
                if matches!(event, EngineEvent::BackfillExhausted { .. }) {
                    remaining_pages = 0;
                }

                if !quiet && let Some(line) = describe(&event, snapshot.bars.last()) {
                    println!("{line}");
                }
            }
        }
    }

    shutdown.cancel();
    engine.task.await.context("Engine task panicked")?;

    if let Some(reason) = failure {
        bail!("Subscribe {symbol} {timeframe} failed: {reason}");
    }

    if let Some(output) = args.export {
        let output = output.unwrap_or_else(|| default_output(&symbol, timeframe, args.format));
        let written = write_snapshot(&output, args.format, &snapshot.bars, snapshot.bands.as_ref())?;
        if !quiet {
            for path in written {
                println!("Output written to: {}", path.display());
            }
        }
    }

    Ok(())
}

async fn pick_symbol(client: &Arc<OhlcvClient>) -> Result<Symbol> {
    let symbols = client
        .fetch_tables()
        .await
        .context("Failed to fetch symbol list")?;
    if symbols.is_empty() {
        bail!("The data service returned no symbols");
    }

    tokio::task::spawn_blocking(move || {
        Select::new("Symbol:", symbols)
            .with_page_size(15)
            .prompt()
            .context("No symbol selected")
    })
    .await?
}
