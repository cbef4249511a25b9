//! candlesync CLI - live OHLCV reconciliation with Bollinger Bands.

use anyhow::Result;
use candlesync_lib::prelude::*;
use clap::{CommandFactory, Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod display;
mod logging;
mod settings;

use commands::fetch::FetchArgs;
use commands::watch::WatchArgs;
use display::Format;
use settings::Settings;

#[derive(Parser)]
#[command(name = "candlesync")]
#[command(about = "Live OHLCV series reconciliation with Bollinger Bands", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Quiet mode (suppress progress output)
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Settings file (defaults to the platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Data service base URL
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Push channel WebSocket URL
    #[arg(long, global = true)]
    push_url: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Subscribe to a symbol and print live bars and bands
    Watch {
        /// Symbol (e.g., NSE_TCS). Prompts with the service's list if omitted.
        symbol: Option<String>,

        /// Timeframe (1m, 5m, 15m, 30m, 1h, 1d or a minute count)
        #[arg(short, long, default_value = "1m")]
        timeframe: Timeframe,

        /// Older pages to load after subscribing
        #[arg(long, default_value = "0")]
        history_pages: usize,

        /// Do not connect the push channel
        #[arg(long)]
        no_push: bool,

        /// Export the series and bands on exit, optionally to a path
        #[arg(short, long, num_args = 0..=1)]
        export: Option<Option<PathBuf>>,

        /// Export format
        #[arg(short, long, value_enum, default_value = "csv")]
        format: Format,
    },

    /// Download history for a symbol to a file
    Fetch {
        /// Symbol (e.g., NSE_TCS)
        symbol: String,

        /// Timeframe (1m, 5m, 15m, 30m, 1h, 1d or a minute count)
        #[arg(short, long, default_value = "1m")]
        timeframe: Timeframe,

        /// Maximum pages to fetch, newest first
        #[arg(short, long, default_value = "1")]
        pages: usize,

        /// Output file path. Defaults to <symbol>_<timeframe>.<format>
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "csv")]
        format: Format,

        /// Also write fast and slow Bollinger Bands
        #[arg(long)]
        bands: bool,
    },

    /// List symbols available on the data service
    Symbols {
        /// Filter by market (nse, snp, etf, crypto)
        #[arg(short, long)]
        market: Option<Market>,

        /// Search pattern
        #[arg(short, long)]
        search: Option<String>,

        /// List spreads instead of tables
        #[arg(long)]
        spreads: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Show help if no command provided
    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        return Ok(());
    };

    logging::init(cli.verbose, cli.quiet);

    let mut settings = Settings::load(cli.config.as_deref())?;
    if let Some(base_url) = cli.base_url {
        settings.base_url = base_url;
    }
    if let Some(push_url) = cli.push_url {
        settings.push_url = push_url;
    }

    match command {
        Commands::Watch {
            symbol,
            timeframe,
            history_pages,
            no_push,
            export,
            format,
        } => {
            let args = WatchArgs {
                symbol: symbol.map(Symbol::new),
                timeframe,
                history_pages,
                no_push,
                export,
                format,
            };
            commands::watch::watch(&settings, args, cli.quiet).await
        }
        Commands::Fetch {
            symbol,
            timeframe,
            pages,
            output,
            format,
            bands,
        } => {
            let args = FetchArgs {
                symbol: Symbol::new(symbol),
                timeframe,
                pages: pages.max(1),
                output,
                format,
                bands,
            };
            commands::fetch::fetch(&settings, args, cli.quiet).await
        }
        Commands::Symbols {
            market,
            search,
            spreads,
        } => {
            commands::symbols::list_symbols(&settings, market, search.as_deref(), spreads).await
        }
    }
}
