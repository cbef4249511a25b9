//! Real-time OHLCV reconciliation with Bollinger Bands.
//!
//! This is a facade crate that re-exports functionality from the candlesync
//! workspace crates for convenient access.
//!
//! # Quick Start
//!
//! ```ignore
//! use candlesync_lib::prelude::*;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let source = Arc::new(OhlcvClient::with_defaults()?);
//!     let push = PushClient::new(PushConfig::default()).start();
//!     let mut engine = EngineRuntime::new(EngineConfig::default(), source)
//!         .spawn(Some(push), CancellationToken::new());
//!
//!     engine
//!         .commands
//!         .send(EngineCommand::Subscribe {
//!             symbol: Symbol::new("NSE_TCS"),
//!             timeframe: Timeframe::Minute1,
//!         })
//!         .await?;
//!
//!     while let Some(event) = engine.events.recv().await {
//!         if let EngineEvent::BandsUpdated { bands, .. } = event {
//!             println!("{} fast band points", bands.fast.len());
//!         }
//!     }
//!     Ok(())
//! }
//! ```

#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Re-export core types
pub use candlesync_types::*;

// Re-export aggregation and indicators
pub use candlesync_aggregate::{MinuteAggregator, TickOutcome, minute_bucket};
pub use candlesync_indicators::{
    BandParams, BandPoint, BandSettings, Bands, IndicatorError, bollinger_bands,
};

// Re-export fetch functionality
#[cfg(feature = "fetch")]
pub use candlesync_fetch::{
    ClientConfig, ClientMessage, ConnectionStatus, FetchError, OhlcvClient, OhlcvSource,
    PageRequest, PushClient, PushConfig, PushError, PushEvent, PushHandle,
};

// Re-export the engine
#[cfg(feature = "engine")]
pub use candlesync_engine::{
    BackfillCursor, BackfillOutcome, EngineCommand, EngineConfig, EngineError, EngineEvent,
    EngineHandle, EngineRuntime, Series, SessionId, SubscriptionController, SubscriptionState,
    VisibleRange,
};

// Re-export formatters
#[cfg(feature = "format")]
pub use candlesync_format::{
    CsvFormatter, FormatError, Formatter, JsonFormatter, OutputFormat, export_bands, export_bars,
};

#[cfg(all(feature = "format", feature = "parquet"))]
pub use candlesync_format::ParquetFormatter;

/// Prelude module for convenient imports.
///
/// ```
/// use candlesync_lib::prelude::*;
/// ```
pub mod prelude {
    pub use candlesync_types::{Bar, Exchange, LtpUpdate, Market, RawBar, Symbol, Timeframe};

    pub use candlesync_indicators::{BandParams, BandSettings, Bands};

    #[cfg(feature = "fetch")]
    pub use candlesync_fetch::{OhlcvClient, OhlcvSource, PushClient, PushConfig};

    #[cfg(feature = "engine")]
    pub use candlesync_engine::{
        EngineCommand, EngineConfig, EngineEvent, EngineRuntime, SubscriptionController,
    };

    #[cfg(feature = "engine")]
    pub use tokio_util::sync::CancellationToken;

    #[cfg(feature = "format")]
    pub use candlesync_format::{Formatter, OutputFormat, export_bands, export_bars};
}
