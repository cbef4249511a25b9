//! Events produced by the engine and the work it asks to run.

use candlesync_fetch::{ClientMessage, PageRequest};
use candlesync_indicators::Bands;
use candlesync_types::{Bar, Symbol, Timeframe};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::SessionId;

/// A notification for consumers of the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// The initial page was stored and the session is live.
    Subscribed {
        /// Session id.
        session: SessionId,
        /// Subscribed symbol.
        symbol: Symbol,
        /// Subscribed timeframe.
        timeframe: Timeframe,
        /// Bars stored.
        bars: usize,
    },
    /// The initial load failed or returned nothing usable.
    SubscribeFailed {
        /// Requested symbol.
        symbol: Symbol,
        /// Requested timeframe.
        timeframe: Timeframe,
        /// Failure description.
        reason: String,
    },
    /// The session for `symbol` ended.
    Unsubscribed {
        /// Symbol that was active.
        symbol: Symbol,
    },
    /// Snapshot of the series after a change.
    SeriesUpdated {
        /// Session id.
        session: SessionId,
        /// All stored bars, ascending.
        bars: Arc<[Bar]>,
    },
    /// Live data added or changed candles.
    CandlesChanged {
        /// Session id.
        session: SessionId,
        /// Appended plus replaced candles.
        count: usize,
    },
    /// Bands recomputed over the current series.
    BandsUpdated {
        /// Session id.
        session: SessionId,
        /// Fast and slow band points.
        bands: Bands,
    },
    /// The in-progress minute bar changed.
    PendingBar {
        /// Session id.
        session: SessionId,
        /// Pending bar snapshot.
        bar: Bar,
    },
    /// Last traded price for the active symbol.
    Ltp {
        /// Symbol.
        symbol: Symbol,
        /// Price.
        price: f64,
        /// Tick time (epoch seconds).
        time: i64,
    },
    /// An older page was merged.
    BackfillLoaded {
        /// Session id.
        session: SessionId,
        /// Bars added.
        inserted: usize,
        /// New earliest stored time.
        earliest: Option<i64>,
    },
    /// No older data is available for this session.
    BackfillExhausted {
        /// Session id.
        session: SessionId,
    },
    /// A backfill page failed; the next trigger retries.
    BackfillFailed {
        /// Session id.
        session: SessionId,
        /// Failure description.
        reason: String,
    },
    /// Data-pull mode toggled.
    DataPull {
        /// New state.
        enabled: bool,
    },
    /// A message for the push channel.
    Push(ClientMessage),
}

/// Why a page is being fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchKind {
    /// Initial load of a new session.
    Initial,
    /// Older history.
    Backfill,
    /// Latest bars requested by data-pull mode.
    Pull,
    /// Latest bars requested by a manual refresh.
    Refresh,
}

/// A page fetch requested by the controller on behalf of a session.
///
/// The result must be handed back with the same task so that it can be
/// checked against the active session.
#[derive(Debug, Clone)]
pub struct FetchTask {
    /// Requesting session.
    pub session: SessionId,
    /// Purpose of the fetch.
    pub kind: FetchKind,
    /// Page to fetch.
    pub request: PageRequest,
    /// Cancelled when the session ends.
    pub cancel: CancellationToken,
}
