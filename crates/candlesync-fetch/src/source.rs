//! The page-oriented OHLCV source abstraction.

use async_trait::async_trait;
use candlesync_types::{RawBar, Symbol, Timeframe};
use serde::{Deserialize, Serialize};

use crate::FetchError;

/// One page of bars, counted back from the most recent.
///
/// `offset` 0 with `limit` 1000 asks for the latest 1000 bars; offset 1000
/// for the 1000 before those.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PageRequest {
    /// Symbol to fetch.
    pub symbol: Symbol,
    /// Bar timeframe.
    pub timeframe: Timeframe,
    /// Maximum number of bars.
    pub limit: usize,
    /// Number of most recent bars to skip.
    pub offset: usize,
}

impl PageRequest {
    /// Creates a page request.
    #[must_use]
    pub const fn new(symbol: Symbol, timeframe: Timeframe, limit: usize, offset: usize) -> Self {
        Self {
            symbol,
            timeframe,
            limit,
            offset,
        }
    }

    /// Requests the most recent `limit` bars.
    #[must_use]
    pub const fn latest(symbol: Symbol, timeframe: Timeframe, limit: usize) -> Self {
        Self::new(symbol, timeframe, limit, 0)
    }
}

/// A source of historical OHLCV pages.
///
/// Records are returned as delivered; normalization happens downstream.
#[async_trait]
pub trait OhlcvSource: Send + Sync {
    /// Fetches one page of raw bars.
    ///
    /// # Errors
    ///
    /// Returns a [`FetchError`] on transport, status or decoding failure.
    async fn fetch_page(&self, request: &PageRequest) -> Result<Vec<RawBar>, FetchError>;
}

#[async_trait]
impl<T: OhlcvSource + ?Sized> OhlcvSource for std::sync::Arc<T> {
    async fn fetch_page(&self, request: &PageRequest) -> Result<Vec<RawBar>, FetchError> {
        (**self).fetch_page(request).await
    }
}
