//! Engine error types.

use candlesync_fetch::FetchError;
use candlesync_types::Symbol;
use thiserror::Error;

use crate::SessionId;

/// Errors reported by the subscription controller.
#[derive(Error, Debug)]
pub enum EngineError {
    /// The initial page held no usable bars.
    #[error("no data for {symbol}")]
    EmptyResponse {
        /// Requested symbol.
        symbol: Symbol,
    },

    /// A response arrived for a session that is no longer active.
    #[error("stale response for session {session}")]
    StaleResponse {
        /// Session the response belongs to.
        session: SessionId,
    },

    /// The operation needs an active subscription.
    #[error("not subscribed")]
    NotSubscribed,

    /// Fetching from the data service failed.
    #[error(transparent)]
    Fetch(#[from] FetchError),
}

impl EngineError {
    /// Returns true for responses that were discarded as stale.
    #[must_use]
    pub const fn is_stale(&self) -> bool {
        matches!(self, Self::StaleResponse { .. })
    }
}
