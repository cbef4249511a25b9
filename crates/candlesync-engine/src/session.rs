//! Subscription sessions.

use candlesync_aggregate::MinuteAggregator;
use candlesync_types::{Symbol, Timeframe};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::{BackfillCursor, Series};

/// Identity of one subscription lifetime.
pub type SessionId = Uuid;

/// Lifecycle phase of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Initial page requested, nothing stored yet.
    Loading,
    /// Series loaded and receiving live updates.
    Live,
}

/// All state owned by one subscription.
///
/// Created on subscribe and dropped on unsubscribe, so nothing from an old
/// symbol outlives the switch. Work spawned for the session is bound to its
/// cancellation token.
#[derive(Debug)]
pub struct Session {
    id: SessionId,
    symbol: Symbol,
    timeframe: Timeframe,
    phase: SessionPhase,
    pub(crate) series: Series,
    pub(crate) cursor: BackfillCursor,
    pub(crate) aggregator: MinuteAggregator,
    token: CancellationToken,
}

impl Session {
    /// Creates a session in the loading phase.
    #[must_use]
    pub fn new(symbol: Symbol, timeframe: Timeframe, max_retained: usize) -> Self {
        Self {
            id: Uuid::new_v4(),
            symbol,
            timeframe,
            phase: SessionPhase::Loading,
            series: Series::new(max_retained),
            cursor: BackfillCursor::default(),
            aggregator: MinuteAggregator::new(),
            token: CancellationToken::new(),
        }
    }

    /// Returns the session id.
    #[must_use]
    pub const fn id(&self) -> SessionId {
        self.id
    }

    /// Returns the subscribed symbol.
    #[must_use]
    pub const fn symbol(&self) -> &Symbol {
        &self.symbol
    }

    /// Returns the subscribed timeframe.
    #[must_use]
    pub const fn timeframe(&self) -> Timeframe {
        self.timeframe
    }

    /// Returns the lifecycle phase.
    #[must_use]
    pub const fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Returns true once the initial page has been stored.
    #[must_use]
    pub fn is_live(&self) -> bool {
        self.phase == SessionPhase::Live
    }

    /// Returns the stored series.
    #[must_use]
    pub const fn series(&self) -> &Series {
        &self.series
    }

    /// Returns the backfill cursor.
    #[must_use]
    pub const fn cursor(&self) -> &BackfillCursor {
        &self.cursor
    }

    /// Returns the minute aggregator.
    #[must_use]
    pub const fn aggregator(&self) -> &MinuteAggregator {
        &self.aggregator
    }

    /// Returns the session's cancellation token.
    #[must_use]
    pub const fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub(crate) fn go_live(&mut self) {
        self.phase = SessionPhase::Live;
    }

    /// Cancels in-flight work and clears all session data.
    pub(crate) fn close(&mut self) {
        self.token.cancel();
        self.aggregator.reset();
        self.series.clear();
        self.cursor = BackfillCursor::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use candlesync_types::Bar;

    #[test]
    fn test_sessions_have_distinct_ids() {
        let a = Session::new(Symbol::new("NSE_TCS"), Timeframe::Minute1, 10);
        let b = Session::new(Symbol::new("NSE_TCS"), Timeframe::Minute1, 10);
        assert_ne!(a.id(), b.id());
        assert_eq!(a.phase(), SessionPhase::Loading);
    }

    #[test]
    fn test_close_cancels_and_clears() {
        let mut session = Session::new(Symbol::new("NSE_TCS"), Timeframe::Minute1, 10);
        session.series.set_all(vec![Bar::flat(0, 1.0)]);
        session.aggregator.on_tick(1.0, 30);
        let token = session.token().clone();

        session.close();
        assert!(token.is_cancelled());
        assert!(session.series().is_empty());
        assert!(session.aggregator().is_idle());
    }
}
