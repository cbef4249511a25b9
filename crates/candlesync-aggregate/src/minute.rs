//! Streaming tick-to-minute-bar aggregation.

use candlesync_types::Bar;
use tracing::trace;

/// Width of an aggregation bucket in seconds.
pub const MINUTE_SECONDS: i64 = 60;

/// Returns the start of the minute bucket containing `time`.
#[must_use]
pub const fn minute_bucket(time: i64) -> i64 {
    time.div_euclid(MINUTE_SECONDS) * MINUTE_SECONDS
}

/// Result of feeding one tick to a [`MinuteAggregator`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickOutcome {
    /// The aggregator was idle; a new pending bar was started.
    Started(Bar),
    /// The pending bar was updated in place.
    Updated(Bar),
    /// The tick belongs to a later minute: `flushed` is complete and
    /// `started` is the new pending bar.
    Rolled {
        /// The completed bar for the previous minute.
        flushed: Bar,
        /// The new pending bar.
        started: Bar,
    },
    /// The tick was dropped (non-finite price or an already closed minute).
    Ignored,
}

impl TickOutcome {
    /// Returns the bar completed by this tick, if any.
    #[must_use]
    pub const fn flushed(&self) -> Option<Bar> {
        match self {
            Self::Rolled { flushed, .. } => Some(*flushed),
            _ => None,
        }
    }

    /// Returns the pending bar after this tick, if it changed.
    #[must_use]
    pub const fn pending(&self) -> Option<Bar> {
        match self {
            Self::Started(bar) | Self::Updated(bar) => Some(*bar),
            Self::Rolled { started, .. } => Some(*started),
            Self::Ignored => None,
        }
    }
}

/// Streaming LTP aggregator.
///
/// Idle until the first tick, then accumulates one pending bar per minute
/// bucket. Volume of synthetic bars is always zero. Once a minute has been
/// flushed, ticks for it or any earlier minute are ignored.
#[derive(Debug, Default)]
pub struct MinuteAggregator {
    pending: Option<PendingMinute>,
    last_flushed: Option<i64>,
}

impl MinuteAggregator {
    /// Creates an idle aggregator.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            pending: None,
            last_flushed: None,
        }
    }

    /// Returns true if no bar is pending.
    #[must_use]
    pub const fn is_idle(&self) -> bool {
        self.pending.is_none()
    }

    /// Returns a snapshot of the pending bar.
    #[must_use]
    pub fn pending(&self) -> Option<Bar> {
        self.pending.as_ref().map(PendingMinute::to_bar)
    }

    /// Processes a tick at `price` observed at `time` (epoch seconds).
    pub fn on_tick(&mut self, price: f64, time: i64) -> TickOutcome {
        if !price.is_finite() {
            return TickOutcome::Ignored;
        }
        let bucket = minute_bucket(time);
        if self.last_flushed.is_some_and(|closed| bucket <= closed) {
            trace!(tick_bucket = bucket, "tick for closed minute ignored");
            return TickOutcome::Ignored;
        }

        match self.pending.as_mut() {
            None => {
                let started = PendingMinute::new(bucket, price);
                let bar = started.to_bar();
                self.pending = Some(started);
                TickOutcome::Started(bar)
            }
            Some(pending) if pending.bucket == bucket => {
                pending.update(price);
                TickOutcome::Updated(pending.to_bar())
            }
            Some(pending) if pending.bucket < bucket => {
                let flushed = pending.to_bar();
                trace!(bucket = flushed.time, ticks = pending.tick_count, "minute rolled");
                *pending = PendingMinute::new(bucket, price);
                self.last_flushed = Some(flushed.time);
                TickOutcome::Rolled {
                    flushed,
                    started: pending.to_bar(),
                }
            }
            Some(pending) => {
                trace!(tick_bucket = bucket, pending_bucket = pending.bucket, "late tick ignored");
                TickOutcome::Ignored
            }
        }
    }

    /// Flushes the pending bar if its minute has fully elapsed at `now`.
    ///
    /// Returns the flushed bar; the aggregator is idle afterwards.
    pub fn flush_if_stale(&mut self, now: i64) -> Option<Bar> {
        let stale = self
            .pending
            .as_ref()
            .is_some_and(|p| now >= p.bucket + MINUTE_SECONDS);
        if stale { self.flush() } else { None }
    }

    /// Flushes the pending bar unconditionally.
    pub fn flush(&mut self) -> Option<Bar> {
        let bar = self.pending.take().map(|p| p.to_bar())?;
        self.last_flushed = Some(bar.time);
        Some(bar)
    }

    /// Returns the start of the most recently flushed minute.
    #[must_use]
    pub const fn last_flushed(&self) -> Option<i64> {
        self.last_flushed
    }

    /// Discards any pending bar without flushing it and forgets closed
    /// minutes.
    ///
    /// Returns the abandoned bar, if there was one.
    pub fn reset(&mut self) -> Option<Bar> {
        self.last_flushed = None;
        self.pending.take().map(|p| p.to_bar())
    }
}

/// In-progress minute bar.
#[derive(Debug)]
struct PendingMinute {
    bucket: i64,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    tick_count: u32,
}

impl PendingMinute {
    const fn new(bucket: i64, price: f64) -> Self {
        Self {
            bucket,
            open: price,
            high: price,
            low: price,
            close: price,
            tick_count: 1,
        }
    }

    fn update(&mut self, price: f64) {
        self.high = self.high.max(price);
        self.low = self.low.min(price);
        self.close = price;
        self.tick_count += 1;
    }

    const fn to_bar(&self) -> Bar {
        Bar::new(self.bucket, self.open, self.high, self.low, self.close, 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const T: i64 = 1_700_000_040;

    #[test]
    fn test_ticks_within_minute_build_one_bar() {
        let mut agg = MinuteAggregator::new();

        assert!(matches!(agg.on_tick(100.0, T), TickOutcome::Started(_)));
        assert!(matches!(agg.on_tick(105.0, T + 20), TickOutcome::Updated(_)));
        let outcome = agg.on_tick(98.0, T + 59);

        let bar = outcome.pending().unwrap();
        assert_eq!(bar, Bar::new(T, 100.0, 105.0, 98.0, 98.0, 0.0));
        assert!(outcome.flushed().is_none());
    }

    #[test]
    fn test_later_minute_flushes_and_restarts() {
        let mut agg = MinuteAggregator::new();
        agg.on_tick(100.0, T);
        agg.on_tick(105.0, T + 10);
        agg.on_tick(98.0, T + 30);

        let outcome = agg.on_tick(101.0, T + 61);
        assert_eq!(
            outcome.flushed(),
            Some(Bar::new(T, 100.0, 105.0, 98.0, 98.0, 0.0))
        );
        assert_eq!(agg.pending(), Some(Bar::flat(T + 60, 101.0)));
    }

    #[test]
    fn test_bucket_is_floor_of_minute() {
        assert_eq!(minute_bucket(T + 59), T);
        assert_eq!(minute_bucket(T + 60), T + 60);
        assert_eq!(minute_bucket(-1), -60);

        let mut agg = MinuteAggregator::new();
        agg.on_tick(1.0, T + 17);
        assert_eq!(agg.pending().unwrap().time, T);
    }

    #[test]
    fn test_stale_flush_only_after_minute_elapsed() {
        let mut agg = MinuteAggregator::new();
        agg.on_tick(100.0, T + 5);

        assert!(agg.flush_if_stale(T + 59).is_none());
        assert!(!agg.is_idle());

        let flushed = agg.flush_if_stale(T + 60).unwrap();
        assert_eq!(flushed, Bar::flat(T, 100.0));
        assert!(agg.is_idle());
        assert!(agg.flush_if_stale(T + 600).is_none());
    }

    #[test]
    fn test_late_and_invalid_ticks_ignored() {
        let mut agg = MinuteAggregator::new();
        agg.on_tick(100.0, T + 60);

        assert_eq!(agg.on_tick(90.0, T), TickOutcome::Ignored);
        assert_eq!(agg.on_tick(f64::NAN, T + 61), TickOutcome::Ignored);
        assert_eq!(agg.pending(), Some(Bar::flat(T + 60, 100.0)));
    }

    #[test]
    fn test_tick_for_flushed_minute_ignored() {
        let mut agg = MinuteAggregator::new();
        agg.on_tick(100.0, T);
        agg.on_tick(120.0, T + 10);
        agg.on_tick(90.0, T + 20);
        assert_eq!(
            agg.flush_if_stale(T + 60),
            Some(Bar::new(T, 100.0, 120.0, 90.0, 90.0, 0.0))
        );
        assert_eq!(agg.last_flushed(), Some(T));

        assert_eq!(agg.on_tick(101.0, T + 50), TickOutcome::Ignored);
        assert!(agg.is_idle());

        let outcome = agg.on_tick(102.0, T + 61);
        assert!(matches!(outcome, TickOutcome::Started(_)));
        assert!(outcome.flushed().is_none());
    }

    #[test]
    fn test_tick_for_rolled_minute_ignored() {
        let mut agg = MinuteAggregator::new();
        agg.on_tick(100.0, T);
        agg.on_tick(101.0, T + 60);
        agg.flush_if_stale(T + 120);

        assert_eq!(agg.on_tick(99.0, T + 30), TickOutcome::Ignored);
        assert_eq!(agg.on_tick(99.0, T + 90), TickOutcome::Ignored);
        assert!(agg.is_idle());
    }

    #[test]
    fn test_reset_discards_pending() {
        let mut agg = MinuteAggregator::new();
        agg.on_tick(100.0, T);

        agg.on_tick(101.0, T + 60);

        assert_eq!(agg.reset(), Some(Bar::flat(T + 60, 101.0)));
        assert!(agg.is_idle());
        assert_eq!(agg.last_flushed(), None);
        assert!(matches!(agg.on_tick(50.0, T + 1), TickOutcome::Started(_)));
    }
}
