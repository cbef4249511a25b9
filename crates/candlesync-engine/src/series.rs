//! Ordered, deduplicated, bounded bar storage.

use candlesync_types::Bar;
use tracing::trace;

/// Default retention bound.
pub const DEFAULT_MAX_RETAINED: usize = 100_000;

/// Result of [`Series::upsert_many`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpsertOutcome {
    /// Bars inserted at a new time.
    pub appended: usize,
    /// Existing bars replaced with different values.
    pub changed: usize,
    /// Incoming bars identical to the stored bar.
    pub unchanged: usize,
    /// Oldest bars dropped to honour the retention bound.
    pub evicted: usize,
}

impl UpsertOutcome {
    /// Number of candles that need re-rendering.
    #[must_use]
    pub const fn changed_candles(&self) -> usize {
        self.appended + self.changed
    }

    /// Returns true if the series was not mutated.
    #[must_use]
    pub const fn is_noop(&self) -> bool {
        self.changed_candles() == 0 && self.evicted == 0
    }
}

/// Result of [`Series::prepend_older`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PrependOutcome {
    /// Bars merged into the series.
    pub inserted: usize,
    /// Incoming bars dropped because a bar with the same time exists.
    pub collisions: usize,
    /// Oldest bars dropped to honour the retention bound.
    pub evicted: usize,
}

/// A time series of bars for one symbol and timeframe.
///
/// Bars are kept strictly ascending by `time` with unique times. When the
/// length exceeds the retention bound the oldest bars are evicted.
#[derive(Debug, Clone)]
pub struct Series {
    bars: Vec<Bar>,
    max_retained: usize,
}

impl Default for Series {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_RETAINED)
    }
}

impl Series {
    /// Creates an empty series with the given retention bound.
    #[must_use]
    pub const fn new(max_retained: usize) -> Self {
        Self {
            bars: Vec::new(),
            max_retained,
        }
    }

    /// Replaces the whole series.
    ///
    /// Input is re-sorted; for equal times the later bar wins. Returns the
    /// number of bars evicted by the retention bound.
    pub fn set_all(&mut self, bars: impl IntoIterator<Item = Bar>) -> usize {
        let mut incoming: Vec<Bar> = bars.into_iter().collect();
        incoming.sort_by_key(|bar| bar.time);

        self.bars.clear();
        self.bars.reserve(incoming.len());
        for bar in incoming {
            match self.bars.last_mut() {
                Some(last) if last.time == bar.time => *last = bar,
                _ => self.bars.push(bar),
            }
        }
        self.enforce_retention()
    }

    /// Inserts or replaces bars by time.
    ///
    /// A bar at a new time is inserted; a bar at an existing time replaces
    /// the stored one only if any OHLCV field differs.
    pub fn upsert_many(&mut self, bars: &[Bar]) -> UpsertOutcome {
        let mut outcome = UpsertOutcome::default();

        for bar in bars {
            if self.bars.last().is_none_or(|last| last.time < bar.time) {
                self.bars.push(*bar);
                outcome.appended += 1;
                continue;
            }
            match self.bars.binary_search_by_key(&bar.time, |b| b.time) {
                Ok(i) if self.bars[i].same_values(bar) => outcome.unchanged += 1,
                Ok(i) => {
                    self.bars[i] = *bar;
                    outcome.changed += 1;
                }
                Err(i) => {
                    self.bars.insert(i, *bar);
                    outcome.appended += 1;
                }
            }
        }

        outcome.evicted = self.enforce_retention();
        trace!(?outcome, len = self.bars.len(), "upsert");
        outcome
    }

    /// Merges historical bars, keeping existing bars on time collisions.
    pub fn prepend_older(&mut self, bars: &[Bar]) -> PrependOutcome {
        let mut outcome = PrependOutcome::default();

        let mut fresh: Vec<Bar> = Vec::with_capacity(bars.len());
        for bar in bars {
            if self.bars.binary_search_by_key(&bar.time, |b| b.time).is_ok() {
                outcome.collisions += 1;
            } else {
                fresh.push(*bar);
            }
        }
        fresh.sort_by_key(|bar| bar.time);
        fresh.dedup_by(|later, earlier| {
            let duplicate = later.time == earlier.time;
            if duplicate {
                *earlier = *later;
            }
            duplicate
        });
        outcome.inserted = fresh.len();

        if !fresh.is_empty() {
            let existing = std::mem::take(&mut self.bars);
            self.bars = merge_sorted(fresh, existing);
        }

        outcome.evicted = self.enforce_retention();
        trace!(?outcome, len = self.bars.len(), "prepend");
        outcome
    }

    /// Looks up the bar for an inspection time.
    ///
    /// Returns the earliest bar within `tolerance` seconds of `target`; if
    /// none is that close, the bar nearest to `target` (ties go to the
    /// earlier bar). Returns `None` only for an empty series.
    #[must_use]
    pub fn find_nearest(&self, target: i64, tolerance: i64) -> Option<&Bar> {
        let start = self
            .bars
            .partition_point(|b| b.time < target.saturating_sub(tolerance));
        if let Some(bar) = self.bars.get(start)
            && (bar.time - target).abs() <= tolerance
        {
            return Some(bar);
        }

        let idx = self.bars.partition_point(|b| b.time < target);
        let before = idx.checked_sub(1).and_then(|i| self.bars.get(i));
        let after = self.bars.get(idx);
        match (before, after) {
            (Some(b), Some(a)) => {
                if (target - b.time) <= (a.time - target) {
                    Some(b)
                } else {
                    Some(a)
                }
            }
            (Some(b), None) => Some(b),
            (None, a) => a,
        }
    }

    /// Returns the bars in ascending time order.
    #[must_use]
    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    /// Returns the number of bars.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.bars.len()
    }

    /// Returns true if the series is empty.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// Returns the oldest bar.
    #[must_use]
    pub fn first(&self) -> Option<&Bar> {
        self.bars.first()
    }

    /// Returns the newest bar.
    #[must_use]
    pub fn last(&self) -> Option<&Bar> {
        self.bars.last()
    }

    /// Returns the time of the oldest bar.
    #[must_use]
    pub fn earliest_time(&self) -> Option<i64> {
        self.first().map(|b| b.time)
    }

    /// Returns the time of the newest bar.
    #[must_use]
    pub fn latest_time(&self) -> Option<i64> {
        self.last().map(|b| b.time)
    }

    /// Returns the retention bound.
    #[must_use]
    pub const fn max_retained(&self) -> usize {
        self.max_retained
    }

    /// Removes all bars.
    pub fn clear(&mut self) {
        self.bars.clear();
    }

    fn enforce_retention(&mut self) -> usize {
        let excess = self.bars.len().saturating_sub(self.max_retained);
        if excess > 0 {
            self.bars.drain(..excess);
        }
        excess
    }
}

/// Merges two time-sorted vectors with disjoint times.
fn merge_sorted(a: Vec<Bar>, b: Vec<Bar>) -> Vec<Bar> {
    let mut merged = Vec::with_capacity(a.len() + b.len());
    let mut a = a.into_iter().peekable();
    let mut b = b.into_iter().peekable();
    loop {
        let take_a = match (a.peek(), b.peek()) {
            (Some(x), Some(y)) => x.time < y.time,
            (Some(_), None) => true,
            (None, Some(_)) => false,
            (None, None) => break,
        };
        let next = if take_a { a.next() } else { b.next() };
        merged.extend(next);
    }
    merged
}
