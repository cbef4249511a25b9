//! Historical backfill paging and trigger policy.

use candlesync_types::{RawBar, normalize_batch};
use tracing::debug;

use crate::{PrependOutcome, Series};

/// Paging state of the historical backfill for one session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BackfillCursor {
    /// Offset of the last requested page.
    pub offset: usize,
    /// Time of the oldest stored bar.
    pub earliest_loaded_time: Option<i64>,
    /// Time of the newest stored bar.
    pub latest_loaded_time: Option<i64>,
    /// An empty page was returned; no older data exists.
    pub exhausted: bool,
    /// A page request is in flight.
    pub loading: bool,
}

/// Result of applying a backfill page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackfillOutcome {
    /// Bars were merged into the series.
    Loaded(PrependOutcome),
    /// The page was empty; backfill is finished for this session.
    Exhausted,
    /// The page had records but none survived normalization.
    Rejected {
        /// Records in the page.
        records: usize,
    },
}

impl BackfillCursor {
    /// Creates a cursor positioned on a freshly loaded series.
    #[must_use]
    pub fn for_series(series: &Series) -> Self {
        let mut cursor = Self::default();
        cursor.sync(series);
        cursor
    }

    /// Refreshes the loaded-time bounds from the series.
    pub fn sync(&mut self, series: &Series) {
        self.earliest_loaded_time = series.earliest_time();
        self.latest_loaded_time = series.latest_time();
    }

    /// Returns true if another page may be requested.
    #[must_use]
    pub const fn can_load(&self) -> bool {
        !self.loading && !self.exhausted
    }

    /// Starts a page load and returns its offset.
    ///
    /// The offset is the series length rounded down to a whole page. Returns
    /// `None` while a page is already loading or once backfill is exhausted;
    /// the request is dropped, not queued.
    pub fn begin(&mut self, series_len: usize, page_size: usize) -> Option<usize> {
        if !self.can_load() || page_size == 0 {
            return None;
        }
        self.loading = true;
        self.offset = series_len / page_size * page_size;
        Some(self.offset)
    }

    /// Applies a fetched page to `series`.
    pub fn apply(&mut self, series: &mut Series, page: &[RawBar]) -> BackfillOutcome {
        self.loading = false;

        if page.is_empty() {
            self.exhausted = true;
            debug!(offset = self.offset, "backfill exhausted");
            return BackfillOutcome::Exhausted;
        }

        let bars = normalize_batch(page);
        if bars.is_empty() {
            return BackfillOutcome::Rejected {
                records: page.len(),
            };
        }

        let outcome = series.prepend_older(&bars);
        self.sync(series);
        debug!(
            offset = self.offset,
            inserted = outcome.inserted,
            collisions = outcome.collisions,
            earliest = ?self.earliest_loaded_time,
            "backfill page applied"
        );
        BackfillOutcome::Loaded(outcome)
    }

    /// Records a failed page load. `exhausted` is left untouched so that the
    /// next trigger retries.
    pub fn fail(&mut self) {
        self.loading = false;
    }
}

/// Visible time window of a consumer, in epoch seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisibleRange {
    /// Left edge.
    pub from: i64,
    /// Right edge.
    pub to: i64,
}

impl VisibleRange {
    /// Creates a visible range.
    #[must_use]
    pub const fn new(from: i64, to: i64) -> Self {
        Self { from, to }
    }

    /// Returns the span in seconds.
    #[must_use]
    pub const fn span(&self) -> i64 {
        self.to.saturating_sub(self.from)
    }
}

/// Decides when scrolling toward older data should load another page.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackfillTrigger {
    /// Minimum buffer in seconds.
    pub buffer_floor: i64,
    /// Buffer as a fraction of the visible span.
    pub buffer_ratio: f64,
}

impl Default for BackfillTrigger {
    fn default() -> Self {
        Self {
            buffer_floor: 600,
            buffer_ratio: 0.05,
        }
    }
}

impl BackfillTrigger {
    /// Returns the buffer for a visible range.
    #[must_use]
    pub fn buffer(&self, range: VisibleRange) -> i64 {
        let proportional = (range.span() as f64 * self.buffer_ratio) as i64;
        self.buffer_floor.max(proportional)
    }

    /// Returns true if the left edge is within the buffer of the earliest
    /// loaded bar. Never fires in live mode.
    #[must_use]
    pub fn should_load(&self, range: VisibleRange, earliest: Option<i64>, live_mode: bool) -> bool {
        if live_mode {
            return false;
        }
        earliest.is_some_and(|earliest| range.from <= earliest.saturating_add(self.buffer(range)))
    }
}
