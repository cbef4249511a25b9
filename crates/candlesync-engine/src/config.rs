//! Engine configuration.

use candlesync_indicators::BandSettings;
use std::time::Duration;

use crate::{BackfillTrigger, series::DEFAULT_MAX_RETAINED};

/// Configuration for the subscription controller and its runtime.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Retention bound of the series.
    pub max_retained: usize,
    /// Bars requested on subscribe.
    pub initial_page_size: usize,
    /// Bars per backfill page.
    pub backfill_page_size: usize,
    /// Bars requested per data-pull.
    pub pull_page_size: usize,
    /// Bars requested by a refresh.
    pub refresh_page_size: usize,
    /// Inspection lookup tolerance in seconds.
    pub nearest_tolerance: i64,
    /// Backfill trigger policy.
    pub backfill_trigger: BackfillTrigger,
    /// Debounce for backfill triggers.
    pub backfill_debounce: Duration,
    /// Debounce for band recomputation.
    pub band_debounce: Duration,
    /// Period of the stale minute-bar check.
    pub minute_timer: Duration,
    /// Band parameters.
    pub bands: BandSettings,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_retained: DEFAULT_MAX_RETAINED,
            initial_page_size: 1000,
            backfill_page_size: 1000,
            pull_page_size: 100,
            refresh_page_size: 1000,
            nearest_tolerance: 60,
            backfill_trigger: BackfillTrigger::default(),
            backfill_debounce: Duration::from_millis(100),
            band_debounce: Duration::from_millis(200),
            minute_timer: Duration::from_secs(60),
            bands: BandSettings::default(),
        }
    }
}

impl EngineConfig {
    /// Sets the retention bound.
    #[must_use]
    pub const fn with_max_retained(mut self, max_retained: usize) -> Self {
        self.max_retained = max_retained;
        self
    }

    /// Sets the initial and backfill page sizes.
    #[must_use]
    pub const fn with_page_size(mut self, page_size: usize) -> Self {
        self.initial_page_size = page_size;
        self.backfill_page_size = page_size;
        self
    }

    /// Sets the band parameters.
    #[must_use]
    pub const fn with_bands(mut self, bands: BandSettings) -> Self {
        self.bands = bands;
        self
    }

    /// Sets both debounce delays.
    #[must_use]
    pub const fn with_debounce(mut self, backfill: Duration, bands: Duration) -> Self {
        self.backfill_debounce = backfill;
        self.band_debounce = bands;
        self
    }

    /// Sets the stale minute-bar check period.
    #[must_use]
    pub const fn with_minute_timer(mut self, period: Duration) -> Self {
        self.minute_timer = period;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use candlesync_indicators::BandParams;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.max_retained, 100_000);
        assert_eq!(config.initial_page_size, 1000);
        assert_eq!(config.pull_page_size, 100);
        assert_eq!(config.nearest_tolerance, 60);
        assert_eq!(config.backfill_debounce, Duration::from_millis(100));
        assert_eq!(config.band_debounce, Duration::from_millis(200));
        assert_eq!(config.bands.fast, BandParams::fast());
    }

    #[test]
    fn test_builder() {
        let config = EngineConfig::default()
            .with_max_retained(500)
            .with_page_size(50)
            .with_minute_timer(Duration::from_secs(1));
        assert_eq!(config.max_retained, 500);
        assert_eq!(config.initial_page_size, 50);
        assert_eq!(config.backfill_page_size, 50);
        assert_eq!(config.minute_timer, Duration::from_secs(1));
    }
}
