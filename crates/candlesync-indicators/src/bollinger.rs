//! Bollinger Bands over a bar series.

use candlesync_types::Bar;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Smallest accepted band period.
pub const MIN_PERIOD: usize = 10;
/// Largest accepted band period.
pub const MAX_PERIOD: usize = 500;
/// Smallest accepted standard-deviation multiplier.
pub const MIN_MULTIPLIER: f64 = 0.1;
/// Largest accepted standard-deviation multiplier.
pub const MAX_MULTIPLIER: f64 = 10.0;

/// Errors raised when configuring an indicator.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum IndicatorError {
    /// Period or multiplier outside the accepted range.
    #[error(
        "invalid band parameters: period {period} (expected {MIN_PERIOD}..={MAX_PERIOD}), \
         multiplier {multiplier} (expected {MIN_MULTIPLIER}..={MAX_MULTIPLIER})"
    )]
    InvalidParams {
        /// Requested period.
        period: usize,
        /// Requested multiplier.
        multiplier: f64,
    },
}

/// Window length and envelope width of one band.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BandParams {
    period: usize,
    std_dev_multiplier: f64,
}

impl BandParams {
    /// Creates validated band parameters.
    ///
    /// # Errors
    ///
    /// Returns [`IndicatorError::InvalidParams`] if `period` is outside
    /// `10..=500` or the multiplier outside `0.1..=10`.
    pub fn new(period: usize, std_dev_multiplier: f64) -> Result<Self, IndicatorError> {
        let period_ok = (MIN_PERIOD..=MAX_PERIOD).contains(&period);
        let multiplier_ok = (MIN_MULTIPLIER..=MAX_MULTIPLIER).contains(&std_dev_multiplier);
        if period_ok && multiplier_ok {
            Ok(Self {
                period,
                std_dev_multiplier,
            })
        } else {
            Err(IndicatorError::InvalidParams {
                period,
                multiplier: std_dev_multiplier,
            })
        }
    }

    /// Default fast band: period 100, 4 standard deviations.
    #[must_use]
    pub const fn fast() -> Self {
        Self {
            period: 100,
            std_dev_multiplier: 4.0,
        }
    }

    /// Default slow band: period 100, 2 standard deviations.
    #[must_use]
    pub const fn slow() -> Self {
        Self {
            period: 100,
            std_dev_multiplier: 2.0,
        }
    }

    /// Returns the window length.
    #[must_use]
    pub const fn period(&self) -> usize {
        self.period
    }

    /// Returns the standard-deviation multiplier.
    #[must_use]
    pub const fn std_dev_multiplier(&self) -> f64 {
        self.std_dev_multiplier
    }
}

/// One sample of a mean ± k·σ envelope.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BandPoint {
    /// Time of the last bar in the window.
    pub time: i64,
    /// Upper band.
    pub upper: f64,
    /// Simple moving average of the window.
    pub middle: f64,
    /// Lower band.
    pub lower: f64,
}

/// Computes Bollinger Bands over `bars`.
///
/// Produces one point per index `i >= period - 1` from the simple moving
/// average and population standard deviation of the trailing `period`
/// closes. Returns an empty vector when the series is shorter than the
/// period.
#[must_use]
pub fn bollinger_bands(bars: &[Bar], params: BandParams) -> Vec<BandPoint> {
    let period = params.period;
    if period == 0 || bars.len() < period {
        return Vec::new();
    }

    let n = period as f64;
    let k = params.std_dev_multiplier;

    bars.windows(period)
        .map(|window| {
            let mean = window.iter().map(|b| b.close).sum::<f64>() / n;
            let variance = window
                .iter()
                .map(|b| (b.close - mean).powi(2))
                .sum::<f64>()
                / n;
            let std = variance.sqrt();
            BandPoint {
                time: window[period - 1].time,
                upper: mean + k * std,
                middle: mean,
                lower: mean - k * std,
            }
        })
        .collect()
}

/// Parameters for the fast and slow bands drawn together.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BandSettings {
    /// Fast band parameters.
    pub fast: BandParams,
    /// Slow band parameters.
    pub slow: BandParams,
}

impl Default for BandSettings {
    fn default() -> Self {
        Self {
            fast: BandParams::fast(),
            slow: BandParams::slow(),
        }
    }
}

impl BandSettings {
    /// Computes both bands over `bars`.
    #[must_use]
    pub fn compute(&self, bars: &[Bar]) -> Bands {
        Bands {
            fast: bollinger_bands(bars, self.fast),
            slow: bollinger_bands(bars, self.slow),
        }
    }
}

/// Fast and slow band point arrays.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Bands {
    /// Fast band points.
    pub fast: Vec<BandPoint>,
    /// Slow band points.
    pub slow: Vec<BandPoint>,
}

impl Bands {
    /// Returns true if neither band has points.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fast.is_empty() && self.slow.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn series(closes: &[f64]) -> Vec<Bar> {
        closes
            .iter()
            .enumerate()
            .map(|(i, &c)| Bar::flat(i as i64 * 60, c))
            .collect()
    }

    fn ramp(len: usize) -> Vec<Bar> {
        series(&(0..len).map(|i| 100.0 + i as f64).collect::<Vec<_>>())
    }

    #[test]
    fn test_short_series_has_no_points() {
        let params = BandParams::new(100, 2.0).unwrap();
        assert!(bollinger_bands(&ramp(50), params).is_empty());
        assert!(bollinger_bands(&[], params).is_empty());
    }

    #[test]
    fn test_point_count_boundary() {
        let params = BandParams::new(100, 2.0).unwrap();
        let points = bollinger_bands(&ramp(150), params);
        assert_eq!(points.len(), 51);
        assert_eq!(points[0].time, 99 * 60);
        assert_eq!(points[50].time, 149 * 60);

        assert_eq!(bollinger_bands(&ramp(100), params).len(), 1);
    }

    #[test]
    fn test_population_std_dev() {
        // closes 2,4,4,4,5,5,7,9 have mean 5 and population sigma 2
        let mut closes = vec![2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        closes.extend([5.0; 2]);
        let bars = series(&closes);
        let params = BandParams {
            period: 8,
            std_dev_multiplier: 2.0,
        };

        let points = bollinger_bands(&bars, params);
        assert_eq!(points.len(), 3);
        assert_relative_eq!(points[0].middle, 5.0);
        assert_relative_eq!(points[0].upper, 9.0);
        assert_relative_eq!(points[0].lower, 1.0);
    }

    #[test]
    fn test_flat_series_collapses_band() {
        let bars = series(&[42.0; 20]);
        let points = bollinger_bands(&bars, BandParams::new(10, 4.0).unwrap());
        assert_eq!(points.len(), 11);
        for p in points {
            assert_relative_eq!(p.upper, 42.0);
            assert_relative_eq!(p.lower, 42.0);
        }
    }

    #[test]
    fn test_param_validation() {
        assert!(BandParams::new(9, 2.0).is_err());
        assert!(BandParams::new(501, 2.0).is_err());
        assert!(BandParams::new(20, 0.0).is_err());
        assert!(BandParams::new(20, 10.5).is_err());
        assert!(BandParams::new(10, 0.1).is_ok());
    }

    #[test]
    fn test_settings_compute_both_bands() {
        let bands = BandSettings::default().compute(&ramp(120));
        assert_eq!(bands.fast.len(), 21);
        assert_eq!(bands.slow.len(), 21);
        assert!(bands.fast[0].upper > bands.slow[0].upper);
        assert!(!bands.is_empty());
    }
}
