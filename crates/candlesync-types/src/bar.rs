//! OHLCV bar representation and normalization.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::InvalidBar;

/// A single OHLCV sample for one period.
///
/// `time` is the period start in seconds since the epoch and is the unique
/// key of a bar within a series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    /// Period start (epoch seconds).
    pub time: i64,
    /// Opening price.
    pub open: f64,
    /// Highest price during the period.
    pub high: f64,
    /// Lowest price during the period.
    pub low: f64,
    /// Closing (or latest) price.
    pub close: f64,
    /// Traded volume, zero when unknown.
    pub volume: f64,
}

impl Bar {
    /// Creates a new bar.
    #[must_use]
    pub const fn new(time: i64, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self {
            time,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// Creates a flat bar where every price equals `price` and volume is zero.
    #[must_use]
    pub const fn flat(time: i64, price: f64) -> Self {
        Self::new(time, price, price, price, price, 0.0)
    }

    /// Returns the bar time as a UTC datetime, if representable.
    #[must_use]
    pub fn datetime(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.time, 0)
    }

    /// Returns true if every OHLCV field is identical to `other`'s.
    ///
    /// The time key is not compared.
    #[must_use]
    #[allow(clippy::float_cmp)]
    pub fn same_values(&self, other: &Self) -> bool {
        self.open == other.open
            && self.high == other.high
            && self.low == other.low
            && self.close == other.close
            && self.volume == other.volume
    }

    /// Returns the price range (high - low).
    #[must_use]
    pub fn range(&self) -> f64 {
        self.high - self.low
    }

    /// Returns the body size (|close - open|).
    #[must_use]
    pub fn body(&self) -> f64 {
        (self.close - self.open).abs()
    }

    /// Returns true if this is a bullish (green) bar.
    #[must_use]
    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }

    /// Returns true if this is a bearish (red) bar.
    #[must_use]
    pub fn is_bearish(&self) -> bool {
        self.close < self.open
    }

    /// Returns the typical price ((high + low + close) / 3).
    #[must_use]
    pub fn typical_price(&self) -> f64 {
        (self.high + self.low + self.close) / 3.0
    }
}

/// A bar record as delivered by the REST source or the push channel.
///
/// Every field may be a JSON number, a numeric string, `null`, or absent.
/// Use [`RawBar::normalize`] to obtain a [`Bar`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawBar {
    /// Period start in epoch seconds.
    #[serde(default)]
    pub timestamp: Option<Value>,
    /// Opening price.
    #[serde(default)]
    pub open: Option<Value>,
    /// Highest price.
    #[serde(default)]
    pub high: Option<Value>,
    /// Lowest price.
    #[serde(default)]
    pub low: Option<Value>,
    /// Closing price.
    #[serde(default)]
    pub close: Option<Value>,
    /// Volume.
    #[serde(default)]
    pub volume: Option<Value>,
}

impl RawBar {
    /// Creates a raw bar from numeric fields.
    #[must_use]
    pub fn new(timestamp: i64, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self {
            timestamp: Some(Value::from(timestamp)),
            open: Some(Value::from(open)),
            high: Some(Value::from(high)),
            low: Some(Value::from(low)),
            close: Some(Value::from(close)),
            volume: Some(Value::from(volume)),
        }
    }

    /// Converts the record into a canonical [`Bar`].
    ///
    /// The timestamp is taken as whole seconds without unit conversion.
    /// Volume falls back to zero when absent, unparseable or negative.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidBar`] if the timestamp is missing or not an integer,
    /// or if any of open, high, low, close is not a finite number.
    pub fn normalize(&self) -> Result<Bar, InvalidBar> {
        let timestamp = self
            .timestamp
            .as_ref()
            .filter(|v| !v.is_null())
            .ok_or(InvalidBar::MissingTimestamp)?;
        let time = parse_seconds(timestamp)
            .ok_or_else(|| InvalidBar::InvalidTimestamp(timestamp.to_string()))?;

        let open = price_field(self.open.as_ref(), "open")?;
        let high = price_field(self.high.as_ref(), "high")?;
        let low = price_field(self.low.as_ref(), "low")?;
        let close = price_field(self.close.as_ref(), "close")?;
        let volume = self
            .volume
            .as_ref()
            .and_then(parse_float)
            .filter(|v| v.is_finite() && *v >= 0.0)
            .unwrap_or(0.0);

        Ok(Bar::new(time, open, high, low, close, volume))
    }
}

impl From<Bar> for RawBar {
    fn from(bar: Bar) -> Self {
        Self::new(bar.time, bar.open, bar.high, bar.low, bar.close, bar.volume)
    }
}

/// Normalizes a batch of raw records.
///
/// Each record is normalized independently; invalid ones are dropped. The
/// surviving bars are sorted ascending by time, since input order is not
/// trusted.
#[must_use]
pub fn normalize_batch<'a, I>(raws: I) -> Vec<Bar>
where
    I: IntoIterator<Item = &'a RawBar>,
{
    let mut dropped = 0usize;
    let mut bars: Vec<Bar> = raws
        .into_iter()
        .filter_map(|raw| match raw.normalize() {
            Ok(bar) => Some(bar),
            Err(e) => {
                debug!(error = %e, ?raw, "dropping invalid bar");
                dropped += 1;
                None
            }
        })
        .collect();

    if dropped > 0 {
        warn!(dropped, kept = bars.len(), "invalid OHLCV records dropped");
    }

    bars.sort_by_key(|b| b.time);
    bars
}

fn price_field(value: Option<&Value>, field: &'static str) -> Result<f64, InvalidBar> {
    value
        .and_then(parse_float)
        .filter(|v| v.is_finite())
        .ok_or(InvalidBar::NonFinitePrice { field })
}

/// Parses an integer number of seconds.
///
/// Numbers are truncated toward zero; strings are read up to the first
/// non-digit after an optional sign.
pub(crate) fn parse_seconds(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite())
                .map(|f| f.trunc() as i64)
        }),
        Value::String(s) => leading_integer(s),
        _ => None,
    }
}

/// Parses a float from a JSON number or numeric string.
pub(crate) fn parse_float(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn leading_integer(s: &str) -> Option<i64> {
    let s = s.trim_start();
    let (negative, digits) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s.strip_prefix('+').unwrap_or(s)),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    if end == 0 {
        return None;
    }
    let magnitude = digits[..end].parse::<i64>().ok()?;
    Some(if negative { -magnitude } else { magnitude })
}
