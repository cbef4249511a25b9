//! Last-traded-price updates.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::bar::{parse_float, parse_seconds};

/// A last-traded-price tick delivered by the push channel.
///
/// The server sends `ltp` and `timestamp` when live data exists for the
/// symbol, or an `error` message when it does not.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LtpUpdate {
    /// Symbol the price belongs to.
    pub symbol: String,
    /// Last traded price.
    #[serde(default)]
    pub ltp: Option<Value>,
    /// Trade time in epoch seconds.
    #[serde(default)]
    pub timestamp: Option<Value>,
    /// Server-side error text when no price is available.
    #[serde(default)]
    pub error: Option<String>,
}

impl LtpUpdate {
    /// Creates an update with a price and timestamp.
    #[must_use]
    pub fn new(symbol: impl Into<String>, ltp: f64, timestamp: i64) -> Self {
        Self {
            symbol: symbol.into(),
            ltp: Some(Value::from(ltp)),
            timestamp: Some(Value::from(timestamp)),
            error: None,
        }
    }

    /// Returns the price if present and finite.
    #[must_use]
    pub fn price(&self) -> Option<f64> {
        self.ltp
            .as_ref()
            .and_then(parse_float)
            .filter(|p| p.is_finite())
    }

    /// Returns the tick time, falling back to `now` when the timestamp is
    /// absent, unparseable or zero.
    #[must_use]
    pub fn time_or(&self, now: i64) -> i64 {
        self.timestamp
            .as_ref()
            .and_then(parse_seconds)
            .filter(|t| *t != 0)
            .unwrap_or(now)
    }
}
