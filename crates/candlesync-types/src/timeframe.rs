//! Chart timeframe definitions.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Chart timeframe.
///
/// Each timeframe maps to one REST interval identifier understood by the
/// OHLCV source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub enum Timeframe {
    /// 1-minute bars.
    #[default]
    #[serde(rename = "1m")]
    Minute1,
    /// 5-minute bars.
    #[serde(rename = "5m")]
    Minute5,
    /// 15-minute bars.
    #[serde(rename = "15m")]
    Minute15,
    /// 30-minute bars.
    #[serde(rename = "30m")]
    Minute30,
    /// 1-hour bars.
    #[serde(rename = "1h")]
    Hour1,
    /// Daily bars.
    #[serde(rename = "1d")]
    Day1,
}

impl Timeframe {
    /// Maps a minute count to the nearest supported timeframe at or below it.
    ///
    /// `>= 1440` is daily, `>= 60` hourly, `>= 30`, `>= 15`, `>= 5` the
    /// matching minute bars, anything smaller one minute.
    #[must_use]
    pub const fn from_minutes(minutes: u32) -> Self {
        if minutes >= 1440 {
            Self::Day1
        } else if minutes >= 60 {
            Self::Hour1
        } else if minutes >= 30 {
            Self::Minute30
        } else if minutes >= 15 {
            Self::Minute15
        } else if minutes >= 5 {
            Self::Minute5
        } else {
            Self::Minute1
        }
    }

    /// Returns the duration in minutes.
    #[must_use]
    pub const fn minutes(&self) -> u32 {
        match self {
            Self::Minute1 => 1,
            Self::Minute5 => 5,
            Self::Minute15 => 15,
            Self::Minute30 => 30,
            Self::Hour1 => 60,
            Self::Day1 => 1440,
        }
    }

    /// Returns the duration in seconds.
    #[must_use]
    pub const fn seconds(&self) -> i64 {
        self.minutes() as i64 * 60
    }

    /// Returns the REST interval identifier.
    #[must_use]
    pub const fn interval(&self) -> &'static str {
        match self {
            Self::Minute1 => "1m",
            Self::Minute5 => "5m",
            Self::Minute15 => "15m",
            Self::Minute30 => "30m",
            Self::Hour1 => "1h",
            Self::Day1 => "1d",
        }
    }

    /// Returns all available timeframes.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Minute1,
            Self::Minute5,
            Self::Minute15,
            Self::Minute30,
            Self::Hour1,
            Self::Day1,
        ]
    }
}

impl std::fmt::Display for Timeframe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.interval())
    }
}

impl FromStr for Timeframe {
    type Err = TimeframeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        if let Ok(minutes) = lower.parse::<u32>() {
            return Ok(Self::from_minutes(minutes));
        }
        match lower.as_str() {
            "1m" | "m1" | "minute" | "minute1" => Ok(Self::Minute1),
            "5m" | "m5" | "minute5" => Ok(Self::Minute5),
            "15m" | "m15" | "minute15" => Ok(Self::Minute15),
            "30m" | "m30" | "minute30" => Ok(Self::Minute30),
            "1h" | "h1" | "hour" | "hour1" => Ok(Self::Hour1),
            "1d" | "d1" | "day" | "day1" | "daily" => Ok(Self::Day1),
            _ => Err(TimeframeParseError(s.to_string())),
        }
    }
}

/// Error returned when parsing an invalid timeframe string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeframeParseError(String);

impl std::fmt::Display for TimeframeParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "invalid timeframe '{}', expected a minute count or one of: 1m, 5m, 15m, 30m, 1h, 1d",
            self.0
        )
    }
}

impl std::error::Error for TimeframeParseError {}
