//! Candle: the fundamental market data unit.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

/// OHLCV candle for the traded instrument over one interval.
///
/// Candles arrive in chronological order and are never mutated after fetch.
/// Indicators only read `close`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub timestamp: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

impl Candle {
    /// Returns true if any price field is NaN or infinite.
    pub fn is_void(&self) -> bool {
        !(self.open.is_finite()
            && self.high.is_finite()
            && self.low.is_finite()
            && self.close.is_finite())
    }

    /// Basic OHLC sanity check: high >= low, high >= open, high >= close, etc.
    pub fn is_sane(&self) -> bool {
        if self.is_void() {
            return false;
        }
        self.high >= self.low
            && self.high >= self.open
            && self.high >= self.close
            && self.low <= self.open
            && self.low <= self.close
            && self.open > 0.0
            && self.close > 0.0
    }
}

/// Returns the index of the first candle whose timestamp does not strictly
/// follow its predecessor, or `None` if the series is chronological.
pub fn first_out_of_order(candles: &[Candle]) -> Option<usize> {
    candles
        .windows(2)
        .position(|pair| pair[1].timestamp <= pair[0].timestamp)
        .map(|i| i + 1)
}

/// Candle interval as named by the upstream broker API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Interval {
    #[serde(rename = "minute")]
    Minute,
    #[serde(rename = "5minute")]
    #[default]
    FiveMinute,
    #[serde(rename = "15minute")]
    FifteenMinute,
    #[serde(rename = "60minute")]
    Hour,
    #[serde(rename = "day")]
    Day,
}

impl Interval {
    /// Length of one candle.
    pub fn duration(&self) -> chrono::Duration {
        match self {
            Interval::Minute => chrono::Duration::minutes(1),
            Interval::FiveMinute => chrono::Duration::minutes(5),
            Interval::FifteenMinute => chrono::Duration::minutes(15),
            Interval::Hour => chrono::Duration::hours(1),
            Interval::Day => chrono::Duration::days(1),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Interval::Minute => "minute",
            Interval::FiveMinute => "5minute",
            Interval::FifteenMinute => "15minute",
            Interval::Hour => "60minute",
            Interval::Day => "day",
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
