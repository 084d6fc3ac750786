//! Indicator engine: EMA, RSI, and the aligned frame the strategy reads.
//!
//! Indicators are pure functions: candle history in, numeric series out.
//! Only closing prices are consumed.

pub mod ema;
pub mod frame;
pub mod rsi;

pub use ema::{ema_of_series, Ema};
pub use frame::{IndicatorError, IndicatorFrame, IndicatorPeriods, IndicatorRow};
pub use rsi::{rsi_of_series, Rsi};

use crate::domain::Candle;

/// Trait for single-series indicators.
///
/// `compute` returns a `Vec<f64>` of the same length as the input, with the
/// first `lookback()` values NaN (warmup).
///
/// # Look-ahead contamination guard
/// No indicator value at candle t may depend on price data from candle t+1
/// or later. Every indicator must pass the truncated-vs-full series test.
pub trait Indicator: Send + Sync {
    /// Number of candles before the indicator produces valid output.
    fn lookback(&self) -> usize;

    fn compute(&self, candles: &[Candle]) -> Vec<f64>;
}

/// Create synthetic 5-minute candles from close prices for testing.
///
/// open = prev close (or close for the first candle),
/// high = max(open, close) + 1.0, low = min(open, close) - 1.0, volume = 1000.
#[cfg(test)]
pub fn make_candles(closes: &[f64]) -> Vec<Candle> {
    let base = chrono::NaiveDate::from_ymd_opt(2024, 1, 2)
        .unwrap()
        .and_hms_opt(9, 15, 0)
        .unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            Candle {
                timestamp: base + chrono::Duration::minutes(5 * i as i64),
                open,
                high: open.max(close) + 1.0,
                low: open.min(close) - 1.0,
                close,
                volume: 1000,
            }
        })
        .collect()
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

/// Default epsilon for indicator tests.
#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
