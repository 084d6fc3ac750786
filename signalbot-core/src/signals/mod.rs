//! Signal generation: turns a candle window into BUY / SELL / HOLD.
//!
//! Signals are position-agnostic: they receive candle history only, never the
//! caller's position state. Evaluation is total: bad or short input degrades
//! to HOLD instead of surfacing an error.

pub mod ema_rsi;
pub mod params;

pub use ema_rsi::{Conditions, EmaRsiStrategy};
pub use params::{ExitRule, Preset, StrategyError, StrategyParams};

use crate::domain::{Candle, Signal};
use crate::indicators::IndicatorRow;

/// Trait for signal generators.
///
/// # Architecture invariant
/// `evaluate` receives only the candle window. Position tracking belongs to
/// the backtest engine or the live trader.
pub trait SignalGenerator: Send + Sync {
    /// Human-readable name (e.g., "ema_rsi_20_50_14").
    fn name(&self) -> &str;

    /// Number of candles needed before this generator can emit BUY or SELL.
    fn warmup_bars(&self) -> usize;

    /// Evaluate the most recent candle of `candles`. Never fails.
    fn evaluate(&self, candles: &[Candle]) -> Signal;

    /// Like `evaluate`, also returning the indicator row that decided it.
    fn evaluate_detailed(&self, candles: &[Candle]) -> Evaluation {
        Evaluation {
            signal: self.evaluate(candles),
            row: None,
            hold_reason: None,
        }
    }
}

impl<T: SignalGenerator + ?Sized> SignalGenerator for &T {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn warmup_bars(&self) -> usize {
        (**self).warmup_bars()
    }

    fn evaluate(&self, candles: &[Candle]) -> Signal {
        (**self).evaluate(candles)
    }

    fn evaluate_detailed(&self, candles: &[Candle]) -> Evaluation {
        (**self).evaluate_detailed(candles)
    }
}

impl<T: SignalGenerator + ?Sized> SignalGenerator for Box<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn warmup_bars(&self) -> usize {
        (**self).warmup_bars()
    }

    fn evaluate(&self, candles: &[Candle]) -> Signal {
        (**self).evaluate(candles)
    }

    fn evaluate_detailed(&self, candles: &[Candle]) -> Evaluation {
        (**self).evaluate_detailed(candles)
    }
}

/// A signal together with the context that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub signal: Signal,
    /// Last fully-defined indicator row, when one exists.
    pub row: Option<IndicatorRow>,
    /// Why the generator degraded to HOLD without reading indicators.
    pub hold_reason: Option<String>,
}

impl Evaluation {
    pub fn hold(reason: Option<String>) -> Self {
        Self {
            signal: Signal::Hold,
            row: None,
            hold_reason: reason,
        }
    }
}

/// Signal for `candles` under the default momentum thresholds.
pub fn generate_signal(candles: &[Candle]) -> Signal {
    EmaRsiStrategy::default().evaluate(candles)
}

/// Whether `signal` is actionable at `current_price`.
///
/// BUY needs a positive price. SELL needs a known entry price that differs
/// from the current price. HOLD is never actionable.
pub fn validate_signal(signal: Signal, current_price: f64, entry_price: Option<f64>) -> bool {
    match signal {
        Signal::Hold => false,
        Signal::Buy => current_price > 0.0,
        Signal::Sell => entry_price.is_some_and(|entry| entry != current_price),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::make_candles;

    #[test]
    fn short_series_holds() {
        for n in [0, 1, 10, 49] {
            let closes: Vec<f64> = (0..n).map(|i| 100.0 + i as f64).collect();
            assert_eq!(generate_signal(&make_candles(&closes)), Signal::Hold);
        }
    }

    #[test]
    fn nan_close_holds() {
        let mut closes: Vec<f64> = (0..60).map(|i| 100.0 + i as f64).collect();
        closes[59] = f64::NAN;
        assert_eq!(generate_signal(&make_candles(&closes)), Signal::Hold);
    }

    #[test]
    fn validate_hold_is_never_actionable() {
        assert!(!validate_signal(Signal::Hold, 100.0, None));
        assert!(!validate_signal(Signal::Hold, 100.0, Some(90.0)));
    }

    #[test]
    fn validate_buy_needs_positive_price() {
        assert!(validate_signal(Signal::Buy, 2500.0, None));
        assert!(!validate_signal(Signal::Buy, 0.0, None));
        assert!(!validate_signal(Signal::Buy, -1.0, None));
        assert!(!validate_signal(Signal::Buy, f64::NAN, None));
    }

    #[test]
    fn validate_sell_needs_distinct_entry() {
        assert!(!validate_signal(Signal::Sell, 2500.0, None));
        assert!(!validate_signal(Signal::Sell, 2500.0, Some(2500.0)));
        assert!(validate_signal(Signal::Sell, 2510.0, Some(2500.0)));
        assert!(validate_signal(Signal::Sell, 2490.0, Some(2500.0)));
    }
}
