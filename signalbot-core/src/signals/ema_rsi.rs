//! EMA trend + RSI momentum signal.
//!
//! BUY: ema_fast > ema_slow, RSI inside the buy band, and (optionally)
//! close above ema_fast. SELL is only checked when BUY fails: trend reversal
//! and/or RSI overbought, combined per the exit rule. Otherwise HOLD.

use tracing::debug;

use super::params::{ExitRule, StrategyError, StrategyParams};
use super::{Evaluation, SignalGenerator};
use crate::domain::{Candle, Signal};
use crate::indicators::{IndicatorFrame, IndicatorRow};

/// Outcome of both rule branches on one indicator row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Conditions {
    pub buy: bool,
    pub sell: bool,
}

#[derive(Debug, Clone)]
pub struct EmaRsiStrategy {
    params: StrategyParams,
    name: String,
}

impl EmaRsiStrategy {
    pub fn new(params: StrategyParams) -> Result<Self, StrategyError> {
        params.validate()?;
        Ok(Self::with_valid_params(params))
    }

    fn with_valid_params(params: StrategyParams) -> Self {
        let name = format!(
            "ema_rsi_{}_{}_{}",
            params.periods.ema_fast, params.periods.ema_slow, params.periods.rsi
        );
        Self { params, name }
    }

    pub fn params(&self) -> &StrategyParams {
        &self.params
    }

    /// Evaluate both branches independently, without the BUY-first ordering.
    pub fn conditions(&self, row: &IndicatorRow) -> Conditions {
        let p = &self.params;

        let uptrend = row.ema_fast > row.ema_slow;
        let rsi_in_band =
            row.rsi < p.buy_rsi_max && p.buy_rsi_min.map_or(true, |min| row.rsi > min);
        let confirmed = !p.ema_confirmation || row.close > row.ema_fast;
        let buy = uptrend && rsi_in_band && confirmed;

        let downtrend = row.ema_fast < row.ema_slow;
        let overbought = row.rsi > p.sell_rsi_min;
        let sell = match p.exit_rule {
            ExitRule::Any => downtrend || overbought,
            ExitRule::All => downtrend && overbought,
        };

        Conditions { buy, sell }
    }

    /// Apply the rule set to one row: BUY first, then SELL, else HOLD.
    pub fn decide(&self, row: &IndicatorRow) -> Signal {
        let conditions = self.conditions(row);
        if conditions.buy {
            Signal::Buy
        } else if conditions.sell {
            Signal::Sell
        } else {
            Signal::Hold
        }
    }
}

impl Default for EmaRsiStrategy {
    fn default() -> Self {
        Self::with_valid_params(StrategyParams::default())
    }
}

impl SignalGenerator for EmaRsiStrategy {
    fn name(&self) -> &str {
        &self.name
    }

    fn warmup_bars(&self) -> usize {
        self.params.required_candles()
    }

    fn evaluate(&self, candles: &[Candle]) -> Signal {
        self.evaluate_detailed(candles).signal
    }

    fn evaluate_detailed(&self, candles: &[Candle]) -> Evaluation {
        let frame = match IndicatorFrame::compute(candles, &self.params.periods) {
            Ok(frame) => frame,
            Err(err) => {
                debug!(strategy = %self.name, error = %err, "indicator frame unavailable, holding");
                return Evaluation::hold(Some(err.to_string()));
            }
        };

        let Some(row) = frame.last().copied() else {
            return Evaluation::hold(Some("indicator frame empty".to_string()));
        };

        let signal = self.decide(&row);
        debug!(
            strategy = %self.name,
            close = row.close,
            ema_fast = row.ema_fast,
            ema_slow = row.ema_slow,
            rsi = row.rsi,
            %signal,
            "signal evaluated"
        );
        Evaluation {
            signal,
            row: Some(row),
            hold_reason: None,
        }
    }
}
