//! IndicatorFrame: EMA fast/slow and RSI aligned to a candle window.
//!
//! Rows where any indicator is still in warmup are dropped, so every row in
//! the frame is fully defined. The frame refuses to build from fewer candles
//! than the slowest indicator needs, and from any non-finite close.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::ema::Ema;
use super::rsi::Rsi;
use super::Indicator;
use crate::domain::Candle;

/// Indicator computation errors. `generate_signal` maps every variant to HOLD.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum IndicatorError {
    #[error("insufficient data: need {required} candles, got {actual}")]
    InsufficientData { required: usize, actual: usize },

    #[error("non-finite close at candle {index}")]
    NonFiniteClose { index: usize },

    #[error("invalid indicator period: {0}")]
    InvalidPeriod(String),
}

/// Periods for the three indicators the strategy reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndicatorPeriods {
    pub ema_fast: usize,
    pub ema_slow: usize,
    pub rsi: usize,
}

impl Default for IndicatorPeriods {
    fn default() -> Self {
        Self {
            ema_fast: 20,
            ema_slow: 50,
            rsi: 14,
        }
    }
}

impl IndicatorPeriods {
    /// Minimum candle count for at least one fully-defined row.
    pub fn required_candles(&self) -> usize {
        let (fast, slow, rsi) = self.indicators();
        fast.lookback().max(slow.lookback()).max(rsi.lookback()) + 1
    }

    fn indicators(&self) -> (Ema, Ema, Rsi) {
        (Ema::new(self.ema_fast), Ema::new(self.ema_slow), Rsi::new(self.rsi))
    }

    pub fn validate(&self) -> Result<(), IndicatorError> {
        if self.ema_fast == 0 || self.ema_slow == 0 || self.rsi == 0 {
            return Err(IndicatorError::InvalidPeriod(format!(
                "periods must be >= 1 (ema_fast={}, ema_slow={}, rsi={})",
                self.ema_fast, self.ema_slow, self.rsi
            )));
        }
        if self.ema_fast >= self.ema_slow {
            return Err(IndicatorError::InvalidPeriod(format!(
                "ema_fast ({}) must be shorter than ema_slow ({})",
                self.ema_fast, self.ema_slow
            )));
        }
        Ok(())
    }
}

/// One fully-defined indicator row.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IndicatorRow {
    /// Position of the source candle in the input slice.
    pub index: usize,
    pub timestamp: NaiveDateTime,
    pub close: f64,
    pub ema_fast: f64,
    pub ema_slow: f64,
    pub rsi: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndicatorFrame {
    rows: Vec<IndicatorRow>,
}

impl IndicatorFrame {
    pub fn compute(candles: &[Candle], periods: &IndicatorPeriods) -> Result<Self, IndicatorError> {
        periods.validate()?;

        let required = periods.required_candles();
        if candles.len() < required {
            return Err(IndicatorError::InsufficientData {
                required,
                actual: candles.len(),
            });
        }

        if let Some(index) = candles.iter().position(|c| !c.close.is_finite()) {
            return Err(IndicatorError::NonFiniteClose { index });
        }

        let (fast, slow, rsi) = periods.indicators();
        let fast = fast.compute(candles);
        let slow = slow.compute(candles);
        let rsi = rsi.compute(candles);

        let rows = candles
            .iter()
            .enumerate()
            .filter_map(|(i, candle)| {
                let row = IndicatorRow {
                    index: i,
                    timestamp: candle.timestamp,
                    close: candle.close,
                    ema_fast: fast[i],
                    ema_slow: slow[i],
                    rsi: rsi[i],
                };
                row.is_defined().then_some(row)
            })
            .collect();

        Ok(Self { rows })
    }

    pub fn rows(&self) -> &[IndicatorRow] {
        &self.rows
    }

    pub fn last(&self) -> Option<&IndicatorRow> {
        self.rows.last()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl IndicatorRow {
    fn is_defined(&self) -> bool {
        self.ema_fast.is_finite() && self.ema_slow.is_finite() && self.rsi.is_finite()
    }
}
