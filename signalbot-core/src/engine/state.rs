//! Backtest configuration, the single-slot position state machine, and run result types.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::metrics::Metrics;
use crate::domain::{ExitReason, Position, Signal, Trade};

/// Default trailing window handed to the signal generator.
pub const DEFAULT_LOOKBACK: usize = 50;

/// What happens to a position still open when the candle series ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpenPositionPolicy {
    /// Leave it unrealized and out of the metrics.
    #[default]
    Exclude,
    /// Close it at the final candle's close and count it as a trade.
    MarkToMarket,
}

/// Configuration for a single backtest run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestConfig {
    /// Number of candles strictly before index i used to compute the signal for i.
    pub lookback: usize,
    pub open_position: OpenPositionPolicy,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            lookback: DEFAULT_LOOKBACK,
            open_position: OpenPositionPolicy::Exclude,
        }
    }
}

/// Single-slot, long-only position state.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum PositionState {
    #[default]
    Flat,
    Long(Position),
}

/// Effect of one signal on the position state.
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    Opened(Position),
    Closed(Trade),
    Unchanged,
}

impl PositionState {
    /// Step the state machine with the signal for candle `index`, filled at `close`.
    ///
    /// Flat + BUY opens; Long + SELL closes. Everything else is a no-op:
    /// no pyramiding, no shorting.
    pub fn on_signal(&mut self, signal: Signal, index: usize, close: f64) -> Transition {
        match (std::mem::take(self), signal) {
            (PositionState::Flat, Signal::Buy) => {
                let position = Position::long(index, close);
                *self = PositionState::Long(position.clone());
                Transition::Opened(position)
            }
            (PositionState::Long(position), Signal::Sell) => {
                Transition::Closed(Trade::close(&position, index, close, ExitReason::Signal))
            }
            (previous, _) => {
                *self = previous;
                Transition::Unchanged
            }
        }
    }

    pub fn position(&self) -> Option<&Position> {
        match self {
            PositionState::Flat => None,
            PositionState::Long(position) => Some(position),
        }
    }

    pub fn is_flat(&self) -> bool {
        matches!(self, PositionState::Flat)
    }
}

/// One evaluated signal, as replayed by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalRecord {
    pub index: usize,
    pub timestamp: NaiveDateTime,
    pub close: f64,
    pub signal: Signal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SignalCounts {
    pub buy: usize,
    pub sell: usize,
    pub hold: usize,
}

/// Complete result of one backtest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestRun {
    pub strategy: String,
    pub config: BacktestConfig,
    pub candle_count: usize,
    pub signals: Vec<SignalRecord>,
    pub trades: Vec<Trade>,
    /// Position still open at the end (only under `OpenPositionPolicy::Exclude`).
    pub open_position: Option<Position>,
    /// Open position valued at the final close. Never part of `metrics`.
    pub unrealized_pnl: Option<f64>,
    pub positions_opened: usize,
    pub metrics: Metrics,
}

impl BacktestRun {
    pub fn signal_counts(&self) -> SignalCounts {
        self.signals
            .iter()
            .fold(SignalCounts::default(), |mut counts, record| {
                match record.signal {
                    Signal::Buy => counts.buy += 1,
                    Signal::Sell => counts.sell += 1,
                    Signal::Hold => counts.hold += 1,
                }
                counts
            })
    }
}
