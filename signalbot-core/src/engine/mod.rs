//! Backtesting engine: replays candles through a signal generator and
//! simulates a single long-only position.
//!
//! Per candle i (from `lookback` on):
//! 1. Signal from the window `[i - lookback, i)`
//! 2. Step the position state machine at candle i's close
//! 3. Record the signal and any closed trade
//!
//! Metrics are computed from closed trades once the series is exhausted.

pub mod loop_runner;
pub mod metrics;
pub mod state;

pub use loop_runner::BacktestEngine;
pub use metrics::Metrics;
pub use state::{
    BacktestConfig, BacktestRun, OpenPositionPolicy, PositionState, SignalCounts, SignalRecord,
    Transition, DEFAULT_LOOKBACK,
};

use thiserror::Error;

use crate::domain::Candle;
use crate::signals::EmaRsiStrategy;

/// Reasons a backtest cannot produce metrics. No partial result is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BacktestError {
    #[error("insufficient data: need at least {required} candles, got {actual}")]
    InsufficientData { required: usize, actual: usize },

    #[error("lookback must be at least 1")]
    InvalidLookback,

    #[error("candle {index} has a non-finite close")]
    InvalidClose { index: usize },

    #[error("candle {index} is not after its predecessor")]
    OutOfOrder { index: usize },
}

/// Backtest the default momentum strategy and return its metrics.
pub fn run_backtest(candles: &[Candle], lookback: usize) -> Result<Metrics, BacktestError> {
    let config = BacktestConfig {
        lookback,
        ..BacktestConfig::default()
    };
    BacktestEngine::new(EmaRsiStrategy::default(), config)
        .run(candles)
        .map(|run| run.metrics)
}
