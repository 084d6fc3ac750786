//! SignalBot Core: candles, indicators, signal generation, sizing, backtesting.
//!
//! This crate contains the decision logic of the bot:
//! - Domain types (candles, signals, positions, trades)
//! - Indicator engine (EMA fast/slow, Wilder RSI) and the aligned indicator frame
//! - EMA/RSI signal generator with versioned threshold presets
//! - Fixed fractional risk position sizer
//! - Single-position long-only backtest engine and trade metrics
//! - Collaborator traits for market data and order submission

pub mod data;
pub mod domain;
pub mod engine;
pub mod indicators;
pub mod signals;
pub mod sizers;

pub use domain::{Candle, Interval, OrderSide, Signal, Trade};
pub use engine::{run_backtest, BacktestConfig, BacktestEngine, BacktestError, BacktestRun, Metrics};
pub use signals::{generate_signal, validate_signal, EmaRsiStrategy, SignalGenerator, StrategyParams};
pub use sizers::{get_quantity, FixedRiskSizer, SizingError};

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: core types can move into sweep worker threads.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        require_send::<domain::Candle>();
        require_sync::<domain::Candle>();
        require_send::<domain::Trade>();
        require_sync::<domain::Trade>();
        require_send::<domain::Position>();
        require_sync::<domain::Position>();

        require_send::<indicators::IndicatorFrame>();
        require_sync::<indicators::IndicatorFrame>();

        require_send::<signals::EmaRsiStrategy>();
        require_sync::<signals::EmaRsiStrategy>();
        require_send::<signals::StrategyParams>();
        require_sync::<signals::StrategyParams>();

        require_send::<sizers::FixedRiskSizer>();
        require_sync::<sizers::FixedRiskSizer>();

        require_send::<engine::BacktestEngine<signals::EmaRsiStrategy>>();
        require_send::<engine::BacktestRun>();
        require_sync::<engine::BacktestRun>();
        require_send::<engine::Metrics>();
        require_sync::<engine::Metrics>();
    }

    /// Architecture contract: SignalGenerator does NOT see position state.
    ///
    /// `evaluate()` takes only the candle window. If a position parameter is
    /// ever added, every implementation breaks and this test with it.
    #[test]
    fn signal_generator_trait_has_no_position_parameter() {
        fn _check_trait_object_builds(
            sig: &dyn signals::SignalGenerator,
            candles: &[domain::Candle],
        ) -> domain::Signal {
            sig.evaluate(candles)
        }
    }
}
