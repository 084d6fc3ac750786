//! Backtest driving loop.
//!
//! For each candle i from `lookback` to the end, the signal is computed from
//! the trailing window `[i - lookback, i)` and filled at candle i's close.
//! The window never contains candle i, so no decision can see its own fill price.

use tracing::{debug, info};

use super::metrics::Metrics;
use super::state::{
    BacktestConfig, BacktestRun, OpenPositionPolicy, PositionState, SignalRecord, Transition,
};
use super::BacktestError;
use crate::domain::{first_out_of_order, Candle, ExitReason, Trade};
use crate::signals::SignalGenerator;

/// Replays a candle series through a signal generator.
///
/// The engine owns the run-local position state and trade list; `run`
/// consumes it, so every run starts from a fresh instance.
pub struct BacktestEngine<G> {
    generator: G,
    config: BacktestConfig,
    state: PositionState,
    trades: Vec<Trade>,
    signals: Vec<SignalRecord>,
    positions_opened: usize,
}

impl<G: SignalGenerator> BacktestEngine<G> {
    pub fn new(generator: G, config: BacktestConfig) -> Self {
        Self {
            generator,
            config,
            state: PositionState::Flat,
            trades: Vec::new(),
            signals: Vec::new(),
            positions_opened: 0,
        }
    }

    pub fn run(mut self, candles: &[Candle]) -> Result<BacktestRun, BacktestError> {
        self.check_input(candles)?;

        let lookback = self.config.lookback;
        info!(
            strategy = self.generator.name(),
            candles = candles.len(),
            lookback,
            "starting backtest"
        );

        for i in lookback..candles.len() {
            self.step(&candles[i - lookback..i], i, &candles[i]);
        }

        Ok(self.finish(candles))
    }

    fn check_input(&self, candles: &[Candle]) -> Result<(), BacktestError> {
        if self.config.lookback == 0 {
            return Err(BacktestError::InvalidLookback);
        }
        let required = self.config.lookback + 1;
        if candles.len() < required {
            return Err(BacktestError::InsufficientData {
                required,
                actual: candles.len(),
            });
        }
        if let Some(index) = candles.iter().position(|c| !c.close.is_finite()) {
            return Err(BacktestError::InvalidClose { index });
        }
        if let Some(index) = first_out_of_order(candles) {
            return Err(BacktestError::OutOfOrder { index });
        }
        Ok(())
    }

    fn step(&mut self, window: &[Candle], index: usize, candle: &Candle) {
        let signal = self.generator.evaluate(window);
        self.signals.push(SignalRecord {
            index,
            timestamp: candle.timestamp,
            close: candle.close,
            signal,
        });

        match self.state.on_signal(signal, index, candle.close) {
            Transition::Opened(position) => {
                self.positions_opened += 1;
                info!(index, price = position.entry_price, "BUY: opened long");
            }
            Transition::Closed(trade) => {
                info!(
                    index,
                    price = trade.exit_price,
                    pnl = trade.pnl,
                    pnl_pct = trade.pnl_pct,
                    "SELL: closed long"
                );
                self.trades.push(trade);
            }
            Transition::Unchanged => {
                debug!(index, %signal, "no position change");
            }
        }
    }

    fn finish(mut self, candles: &[Candle]) -> BacktestRun {
        let last_index = candles.len() - 1;
        let last_close = candles[last_index].close;

        let mut open_position = self.state.position().cloned();
        if self.config.open_position == OpenPositionPolicy::MarkToMarket {
            if let Some(position) = open_position.take() {
                let trade =
                    Trade::close(&position, last_index, last_close, ExitReason::MarkToMarket);
                info!(pnl = trade.pnl, "open position marked to market at final close");
                self.trades.push(trade);
            }
        }

        let unrealized_pnl = open_position
            .as_ref()
            .map(|p| p.unrealized_pnl(last_close));
        let metrics = Metrics::from_trades(&self.trades);

        info!(
            trades = metrics.total_trades,
            total_pnl = metrics.total_pnl,
            open = open_position.is_some(),
            "backtest complete"
        );

        BacktestRun {
            strategy: self.generator.name().to_string(),
            config: self.config,
            candle_count: candles.len(),
            signals: self.signals,
            trades: self.trades,
            open_position,
            unrealized_pnl,
            positions_opened: self.positions_opened,
            metrics,
        }
    }
}
