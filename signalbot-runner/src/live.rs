//! Polling live / paper trader.
//!
//! One cycle:
//! 1. Fetch the configured history window ending now
//! 2. Generate a signal from it
//! 3. Fetch the last traded price (missing price skips the cycle)
//! 4. Stop = price × (1 − stoploss_pct), quantity from the sizer
//! 5. Submit through the order sink when the signal is actionable
//!
//! The trader owns the only mutable state (the last BUY fill price), so
//! nothing here is process-global.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use signalbot_core::data::{FeedError, MarketData, OrderAck, OrderSink};
use signalbot_core::domain::{OrderSide, Signal};
use signalbot_core::signals::{validate_signal, EmaRsiStrategy, SignalGenerator, StrategyError};
use signalbot_core::sizers::{stoploss_below, FixedRiskSizer, SizingError};

use crate::config::{BotConfig, ConfigError, InstrumentConfig, LiveConfig};

#[derive(Debug, Error)]
pub enum LiveError {
    #[error("feed error: {0}")]
    Feed(#[from] FeedError),

    #[error("sizing error: {0}")]
    Sizing(#[from] SizingError),

    #[error("strategy error: {0}")]
    Strategy(#[from] StrategyError),

    #[error("config error: {0}")]
    Config(#[from] ConfigError),
}

impl LiveError {
    /// Whether the loop should back off and retry rather than stop.
    pub fn is_recoverable(&self) -> bool {
        match self {
            LiveError::Feed(FeedError::AuthenticationRequired(_)) => false,
            LiveError::Feed(_) => true,
            LiveError::Sizing(_) => true,
            LiveError::Strategy(_) | LiveError::Config(_) => false,
        }
    }
}

/// What one polling cycle did.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CycleOutcome {
    /// No last price was available.
    Skipped { signal: Signal },
    /// Signal was HOLD, sized to zero, or rejected by the validator.
    NoAction {
        signal: Signal,
        price: f64,
        quantity: u64,
    },
    Submitted {
        side: OrderSide,
        price: f64,
        stoploss: f64,
        quantity: u64,
        order_id: String,
    },
}

/// Totals for a finished loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoopSummary {
    pub cycles: u64,
    pub orders: u64,
    pub skipped: u64,
    pub errors: u64,
}

pub struct LiveTrader<M, S> {
    feed: M,
    sink: S,
    strategy: EmaRsiStrategy,
    sizer: FixedRiskSizer,
    instrument: InstrumentConfig,
    stoploss_pct: f64,
    live: LiveConfig,
    entry_price: Option<f64>,
}

impl<M: MarketData, S: OrderSink> LiveTrader<M, S> {
    pub fn new(config: &BotConfig, feed: M, sink: S) -> Result<Self, LiveError> {
        config.validate()?;
        Ok(Self {
            feed,
            sink,
            strategy: EmaRsiStrategy::new(config.strategy.params())?,
            sizer: config.risk.sizer()?,
            instrument: config.instrument.clone(),
            stoploss_pct: config.risk.stoploss_pct,
            live: config.live.clone(),
            entry_price: None,
        })
    }

    /// Fill price of the last submitted BUY, cleared by a submitted SELL.
    pub fn entry_price(&self) -> Option<f64> {
        self.entry_price
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Run a single cycle as of `now`.
    pub fn step(&mut self, now: NaiveDateTime) -> Result<CycleOutcome, LiveError> {
        let from = now - chrono::Duration::days(i64::from(self.instrument.history_days));
        let candles = self.feed.fetch_historical(
            &self.instrument.token,
            from,
            now,
            self.instrument.interval,
        )?;
        let signal = self.strategy.evaluate(&candles);
        debug!(candles = candles.len(), %signal, "cycle signal");

        let Some(price) = self.feed.fetch_last_price(&self.instrument.symbol)? else {
            warn!(symbol = %self.instrument.symbol, %signal, "no last price, skipping cycle");
            return Ok(CycleOutcome::Skipped { signal });
        };

        let stoploss = stoploss_below(price, self.stoploss_pct)?;
        let quantity = self.sizer.quantity(price, stoploss)?;

        let actionable = !signal.is_hold()
            && quantity > 0
            && validate_signal(signal, price, self.entry_price);
        let side = match signal.side() {
            Some(side) if actionable => side,
            _ => {
                info!(%signal, price, quantity, "no order this cycle");
                return Ok(CycleOutcome::NoAction {
                    signal,
                    price,
                    quantity,
                });
            }
        };

        let OrderAck { order_id } = self.sink.submit(&self.instrument.symbol, side, quantity)?;
        info!(
            %side,
            symbol = %self.instrument.symbol,
            quantity,
            price,
            stoploss,
            order_id = %order_id,
            "order submitted"
        );

        self.entry_price = match side {
            OrderSide::Buy => Some(price),
            OrderSide::Sell => None,
        };

        Ok(CycleOutcome::Submitted {
            side,
            price,
            stoploss,
            quantity,
            order_id,
        })
    }

    /// Poll until `clock` returns `None`, `max_cycles` is reached, or an
    /// unrecoverable error occurs.
    ///
    /// `clock` supplies the time for each cycle; `sleep` waits between them.
    pub fn run_loop<C, W>(&mut self, mut clock: C, mut sleep: W) -> Result<LoopSummary, LiveError>
    where
        C: FnMut() -> Option<NaiveDateTime>,
        W: FnMut(Duration),
    {
        let mut summary = LoopSummary::default();
        info!(
            mode = ?self.live.mode,
            symbol = %self.instrument.symbol,
            feed = self.feed.name(),
            sink = self.sink.name(),
            "trader started"
        );

        while self.live.max_cycles.map_or(true, |max| summary.cycles < max) {
            let Some(now) = clock() else {
                break;
            };
            summary.cycles += 1;

            match self.step(now) {
                Ok(CycleOutcome::Submitted { .. }) => {
                    summary.orders += 1;
                    sleep(self.live.poll_interval());
                }
                Ok(CycleOutcome::Skipped { .. }) => {
                    summary.skipped += 1;
                    sleep(self.live.poll_interval());
                }
                Ok(CycleOutcome::NoAction { .. }) => sleep(self.live.poll_interval()),
                Err(err) if err.is_recoverable() => {
                    summary.errors += 1;
                    error!(error = %err, backoff_secs = self.live.error_backoff_secs, "cycle failed");
                    sleep(self.live.error_backoff());
                }
                Err(err) => {
                    error!(error = %err, "unrecoverable error, stopping");
                    return Err(err);
                }
            }
        }

        info!(
            cycles = summary.cycles,
            orders = summary.orders,
            skipped = summary.skipped,
            errors = summary.errors,
            "trader stopped"
        );
        Ok(summary)
    }
}

/// An order recorded by [`PaperSink`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaperOrder {
    pub order_id: String,
    pub symbol: String,
    pub side: OrderSide,
    pub quantity: u64,
}

/// Order sink that logs and records orders instead of sending them.
#[derive(Debug, Default)]
pub struct PaperSink {
    next_id: AtomicU64,
    orders: Mutex<Vec<PaperOrder>>,
}

impl PaperSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn orders(&self) -> Vec<PaperOrder> {
        self.orders
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl OrderSink for PaperSink {
    fn name(&self) -> &str {
        "paper"
    }

    fn submit(&self, symbol: &str, side: OrderSide, quantity: u64) -> Result<OrderAck, FeedError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let order = PaperOrder {
            order_id: format!("paper-{id}"),
            symbol: symbol.to_string(),
            side,
            quantity,
        };
        info!(%side, symbol, quantity, order_id = %order.order_id, "paper order");

        let mut orders = self
            .orders
            .lock()
            .map_err(|_| FeedError::Other("paper order log poisoned".into()))?;
        orders.push(order.clone());
        Ok(OrderAck {
            order_id: order.order_id,
        })
    }
}
