//! Collaborator traits for market data and order submission, plus their errors.
//!
//! The core never talks to a broker directly. Whatever needs candles, a last
//! traded price, or an order sink receives an implementation of these traits,
//! so the broker session is never process-wide state and tests can swap in mocks.

use chrono::NaiveDateTime;
use thiserror::Error;

use crate::domain::{Candle, Interval, OrderSide};

/// Errors raised by market data and order collaborators.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FeedError {
    #[error("data unavailable for {instrument}: {reason}")]
    DataUnavailable { instrument: String, reason: String },

    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("authentication required: {0}")]
    AuthenticationRequired(String),

    #[error("order rejected: {0}")]
    OrderRejected(String),

    #[error("feed error: {0}")]
    Other(String),
}

/// Source of historical candles and last traded prices.
pub trait MarketData {
    /// Human-readable name of this source.
    fn name(&self) -> &str;

    /// Candles for `instrument` with timestamps in `[from, to]`, oldest first.
    ///
    /// An empty result is not an error; the signal generator treats it as
    /// insufficient data.
    fn fetch_historical(
        &self,
        instrument: &str,
        from: NaiveDateTime,
        to: NaiveDateTime,
        interval: Interval,
    ) -> Result<Vec<Candle>, FeedError>;

    /// Last traded price, or `None` when the upstream has no quote.
    fn fetch_last_price(&self, symbol: &str) -> Result<Option<f64>, FeedError>;
}

/// Acknowledgement returned by an order sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderAck {
    pub order_id: String,
}

/// Destination for market orders.
pub trait OrderSink {
    fn name(&self) -> &str;

    fn submit(&self, symbol: &str, side: OrderSide, quantity: u64) -> Result<OrderAck, FeedError>;
}

impl<T: MarketData + ?Sized> MarketData for &T {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn fetch_historical(
        &self,
        instrument: &str,
        from: NaiveDateTime,
        to: NaiveDateTime,
        interval: Interval,
    ) -> Result<Vec<Candle>, FeedError> {
        (**self).fetch_historical(instrument, from, to, interval)
    }

    fn fetch_last_price(&self, symbol: &str) -> Result<Option<f64>, FeedError> {
        (**self).fetch_last_price(symbol)
    }
}

impl<T: OrderSink + ?Sized> OrderSink for &T {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn submit(&self, symbol: &str, side: OrderSide, quantity: u64) -> Result<OrderAck, FeedError> {
        (**self).submit(symbol, side, quantity)
    }
}
