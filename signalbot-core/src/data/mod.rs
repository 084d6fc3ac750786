//! Collaborator seams for market data and order submission.

pub mod provider;

pub use provider::{FeedError, MarketData, OrderAck, OrderSink};
