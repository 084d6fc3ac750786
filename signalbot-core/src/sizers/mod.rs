//! Position sizing: converts a risk budget and stop distance into shares.
//!
//! Sizers are signal-agnostic: they never decide entry or exit, only how much.
//! Unlike signal generation, invalid inputs are NOT masked here: a zero stop
//! distance or a non-positive price is the caller's bug and comes back as an error.

pub mod fixed_risk;

pub use fixed_risk::FixedRiskSizer;

use thiserror::Error;

/// Capital used by [`get_quantity`].
pub const DEFAULT_CAPITAL: f64 = 100_000.0;

/// Fraction of capital risked per trade used by [`get_quantity`].
pub const DEFAULT_RISK_PER_TRADE: f64 = 0.01;

/// Default stop distance below entry for live orders.
pub const DEFAULT_STOPLOSS_PCT: f64 = 0.02;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SizingError {
    #[error("price must be positive and finite, got {0}")]
    InvalidPrice(f64),

    #[error("stoploss must be positive and finite, got {0}")]
    InvalidStoploss(f64),

    #[error("stoploss equals price ({price}): stop distance is zero")]
    ZeroStopDistance { price: f64 },

    #[error("capital must be positive and finite, got {0}")]
    InvalidCapital(f64),

    #[error("risk per trade must be in (0, 1), got {0}")]
    InvalidRiskFraction(f64),

    #[error("stoploss percent must be in (0, 1), got {0}")]
    InvalidStoplossPct(f64),
}

/// Quantity for `price` / `stoploss` at the default capital and risk fraction.
pub fn get_quantity(price: f64, stoploss: f64) -> Result<u64, SizingError> {
    FixedRiskSizer::new(DEFAULT_CAPITAL, DEFAULT_RISK_PER_TRADE)?.quantity(price, stoploss)
}

/// Stop price `pct` below `price` for a long entry.
pub fn stoploss_below(price: f64, pct: f64) -> Result<f64, SizingError> {
    if !(pct > 0.0 && pct < 1.0) {
        return Err(SizingError::InvalidStoplossPct(pct));
    }
    Ok(price * (1.0 - pct))
}
