//! Fixed fractional risk sizer.
//!
//! Risk a fixed fraction of capital per trade, with the stop distance
//! setting how many shares that budget buys.

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::SizingError;

/// Fixed fractional risk sizer.
///
/// # Formula
/// ```text
/// risk_amount = capital * risk_per_trade
/// quantity    = floor(risk_amount / |price - stoploss|)
/// ```
///
/// # Example
/// - Capital: 100,000
/// - Risk per trade: 1% (1,000)
/// - Price 2,500, stop 2,450 → distance 50
/// - Quantity: 1,000 / 50 = 20 shares
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FixedRiskSizer {
    capital: f64,
    risk_per_trade: f64,
    /// Upper bound on the returned quantity. `None` applies no clamp.
    max_quantity: Option<u64>,
}

impl FixedRiskSizer {
    pub fn new(capital: f64, risk_per_trade: f64) -> Result<Self, SizingError> {
        if !(capital.is_finite() && capital > 0.0) {
            return Err(SizingError::InvalidCapital(capital));
        }
        if !(risk_per_trade > 0.0 && risk_per_trade < 1.0) {
            return Err(SizingError::InvalidRiskFraction(risk_per_trade));
        }
        Ok(Self {
            capital,
            risk_per_trade,
            max_quantity: None,
        })
    }

    pub fn with_max_quantity(mut self, max_quantity: Option<u64>) -> Self {
        self.max_quantity = max_quantity;
        self
    }

    pub fn capital(&self) -> f64 {
        self.capital
    }

    pub fn risk_per_trade(&self) -> f64 {
        self.risk_per_trade
    }

    pub fn max_quantity(&self) -> Option<u64> {
        self.max_quantity
    }

    /// Amount of capital put at risk on one trade.
    pub fn risk_amount(&self) -> f64 {
        self.capital * self.risk_per_trade
    }

    /// Whole-share quantity for an entry at `price` with a stop at `stoploss`.
    ///
    /// Returns 0 when the risk budget cannot cover one share's stop distance;
    /// callers must skip order placement in that case.
    pub fn quantity(&self, price: f64, stoploss: f64) -> Result<u64, SizingError> {
        if !(price.is_finite() && price > 0.0) {
            return Err(SizingError::InvalidPrice(price));
        }
        if !(stoploss.is_finite() && stoploss > 0.0) {
            return Err(SizingError::InvalidStoploss(stoploss));
        }

        let distance = (price - stoploss).abs();
        if distance == 0.0 {
            return Err(SizingError::ZeroStopDistance { price });
        }

        let raw = (self.risk_amount() / distance).floor() as u64;

        match self.max_quantity {
            Some(cap) if raw > cap => {
                warn!(raw, cap, price, stoploss, "quantity clamped to max_quantity");
                Ok(cap)
            }
            _ => Ok(raw),
        }
    }
}
