//! Strategy parameters and the named threshold presets.
//!
//! The strategy has gone through three threshold generations. Each is a
//! preset over the same rule set, so a variant is data rather than a fork.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::indicators::{IndicatorError, IndicatorPeriods};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum StrategyError {
    #[error(transparent)]
    Indicator(#[from] IndicatorError),

    #[error("invalid strategy parameters: {0}")]
    InvalidParams(String),

    #[error("unknown strategy preset '{0}' (expected neutral_band, wide_band or momentum)")]
    UnknownPreset(String),
}

/// How the two SELL conditions (trend reversal, overbought RSI) combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitRule {
    /// Either condition triggers SELL.
    Any,
    /// Both conditions are required.
    All,
}

/// Thresholds and periods for the EMA/RSI strategy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StrategyParams {
    pub periods: IndicatorPeriods,
    /// Lower RSI bound for BUY (exclusive). `None` disables the bound.
    pub buy_rsi_min: Option<f64>,
    /// Upper RSI bound for BUY (exclusive).
    pub buy_rsi_max: f64,
    /// RSI above which the overbought SELL condition holds.
    pub sell_rsi_min: f64,
    /// Require close > ema_fast for BUY.
    pub ema_confirmation: bool,
    pub exit_rule: ExitRule,
}

impl Default for StrategyParams {
    fn default() -> Self {
        Preset::Momentum.params()
    }
}

impl StrategyParams {
    pub fn validate(&self) -> Result<(), StrategyError> {
        self.periods.validate()?;

        for (name, value) in [
            ("buy_rsi_max", Some(self.buy_rsi_max)),
            ("sell_rsi_min", Some(self.sell_rsi_min)),
            ("buy_rsi_min", self.buy_rsi_min),
        ] {
            if let Some(v) = value {
                if !(0.0..=100.0).contains(&v) {
                    return Err(StrategyError::InvalidParams(format!(
                        "{name} must be within 0..=100, got {v}"
                    )));
                }
            }
        }

        if let Some(min) = self.buy_rsi_min {
            if min >= self.buy_rsi_max {
                return Err(StrategyError::InvalidParams(format!(
                    "buy_rsi_min ({min}) must be below buy_rsi_max ({})",
                    self.buy_rsi_max
                )));
            }
        }

        // With ExitRule::Any an RSI inside both bands would satisfy BUY and SELL at once.
        if self.exit_rule == ExitRule::Any && self.sell_rsi_min < self.buy_rsi_max {
            return Err(StrategyError::InvalidParams(format!(
                "sell_rsi_min ({}) must be >= buy_rsi_max ({}) when any exit condition sells",
                self.sell_rsi_min, self.buy_rsi_max
            )));
        }

        Ok(())
    }

    /// Minimum number of candles a window needs to produce a non-HOLD signal.
    pub fn required_candles(&self) -> usize {
        self.periods.required_candles()
    }
}

/// Named threshold generations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Preset {
    /// BUY in a neutral 40–60 RSI band; SELL needs reversal and RSI > 60.
    NeutralBand,
    /// BUY below RSI 70; SELL needs reversal and RSI > 80.
    WideBand,
    /// BUY below RSI 75; SELL on reversal or RSI > 75.
    Momentum,
}

impl Preset {
    pub const ALL: [Preset; 3] = [Preset::NeutralBand, Preset::WideBand, Preset::Momentum];

    pub fn params(&self) -> StrategyParams {
        let periods = IndicatorPeriods::default();
        match self {
            Preset::NeutralBand => StrategyParams {
                periods,
                buy_rsi_min: Some(40.0),
                buy_rsi_max: 60.0,
                sell_rsi_min: 60.0,
                ema_confirmation: true,
                exit_rule: ExitRule::All,
            },
            Preset::WideBand => StrategyParams {
                periods,
                buy_rsi_min: None,
                buy_rsi_max: 70.0,
                sell_rsi_min: 80.0,
                ema_confirmation: true,
                exit_rule: ExitRule::All,
            },
            Preset::Momentum => StrategyParams {
                periods,
                buy_rsi_min: None,
                buy_rsi_max: 75.0,
                sell_rsi_min: 75.0,
                ema_confirmation: true,
                exit_rule: ExitRule::Any,
            },
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Preset::NeutralBand => "neutral_band",
            Preset::WideBand => "wide_band",
            Preset::Momentum => "momentum",
        }
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Preset {
    type Err = StrategyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Preset::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| StrategyError::UnknownPreset(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_momentum_preset() {
        let params = StrategyParams::default();
        assert_eq!(params.buy_rsi_max, 75.0);
        assert_eq!(params.sell_rsi_min, 75.0);
        assert_eq!(params.exit_rule, ExitRule::Any);
        assert!(params.ema_confirmation);
        assert_eq!(params.required_candles(), 50);
    }

    #[test]
    fn all_presets_validate() {
        for preset in Preset::ALL {
            assert!(preset.params().validate().is_ok(), "{preset} failed validation");
        }
    }

    #[test]
    fn overlapping_any_rule_is_rejected() {
        let params = StrategyParams {
            sell_rsi_min: 70.0,
            ..StrategyParams::default()
        };
        assert!(matches!(
            params.validate(),
            Err(StrategyError::InvalidParams(_))
        ));
    }

    #[test]
    fn inverted_buy_band_is_rejected() {
        let params = StrategyParams {
            buy_rsi_min: Some(80.0),
            ..StrategyParams::default()
        };
        assert!(params.validate().is_err());
    }

    #[test]
    fn preset_round_trips_through_name() {
        for preset in Preset::ALL {
            assert_eq!(preset.as_str().parse::<Preset>().unwrap(), preset);
        }
        assert!(matches!(
            "aggressive".parse::<Preset>(),
            Err(StrategyError::UnknownPreset(_))
        ));
    }

    #[test]
    fn params_deserialize_with_defaults() {
        let params: StrategyParams = serde_json::from_str(r#"{"buy_rsi_max": 72.0, "sell_rsi_min": 72.0}"#).unwrap();
        assert_eq!(params.buy_rsi_max, 72.0);
        assert_eq!(params.periods, IndicatorPeriods::default());
        assert_eq!(params.exit_rule, ExitRule::Any);
    }
}
