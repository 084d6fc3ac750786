//! Bot configuration loaded from TOML.
//!
//! Every section carries serde defaults, so a partial file (or an empty one)
//! yields the stock bot: 5-minute candles, 1% risk of 100k capital, a 2%
//! stop, the momentum thresholds, and a 50-candle backtest window.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use signalbot_core::domain::Interval;
use signalbot_core::engine::{BacktestConfig, OpenPositionPolicy, DEFAULT_LOOKBACK};
use signalbot_core::signals::{Preset, StrategyError, StrategyParams};
use signalbot_core::sizers::{
    FixedRiskSizer, SizingError, DEFAULT_CAPITAL, DEFAULT_RISK_PER_TRADE, DEFAULT_STOPLOSS_PCT,
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),

    #[error(transparent)]
    Strategy(#[from] StrategyError),

    #[error(transparent)]
    Sizing(#[from] SizingError),
}

/// Complete bot configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    pub instrument: InstrumentConfig,
    pub risk: RiskConfig,
    pub strategy: StrategyConfig,
    pub backtest: BacktestSection,
    pub live: LiveConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstrumentConfig {
    pub symbol: String,
    pub exchange: String,
    /// Broker instrument token used for historical candle requests.
    pub token: String,
    pub interval: Interval,
    /// Days of history fetched per live cycle.
    pub history_days: u32,
}

impl Default for InstrumentConfig {
    fn default() -> Self {
        Self {
            symbol: "RELIANCE".to_string(),
            exchange: "NSE".to_string(),
            token: "738561".to_string(),
            interval: Interval::default(),
            history_days: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskConfig {
    pub capital: f64,
    pub risk_per_trade: f64,
    /// Live stop distance: stop = price × (1 − stoploss_pct).
    pub stoploss_pct: f64,
    pub max_quantity: Option<u64>,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            capital: DEFAULT_CAPITAL,
            risk_per_trade: DEFAULT_RISK_PER_TRADE,
            stoploss_pct: DEFAULT_STOPLOSS_PCT,
            max_quantity: None,
        }
    }
}

impl RiskConfig {
    pub fn sizer(&self) -> Result<FixedRiskSizer, SizingError> {
        Ok(FixedRiskSizer::new(self.capital, self.risk_per_trade)?
            .with_max_quantity(self.max_quantity))
    }
}

/// Strategy thresholds: a named preset, or explicit parameters.
///
/// A table that names a preset and also sets thresholds matches neither arm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StrategyConfig {
    Preset(PresetRef),
    Custom(StrategyParams),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PresetRef {
    pub preset: Preset,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        StrategyConfig::preset(Preset::Momentum)
    }
}

impl StrategyConfig {
    pub fn preset(preset: Preset) -> Self {
        StrategyConfig::Preset(PresetRef { preset })
    }

    pub fn params(&self) -> StrategyParams {
        match self {
            StrategyConfig::Preset(r) => r.preset.params(),
            StrategyConfig::Custom(params) => *params,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestSection {
    pub lookback: usize,
    pub open_position: OpenPositionPolicy,
}

impl Default for BacktestSection {
    fn default() -> Self {
        Self {
            lookback: DEFAULT_LOOKBACK,
            open_position: OpenPositionPolicy::default(),
        }
    }
}

impl From<BacktestSection> for BacktestConfig {
    fn from(section: BacktestSection) -> Self {
        BacktestConfig {
            lookback: section.lookback,
            open_position: section.open_position,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradingMode {
    /// Orders are logged, never sent.
    #[default]
    Paper,
    Live,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LiveConfig {
    pub mode: TradingMode,
    pub poll_interval_secs: u64,
    pub error_backoff_secs: u64,
    /// Stop after this many cycles; run until interrupted when unset.
    pub max_cycles: Option<u64>,
}

impl Default for LiveConfig {
    fn default() -> Self {
        Self {
            mode: TradingMode::Paper,
            poll_interval_secs: 300,
            error_backoff_secs: 60,
            max_cycles: None,
        }
    }
}

impl LiveConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn error_backoff(&self) -> Duration {
        Duration::from_secs(self.error_backoff_secs)
    }
}

impl BotConfig {
    /// Read, parse, and validate a TOML config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: BotConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let risk = &self.risk;
        if !(risk.capital.is_finite() && risk.capital > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "risk.capital must be positive, got {}",
                risk.capital
            )));
        }
        if !(risk.risk_per_trade > 0.0 && risk.risk_per_trade < 1.0) {
            return Err(ConfigError::Invalid(format!(
                "risk.risk_per_trade must be in (0, 1), got {}",
                risk.risk_per_trade
            )));
        }
        if !(risk.stoploss_pct > 0.0 && risk.stoploss_pct < 1.0) {
            return Err(ConfigError::Invalid(format!(
                "risk.stoploss_pct must be in (0, 1), got {}",
                risk.stoploss_pct
            )));
        }
        if self.backtest.lookback == 0 {
            return Err(ConfigError::Invalid(
                "backtest.lookback must be at least 1".into(),
            ));
        }
        if self.instrument.symbol.trim().is_empty() {
            return Err(ConfigError::Invalid("instrument.symbol is empty".into()));
        }
        if self.instrument.history_days == 0 {
            return Err(ConfigError::Invalid(
                "instrument.history_days must be at least 1".into(),
            ));
        }
        self.strategy.params().validate()?;
        Ok(())
    }

    pub fn backtest_config(&self) -> BacktestConfig {
        self.backtest.into()
    }

    /// Deterministic content hash of this configuration.
    ///
    /// Two configs that serialize identically share a fingerprint, so
    /// reports produced from them can be compared directly.
    pub fn fingerprint(&self) -> String {
        // Serializing plain data structs cannot fail; an empty payload still hashes.
        let json = serde_json::to_string(self).unwrap_or_default();
        blake3::hash(json.as_bytes()).to_hex().to_string()
    }
}
