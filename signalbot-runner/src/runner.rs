//! Backtest runner: wires configuration, candles, strategy, and engine.
//!
//! Two entry points:
//! - `run_backtest_with_config()`: candles already in memory. Used by the CLI
//!   and the sweep.
//! - `run_backtest_from_csv()`: loads a CSV file first.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use signalbot_core::domain::Candle;
use signalbot_core::engine::{BacktestConfig, BacktestEngine, BacktestError, BacktestRun};
use signalbot_core::signals::{EmaRsiStrategy, StrategyError, StrategyParams};

use crate::config::{BotConfig, ConfigError};
use crate::data_loader::{dataset_hash, load_candles_csv, DataSource, LoadError, LoadedCandles};

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("data error: {0}")]
    Data(#[from] LoadError),
    #[error("strategy error: {0}")]
    Strategy(#[from] StrategyError),
    #[error("backtest error: {0}")]
    Backtest(#[from] BacktestError),
}

/// Current schema version for persisted reports.
pub const SCHEMA_VERSION: u32 = 1;

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

/// Complete result of a single backtest, ready for rendering or export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestReport {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub symbol: String,
    pub params: StrategyParams,
    /// BLAKE3 of the bot configuration that produced this run.
    pub config_fingerprint: String,
    pub dataset_hash: String,
    pub source: Option<DataSource>,
    pub first_timestamp: Option<String>,
    pub last_timestamp: Option<String>,
    pub run: BacktestRun,
}

impl BacktestReport {
    pub fn is_synthetic(&self) -> bool {
        matches!(self.source, Some(DataSource::Synthetic { .. }))
    }
}

/// Run one backtest of `params` over `candles`.
pub fn run_backtest_with_params(
    params: StrategyParams,
    backtest: BacktestConfig,
    candles: &[Candle],
) -> Result<BacktestRun, RunError> {
    let strategy = EmaRsiStrategy::new(params)?;
    Ok(BacktestEngine::new(strategy, backtest).run(candles)?)
}

/// Run the configured strategy over in-memory candles.
pub fn run_backtest_with_config(
    config: &BotConfig,
    candles: &[Candle],
) -> Result<BacktestReport, RunError> {
    config.validate()?;
    let params = config.strategy.params();
    let run = run_backtest_with_params(params, config.backtest_config(), candles)?;

    info!(
        symbol = %config.instrument.symbol,
        strategy = %run.strategy,
        trades = run.metrics.total_trades,
        total_pnl = run.metrics.total_pnl,
        "backtest finished"
    );

    Ok(BacktestReport {
        schema_version: SCHEMA_VERSION,
        symbol: config.instrument.symbol.clone(),
        params,
        config_fingerprint: config.fingerprint(),
        dataset_hash: dataset_hash(candles),
        source: None,
        first_timestamp: candles.first().map(|c| c.timestamp.to_string()),
        last_timestamp: candles.last().map(|c| c.timestamp.to_string()),
        run,
    })
}

/// Run the configured strategy over a loaded series, keeping its provenance.
pub fn run_backtest_on(
    config: &BotConfig,
    loaded: &LoadedCandles,
) -> Result<BacktestReport, RunError> {
    let mut report = run_backtest_with_config(config, &loaded.candles)?;
    report.source = Some(loaded.source.clone());
    Ok(report)
}

/// Load a CSV file and backtest the configured strategy on it.
pub fn run_backtest_from_csv(config: &BotConfig, path: &Path) -> Result<BacktestReport, RunError> {
    let loaded = load_candles_csv(path)?;
    run_backtest_on(config, &loaded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_loader::synthetic_candles;
    use chrono::NaiveDate;
    use signalbot_core::domain::Interval;

    fn series(n: usize) -> LoadedCandles {
        let start = NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_opt(9, 15, 0)
            .unwrap();
        synthetic_candles(11, n, start, Interval::FiveMinute)
    }

    #[test]
    fn report_carries_provenance() {
        let loaded = series(300);
        let report = run_backtest_on(&BotConfig::default(), &loaded).unwrap();
        assert_eq!(report.schema_version, SCHEMA_VERSION);
        assert_eq!(report.symbol, "RELIANCE");
        assert_eq!(report.dataset_hash, loaded.dataset_hash);
        assert_eq!(report.config_fingerprint, BotConfig::default().fingerprint());
        assert!(report.is_synthetic());
        assert_eq!(report.run.candle_count, 300);
        assert_eq!(report.run.signals.len(), 250);
    }

    #[test]
    fn same_inputs_same_report() {
        let loaded = series(400);
        let a = run_backtest_on(&BotConfig::default(), &loaded).unwrap();
        let b = run_backtest_on(&BotConfig::default(), &loaded).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn short_series_is_a_backtest_error() {
        let loaded = series(20);
        let err = run_backtest_on(&BotConfig::default(), &loaded).unwrap_err();
        assert!(matches!(
            err,
            RunError::Backtest(BacktestError::InsufficientData {
                required: 51,
                actual: 20
            })
        ));
    }

    #[test]
    fn invalid_params_are_rejected_before_running() {
        let mut params = StrategyParams::default();
        params.sell_rsi_min = 10.0;
        let err = run_backtest_with_params(params, BacktestConfig::default(), &series(100).candles)
            .unwrap_err();
        assert!(matches!(err, RunError::Strategy(_)));
    }
}
