//! Parameter sweep over strategy variants.
//!
//! Each variant gets its own strategy and engine instance, so variants can
//! run in parallel without sharing position state.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use signalbot_core::domain::Candle;
use signalbot_core::engine::{BacktestConfig, Metrics};
use signalbot_core::signals::{ExitRule, Preset, StrategyParams};

use crate::runner::{run_backtest_with_params, RunError};

/// One named set of strategy parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepVariant {
    pub label: String,
    pub params: StrategyParams,
}

impl SweepVariant {
    pub fn new(label: impl Into<String>, params: StrategyParams) -> Self {
        Self {
            label: label.into(),
            params,
        }
    }
}

/// The three threshold presets as sweep variants.
pub fn preset_variants() -> Vec<SweepVariant> {
    Preset::ALL
        .iter()
        .map(|p| SweepVariant::new(p.as_str(), p.params()))
        .collect()
}

/// Threshold grid around a base parameter set.
#[derive(Debug, Clone)]
pub struct ParamGrid {
    pub buy_rsi_max: Vec<f64>,
    pub sell_rsi_min: Vec<f64>,
    pub exit_rules: Vec<ExitRule>,
}

impl ParamGrid {
    /// BUY ceiling 60..=75 by 5, SELL floor 60..=80 by 5, both exit rules.
    pub fn rsi_default() -> Self {
        Self {
            buy_rsi_max: vec![60.0, 65.0, 70.0, 75.0],
            sell_rsi_min: vec![60.0, 65.0, 70.0, 75.0, 80.0],
            exit_rules: vec![ExitRule::Any, ExitRule::All],
        }
    }

    /// Upper bound on the number of variants (before invalid ones are skipped).
    pub fn size(&self) -> usize {
        self.buy_rsi_max.len() * self.sell_rsi_min.len() * self.exit_rules.len()
    }

    /// All valid variants. Combinations that fail validation are skipped.
    pub fn variants(&self, base: &StrategyParams) -> Vec<SweepVariant> {
        let mut variants = Vec::new();
        for &buy in &self.buy_rsi_max {
            for &sell in &self.sell_rsi_min {
                for &rule in &self.exit_rules {
                    let params = StrategyParams {
                        buy_rsi_max: buy,
                        sell_rsi_min: sell,
                        exit_rule: rule,
                        ..*base
                    };
                    if params.validate().is_err() {
                        continue;
                    }
                    let rule_name = match rule {
                        ExitRule::Any => "any",
                        ExitRule::All => "all",
                    };
                    variants.push(SweepVariant::new(
                        format!("buy<{buy}_sell>{sell}_{rule_name}"),
                        params,
                    ));
                }
            }
        }
        variants
    }
}

/// Outcome of one variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepEntry {
    pub label: String,
    pub params: StrategyParams,
    pub metrics: Metrics,
    pub open_at_end: bool,
}

/// Sweep results ranked by total P&L, best first.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SweepResults {
    entries: Vec<SweepEntry>,
}

impl SweepResults {
    fn ranked(mut entries: Vec<SweepEntry>) -> Self {
        entries.sort_by(|a, b| {
            b.metrics
                .total_pnl
                .partial_cmp(&a.metrics.total_pnl)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.label.cmp(&b.label))
        });
        Self { entries }
    }

    pub fn all(&self) -> &[SweepEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn best(&self) -> Option<&SweepEntry> {
        self.entries.first()
    }

    pub fn top_n(&self, n: usize) -> &[SweepEntry] {
        &self.entries[..n.min(self.entries.len())]
    }
}

/// Backtest every variant in parallel and rank by total P&L.
///
/// Fails on the first variant error; no partial ranking is returned.
pub fn run_sweep(
    candles: &[Candle],
    variants: &[SweepVariant],
    backtest: BacktestConfig,
) -> Result<SweepResults, RunError> {
    if variants.is_empty() {
        warn!("sweep called with no variants");
    }
    info!(variants = variants.len(), candles = candles.len(), "starting sweep");

    let entries = variants
        .par_iter()
        .map(|variant| {
            let run = run_backtest_with_params(variant.params, backtest, candles)?;
            Ok(SweepEntry {
                label: variant.label.clone(),
                params: variant.params,
                metrics: run.metrics,
                open_at_end: run.open_position.is_some(),
            })
        })
        .collect::<Result<Vec<_>, RunError>>()?;

    let results = SweepResults::ranked(entries);
    if let Some(best) = results.best() {
        info!(label = %best.label, total_pnl = best.metrics.total_pnl, "sweep complete");
    }
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_loader::synthetic_candles;
    use chrono::NaiveDate;
    use signalbot_core::domain::Interval;
    use signalbot_core::engine::BacktestEngine;
    use signalbot_core::signals::EmaRsiStrategy;

    fn candles(n: usize) -> Vec<Candle> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_opt(9, 15, 0)
            .unwrap();
        synthetic_candles(5, n, start, Interval::FiveMinute).candles
    }

    #[test]
    fn presets_sweep_is_ranked() {
        let candles = candles(600);
        let results = run_sweep(&candles, &preset_variants(), BacktestConfig::default()).unwrap();
        assert_eq!(results.len(), 3);
        for pair in results.all().windows(2) {
            assert!(pair[0].metrics.total_pnl >= pair[1].metrics.total_pnl);
        }
    }

    #[test]
    fn parallel_matches_sequential() {
        let candles = candles(500);
        let results = run_sweep(&candles, &preset_variants(), BacktestConfig::default()).unwrap();
        for entry in results.all() {
            let strategy = EmaRsiStrategy::new(entry.params).unwrap();
            let run = BacktestEngine::new(strategy, BacktestConfig::default())
                .run(&candles)
                .unwrap();
            assert_eq!(run.metrics, entry.metrics, "{}", entry.label);
        }
    }

    #[test]
    fn grid_skips_invalid_combinations() {
        let grid = ParamGrid::rsi_default();
        assert_eq!(grid.size(), 40);
        let variants = grid.variants(&StrategyParams::default());
        // Any-exit needs sell floor >= buy ceiling: 5+4+3+2 valid pairs. All-exit keeps all 20.
        assert_eq!(variants.len(), 14 + 20);
        assert!(variants.iter().all(|v| v.params.validate().is_ok()));
    }

    #[test]
    fn top_n_is_clamped() {
        let candles = candles(300);
        let results = run_sweep(&candles, &preset_variants(), BacktestConfig::default()).unwrap();
        assert_eq!(results.top_n(10).len(), 3);
        assert_eq!(results.top_n(1).len(), 1);
    }

    #[test]
    fn short_series_fails_the_sweep() {
        let candles = candles(30);
        assert!(run_sweep(&candles, &preset_variants(), BacktestConfig::default()).is_err());
    }
}
