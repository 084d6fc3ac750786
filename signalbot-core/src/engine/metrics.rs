//! Performance metrics: pure functions over the closed trade list.
//!
//! Every ratio guards its denominator: when a metric has no defined value
//! (no trades, no winners, no losers) it is `None` rather than a sentinel.

use serde::{Deserialize, Serialize};

use crate::domain::Trade;

/// Aggregate accuracy and profitability metrics for one backtest run.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Metrics {
    pub total_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    pub breakeven_trades: usize,
    /// Winners as a percentage of all trades.
    pub win_rate: Option<f64>,
    pub avg_win: Option<f64>,
    /// Mean P&L of losing trades (negative).
    pub avg_loss: Option<f64>,
    pub max_win: Option<f64>,
    /// Worst losing trade P&L (most negative).
    pub max_loss: Option<f64>,
    pub total_pnl: f64,
    pub avg_pnl_pct: Option<f64>,
    /// Gross wins / |gross losses|. Undefined without losing trades.
    pub profit_factor: Option<f64>,
    pub expected_value: Option<f64>,
    /// avg_win / |avg_loss|. Undefined without both winners and losers.
    pub reward_risk_ratio: Option<f64>,
}

impl Metrics {
    pub fn from_trades(trades: &[Trade]) -> Self {
        let avg_win = avg_win(trades);
        let avg_loss = avg_loss(trades);
        Self {
            total_trades: trades.len(),
            winning_trades: trades.iter().filter(|t| t.is_winner()).count(),
            losing_trades: trades.iter().filter(|t| t.is_loser()).count(),
            breakeven_trades: trades.iter().filter(|t| t.pnl == 0.0).count(),
            win_rate: win_rate(trades),
            avg_win,
            avg_loss,
            max_win: max_win(trades),
            max_loss: max_loss(trades),
            total_pnl: total_pnl(trades),
            avg_pnl_pct: avg_pnl_pct(trades),
            profit_factor: profit_factor(trades),
            expected_value: expected_value(trades),
            reward_risk_ratio: reward_risk_ratio(avg_win, avg_loss),
        }
    }

    /// True when no trade closed during the run.
    pub fn is_empty(&self) -> bool {
        self.total_trades == 0
    }
}

// ─── Individual metric functions ────────────────────────────────────

pub fn total_pnl(trades: &[Trade]) -> f64 {
    trades.iter().map(|t| t.pnl).sum()
}

pub fn win_rate(trades: &[Trade]) -> Option<f64> {
    if trades.is_empty() {
        return None;
    }
    let winners = trades.iter().filter(|t| t.is_winner()).count();
    Some(winners as f64 / trades.len() as f64 * 100.0)
}

pub fn avg_win(trades: &[Trade]) -> Option<f64> {
    mean(trades.iter().filter(|t| t.is_winner()).map(|t| t.pnl))
}

pub fn avg_loss(trades: &[Trade]) -> Option<f64> {
    mean(trades.iter().filter(|t| t.is_loser()).map(|t| t.pnl))
}

pub fn max_win(trades: &[Trade]) -> Option<f64> {
    trades
        .iter()
        .filter(|t| t.is_winner())
        .map(|t| t.pnl)
        .reduce(f64::max)
}

pub fn max_loss(trades: &[Trade]) -> Option<f64> {
    trades
        .iter()
        .filter(|t| t.is_loser())
        .map(|t| t.pnl)
        .reduce(f64::min)
}

pub fn avg_pnl_pct(trades: &[Trade]) -> Option<f64> {
    mean(trades.iter().map(|t| t.pnl_pct))
}

pub fn profit_factor(trades: &[Trade]) -> Option<f64> {
    let gross_loss: f64 = trades
        .iter()
        .filter(|t| t.is_loser())
        .map(|t| t.pnl.abs())
        .sum();
    if gross_loss == 0.0 {
        return None;
    }
    let gross_profit: f64 = trades
        .iter()
        .filter(|t| t.is_winner())
        .map(|t| t.pnl)
        .sum();
    Some(gross_profit / gross_loss)
}

pub fn expected_value(trades: &[Trade]) -> Option<f64> {
    if trades.is_empty() {
        return None;
    }
    Some(total_pnl(trades) / trades.len() as f64)
}

pub fn reward_risk_ratio(avg_win: Option<f64>, avg_loss: Option<f64>) -> Option<f64> {
    match (avg_win, avg_loss) {
        (Some(win), Some(loss)) if loss != 0.0 => Some(win / loss.abs()),
        _ => None,
    }
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    (count > 0).then(|| sum / count as f64)
}
