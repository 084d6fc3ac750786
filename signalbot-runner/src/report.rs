//! Plain-text backtest report: metrics block and per-trade breakdown.

use std::fmt::Write;

use signalbot_core::engine::Metrics;

use crate::runner::BacktestReport;
use crate::sweep::SweepResults;

fn opt(value: Option<f64>, suffix: &str) -> String {
    match value {
        Some(v) => format!("{v:.2}{suffix}"),
        None => "n/a".to_string(),
    }
}

/// Metrics block shared by the single-run and sweep reports.
pub fn render_metrics(metrics: &Metrics) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Total trades:      {}", metrics.total_trades);
    let _ = writeln!(
        out,
        "Winners / losers:  {} / {} ({} flat)",
        metrics.winning_trades, metrics.losing_trades, metrics.breakeven_trades
    );
    let _ = writeln!(out, "Win rate:          {}", opt(metrics.win_rate, "%"));
    let _ = writeln!(out, "Total P&L:         {:.2}", metrics.total_pnl);
    let _ = writeln!(out, "Avg P&L per trade: {}", opt(metrics.avg_pnl_pct, "%"));
    let _ = writeln!(out, "Avg win:           {}", opt(metrics.avg_win, ""));
    let _ = writeln!(out, "Avg loss:          {}", opt(metrics.avg_loss, ""));
    let _ = writeln!(out, "Max win:           {}", opt(metrics.max_win, ""));
    let _ = writeln!(out, "Max loss:          {}", opt(metrics.max_loss, ""));
    let _ = writeln!(out, "Profit factor:     {}", opt(metrics.profit_factor, ""));
    let _ = writeln!(out, "Expected value:    {}", opt(metrics.expected_value, ""));
    let _ = writeln!(out, "Reward/risk:       {}", opt(metrics.reward_risk_ratio, ""));
    out
}

/// Full text report for one backtest.
pub fn render_summary(report: &BacktestReport) -> String {
    let run = &report.run;
    let mut out = String::new();

    let _ = writeln!(out, "=== Backtest: {} ({}) ===", report.symbol, run.strategy);
    if report.is_synthetic() {
        let _ = writeln!(out, "WARNING: synthetic data");
    }
    let _ = writeln!(
        out,
        "Candles:           {} ({} .. {})",
        run.candle_count,
        report.first_timestamp.as_deref().unwrap_or("-"),
        report.last_timestamp.as_deref().unwrap_or("-")
    );
    let _ = writeln!(out, "Lookback:          {}", run.config.lookback);
    let counts = run.signal_counts();
    let _ = writeln!(
        out,
        "Signals:           {} BUY / {} SELL / {} HOLD",
        counts.buy, counts.sell, counts.hold
    );
    let _ = writeln!(out, "Config:            {}", &report.config_fingerprint[..12.min(report.config_fingerprint.len())]);
    let _ = writeln!(out);

    out.push_str(&render_metrics(&run.metrics));

    if let (Some(position), Some(unrealized)) = (&run.open_position, run.unrealized_pnl) {
        let _ = writeln!(
            out,
            "Open position:     long from candle {} @ {:.2} (unrealized {:+.2}, excluded)",
            position.entry_index, position.entry_price, unrealized
        );
    }

    if !run.trades.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "--- Trades ---");
        let _ = writeln!(
            out,
            "{:>4}  {:>6} {:>10}  {:>6} {:>10}  {:>10} {:>8}  {}",
            "#", "entry", "price", "exit", "price", "pnl", "pnl%", "exit"
        );
        for (i, t) in run.trades.iter().enumerate() {
            let _ = writeln!(
                out,
                "{:>4}  {:>6} {:>10.2}  {:>6} {:>10.2}  {:>+10.2} {:>+7.2}%  {:?}",
                i + 1,
                t.entry_index,
                t.entry_price,
                t.exit_index,
                t.exit_price,
                t.pnl,
                t.pnl_pct,
                t.exit_reason
            );
        }
    }

    out
}

/// Ranking table for a sweep.
pub fn render_sweep(results: &SweepResults, top: usize) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "=== Sweep: {} variants ===", results.len());
    let _ = writeln!(
        out,
        "{:>4}  {:<28} {:>7} {:>9} {:>12} {:>8}",
        "rank", "variant", "trades", "win%", "total_pnl", "pf"
    );
    for (i, entry) in results.top_n(top).iter().enumerate() {
        let m = &entry.metrics;
        let _ = writeln!(
            out,
            "{:>4}  {:<28} {:>7} {:>9} {:>12.2} {:>8}",
            i + 1,
            entry.label,
            m.total_trades,
            opt(m.win_rate, ""),
            m.total_pnl,
            opt(m.profit_factor, "")
        );
    }
    out
}
