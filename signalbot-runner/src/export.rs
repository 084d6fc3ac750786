//! Reporting and export: JSON and CSV artifact generation.
//!
//! - **JSON**: full round-trip serialization of a `BacktestReport`
//! - **CSV**: trade tape and signal trace for external analysis tools
//! - **Text**: the rendered summary from `report`
//!
//! Persisted reports carry a `schema_version`. Newer versions are rejected
//! on load.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use tracing::info;

use signalbot_core::domain::Trade;
use signalbot_core::engine::SignalRecord;

use crate::report::render_summary;
use crate::runner::{BacktestReport, SCHEMA_VERSION};

// ─── JSON export ────────────────────────────────────────────────────

pub fn export_json(report: &BacktestReport) -> Result<String> {
    serde_json::to_string_pretty(report).context("failed to serialize BacktestReport to JSON")
}

/// Deserialize a `BacktestReport`, rejecting unknown schema versions.
pub fn import_json(json: &str) -> Result<BacktestReport> {
    let report: BacktestReport =
        serde_json::from_str(json).context("failed to deserialize BacktestReport from JSON")?;
    if report.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            report.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(report)
}

// ─── CSV export ─────────────────────────────────────────────────────

/// Columns: entry_index, entry_price, exit_index, exit_price, pnl, pnl_pct,
/// bars_held, exit_reason
pub fn export_trades_csv(trades: &[Trade]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "entry_index",
        "entry_price",
        "exit_index",
        "exit_price",
        "pnl",
        "pnl_pct",
        "bars_held",
        "exit_reason",
    ])?;

    for t in trades {
        wtr.write_record([
            &t.entry_index.to_string(),
            &format!("{:.4}", t.entry_price),
            &t.exit_index.to_string(),
            &format!("{:.4}", t.exit_price),
            &format!("{:.4}", t.pnl),
            &format!("{:.4}", t.pnl_pct),
            &t.bars_held().to_string(),
            &format!("{:?}", t.exit_reason),
        ])?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Columns: index, timestamp, close, signal
pub fn export_signals_csv(signals: &[SignalRecord]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["index", "timestamp", "close", "signal"])?;
    for s in signals {
        wtr.write_record([
            &s.index.to_string(),
            &s.timestamp.to_string(),
            &format!("{:.4}", s.close),
            s.signal.as_str(),
        ])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Paths written by [`save_artifacts`].
#[derive(Debug, Clone)]
pub struct ArtifactPaths {
    pub dir: PathBuf,
    pub report_json: PathBuf,
    pub trades_csv: PathBuf,
    pub signals_csv: PathBuf,
    pub summary_txt: PathBuf,
}

/// Save the full artifact set for one backtest.
///
/// Creates `{symbol}_{fingerprint prefix}/` under `output_dir` containing
/// `report.json`, `trades.csv`, `signals.csv`, and `summary.txt`. Rerunning
/// the same config overwrites the same directory.
pub fn save_artifacts(report: &BacktestReport, output_dir: &Path) -> Result<ArtifactPaths> {
    let prefix = &report.config_fingerprint[..12.min(report.config_fingerprint.len())];
    let dir = output_dir.join(format!("{}_{}", report.symbol, prefix));
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create artifact dir: {}", dir.display()))?;

    let paths = ArtifactPaths {
        report_json: dir.join("report.json"),
        trades_csv: dir.join("trades.csv"),
        signals_csv: dir.join("signals.csv"),
        summary_txt: dir.join("summary.txt"),
        dir,
    };

    write(&paths.report_json, &export_json(report)?)?;
    write(&paths.trades_csv, &export_trades_csv(&report.run.trades)?)?;
    write(&paths.signals_csv, &export_signals_csv(&report.run.signals)?)?;
    write(&paths.summary_txt, &render_summary(report))?;

    info!(dir = %paths.dir.display(), "artifacts saved");
    Ok(paths)
}

fn write(path: &Path, contents: &str) -> Result<()> {
    std::fs::write(path, contents).with_context(|| format!("failed to write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BotConfig;
    use crate::data_loader::synthetic_candles;
    use crate::runner::run_backtest_on;
    use chrono::NaiveDate;
    use signalbot_core::domain::Interval;

    fn report() -> BacktestReport {
        let start = NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_opt(9, 15, 0)
            .unwrap();
        let loaded = synthetic_candles(9, 500, start, Interval::FiveMinute);
        run_backtest_on(&BotConfig::default(), &loaded).unwrap()
    }

    #[test]
    fn json_round_trip() {
        let report = report();
        let back = import_json(&export_json(&report).unwrap()).unwrap();
        assert_eq!(back.config_fingerprint, report.config_fingerprint);
        assert_eq!(back.dataset_hash, report.dataset_hash);
        assert_eq!(back.source, report.source);
        assert_eq!(back.run.signals.len(), report.run.signals.len());
        assert_eq!(back.run.trades.len(), report.run.trades.len());
        assert_eq!(back.run.metrics.total_trades, report.run.metrics.total_trades);
        assert!((back.run.metrics.total_pnl - report.run.metrics.total_pnl).abs() < 1e-6);
    }

    #[test]
    fn newer_schema_is_rejected() {
        let mut report = report();
        report.schema_version = SCHEMA_VERSION + 1;
        let json = export_json(&report).unwrap();
        assert!(import_json(&json).is_err());
    }

    #[test]
    fn signals_csv_has_one_row_per_signal() {
        let report = report();
        let csv = export_signals_csv(&report.run.signals).unwrap();
        let mut lines = csv.lines();
        assert_eq!(lines.next(), Some("index,timestamp,close,signal"));
        assert_eq!(lines.count(), report.run.signals.len());
        assert!(csv.contains(",HOLD") || csv.contains(",BUY") || csv.contains(",SELL"));
    }

    #[test]
    fn save_artifacts_writes_bundle() {
        let report = report();
        let dir = tempfile::tempdir().unwrap();
        let paths = save_artifacts(&report, dir.path()).unwrap();
        assert!(paths.report_json.exists());
        assert!(paths.trades_csv.exists());
        assert!(paths.signals_csv.exists());
        let summary = std::fs::read_to_string(&paths.summary_txt).unwrap();
        assert!(summary.contains("RELIANCE"));

        let trades = std::fs::read_to_string(&paths.trades_csv).unwrap();
        assert_eq!(trades.lines().count(), report.run.trades.len() + 1);
    }
}
