//! SignalBot Runner: configuration, data loading, sweeps, reports, live loop.
//!
//! This crate builds on `signalbot-core` to provide:
//! - TOML bot configuration with validation and fingerprinting
//! - Candle loading from CSV or a seeded synthetic walk, and a replay feed
//! - Single-backtest runner producing a serializable report
//! - Parallel parameter sweeps ranked by total P&L
//! - Text, JSON, and CSV report output
//! - The polling live / paper trader

pub mod config;
pub mod data_loader;
pub mod export;
pub mod live;
pub mod report;
pub mod runner;
pub mod sweep;

pub use config::{BotConfig, ConfigError, TradingMode};
pub use data_loader::{
    load_candles_csv, save_candles_csv, synthetic_candles, DataSource, LoadError, LoadedCandles,
    ReplayFeed,
};
pub use export::{save_artifacts, ArtifactPaths};
pub use live::{CycleOutcome, LiveError, LiveTrader, LoopSummary, PaperSink};
pub use report::{render_summary, render_sweep};
pub use runner::{
    run_backtest_from_csv, run_backtest_on, run_backtest_with_config, BacktestReport, RunError,
};
pub use sweep::{preset_variants, run_sweep, ParamGrid, SweepResults, SweepVariant};
