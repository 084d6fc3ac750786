//! SignalBot CLI: backtest, signal, sizing, sweep, and paper-trading commands.
//!
//! Commands:
//! - `backtest`: run the configured strategy over CSV or synthetic candles
//! - `signal`: evaluate the latest candle window and print the decision
//! - `size`: compute an order quantity from price, stop, capital, and risk
//! - `sweep`: backtest every preset (or a threshold grid) and rank by P&L
//! - `paper`: replay candles through the polling trader with a paper sink
//! - `generate`: write a seeded synthetic candle CSV

use anyhow::{bail, Context, Result};
use chrono::NaiveDateTime;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use signalbot_core::domain::Interval;
use signalbot_core::engine::OpenPositionPolicy;
use signalbot_core::signals::{EmaRsiStrategy, Preset, SignalGenerator};
use signalbot_core::sizers::{stoploss_below, FixedRiskSizer};
use signalbot_runner::config::{BotConfig, StrategyConfig, TradingMode};
use signalbot_runner::data_loader::{
    load_candles_csv, save_candles_csv, synthetic_candles, LoadedCandles, ReplayFeed,
};
use signalbot_runner::export::{export_json, save_artifacts};
use signalbot_runner::live::{LiveTrader, PaperSink};
use signalbot_runner::report::{render_summary, render_sweep};
use signalbot_runner::runner::run_backtest_on;
use signalbot_runner::sweep::{preset_variants, run_sweep, ParamGrid};

#[derive(Parser)]
#[command(
    name = "signalbot",
    about = "SignalBot CLI: EMA/RSI signal bot with backtesting and paper trading"
)]
struct Cli {
    /// Debug-level logging (overridden by RUST_LOG).
    #[arg(short, long, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Where candles come from.
#[derive(Args, Clone)]
struct DataArgs {
    /// CSV file with header timestamp,open,high,low,close,volume.
    #[arg(long, conflicts_with = "synthetic")]
    csv: Option<PathBuf>,

    /// Generate this many synthetic candles instead of reading a file.
    #[arg(long)]
    synthetic: Option<usize>,

    /// Seed for synthetic candles.
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Start timestamp for synthetic candles (YYYY-MM-DD HH:MM:SS).
    #[arg(long, default_value = "2024-01-02 09:15:00")]
    start: String,
}

/// Configuration file plus command-line overrides.
#[derive(Args, Clone)]
struct ConfigArgs {
    /// Path to a TOML config file. Defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Threshold preset: neutral_band, wide_band, momentum.
    #[arg(long)]
    preset: Option<Preset>,
}

#[derive(Subcommand)]
enum Commands {
    /// Backtest the configured strategy.
    Backtest {
        #[command(flatten)]
        data: DataArgs,

        #[command(flatten)]
        cfg: ConfigArgs,

        /// Override the lookback window.
        #[arg(long)]
        lookback: Option<usize>,

        /// Close a final open position at the last close and count it.
        #[arg(long, default_value_t = false)]
        mark_to_market: bool,

        /// Print the report as JSON instead of text.
        #[arg(long, default_value_t = false)]
        json: bool,

        /// Write report.json, trades.csv, signals.csv, summary.txt here.
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
    /// Evaluate the most recent candle window.
    Signal {
        #[command(flatten)]
        data: DataArgs,

        #[command(flatten)]
        cfg: ConfigArgs,
    },
    /// Compute an order quantity.
    Size {
        /// Entry price.
        #[arg(long)]
        price: f64,

        /// Stop price. Defaults to price × (1 − stoploss_pct).
        #[arg(long)]
        stoploss: Option<f64>,

        #[arg(long)]
        stoploss_pct: Option<f64>,

        #[arg(long)]
        capital: Option<f64>,

        /// Fraction of capital risked per trade.
        #[arg(long)]
        risk: Option<f64>,

        #[arg(long)]
        max_quantity: Option<u64>,

        #[command(flatten)]
        cfg: ConfigArgs,
    },
    /// Backtest every preset, or a threshold grid, and rank by total P&L.
    Sweep {
        #[command(flatten)]
        data: DataArgs,

        #[command(flatten)]
        cfg: ConfigArgs,

        /// Sweep the RSI threshold grid around the configured parameters.
        #[arg(long, default_value_t = false)]
        grid: bool,

        /// Rows to print.
        #[arg(long, default_value_t = 10)]
        top: usize,
    },
    /// Replay candles through the polling trader, logging paper orders.
    Paper {
        #[command(flatten)]
        data: DataArgs,

        #[command(flatten)]
        cfg: ConfigArgs,

        /// Candle index to start trading from. Defaults to the lookback.
        #[arg(long)]
        warmup: Option<usize>,

        /// Stop after this many cycles.
        #[arg(long)]
        max_cycles: Option<u64>,
    },
    /// Write synthetic candles to a CSV file.
    Generate {
        #[command(flatten)]
        data: DataArgs,

        /// Output CSV path.
        #[arg(long)]
        out: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Backtest {
            data,
            cfg,
            lookback,
            mark_to_market,
            json,
            output_dir,
        } => run_backtest_cmd(data, cfg, lookback, mark_to_market, json, output_dir),
        Commands::Signal { data, cfg } => run_signal_cmd(data, cfg),
        Commands::Size {
            price,
            stoploss,
            stoploss_pct,
            capital,
            risk,
            max_quantity,
            cfg,
        } => run_size_cmd(price, stoploss, stoploss_pct, capital, risk, max_quantity, cfg),
        Commands::Sweep {
            data,
            cfg,
            grid,
            top,
        } => run_sweep_cmd(data, cfg, grid, top),
        Commands::Paper {
            data,
            cfg,
            warmup,
            max_cycles,
        } => run_paper_cmd(data, cfg, warmup, max_cycles),
        Commands::Generate { data, out } => run_generate_cmd(data, out),
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(args: &ConfigArgs) -> Result<BotConfig> {
    let mut config = match &args.config {
        Some(path) => BotConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => BotConfig::default(),
    };
    if let Some(preset) = args.preset {
        config.strategy = StrategyConfig::preset(preset);
    }
    config.validate()?;
    Ok(config)
}

fn load_data(args: &DataArgs, interval: Interval) -> Result<LoadedCandles> {
    match (&args.csv, args.synthetic) {
        (Some(path), _) => Ok(load_candles_csv(path)?),
        (None, Some(count)) => {
            let start = NaiveDateTime::parse_from_str(&args.start, "%Y-%m-%d %H:%M:%S")
                .with_context(|| format!("invalid --start '{}'", args.start))?;
            tracing::warn!(seed = args.seed, count, "using synthetic candles");
            Ok(synthetic_candles(args.seed, count, start, interval))
        }
        (None, None) => bail!("one of --csv or --synthetic is required"),
    }
}

fn run_backtest_cmd(
    data: DataArgs,
    cfg: ConfigArgs,
    lookback: Option<usize>,
    mark_to_market: bool,
    json: bool,
    output_dir: Option<PathBuf>,
) -> Result<()> {
    let mut config = load_config(&cfg)?;
    if let Some(lookback) = lookback {
        config.backtest.lookback = lookback;
    }
    if mark_to_market {
        config.backtest.open_position = OpenPositionPolicy::MarkToMarket;
    }

    let loaded = load_data(&data, config.instrument.interval)?;
    let report = run_backtest_on(&config, &loaded)?;

    if json {
        println!("{}", export_json(&report)?);
    } else {
        print!("{}", render_summary(&report));
    }

    if let Some(dir) = output_dir {
        let paths = save_artifacts(&report, &dir)?;
        println!("Artifacts saved to: {}", paths.dir.display());
    }

    Ok(())
}

fn run_signal_cmd(data: DataArgs, cfg: ConfigArgs) -> Result<()> {
    let config = load_config(&cfg)?;
    let loaded = load_data(&data, config.instrument.interval)?;
    let strategy = EmaRsiStrategy::new(config.strategy.params())?;
    let eval = strategy.evaluate_detailed(&loaded.candles);

    println!("{}", eval.signal);
    match (eval.row, eval.hold_reason) {
        (Some(row), _) => println!(
            "  {}  close={:.2} ema_fast={:.2} ema_slow={:.2} rsi={:.2}",
            row.timestamp, row.close, row.ema_fast, row.ema_slow, row.rsi
        ),
        (None, Some(reason)) => println!("  {reason}"),
        (None, None) => {}
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn run_size_cmd(
    price: f64,
    stoploss: Option<f64>,
    stoploss_pct: Option<f64>,
    capital: Option<f64>,
    risk: Option<f64>,
    max_quantity: Option<u64>,
    cfg: ConfigArgs,
) -> Result<()> {
    let config = load_config(&cfg)?;
    let capital = capital.unwrap_or(config.risk.capital);
    let risk = risk.unwrap_or(config.risk.risk_per_trade);
    let max_quantity = max_quantity.or(config.risk.max_quantity);

    let stoploss = match stoploss {
        Some(stop) => stop,
        None => stoploss_below(price, stoploss_pct.unwrap_or(config.risk.stoploss_pct))?,
    };

    let sizer = FixedRiskSizer::new(capital, risk)?.with_max_quantity(max_quantity);
    let quantity = sizer.quantity(price, stoploss)?;

    println!("price={price:.2} stoploss={stoploss:.2} risk_amount={:.2}", sizer.risk_amount());
    println!("quantity={quantity}");
    if quantity == 0 {
        println!("risk budget does not cover one share; no order would be placed");
    }
    Ok(())
}

fn run_sweep_cmd(data: DataArgs, cfg: ConfigArgs, grid: bool, top: usize) -> Result<()> {
    let config = load_config(&cfg)?;
    let loaded = load_data(&data, config.instrument.interval)?;

    let variants = if grid {
        ParamGrid::rsi_default().variants(&config.strategy.params())
    } else {
        preset_variants()
    };
    if variants.is_empty() {
        bail!("no valid sweep variants");
    }

    let results = run_sweep(&loaded.candles, &variants, config.backtest_config())?;
    print!("{}", render_sweep(&results, top));
    Ok(())
}

fn run_paper_cmd(
    data: DataArgs,
    cfg: ConfigArgs,
    warmup: Option<usize>,
    max_cycles: Option<u64>,
) -> Result<()> {
    let mut config = load_config(&cfg)?;
    if config.live.mode == TradingMode::Live {
        bail!("live mode needs a broker order sink; this build only trades on paper");
    }
    if max_cycles.is_some() {
        config.live.max_cycles = max_cycles;
    }

    let loaded = load_data(&data, config.instrument.interval)?;
    let warmup = warmup.unwrap_or(config.backtest.lookback);
    if warmup >= loaded.candles.len() {
        bail!(
            "warmup {warmup} leaves no candles to replay (have {})",
            loaded.candles.len()
        );
    }

    let feed = ReplayFeed::starting_at(config.instrument.symbol.clone(), loaded.candles, warmup);
    let sink = PaperSink::new();
    let mut trader = LiveTrader::new(&config, &feed, &sink)?;

    let mut first = true;
    let summary = trader.run_loop(
        || {
            if std::mem::take(&mut first) {
                feed.now()
            } else {
                feed.advance()
            }
        },
        // Replay advances on the candle clock, not the wall clock.
        |_| {},
    )?;

    println!(
        "cycles={} orders={} skipped={} errors={}",
        summary.cycles, summary.orders, summary.skipped, summary.errors
    );
    for order in sink.orders() {
        println!(
            "  {} {} {} x{}",
            order.order_id, order.side, order.symbol, order.quantity
        );
    }
    Ok(())
}

fn run_generate_cmd(data: DataArgs, out: PathBuf) -> Result<()> {
    let Some(count) = data.synthetic else {
        bail!("--synthetic <COUNT> is required");
    };
    let loaded = load_data(&data, Interval::default())?;
    save_candles_csv(&out, &loaded.candles)?;
    println!(
        "wrote {count} candles to {} (hash {})",
        out.display(),
        &loaded.dataset_hash[..12]
    );
    Ok(())
}
