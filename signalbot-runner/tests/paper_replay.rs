//! Paper trading against a replayed candle series.
//!
//! The replay feed plays the role of the broker: each cycle advances one
//! candle, so the live loop sees exactly what it would have seen in real time.

use chrono::NaiveDate;
use proptest::prelude::*;
use signalbot_core::domain::{Interval, OrderSide};
use signalbot_runner::config::BotConfig;
use signalbot_runner::data_loader::{synthetic_candles, ReplayFeed};
use signalbot_runner::live::{LiveTrader, PaperSink};

fn start() -> chrono::NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, 2)
        .unwrap()
        .and_hms_opt(9, 15, 0)
        .unwrap()
}

fn replay(seed: u64, candles: usize, warmup: usize) -> (ReplayFeed, PaperSink, BotConfig) {
    let series = synthetic_candles(seed, candles, start(), Interval::FiveMinute);
    let mut config = BotConfig::default();
    config.instrument.symbol = "TEST".into();
    config.live.poll_interval_secs = 0;
    let feed = ReplayFeed::starting_at("TEST", series.candles, warmup);
    (feed, PaperSink::new(), config)
}

#[test]
fn replay_runs_every_candle_once() {
    let (feed, sink, config) = replay(3, 400, 60);
    let mut trader = LiveTrader::new(&config, &feed, &sink).unwrap();

    let mut first = true;
    let summary = trader
        .run_loop(
            || {
                if std::mem::take(&mut first) {
                    feed.now()
                } else {
                    feed.advance()
                }
            },
            |_| {},
        )
        .unwrap();

    assert_eq!(summary.cycles, 400 - 60);
    assert_eq!(summary.errors, 0);
    assert_eq!(summary.orders as usize, sink.orders().len());
}

#[test]
fn replay_honours_max_cycles() {
    let (feed, sink, mut config) = replay(4, 300, 60);
    config.live.max_cycles = Some(25);
    let mut trader = LiveTrader::new(&config, &feed, &sink).unwrap();

    let summary = trader.run_loop(|| feed.advance(), |_| {}).unwrap();
    assert_eq!(summary.cycles, 25);
    assert_eq!(feed.position(), 85);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    /// A SELL is only ever sent after a BUY, and never twice in a row.
    #[test]
    fn sells_follow_buys(seed in 0u64..10_000) {
        let (feed, sink, config) = replay(seed, 250, 50);
        let mut trader = LiveTrader::new(&config, &feed, &sink).unwrap();
        trader.run_loop(|| feed.advance(), |_| {}).unwrap();

        let mut holding = false;
        for order in sink.orders() {
            match order.side {
                OrderSide::Buy => holding = true,
                OrderSide::Sell => {
                    prop_assert!(holding, "SELL without a prior BUY");
                    holding = false;
                }
            }
        }
    }
}
