//! Look-ahead contamination tests.
//!
//! No indicator value at candle t may depend on candle t+1 or later, and the
//! backtest signal at candle i must be the same whether or not later candles
//! exist.
//!
//! Method: compute on a truncated series and on the full series and assert
//! the overlapping prefix is identical.

use chrono::NaiveDate;
use signalbot_core::domain::Candle;
use signalbot_core::engine::{BacktestConfig, BacktestEngine};
use signalbot_core::indicators::{Ema, Indicator, IndicatorFrame, IndicatorPeriods, Rsi};
use signalbot_core::signals::{EmaRsiStrategy, Preset};

/// N five-minute candles from a deterministic LCG random walk.
fn make_test_candles(n: usize) -> Vec<Candle> {
    let base = NaiveDate::from_ymd_opt(2024, 1, 2)
        .unwrap()
        .and_hms_opt(9, 15, 0)
        .unwrap();
    let mut candles = Vec::with_capacity(n);
    let mut price = 2500.0;

    for i in 0..n {
        let seed = (i as u64).wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        let change = ((seed >> 33) % 200) as f64 * 0.1 - 10.0;
        let open = price;
        price = (price + change).max(100.0);

        candles.push(Candle {
            timestamp: base + chrono::Duration::minutes(5 * i as i64),
            open,
            high: open.max(price) + 2.0,
            low: open.min(price) - 2.0,
            close: price,
            volume: 10_000 + (i as u64 * 37) % 5_000,
        });
    }

    candles
}

fn assert_same_prefix(name: &str, truncated: &[f64], full: &[f64]) {
    for (i, (t, f)) in truncated.iter().zip(full).enumerate() {
        if t.is_nan() && f.is_nan() {
            continue;
        }
        assert!(
            (t - f).abs() < 1e-10,
            "{name}: value at {i} differs: truncated={t}, full={f}"
        );
    }
}

#[test]
fn ema_has_no_lookahead() {
    let candles = make_test_candles(200);
    for period in [20, 50] {
        let ema = Ema::new(period);
        let truncated = ema.compute(&candles[..100]);
        let full = ema.compute(&candles);
        assert_eq!(truncated.len(), 100);
        assert_same_prefix(&format!("ema_{period}"), &truncated, &full[..100]);
    }
}

#[test]
fn rsi_has_no_lookahead() {
    let candles = make_test_candles(200);
    let rsi = Rsi::new(14);
    let truncated = rsi.compute(&candles[..100]);
    let full = rsi.compute(&candles);
    assert_eq!(truncated.len(), 100);
    assert_same_prefix("rsi_14", &truncated, &full[..100]);
}

#[test]
fn indicator_frame_rows_have_no_lookahead() {
    let candles = make_test_candles(200);
    let periods = IndicatorPeriods::default();
    let truncated = IndicatorFrame::compute(&candles[..120], &periods).unwrap();
    let full = IndicatorFrame::compute(&candles, &periods).unwrap();

    assert_eq!(truncated.len(), 71);
    for (t, f) in truncated.rows().iter().zip(full.rows()) {
        assert_eq!(t.index, f.index);
        assert!((t.ema_fast - f.ema_fast).abs() < 1e-10);
        assert!((t.ema_slow - f.ema_slow).abs() < 1e-10);
        assert!((t.rsi - f.rsi).abs() < 1e-10);
    }
}

#[test]
fn backtest_signal_ignores_future_candles() {
    let candles = make_test_candles(160);
    for preset in Preset::ALL {
        let strategy = EmaRsiStrategy::new(preset.params()).unwrap();
        let full = BacktestEngine::new(strategy.clone(), BacktestConfig::default())
            .run(&candles)
            .unwrap();

        for cut in [60, 90, 120] {
            let truncated = BacktestEngine::new(strategy.clone(), BacktestConfig::default())
                .run(&candles[..=cut])
                .unwrap();
            let t = truncated.signals.last().unwrap();
            let f = full.signals.iter().find(|s| s.index == cut).unwrap();
            assert_eq!(t.index, cut);
            assert_eq!(t.signal, f.signal, "{preset}: signal at {cut} changed");
        }
    }
}

#[test]
fn changing_the_fill_candle_does_not_change_its_signal() {
    let candles = make_test_candles(120);
    let mut spiked = candles.clone();
    spiked[100].close *= 1.5;

    let strategy = EmaRsiStrategy::default();
    let a = BacktestEngine::new(&strategy, BacktestConfig::default())
        .run(&candles)
        .unwrap();
    let b = BacktestEngine::new(&strategy, BacktestConfig::default())
        .run(&spiked)
        .unwrap();

    let at = |run: &signalbot_core::BacktestRun| {
        run.signals.iter().find(|s| s.index == 100).unwrap().signal
    };
    assert_eq!(at(&a), at(&b));
}
