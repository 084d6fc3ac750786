//! Candle loading for backtests and paper replay.
//!
//! Sources:
//! 1. CSV file with header `timestamp,open,high,low,close,volume`
//! 2. Seeded synthetic random walk (developer mode, tagged as synthetic)
//!
//! Either source can be wrapped in a [`ReplayFeed`], which serves the
//! candles through the `MarketData` seam one step at a time.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use thiserror::Error;
use tracing::{debug, info};

use signalbot_core::data::{FeedError, MarketData};
use signalbot_core::domain::{first_out_of_order, Candle, Interval};

/// Starting price of the synthetic walk.
pub const SYNTHETIC_START_PRICE: f64 = 2500.0;

/// Errors from the data loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to open {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("row {row}: unrecognised timestamp '{value}'")]
    BadTimestamp { row: usize, value: String },

    #[error("row {row}: non-finite or non-positive close")]
    BadClose { row: usize },

    #[error("row {row}: inconsistent OHLC prices")]
    BadOhlc { row: usize },

    #[error("candle {index} is not after its predecessor")]
    OutOfOrder { index: usize },

    #[error("no candles in {0}")]
    Empty(String),
}

/// Where a candle series came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DataSource {
    Csv { path: String },
    Synthetic { seed: u64 },
}

/// A loaded candle series with its provenance.
#[derive(Debug, Clone)]
pub struct LoadedCandles {
    pub candles: Vec<Candle>,
    pub source: DataSource,
    /// BLAKE3 over every candle, for report fingerprinting.
    pub dataset_hash: String,
}

impl LoadedCandles {
    pub fn is_synthetic(&self) -> bool {
        matches!(self.source, DataSource::Synthetic { .. })
    }
}

#[derive(Debug, Deserialize)]
struct CsvRow {
    timestamp: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    #[serde(default)]
    volume: f64,
}

fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.naive_local());
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, fmt) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Load candles from a CSV file, oldest first.
///
/// Rows must be strictly increasing in time; the loader does not sort.
pub fn load_candles_csv(path: &Path) -> Result<LoadedCandles, LoadError> {
    let file = std::fs::File::open(path).map_err(|source| LoadError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(file);

    let mut candles = Vec::new();
    for (row, record) in reader.deserialize::<CsvRow>().enumerate() {
        let record = record?;
        let timestamp =
            parse_timestamp(&record.timestamp).ok_or_else(|| LoadError::BadTimestamp {
                row,
                value: record.timestamp.clone(),
            })?;
        if !(record.close.is_finite() && record.close > 0.0) {
            return Err(LoadError::BadClose { row });
        }
        let candle = Candle {
            timestamp,
            open: record.open,
            high: record.high,
            low: record.low,
            close: record.close,
            volume: record.volume.max(0.0).round() as u64,
        };
        if !candle.is_sane() {
            return Err(LoadError::BadOhlc { row });
        }
        candles.push(candle);
    }

    if candles.is_empty() {
        return Err(LoadError::Empty(path.display().to_string()));
    }
    if let Some(index) = first_out_of_order(&candles) {
        return Err(LoadError::OutOfOrder { index });
    }

    info!(path = %path.display(), candles = candles.len(), "loaded candles from csv");
    let dataset_hash = dataset_hash(&candles);
    Ok(LoadedCandles {
        candles,
        source: DataSource::Csv {
            path: path.display().to_string(),
        },
        dataset_hash,
    })
}

/// Write candles in the same layout `load_candles_csv` reads.
pub fn save_candles_csv(path: &Path, candles: &[Candle]) -> Result<(), LoadError> {
    let mut writer = csv::Writer::from_path(path)?;
    for candle in candles {
        writer.serialize(candle)?;
    }
    writer.flush().map_err(|source| LoadError::Io {
        path: path.display().to_string(),
        source,
    })?;
    Ok(())
}

/// Seeded random walk starting at [`SYNTHETIC_START_PRICE`].
///
/// The same seed always yields the same series.
pub fn synthetic_candles(
    seed: u64,
    count: usize,
    start: NaiveDateTime,
    interval: Interval,
) -> LoadedCandles {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    let mut rng = StdRng::seed_from_u64(seed);
    let step = interval.duration();
    let mut price = SYNTHETIC_START_PRICE;

    let candles: Vec<Candle> = (0..count)
        .map(|i| {
            let ret: f64 = rng.gen_range(-0.004..0.004);
            let open = price;
            let close = price * (1.0 + ret);
            let high = open.max(close) * (1.0 + rng.gen_range(0.0..0.0015));
            let low = open.min(close) * (1.0 - rng.gen_range(0.0..0.0015));
            let volume = rng.gen_range(1_000..50_000u64);
            price = close;
            Candle {
                timestamp: start + step * i as i32,
                open,
                high,
                low,
                close,
                volume,
            }
        })
        .collect();

    debug!(seed, count, "generated synthetic candles");
    let dataset_hash = dataset_hash(&candles);
    LoadedCandles {
        candles,
        source: DataSource::Synthetic { seed },
        dataset_hash,
    }
}

/// Deterministic BLAKE3 hash over timestamps and OHLCV values.
pub fn dataset_hash(candles: &[Candle]) -> String {
    let mut hasher = blake3::Hasher::new();
    for candle in candles {
        hasher.update(candle.timestamp.to_string().as_bytes());
        hasher.update(&candle.open.to_le_bytes());
        hasher.update(&candle.high.to_le_bytes());
        hasher.update(&candle.low.to_le_bytes());
        hasher.update(&candle.close.to_le_bytes());
        hasher.update(&candle.volume.to_le_bytes());
    }
    hasher.finalize().to_hex().to_string()
}

/// Serves a fixed candle series through `MarketData`, one candle at a time.
///
/// The cursor marks the "current" candle: history requests see nothing
/// after it and the last price is its close.
#[derive(Debug)]
pub struct ReplayFeed {
    symbol: String,
    candles: Vec<Candle>,
    cursor: AtomicUsize,
}

impl ReplayFeed {
    /// Feed positioned on the last candle.
    pub fn new(symbol: impl Into<String>, candles: Vec<Candle>) -> Self {
        let last = candles.len().saturating_sub(1);
        Self::starting_at(symbol, candles, last)
    }

    /// Feed positioned on candle `index` (clamped to the series).
    pub fn starting_at(symbol: impl Into<String>, candles: Vec<Candle>, index: usize) -> Self {
        let index = index.min(candles.len().saturating_sub(1));
        Self {
            symbol: symbol.into(),
            candles,
            cursor: AtomicUsize::new(index),
        }
    }

    pub fn candles(&self) -> &[Candle] {
        &self.candles
    }

    pub fn position(&self) -> usize {
        self.cursor.load(Ordering::Relaxed)
    }

    /// Timestamp of the current candle.
    pub fn now(&self) -> Option<NaiveDateTime> {
        self.candles.get(self.position()).map(|c| c.timestamp)
    }

    /// Step to the next candle. Returns its timestamp, or `None` at the end.
    pub fn advance(&self) -> Option<NaiveDateTime> {
        let next = self.position() + 1;
        let candle = self.candles.get(next)?;
        self.cursor.store(next, Ordering::Relaxed);
        Some(candle.timestamp)
    }
}

impl MarketData for ReplayFeed {
    fn name(&self) -> &str {
        "replay"
    }

    fn fetch_historical(
        &self,
        instrument: &str,
        from: NaiveDateTime,
        to: NaiveDateTime,
        _interval: Interval,
    ) -> Result<Vec<Candle>, FeedError> {
        if self.candles.is_empty() {
            return Err(FeedError::DataUnavailable {
                instrument: instrument.to_string(),
                reason: "replay series is empty".into(),
            });
        }
        let end = self.position() + 1;
        Ok(self.candles[..end]
            .iter()
            .filter(|c| c.timestamp >= from && c.timestamp <= to)
            .cloned()
            .collect())
    }

    fn fetch_last_price(&self, symbol: &str) -> Result<Option<f64>, FeedError> {
        if symbol != self.symbol {
            return Ok(None);
        }
        Ok(self.candles.get(self.position()).map(|c| c.close))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn start() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_opt(9, 15, 0)
            .unwrap()
    }

    fn write_csv(body: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(body.as_bytes()).unwrap();
        file
    }

    #[test]
    fn loads_csv_with_mixed_timestamp_formats() {
        let file = write_csv(
            "timestamp,open,high,low,close,volume\n\
             2024-01-02 09:15:00,2500,2505,2495,2502,1200\n\
             2024-01-02T09:20:00,2502,2508,2500,2507,900\n\
             2024-01-02T09:25:00+05:30,2507,2510,2501,2503,1000\n",
        );
        let loaded = load_candles_csv(file.path()).unwrap();
        assert_eq!(loaded.candles.len(), 3);
        assert_eq!(loaded.candles[1].close, 2507.0);
        assert_eq!(loaded.candles[2].volume, 1000);
        assert!(!loaded.is_synthetic());
    }

    #[test]
    fn rejects_out_of_order_rows() {
        let file = write_csv(
            "timestamp,open,high,low,close,volume\n\
             2024-01-02 09:20:00,1,1,1,1,1\n\
             2024-01-02 09:15:00,1,1,1,1,1\n",
        );
        assert!(matches!(
            load_candles_csv(file.path()),
            Err(LoadError::OutOfOrder { index: 1 })
        ));
    }

    #[test]
    fn rejects_bad_timestamp_and_close() {
        let file = write_csv("timestamp,open,high,low,close,volume\nyesterday,1,1,1,1,1\n");
        assert!(matches!(
            load_candles_csv(file.path()),
            Err(LoadError::BadTimestamp { row: 0, .. })
        ));

        let file = write_csv("timestamp,open,high,low,close,volume\n2024-01-02,1,1,1,NaN,1\n");
        assert!(matches!(
            load_candles_csv(file.path()),
            Err(LoadError::BadClose { row: 0 })
        ));
    }

    #[test]
    fn rejects_high_below_close() {
        let file = write_csv(
            "timestamp,open,high,low,close,volume\n\
             2024-01-02 09:15:00,2500,2505,2495,2502,1200\n\
             2024-01-02 09:20:00,2502,2501,2498,2507,900\n",
        );
        assert!(matches!(
            load_candles_csv(file.path()),
            Err(LoadError::BadOhlc { row: 1 })
        ));
    }

    #[test]
    fn empty_csv_is_an_error() {
        let file = write_csv("timestamp,open,high,low,close,volume\n");
        assert!(matches!(load_candles_csv(file.path()), Err(LoadError::Empty(_))));
    }

    #[test]
    fn save_then_load_preserves_series() {
        let series = synthetic_candles(7, 20, start(), Interval::FiveMinute);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("candles.csv");
        save_candles_csv(&path, &series.candles).unwrap();
        let loaded = load_candles_csv(&path).unwrap();
        assert_eq!(loaded.candles, series.candles);
        assert_eq!(loaded.dataset_hash, series.dataset_hash);
    }

    #[test]
    fn synthetic_is_seeded() {
        let a = synthetic_candles(42, 100, start(), Interval::FiveMinute);
        let b = synthetic_candles(42, 100, start(), Interval::FiveMinute);
        let c = synthetic_candles(43, 100, start(), Interval::FiveMinute);
        assert_eq!(a.candles, b.candles);
        assert_eq!(a.dataset_hash, b.dataset_hash);
        assert_ne!(a.dataset_hash, c.dataset_hash);
        assert_eq!(a.candles[0].open, SYNTHETIC_START_PRICE);
        assert!(a.is_synthetic());
        assert!(first_out_of_order(&a.candles).is_none());
        assert!(a.candles.iter().all(|c| c.is_sane()));
    }

    #[test]
    fn replay_feed_hides_future_candles() {
        let series = synthetic_candles(1, 10, start(), Interval::FiveMinute);
        let feed = ReplayFeed::starting_at("TEST", series.candles.clone(), 3);

        let from = start();
        let to = start() + chrono::Duration::days(1);
        let visible = feed
            .fetch_historical("TEST", from, to, Interval::FiveMinute)
            .unwrap();
        assert_eq!(visible.len(), 4);
        assert_eq!(
            feed.fetch_last_price("TEST").unwrap(),
            Some(series.candles[3].close)
        );
        assert_eq!(feed.fetch_last_price("OTHER").unwrap(), None);

        assert_eq!(feed.advance(), Some(series.candles[4].timestamp));
        assert_eq!(feed.position(), 4);
    }

    #[test]
    fn replay_feed_stops_at_the_end() {
        let series = synthetic_candles(1, 3, start(), Interval::FiveMinute);
        let feed = ReplayFeed::new("TEST", series.candles);
        assert_eq!(feed.position(), 2);
        assert_eq!(feed.advance(), None);
        assert_eq!(feed.position(), 2);
    }
}
