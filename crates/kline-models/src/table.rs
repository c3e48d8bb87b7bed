//! An ordered, duplicate-free sequence of Candles for one (symbol, market,
//! interval) stream.
//!
//! The in-memory representation is a plain `Vec<Candle>` kept sorted and
//! deduplicated by construction — the invariants it must uphold are simple
//! enough that a `DataFrame` round-trip for every mutation would only add
//! indirection. `DataFrame` conversion exists at the single boundary that
//! actually needs a columnar, self-describing representation: the Arrow
//! IPC cache file (`kline-cache`), via [`Table::to_dataframe`] /
//! [`Table::from_dataframe`].

use crate::candle::Candle;
use kline_core::error::{Error, IntegrityError, Result};
use kline_core::types::{Interval, TimeRange};
use polars::prelude::*;

#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    interval: Interval,
    candles: Vec<Candle>,
}

impl Table {
    /// An empty table retaining its column schema and interval.
    pub fn empty(interval: Interval) -> Self {
        Self { interval, candles: Vec::new() }
    }

    /// Builds a Table from unordered, possibly-duplicated candles: sorts by
    /// `open_time` ascending, drops duplicates keeping the first occurrence
    ///, then validates every row.
    pub fn from_candles(mut candles: Vec<Candle>, interval: Interval) -> Result<Self> {
        candles.sort_by_key(|c| c.open_time);
        candles.dedup_by_key(|c| c.open_time);
        for candle in &candles {
            candle.validate(interval)?;
        }
        Ok(Self { interval, candles })
    }

    pub fn interval(&self) -> Interval {
        self.interval
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    pub fn candles(&self) -> &[Candle] {
        &self.candles
    }

    pub fn into_candles(self) -> Vec<Candle> {
        self.candles
    }

    /// Checks the Table-level invariants: strictly
    /// increasing `open_time` spaced by exactly `interval`, and containment
    /// within `[aligned_start, aligned_end]`. Gaps (missing steps) are
    /// permitted — the exchange itself may report none — but are returned
    /// so the caller can log them.
    pub fn detect_gaps(&self) -> Vec<(chrono::DateTime<chrono::Utc>, chrono::DateTime<chrono::Utc>)> {
        let step = chrono::Duration::microseconds(self.interval.duration_microseconds());
        let mut gaps = Vec::new();
        for window in self.candles.windows(2) {
            let expected_next = window[0].open_time + step;
            if window[1].open_time > expected_next {
                gaps.push((expected_next, window[1].open_time));
            }
        }
        gaps
    }

    pub fn is_monotonic_increasing(&self) -> bool {
        self.candles.windows(2).all(|w| w[0].open_time < w[1].open_time)
    }

    /// Filters to exactly `[range.start, range.end]` inclusive-inclusive.
    /// The request range is half-open, but by the time this is called
    /// `range` has already been aligned to candle boundaries, so filtering
    /// the candles themselves inclusively is equivalent.
    pub fn filter_range(&self, range: TimeRange) -> Self {
        let filtered = self
            .candles
            .iter()
            .filter(|c| c.open_time >= range.start() && c.open_time <= range.end())
            .cloned()
            .collect();
        Self { interval: self.interval, candles: filtered }
    }

    /// Merges several fragments (cache hits, archive days, REST chunks)
    /// into one Table: concatenates, sorts, and deduplicates by
    /// `open_time` keeping the first occurrence.
    pub fn merge(fragments: Vec<Table>, interval: Interval) -> Result<Self> {
        let mut all = Vec::new();
        for fragment in fragments {
            all.extend(fragment.candles);
        }
        Self::from_candles(all, interval)
    }

    /// Converts to a columnar `DataFrame` with the `open_time` primary
    /// axis, for handoff to the Arrow IPC cache writer.
    pub fn to_dataframe(&self) -> Result<DataFrame> {
        let open_time: Vec<i64> = self.candles.iter().map(|c| c.open_time.timestamp_micros()).collect();
        let close_time: Vec<i64> = self.candles.iter().map(|c| c.close_time.timestamp_micros()).collect();
        let open: Vec<f64> = self.candles.iter().map(|c| c.open).collect();
        let high: Vec<f64> = self.candles.iter().map(|c| c.high).collect();
        let low: Vec<f64> = self.candles.iter().map(|c| c.low).collect();
        let close: Vec<f64> = self.candles.iter().map(|c| c.close).collect();
        let volume: Vec<f64> = self.candles.iter().map(|c| c.volume).collect();
        let quote_volume: Vec<f64> = self.candles.iter().map(|c| c.quote_volume).collect();
        let trades: Vec<i32> = self.candles.iter().map(|c| c.trades).collect();
        let taker_buy_volume: Vec<f64> = self.candles.iter().map(|c| c.taker_buy_volume).collect();
        let taker_buy_quote_volume: Vec<f64> = self.candles.iter().map(|c| c.taker_buy_quote_volume).collect();

        let df = df! {
            "open_time" => open_time,
            "open" => open,
            "high" => high,
            "low" => low,
            "close" => close,
            "volume" => volume,
            "quote_volume" => quote_volume,
            "close_time" => close_time,
            "trades" => trades,
            "taker_buy_volume" => taker_buy_volume,
            "taker_buy_quote_volume" => taker_buy_quote_volume,
        }
        .map_err(|e| Error::IntegrityError(IntegrityError::InvariantViolated(e.to_string())))?;

        df.lazy()
            .with_column(col("open_time").cast(DataType::Datetime(TimeUnit::Microseconds, Some("UTC".into()))))
            .with_column(col("close_time").cast(DataType::Datetime(TimeUnit::Microseconds, Some("UTC".into()))))
            .collect()
            .map_err(|e| Error::IntegrityError(IntegrityError::InvariantViolated(e.to_string())))
    }

    /// Reconstructs a Table from a `DataFrame` produced by
    /// [`Table::to_dataframe`] (or read back from the cache), validating
    /// every row on the way in.
    pub fn from_dataframe(df: &DataFrame, interval: Interval) -> Result<Self> {
        let schema_err = |msg: String| Error::IntegrityError(IntegrityError::InvariantViolated(msg));

        let open_time = df
            .column("open_time")
            .map_err(|e| schema_err(e.to_string()))?
            .datetime()
            .map_err(|e| schema_err(e.to_string()))?;
        let close_time = df
            .column("close_time")
            .map_err(|e| schema_err(e.to_string()))?
            .datetime()
            .map_err(|e| schema_err(e.to_string()))?;
        let open = df.column("open").map_err(|e| schema_err(e.to_string()))?.f64().map_err(|e| schema_err(e.to_string()))?;
        let high = df.column("high").map_err(|e| schema_err(e.to_string()))?.f64().map_err(|e| schema_err(e.to_string()))?;
        let low = df.column("low").map_err(|e| schema_err(e.to_string()))?.f64().map_err(|e| schema_err(e.to_string()))?;
        let close =
            df.column("close").map_err(|e| schema_err(e.to_string()))?.f64().map_err(|e| schema_err(e.to_string()))?;
        let volume =
            df.column("volume").map_err(|e| schema_err(e.to_string()))?.f64().map_err(|e| schema_err(e.to_string()))?;
        let quote_volume = df
            .column("quote_volume")
            .map_err(|e| schema_err(e.to_string()))?
            .f64()
            .map_err(|e| schema_err(e.to_string()))?;
        let trades =
            df.column("trades").map_err(|e| schema_err(e.to_string()))?.i32().map_err(|e| schema_err(e.to_string()))?;
        let taker_buy_volume = df
            .column("taker_buy_volume")
            .map_err(|e| schema_err(e.to_string()))?
            .f64()
            .map_err(|e| schema_err(e.to_string()))?;
        let taker_buy_quote_volume = df
            .column("taker_buy_quote_volume")
            .map_err(|e| schema_err(e.to_string()))?
            .f64()
            .map_err(|e| schema_err(e.to_string()))?;

        let mut candles = Vec::with_capacity(df.height());
        for i in 0..df.height() {
            let ot = open_time.get(i).ok_or_else(|| schema_err("null open_time".into()))?;
            let ct = close_time.get(i).ok_or_else(|| schema_err("null close_time".into()))?;
            candles.push(Candle {
                open_time: chrono::DateTime::from_timestamp_micros(ot).ok_or_else(|| schema_err("bad open_time".into()))?,
                close_time: chrono::DateTime::from_timestamp_micros(ct)
                    .ok_or_else(|| schema_err("bad close_time".into()))?,
                open: open.get(i).ok_or_else(|| schema_err("null open".into()))?,
                high: high.get(i).ok_or_else(|| schema_err("null high".into()))?,
                low: low.get(i).ok_or_else(|| schema_err("null low".into()))?,
                close: close.get(i).ok_or_else(|| schema_err("null close".into()))?,
                volume: volume.get(i).ok_or_else(|| schema_err("null volume".into()))?,
                quote_volume: quote_volume.get(i).ok_or_else(|| schema_err("null quote_volume".into()))?,
                trades: trades.get(i).ok_or_else(|| schema_err("null trades".into()))?,
                taker_buy_volume: taker_buy_volume.get(i).ok_or_else(|| schema_err("null taker_buy_volume".into()))?,
                taker_buy_quote_volume: taker_buy_quote_volume
                    .get(i)
                    .ok_or_else(|| schema_err("null taker_buy_quote_volume".into()))?,
            });
        }

        Self::from_candles(candles, interval)
    }
}
