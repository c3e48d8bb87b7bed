//! A single OHLCV record.

use chrono::{DateTime, Utc};
use kline_core::error::{Error, IntegrityError};
use kline_core::types::Interval;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub open_time: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub quote_volume: f64,
    pub close_time: DateTime<Utc>,
    pub trades: i32,
    pub taker_buy_volume: f64,
    pub taker_buy_quote_volume: f64,
}

impl Candle {
    /// Builds a Candle, deriving `close_time` from `open_time + interval − 1µs`
    ///. Does not itself validate the row — see [`Candle::validate`].
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        open_time: DateTime<Utc>,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
        quote_volume: f64,
        trades: i32,
        taker_buy_volume: f64,
        taker_buy_quote_volume: f64,
        interval: Interval,
    ) -> Self {
        let close_time = open_time + chrono::Duration::microseconds(interval.duration_microseconds() - 1);
        Self {
            open_time,
            open,
            high,
            low,
            close,
            volume,
            quote_volume,
            close_time,
            trades,
            taker_buy_volume,
            taker_buy_quote_volume,
        }
    }

    /// Checks the row-level invariants: close time matches open time plus
    /// the interval's duration, high is not below low, and volume/trades
    /// are not negative.
    pub fn validate(&self, interval: Interval) -> kline_core::error::Result<()> {
        let expected_close = self.open_time + chrono::Duration::microseconds(interval.duration_microseconds() - 1);
        if self.close_time != expected_close {
            return Err(Error::IntegrityError(IntegrityError::InvariantViolated(format!(
                "closeTime {} does not equal openTime + interval - 1us ({})",
                self.close_time, expected_close
            ))));
        }
        if self.high < self.low {
            return Err(Error::IntegrityError(IntegrityError::InvariantViolated(format!(
                "high {} < low {}",
                self.high, self.low
            ))));
        }
        if self.volume < 0.0 {
            return Err(Error::IntegrityError(IntegrityError::InvariantViolated(format!(
                "negative volume {}",
                self.volume
            ))));
        }
        if self.trades < 0 {
            return Err(Error::IntegrityError(IntegrityError::InvariantViolated(format!(
                "negative trade count {}",
                self.trades
            ))));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample(interval: Interval) -> Candle {
        let open_time = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        Candle::new(open_time, 100.0, 110.0, 90.0, 105.0, 1000.0, 50_000.0, 42, 400.0, 20_000.0, interval)
    }

    #[test]
    fn close_time_derivation_matches_invariant() {
        let candle = sample(Interval::Min1);
        assert_eq!(candle.close_time - candle.open_time, chrono::Duration::microseconds(60_000_000 - 1));
    }

    #[test]
    fn valid_candle_passes_validation() {
        assert!(sample(Interval::Min1).validate(Interval::Min1).is_ok());
    }

    #[test]
    fn high_below_low_fails_validation() {
        let mut candle = sample(Interval::Min1);
        candle.high = 1.0;
        candle.low = 2.0;
        assert!(candle.validate(Interval::Min1).is_err());
    }

    #[test]
    fn negative_volume_fails_validation() {
        let mut candle = sample(Interval::Min1);
        candle.volume = -1.0;
        assert!(candle.validate(Interval::Min1).is_err());
    }

    #[test]
    fn negative_trades_fails_validation() {
        let mut candle = sample(Interval::Min1);
        candle.trades = -1;
        assert!(candle.validate(Interval::Min1).is_err());
    }

    #[test]
    fn wrong_interval_close_time_fails_validation() {
        let candle = sample(Interval::Min1);
        assert!(candle.validate(Interval::Min5).is_err());
    }
}
