/*
 *
 *
 *
 *
 * MIT License
 * Copyright (c) 2025. Dwight J. Browne
 * dwight[-at-]dwightjbrowne[-dot-]com
 *
 *
 * Permission is hereby granted, free of charge, to any person obtaining a copy
 * of this software and associated documentation files (the "Software"), to deal
 * in the Software without restriction, including without limitation the rights
 * to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
 * copies of the Software, and to permit persons to whom the Software is
 * furnished to do so, subject to the following conditions:
 *
 * The above copyright notice and this permission notice shall be included in all
 * copies or substantial portions of the Software.
 *
 * THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
 * IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
 * FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
 * AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
 * LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
 * OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
 * SOFTWARE.
 */

//! Chunked REST retrieval with bounded concurrency and host-rotating
//! retries.
//!
//! Callers are expected to have already aligned `range` to interval
//! boundaries (`kline_core::alignment`) before calling [`fetch_range`] —
//! chunk planning here only slices an already-aligned range, it does not
//! re-round it.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use kline_client::rest::{KlineRow, RestClient};
use kline_core::error::{Error, IntegrityError, Result};
use kline_core::types::{Interval, MarketType, TimeRange};
use kline_models::Candle;
use std::sync::Arc;
use std::time::Duration as StdDuration;
use tracing::{debug, warn};

use crate::batch_processor::{self, BatchResult};

/// Binance's published default REST weight budget per rolling minute.
/// Crossing 80% of it is logged for the caller to act on; this layer
/// never throttles on it itself — acting on the advisory is a caller
/// policy decision.
const BINANCE_DEFAULT_WEIGHT_QUOTA_1M: u32 = 1200;

/// One successfully fetched REST chunk: its candles plus the advisory
/// `x-mbx-used-weight-1m` header value, if Binance sent one.
#[derive(Debug, Clone, Default)]
pub struct RestChunkResult {
    pub candles: Vec<Candle>,
    pub used_weight_1m: Option<u32>,
}

pub struct RestFetcher {
    client: RestClient,
    market: MarketType,
    retry_count: u32,
}

impl RestFetcher {
    pub fn new(market: MarketType, timeout_seconds: u64, retry_count: u32) -> Result<Self> {
        Ok(Self { client: RestClient::new(market, timeout_seconds)?, market, retry_count })
    }

    /// Builds a fetcher against an explicit host list — for tests that
    /// point at a mock server instead of the real exchange.
    pub fn with_hosts(market: MarketType, timeout_seconds: u64, retry_count: u32, hosts: Vec<&'static str>) -> Result<Self> {
        Ok(Self { client: RestClient::with_hosts(market, timeout_seconds, hosts)?, market, retry_count })
    }

    /// Fetches one chunk, retrying up to `retry_count` times. Each attempt
    /// calls `RestClient::fetch_klines` fresh (with the transport's own
    /// retry disabled via `retry_count=1`) so every attempt draws a new
    /// host from the pool — host rotation on transport error/rate-limit is
    /// this layer's job, not `kline-client::transport`'s.
    async fn fetch_chunk_with_retry(&self, symbol: &str, interval: Interval, range: TimeRange) -> Result<RestChunkResult> {
        let start_ms = range.start().timestamp_millis();
        let end_ms = range.end().timestamp_millis() - 1;
        let limit = self.market.max_limit();
        let mut last_error = None;

        for attempt in 1..=self.retry_count.max(1) {
            match self.client.fetch_klines(symbol, interval.as_str(), start_ms, end_ms, limit, 1).await {
                Ok(response) => {
                    if let Some(weight) = response.used_weight_1m {
                        if weight * 5 >= BINANCE_DEFAULT_WEIGHT_QUOTA_1M * 4 {
                            debug!(symbol, weight, quota = BINANCE_DEFAULT_WEIGHT_QUOTA_1M, "crossed 80% of rest weight quota");
                        }
                    }
                    let candles =
                        response.rows.into_iter().map(|row| row_to_candle(row, interval)).collect::<Result<Vec<_>>>()?;
                    return Ok(RestChunkResult { candles, used_weight_1m: response.used_weight_1m });
                }
                Err(err @ (Error::TransportError(_) | Error::RateLimited { .. })) => {
                    warn!(symbol, attempt, error = %err, "rest chunk failed, rotating host and retrying");
                    last_error = Some(err);
                    if attempt < self.retry_count.max(1) {
                        tokio::time::sleep(StdDuration::from_secs(backoff_seconds(attempt))).await;
                    }
                }
                Err(err) => return Err(err),
            }
        }

        Err(last_error.unwrap_or(Error::TransportError("max retries exceeded".into())))
    }
}

/// `min(2^attempt, 60)` seconds, matching `kline-client::transport`'s
/// backoff so retries look uniform across layers.
fn backoff_seconds(attempt: u32) -> u64 {
    2u64.saturating_pow(attempt).min(60)
}

fn row_to_candle(row: KlineRow, interval: Interval) -> Result<Candle> {
    let open_time = DateTime::from_timestamp_millis(row.open_time_ms)
        .ok_or_else(|| Error::IntegrityError(IntegrityError::MalformedArchive("open_time out of range".into())))?;
    Ok(Candle::new(
        open_time,
        row.open,
        row.high,
        row.low,
        row.close,
        row.volume,
        row.quote_volume,
        row.trades,
        row.taker_buy_volume,
        row.taker_buy_quote_volume,
        interval,
    ))
}

/// Per-interval-tier chunk-duration cap, capped again by `rest_chunk_size`
/// records worth of span: 1s→1000s, 1m→1000min,
/// other minute tiers→7 days, hour tiers→30 days, day/week/month→uncapped
/// beyond `rest_chunk_size * interval`.
fn chunk_duration(interval: Interval, rest_chunk_size: u32) -> ChronoDuration {
    let by_record_count = ChronoDuration::seconds(interval.duration_seconds() * i64::from(rest_chunk_size.max(1)));
    let tier_cap = match interval {
        Interval::Sec1 => ChronoDuration::seconds(1000),
        Interval::Min1 => ChronoDuration::minutes(1000),
        Interval::Min3 | Interval::Min5 | Interval::Min15 | Interval::Min30 => ChronoDuration::days(7),
        Interval::Hour1 | Interval::Hour2 | Interval::Hour4 | Interval::Hour6 | Interval::Hour8 | Interval::Hour12 => {
            ChronoDuration::days(30)
        }
        Interval::Day1 | Interval::Day3 | Interval::Week1 | Interval::Month1 => by_record_count,
    };
    by_record_count.min(tier_cap)
}

/// Slices an already-aligned range into consecutive chunks, capped at
/// `rest_max_chunks`.
fn plan_chunks(range: TimeRange, interval: Interval, rest_chunk_size: u32, rest_max_chunks: u32) -> Vec<TimeRange> {
    let duration = chunk_duration(interval, rest_chunk_size);
    let mut chunks = Vec::new();
    let mut cursor = range.start();
    while cursor < range.end() && chunks.len() < rest_max_chunks.max(1) as usize {
        let chunk_end = std::cmp::min(cursor + duration, range.end());
        match TimeRange::new(cursor, chunk_end) {
            Ok(chunk) => chunks.push(chunk),
            Err(_) => break,
        }
        cursor = chunk_end;
    }
    chunks
}

/// Fans [`RestFetcher::fetch_chunk_with_retry`] out over the planned
/// chunks with bounded concurrency.
pub async fn fetch_range(
    fetcher: Arc<RestFetcher>,
    symbol: String,
    interval: Interval,
    range: TimeRange,
    rest_chunk_size: u32,
    rest_max_chunks: u32,
    max_concurrency: usize,
) -> BatchResult<RestChunkResult, Error> {
    let chunks = plan_chunks(range, interval, rest_chunk_size, rest_max_chunks);
    batch_processor::run_bounded(chunks, max_concurrency, move |chunk| {
        let fetcher = fetcher.clone();
        let symbol = symbol.clone();
        Box::pin(async move { fetcher.fetch_chunk_with_retry(&symbol, interval, chunk).await })
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn dt(y: i32, mo: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, 0, 0).unwrap()
    }

    #[test]
    fn minute_tier_caps_at_thousand_minutes() {
        let duration = chunk_duration(Interval::Min1, 100_000);
        assert_eq!(duration, ChronoDuration::minutes(1000));
    }

    #[test]
    fn small_rest_chunk_size_is_not_inflated_past_record_count() {
        let duration = chunk_duration(Interval::Min1, 10);
        assert_eq!(duration, ChronoDuration::minutes(10));
    }

    #[test]
    fn hour_tier_caps_at_thirty_days() {
        let duration = chunk_duration(Interval::Hour1, 100_000);
        assert_eq!(duration, ChronoDuration::days(30));
    }

    #[test]
    fn day_tier_is_uncapped_beyond_record_count() {
        let duration = chunk_duration(Interval::Day1, 500);
        assert_eq!(duration, ChronoDuration::days(500));
    }

    #[test]
    fn plan_chunks_covers_whole_range_without_gaps() {
        let range = TimeRange::new(dt(2024, 1, 1, 0), dt(2024, 1, 1, 3)).unwrap();
        let chunks = plan_chunks(range, Interval::Hour1, 1, 10);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].start(), range.start());
        assert_eq!(chunks.last().unwrap().end(), range.end());
        for window in chunks.windows(2) {
            assert_eq!(window[0].end(), window[1].start());
        }
    }

    #[test]
    fn plan_chunks_respects_max_chunk_count() {
        let range = TimeRange::new(dt(2024, 1, 1, 0), dt(2024, 1, 10, 0)).unwrap();
        let chunks = plan_chunks(range, Interval::Hour1, 1, 3);
        assert_eq!(chunks.len(), 3);
    }

    #[tokio::test]
    async fn fetch_chunk_parses_and_rotates_on_rate_limit() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .respond_with(wiremock::ResponseTemplate::new(429).insert_header("Retry-After", "0"))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_json(serde_json::json!([[
                1704067200000i64, "1", "2", "0.5", "1.5", "10", 1704067259999i64, "100", 5, "4", "40", "0"
            ]])))
            .mount(&server)
            .await;

        let leaked: &'static str = Box::leak(server.uri().into_boxed_str());
        let fetcher = RestFetcher::with_hosts(MarketType::Spot, 5, 2, vec![leaked]).unwrap();

        let range = TimeRange::new(dt(2024, 1, 1, 0), dt(2024, 1, 1, 1)).unwrap();
        let result = fetcher.fetch_chunk_with_retry("BTCUSDT", Interval::Min1, range).await.unwrap();
        assert_eq!(result.candles.len(), 1);
    }
}
