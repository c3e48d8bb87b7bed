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

//! The paginated low-latency HTTP `klines` endpoint.

use crate::hosts::HostPool;
use crate::transport::Transport;
use kline_core::error::{Error, IntegrityError, Result};
use kline_core::types::MarketType;
use serde_json::Value;
use tracing::debug;

/// One raw row as returned by the REST endpoint, field order matching the
/// archive CSV exactly: `open_time, open, high, low, close,
/// volume, close_time, quote_volume, trades, taker_buy_volume,
/// taker_buy_quote_volume, ignore`.
#[derive(Debug, Clone, PartialEq)]
pub struct KlineRow {
    pub open_time_ms: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub close_time_ms: i64,
    pub quote_volume: f64,
    pub trades: i32,
    pub taker_buy_volume: f64,
    pub taker_buy_quote_volume: f64,
}

impl KlineRow {
    fn from_json_array(value: &Value) -> Result<Self> {
        let arr = value.as_array().ok_or_else(|| {
            Error::IntegrityError(IntegrityError::MalformedArchive("kline row is not a JSON array".into()))
        })?;
        if arr.len() != 12 {
            return Err(Error::IntegrityError(IntegrityError::CsvSchema { expected: 12, found: arr.len() }));
        }

        let num = |i: usize| -> Result<f64> {
            arr[i]
                .as_str()
                .and_then(|s| s.parse::<f64>().ok())
                .or_else(|| arr[i].as_f64())
                .ok_or_else(|| {
                    Error::IntegrityError(IntegrityError::MalformedArchive(format!("field {i} is not numeric")))
                })
        };
        let int = |i: usize| -> Result<i64> {
            arr[i].as_i64().ok_or_else(|| {
                Error::IntegrityError(IntegrityError::MalformedArchive(format!("field {i} is not an integer")))
            })
        };

        Ok(Self {
            open_time_ms: int(0)?,
            open: num(1)?,
            high: num(2)?,
            low: num(3)?,
            close: num(4)?,
            volume: num(5)?,
            close_time_ms: int(6)?,
            quote_volume: num(7)?,
            trades: int(8)? as i32,
            taker_buy_volume: num(9)?,
            taker_buy_quote_volume: num(10)?,
        })
    }
}

pub struct RestClient {
    transport: Transport,
    hosts: HostPool,
    market: MarketType,
}

pub struct KlinesResponse {
    pub rows: Vec<KlineRow>,
    pub used_weight_1m: Option<u32>,
}

impl RestClient {
    pub fn new(market: MarketType, timeout_seconds: u64) -> Result<Self> {
        Ok(Self { transport: Transport::new(timeout_seconds)?, hosts: HostPool::for_market(market), market })
    }

    /// Builds a client against an explicit host list instead of the market's
    /// real endpoints. Used by callers (and their tests, across crates) that
    /// need to point at a mock server — `hosts` is private so it can't be
    /// poked directly outside this module.
    pub fn with_hosts(market: MarketType, timeout_seconds: u64, hosts: Vec<&'static str>) -> Result<Self> {
        Ok(Self { transport: Transport::new(timeout_seconds)?, hosts: HostPool::from_hosts(hosts), market })
    }

    /// One chunked request: `GET {host}/api/v{n}/klines?symbol=&interval=&startTime=&endTime=&limit=`.
    pub async fn fetch_klines(
        &self,
        symbol: &str,
        interval_str: &str,
        start_time_ms: i64,
        end_time_ms: i64,
        limit: u32,
        retry_count: u32,
    ) -> Result<KlinesResponse> {
        let host = self.hosts.next();
        let version = self.market.api_version();
        let url = format!(
            "{host}/api/{version}/klines?symbol={symbol}&interval={interval_str}&startTime={start_time_ms}&endTime={end_time_ms}&limit={limit}"
        );
        debug!(url, "fetching rest klines chunk");

        let response = self.transport.get_with_retry(&url, retry_count).await?;

        let used_weight_1m = response
            .headers()
            .get("x-mbx-used-weight-1m")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u32>().ok());

        let body: Value = response.json().await.map_err(Error::from)?;
        let arr = body
            .as_array()
            .ok_or_else(|| Error::IntegrityError(IntegrityError::MalformedArchive("klines response is not a JSON array".into())))?;

        let rows = arr.iter().map(KlineRow::from_json_array).collect::<Result<Vec<_>>>()?;

        Ok(KlinesResponse { rows, used_weight_1m })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_well_formed_row() {
        let row = json!([
            1704067200000i64, "42000.10", "42100.00", "41950.00", "42050.00",
            "123.456", 1704067259999i64, "5190000.00", 321, "60.0", "2500000.00", "0"
        ]);
        let parsed = KlineRow::from_json_array(&row).unwrap();
        assert_eq!(parsed.open_time_ms, 1704067200000);
        assert_eq!(parsed.trades, 321);
        assert!((parsed.open - 42000.10).abs() < 1e-9);
    }

    #[test]
    fn rejects_row_with_wrong_column_count() {
        let row = json!([1, 2, 3]);
        assert!(KlineRow::from_json_array(&row).is_err());
    }

    #[tokio::test]
    async fn fetch_klines_parses_rows_and_weight_header() {
        let server = wiremock::MockServer::start().await;
        let body = json!([[
            1704067200000i64, "1", "2", "0.5", "1.5", "10", 1704067259999i64, "100", 5, "4", "40", "0"
        ]]);
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .respond_with(
                wiremock::ResponseTemplate::new(200)
                    .set_body_json(body)
                    .insert_header("x-mbx-used-weight-1m", "42"),
            )
            .mount(&server)
            .await;

        let mut client = RestClient::new(MarketType::Spot, 5).unwrap();
        client.hosts = HostPool::from_hosts(vec![Box::leak(server.uri().into_boxed_str())]);

        let resp = client.fetch_klines("BTCUSDT", "1m", 0, 60_000, 1000, 1).await.unwrap();
        assert_eq!(resp.rows.len(), 1);
        assert_eq!(resp.used_weight_1m, Some(42));
    }
}
