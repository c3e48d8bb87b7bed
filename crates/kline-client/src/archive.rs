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

//! The bulk daily-archive ("Vision") wire client: ZIP + CHECKSUM GETs and
//! digest computation. Retry-once-on-checksum-mismatch and
//! day-pool concurrency are engine-level concerns (`kline-engine::archive_fetcher`);
//! this module only fetches bytes and verifies them.

use crate::transport::Transport;
use chrono::NaiveDate;
use kline_core::error::Result;
use kline_core::types::MarketType;
use sha2::{Digest, Sha256};

const VISION_BASE_URL: &str = "https://data.binance.vision";

pub fn zip_url(market: MarketType, symbol: &str, interval_str: &str, day: NaiveDate) -> String {
    zip_url_with_base(VISION_BASE_URL, market, symbol, interval_str, day)
}

pub fn checksum_url(market: MarketType, symbol: &str, interval_str: &str, day: NaiveDate) -> String {
    format!("{}.CHECKSUM", zip_url(market, symbol, interval_str, day))
}

/// Same as [`zip_url`] against an arbitrary base, so tests can point the
/// archive client at a `wiremock` server instead of the real Vision host.
pub fn zip_url_with_base(base: &str, market: MarketType, symbol: &str, interval_str: &str, day: NaiveDate) -> String {
    let segment = market.vision_path_segment();
    let date = day.format("%Y-%m-%d");
    format!("{base}/data/{segment}/daily/klines/{symbol}/{interval_str}/{symbol}-{interval_str}-{date}.zip")
}

pub fn checksum_url_with_base(base: &str, market: MarketType, symbol: &str, interval_str: &str, day: NaiveDate) -> String {
    format!("{}.CHECKSUM", zip_url_with_base(base, market, symbol, interval_str, day))
}

pub struct ArchiveClient {
    transport: Transport,
    base_url: String,
}

impl ArchiveClient {
    pub fn new(timeout_seconds: u64) -> Result<Self> {
        Ok(Self { transport: Transport::new(timeout_seconds)?, base_url: VISION_BASE_URL.to_string() })
    }

    /// Same as [`ArchiveClient::new`] but against an arbitrary base URL,
    /// for scenario tests that mock the Vision host with `wiremock`.
    pub fn with_base_url(base_url: impl Into<String>, timeout_seconds: u64) -> Result<Self> {
        Ok(Self { transport: Transport::new(timeout_seconds)?, base_url: base_url.into() })
    }

    pub fn zip_url(&self, market: MarketType, symbol: &str, interval_str: &str, day: NaiveDate) -> String {
        zip_url_with_base(&self.base_url, market, symbol, interval_str, day)
    }

    pub fn checksum_url(&self, market: MarketType, symbol: &str, interval_str: &str, day: NaiveDate) -> String {
        checksum_url_with_base(&self.base_url, market, symbol, interval_str, day)
    }

    pub async fn fetch_zip_bytes(&self, url: &str, retry_count: u32) -> Result<Vec<u8>> {
        let response = self.transport.get_with_retry(url, retry_count).await?;
        Ok(response.bytes().await.map_err(kline_core::error::Error::from)?.to_vec())
    }

    /// Fetches the `.CHECKSUM` sidecar and returns the lowercase hex digest
    ///.
    pub async fn fetch_checksum(&self, url: &str, retry_count: u32) -> Result<String> {
        let response = self.transport.get_with_retry(url, retry_count).await?;
        let text = response.text().await.map_err(kline_core::error::Error::from)?;
        Ok(text.split_whitespace().next().unwrap_or_default().to_lowercase())
    }
}

/// Lowercase hex SHA-256 of `bytes`, comparable directly to a parsed
/// `.CHECKSUM` digest.
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}
