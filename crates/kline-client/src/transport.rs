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

//! Retry-with-backoff HTTP GET wrapper.

use kline_core::error::{Error, Result};
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, warn};

/// Thin wrapper over `reqwest::Client` carrying the per-request timeout
/// and a browser-like User-Agent.
pub struct Transport {
    client: Client,
    timeout: Duration,
}

impl Transport {
    pub fn new(timeout_seconds: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .user_agent("Mozilla/5.0 (compatible; kline-engine/1.0)")
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .map_err(Error::from)?;
        Ok(Self { client, timeout: Duration::from_secs(timeout_seconds) })
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// GETs `url`, retrying up to `max_attempts` times with exponential
    /// backoff capped at 60s. On a 418/429 response, honors
    /// `Retry-After` and signals the caller to rotate hosts by returning
    /// `Error::RateLimited`; the caller (rest.rs/archive.rs) supplies the
    /// next host on the following attempt since host rotation is the
    /// fetcher's concern, not the transport's.
    pub async fn get_with_retry(&self, url: &str, max_attempts: u32) -> Result<reqwest::Response> {
        let mut last_error = None;

        for attempt in 1..=max_attempts.max(1) {
            debug!(url, attempt, "sending GET");
            match self.client.get(url).send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return Ok(response);
                    }
                    if status.as_u16() == 418 || status.as_u16() == 429 {
                        let retry_after = response
                            .headers()
                            .get("Retry-After")
                            .and_then(|v| v.to_str().ok())
                            .and_then(|v| v.parse::<u64>().ok())
                            .unwrap_or(backoff_seconds(attempt));
                        warn!(url, attempt, retry_after, "rate limited, backing off");
                        last_error = Some(Error::RateLimited { retry_after_secs: retry_after });
                        if attempt < max_attempts {
                            tokio::time::sleep(Duration::from_secs(retry_after)).await;
                        }
                        continue;
                    }
                    if status.as_u16() == 404 {
                        return Err(Error::RemoteNotFound { url: url.to_string() });
                    }
                    last_error = Some(Error::TransportError(format!("HTTP {status}")));
                }
                Err(err) => {
                    warn!(url, attempt, error = %err, "transport error");
                    last_error = Some(Error::from(err));
                }
            }

            if attempt < max_attempts {
                tokio::time::sleep(Duration::from_secs(backoff_seconds(attempt))).await;
            }
        }

        Err(last_error.unwrap_or(Error::TransportError("max retries exceeded".into())))
    }
}

/// `min(2^attempt, 60)` seconds.
fn backoff_seconds(attempt: u32) -> u64 {
    2u64.saturating_pow(attempt).min(60)
}
