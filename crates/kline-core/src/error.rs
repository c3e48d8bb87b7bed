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

use crate::types::{Interval, MarketType};
use thiserror::Error;

/// The error taxonomy every component in this workspace converts into
/// before it crosses a public function boundary.
#[derive(Error, Debug)]
pub enum Error {
  #[error("invalid input: {0}")]
  InvalidInput(#[from] InvalidInput),

  #[error("transport error: {0}")]
  TransportError(String),

  #[error("rate limited, retry after {retry_after_secs}s")]
  RateLimited { retry_after_secs: u64 },

  #[error("remote not found: {url}")]
  RemoteNotFound { url: String },

  #[error("integrity error: {0}")]
  IntegrityError(#[from] IntegrityError),

  #[error("cache error: {0}")]
  CacheError(String),

  #[error("cancelled")]
  Cancelled,
}

#[derive(Error, Debug)]
pub enum InvalidInput {
  #[error("range start {start} is not before end {end}")]
  RangeNotOrdered { start: String, end: String },

  #[error("interval {interval} is not supported by market {market}")]
  UnsupportedInterval { interval: Interval, market: MarketType },

  #[error("end time {end} is in the future")]
  FutureTime { end: String },

  #[error("naive (non-timezone-aware) datetime rejected: {value}")]
  NaiveDatetime { value: String },

  #[error("invalid configuration: {0}")]
  Configuration(String),

  #[error("forced REST_ONLY range spans {days} calendar days, exceeding the {max_days}-day limit")]
  ForcedRestRangeTooLong { days: i64, max_days: i64 },

  #[error("forced REST_ONLY lookback of {days} days exceeds the {max_days}-day historical limit")]
  ForcedRestLookbackTooOld { days: i64, max_days: i64 },
}

#[derive(Error, Debug)]
pub enum IntegrityError {
  #[error("checksum mismatch for {path}: expected {expected}, got {actual}")]
  ChecksumMismatch { path: String, expected: String, actual: String },

  #[error("malformed archive: {0}")]
  MalformedArchive(String),

  #[error("csv schema mismatch: expected {expected} columns, found {found}")]
  CsvSchema { expected: usize, found: usize },

  #[error("table invariant violated: {0}")]
  InvariantViolated(String),
}

impl From<std::io::Error> for Error {
  fn from(err: std::io::Error) -> Self {
    Error::TransportError(err.to_string())
  }
}

impl From<serde_json::Error> for Error {
  fn from(err: serde_json::Error) -> Self {
    Error::CacheError(err.to_string())
  }
}

impl From<chrono::ParseError> for Error {
  fn from(err: chrono::ParseError) -> Self {
    Error::InvalidInput(InvalidInput::NaiveDatetime { value: err.to_string() })
  }
}

impl From<csv::Error> for Error {
  fn from(err: csv::Error) -> Self {
    Error::IntegrityError(IntegrityError::MalformedArchive(err.to_string()))
  }
}

impl From<zip::result::ZipError> for Error {
  fn from(err: zip::result::ZipError) -> Self {
    Error::IntegrityError(IntegrityError::MalformedArchive(err.to_string()))
  }
}

impl From<reqwest::Error> for Error {
  fn from(err: reqwest::Error) -> Self {
    if err.is_timeout() || err.is_connect() {
      Error::TransportError(err.to_string())
    } else if let Some(status) = err.status() {
      if status.as_u16() == 418 || status.as_u16() == 429 {
        Error::RateLimited { retry_after_secs: 0 }
      } else if status.as_u16() == 404 {
        Error::RemoteNotFound { url: err.url().map(|u| u.to_string()).unwrap_or_default() }
      } else {
        Error::TransportError(err.to_string())
      }
    } else {
      Error::TransportError(err.to_string())
    }
  }
}

pub type Result<T> = std::result::Result<T, Error>;
