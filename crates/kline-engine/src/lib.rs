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

//! # kline-engine
//!
//! Everything that turns a `(symbol, interval, range)` request into a
//! [`kline_models::Table`]:
//!
//! - [`source_selector`] - pure REST-vs-archive decision
//! - [`archive_fetcher`] - Vision ZIP download, checksum verification, CSV parsing
//! - [`rest_fetcher`] - chunked, host-rotating REST retrieval
//! - [`batch_processor`] - the bounded-concurrency fan-out both fetchers share
//! - [`orchestrator`] - [`Orchestrator`], composing the above with [`kline_cache`]
//!
//! ## Example
//!
//! ```no_run
//! use kline_core::types::{Interval, MarketType, TimeRange};
//! use kline_core::OrchestratorConfig;
//! use kline_engine::{Orchestrator, SourceHint};
//! use chrono::{Duration, Utc};
//!
//! # async fn run() -> kline_engine::Result<()> {
//! let orchestrator = Orchestrator::new(MarketType::Spot, OrchestratorConfig::default())?;
//! let now = Utc::now();
//! let range = TimeRange::new(now - Duration::days(1), now)?;
//! let (table, coverage) = orchestrator
//!     .get_range("btcusdt", Interval::Min1, range, SourceHint::Auto)
//!     .await?;
//! println!("{} candles, {} gaps", table.len(), coverage.gap_ranges.len());
//! # Ok(())
//! # }
//! ```

pub mod archive_fetcher;
pub mod batch_processor;
pub mod error;
pub mod orchestrator;
pub mod rest_fetcher;
pub mod source_selector;

pub use archive_fetcher::{ArchiveDayResult, ArchiveFetcher};
pub use batch_processor::BatchResult;
pub use error::{EngineError, Result};
pub use orchestrator::{CoverageReport, Orchestrator};
pub use rest_fetcher::{RestChunkResult, RestFetcher};
pub use source_selector::{select_source, PrimarySource, SourceHint};
