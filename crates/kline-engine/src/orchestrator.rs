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

//! The mediator tying cache, archive, and REST together: validates a
//! request, consults the cache, dispatches to the archive and REST
//! fetchers as needed, merges fragments, persists results, and reports
//! cache-integrity and coverage statistics.

use chrono::{DateTime, Duration as ChronoDuration, NaiveDate, TimeZone, Utc};
use kline_cache::{Cache, CacheStatsSnapshot, FileCache};
use kline_core::alignment;
use kline_core::error::InvalidInput;
use kline_core::types::{Interval, MarketType, TimeRange};
use kline_core::OrchestratorConfig;
use kline_models::{CacheKey, Candle, Table};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::archive_fetcher::{self, ArchiveFetcher};
use crate::error::{EngineError, Result};
use crate::rest_fetcher::{self, RestFetcher};
use crate::source_selector::{select_source, PrimarySource, SourceHint};

/// Supplemental coverage accounting returned alongside every [`Table`]:
/// expected vs. actual point counts, duplicates dropped, detected gaps,
/// and synthesized midnight rows.
#[derive(Debug, Clone, PartialEq)]
pub struct CoverageReport {
    pub expected_points: i64,
    pub actual_points: usize,
    pub duplicate_points_removed: usize,
    pub gap_ranges: Vec<(DateTime<Utc>, DateTime<Utc>)>,
    pub synthesized_points: usize,
    /// Set when the requested range reaches into the last bar's
    /// `INCOMPLETE_BAR_THRESHOLD` window — the exchange may still revise
    /// that bar. Advisory only; never a hard error.
    pub incomplete_bar_advisory: bool,
}

/// Caps how many individual gap ranges get carried in a [`CoverageReport`];
/// beyond this the count alone is logged, not every range.
const MAX_REPORTED_GAP_RANGES: usize = 256;

/// A single request's raw (unaligned) range may not exceed this many
/// calendar days when `SourceHint::RestOnly` is forced; `Auto`/`ArchiveOnly`
/// have no such ceiling.
const MAX_FORCED_REST_RANGE_DAYS: i64 = 30;

/// A bar is considered provisionally incomplete for this many minutes past
/// its `closeTime`.
const INCOMPLETE_BAR_THRESHOLD_MINUTES: i64 = 5;

impl CoverageReport {
    fn empty(expected_points: i64) -> Self {
        Self {
            expected_points,
            actual_points: 0,
            duplicate_points_removed: 0,
            gap_ranges: Vec::new(),
            synthesized_points: 0,
            incomplete_bar_advisory: false,
        }
    }
}

/// The single entry point composing cache, archive, and REST.
pub struct Orchestrator {
    config: OrchestratorConfig,
    market: MarketType,
    cache: Arc<dyn Cache>,
    archive_fetcher: Arc<ArchiveFetcher>,
    rest_fetcher: Arc<RestFetcher>,
}

impl Orchestrator {
    pub fn new(market: MarketType, config: OrchestratorConfig) -> Result<Self> {
        config.validate()?;
        let cache: Arc<dyn Cache> = Arc::new(FileCache::new(&config.cache_dir)?);
        Self::with_cache(market, config, cache)
    }

    /// Builds an Orchestrator against a caller-supplied [`Cache`] — the
    /// seam tests use to substitute a `mockall` double or a `tempfile`
    /// cache root without touching the real filesystem.
    pub fn with_cache(market: MarketType, config: OrchestratorConfig, cache: Arc<dyn Cache>) -> Result<Self> {
        config.validate()?;
        let archive_fetcher = Arc::new(ArchiveFetcher::new(market, config.api_timeout_seconds, config.retry_count)?);
        let rest_fetcher = Arc::new(RestFetcher::new(market, config.api_timeout_seconds, config.retry_count)?);
        Self::with_fetchers(market, config, cache, archive_fetcher, rest_fetcher)
    }

    /// Builds an Orchestrator against caller-supplied cache and fetchers —
    /// the seam scenario tests use to point both fetchers at a `wiremock`
    /// server via [`ArchiveFetcher::with_base_url`]/[`RestFetcher::with_hosts`].
    pub fn with_fetchers(
        market: MarketType,
        config: OrchestratorConfig,
        cache: Arc<dyn Cache>,
        archive_fetcher: Arc<ArchiveFetcher>,
        rest_fetcher: Arc<RestFetcher>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, market, cache, archive_fetcher, rest_fetcher })
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// `GetRange`: the 8-step retrieval algorithm — normalize and
    /// align, select a source, consult the cache day by day, dispatch
    /// fetchers for misses, fall back to REST for archive days that come
    /// back empty within the Vision publication delay, merge and dedupe,
    /// persist consolidated days, and filter to the exact requested window.
    pub async fn get_range(
        &self,
        symbol: &str,
        interval: Interval,
        range: TimeRange,
        hint: SourceHint,
    ) -> Result<(Table, CoverageReport)> {
        let now = Utc::now();
        self.validate_request(interval, range, hint, now)?;
        let symbol = self.market.normalize_symbol(symbol);

        let last_included = range.end() - ChronoDuration::microseconds(1);
        let aligned_start_t = alignment::aligned_start(range.start(), interval);
        let aligned_end_t = alignment::aligned_end(last_included, interval);
        let expected_points = alignment::estimate_records(aligned_start_t, aligned_end_t, interval);

        if expected_points == 0 {
            return Ok((Table::empty(interval), CoverageReport::empty(expected_points)));
        }

        let primary = select_source(
            interval,
            range,
            self.market,
            hint,
            self.config.vision_data_delay_hours,
            self.config.rest_chunk_size,
            self.config.rest_max_chunks,
            now,
        )?;

        let days = day_range_inclusive(aligned_start_t.date_naive(), aligned_end_t.date_naive());

        let mut fragments: Vec<Table> = Vec::new();
        let mut missing_days: Vec<NaiveDate> = Vec::new();

        for day in &days {
            if self.config.use_cache && self.is_consolidated(*day, now) {
                let key = CacheKey::new(self.market, symbol.as_str(), interval, *day);
                if let Some(table) = self.cache.load(&key).await? {
                    fragments.push(table);
                    continue;
                }
            }
            missing_days.push(*day);
        }

        let mut synthesized_points = 0usize;
        let mut to_persist: Vec<(NaiveDate, Table)> = Vec::new();

        match primary {
            PrimarySource::Archive => {
                let results = archive_fetcher::fetch_days(
                    self.archive_fetcher.clone(),
                    symbol.clone(),
                    interval,
                    missing_days,
                    now,
                    self.config.max_concurrent_downloads,
                )
                .await;

                for (idx, err) in &results.failures {
                    warn!(%symbol, index = idx, error = %err, "archive day fetch failed, day will show as a gap");
                }

                for day_result in results.successes {
                    synthesized_points += day_result.synthesized_points;
                    let mut candles = day_result.candles;

                    if candles.is_empty() && self.within_vision_delay(day_result.day, now) {
                        info!(%symbol, day = %day_result.day, "archive day empty within publication delay, falling back to REST");
                        candles = self.fetch_day_via_rest(&symbol, interval, day_result.day).await;
                    }

                    if candles.is_empty() {
                        continue;
                    }
                    let table = Table::from_candles(candles, interval)?;
                    if self.config.use_cache && self.is_consolidated(day_result.day, now) {
                        to_persist.push((day_result.day, table.clone()));
                    }
                    fragments.push(table);
                }
            }
            PrimarySource::Rest => {
                for day in missing_days {
                    let candles = self.fetch_day_via_rest(&symbol, interval, day).await;
                    if candles.is_empty() {
                        continue;
                    }
                    let table = Table::from_candles(candles, interval)?;
                    if self.config.use_cache && self.is_consolidated(day, now) {
                        to_persist.push((day, table.clone()));
                    }
                    fragments.push(table);
                }
            }
        }

        for (day, table) in &to_persist {
            let key = CacheKey::new(self.market, symbol.as_str(), interval, *day);
            if let Err(err) = self.cache.store(&key, table).await {
                warn!(%symbol, %day, error = %err, "failed to persist consolidated day to cache");
            }
        }

        let raw_count: usize = fragments.iter().map(Table::len).sum();
        let merged = Table::merge(fragments, interval)?;
        let duplicate_points_removed = raw_count.saturating_sub(merged.len());

        let mut gap_ranges = merged.detect_gaps();
        if gap_ranges.len() > MAX_REPORTED_GAP_RANGES {
            warn!(total_gaps = gap_ranges.len(), "more gaps than MAX_REPORTED_GAP_RANGES, truncating report");
            gap_ranges.truncate(MAX_REPORTED_GAP_RANGES);
        }

        let filtered_candles: Vec<Candle> = merged.into_candles().into_iter().filter(|c| range.contains(c.open_time)).collect();
        let filtered = Table::from_candles(filtered_candles, interval)?;

        let last_bar_close = aligned_end_t + ChronoDuration::microseconds(interval.duration_microseconds() - 1);
        let incomplete_bar_advisory = now - last_bar_close < ChronoDuration::minutes(INCOMPLETE_BAR_THRESHOLD_MINUTES);
        if incomplete_bar_advisory {
            debug!(%symbol, %interval, close_time = %last_bar_close, "requested range reaches into the incomplete-bar threshold window");
        }

        let coverage = CoverageReport {
            expected_points,
            actual_points: filtered.len(),
            duplicate_points_removed,
            gap_ranges,
            synthesized_points,
            incomplete_bar_advisory,
        };

        Ok((filtered, coverage))
    }

    /// `ValidateCacheIntegrity`: reports whether a day's cache
    /// entry exists and passes structural validation, without returning
    /// its rows.
    pub async fn validate_cache_integrity(&self, symbol: &str, interval: Interval, day: NaiveDate) -> (bool, Option<String>) {
        let symbol = self.market.normalize_symbol(symbol);
        let key = CacheKey::new(self.market, symbol.as_str(), interval, day);
        match self.cache.load(&key).await {
            Ok(Some(_)) => (true, None),
            Ok(None) => (false, Some("cache miss".to_string())),
            Err(err) => (false, Some(err.to_string())),
        }
    }

    /// `RepairCache`: invalidates a corrupted or missing day
    /// entry and refetches it from whichever source `SourceSelector` would
    /// pick, verifying the repair by reading the entry back.
    pub async fn repair_cache(&self, symbol: &str, interval: Interval, day: NaiveDate) -> bool {
        let symbol = self.market.normalize_symbol(symbol);
        let key = CacheKey::new(self.market, symbol.as_str(), interval, day);
        let _ = self.cache.invalidate(&key).await;

        let Ok(day_range) = day_time_range(day) else {
            return false;
        };
        let now = Utc::now();
        let Ok(primary) = select_source(
            interval,
            day_range,
            self.market,
            SourceHint::Auto,
            self.config.vision_data_delay_hours,
            self.config.rest_chunk_size,
            self.config.rest_max_chunks,
            now,
        ) else {
            return false;
        };

        let candles = match primary {
            PrimarySource::Archive => match self.archive_fetcher.fetch_day(&symbol, interval, day, now).await {
                Ok(result) if !result.candles.is_empty() => result.candles,
                _ => self.fetch_day_via_rest(&symbol, interval, day).await,
            },
            PrimarySource::Rest => self.fetch_day_via_rest(&symbol, interval, day).await,
        };

        if candles.is_empty() {
            return false;
        }
        let Ok(table) = Table::from_candles(candles, interval) else {
            return false;
        };
        if self.cache.store(&key, &table).await.is_err() {
            return false;
        }
        self.validate_cache_integrity(&symbol, interval, day).await.0
    }

    /// `CacheStats`: running hit/miss/error counters.
    pub fn cache_stats(&self) -> CacheStatsSnapshot {
        self.cache.stats()
    }

    fn validate_request(&self, interval: Interval, range: TimeRange, hint: SourceHint, now: DateTime<Utc>) -> Result<()> {
        if range.end() > now {
            return Err(EngineError::Core(kline_core::Error::InvalidInput(InvalidInput::FutureTime {
                end: range.end().to_rfc3339(),
            })));
        }
        if !self.market.supports_interval(interval) {
            return Err(EngineError::Core(kline_core::Error::InvalidInput(InvalidInput::UnsupportedInterval {
                interval,
                market: self.market,
            })));
        }
        if hint == SourceHint::RestOnly {
            let raw_days = (range.end() - range.start()).num_milliseconds().div_euclid(86_400_000).max(1);
            if raw_days > MAX_FORCED_REST_RANGE_DAYS {
                return Err(EngineError::Core(kline_core::Error::InvalidInput(InvalidInput::ForcedRestRangeTooLong {
                    days: raw_days,
                    max_days: MAX_FORCED_REST_RANGE_DAYS,
                })));
            }
            let lookback_days = (now - range.start()).num_milliseconds().div_euclid(86_400_000).max(0);
            if lookback_days > self.config.max_historical_days {
                return Err(EngineError::Core(kline_core::Error::InvalidInput(InvalidInput::ForcedRestLookbackTooOld {
                    days: lookback_days,
                    max_days: self.config.max_historical_days,
                })));
            }
        }
        Ok(())
    }

    /// A day is "consolidated" — stable enough to persist permanently —
    /// once `consolidation_delay_hours` have passed since it ended.
    fn is_consolidated(&self, day: NaiveDate, now: DateTime<Utc>) -> bool {
        let day_end = Utc.from_utc_datetime(&(day + ChronoDuration::days(1)).and_hms_opt(0, 0, 0).unwrap());
        now >= day_end + ChronoDuration::hours(self.config.consolidation_delay_hours)
    }

    /// Whether `day` falls inside the Vision publication delay window of
    /// `now` — the condition gating the archive-empty REST fallback.
    fn within_vision_delay(&self, day: NaiveDate, now: DateTime<Utc>) -> bool {
        let day_start = Utc.from_utc_datetime(&day.and_hms_opt(0, 0, 0).unwrap());
        now - day_start < ChronoDuration::hours(self.config.vision_data_delay_hours)
    }

    /// Fetches one whole day via REST, non-recursively (used both as the
    /// archive-empty fallback and as the direct path when REST is primary).
    async fn fetch_day_via_rest(&self, symbol: &str, interval: Interval, day: NaiveDate) -> Vec<Candle> {
        let Ok(day_range) = day_time_range(day) else {
            return Vec::new();
        };
        let result = rest_fetcher::fetch_range(
            self.rest_fetcher.clone(),
            symbol.to_string(),
            interval,
            day_range,
            self.config.rest_chunk_size,
            self.config.rest_max_chunks,
            self.config.max_concurrent,
        )
        .await;

        for (idx, err) in &result.failures {
            warn!(symbol, day = %day, index = idx, error = %err, "rest chunk fetch failed, day will show as a gap");
        }
        result.successes.into_iter().flat_map(|r| r.candles).collect()
    }
}

fn day_time_range(day: NaiveDate) -> Result<TimeRange> {
    let start = Utc.from_utc_datetime(&day.and_hms_opt(0, 0, 0).unwrap());
    let end = start + ChronoDuration::days(1);
    Ok(TimeRange::new(start, end)?)
}

fn day_range_inclusive(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    let mut days = Vec::new();
    let mut cursor = start;
    while cursor <= end {
        days.push(cursor);
        cursor += ChronoDuration::days(1);
    }
    days
}
