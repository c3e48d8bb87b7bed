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

//! Pure REST-vs-archive source selection: given an interval, a time range,
//! a market type, and an optional caller hint, decide which upstream
//! source should serve the request.

use chrono::{DateTime, Duration, Utc};
use kline_core::error::{Error, InvalidInput, Result};
use kline_core::types::{Interval, MarketType, TimeRange};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceHint {
    Auto,
    RestOnly,
    ArchiveOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimarySource {
    Rest,
    Archive,
}

/// Decides REST vs archive for one request.
#[allow(clippy::too_many_arguments)]
pub fn select_source(
    interval: Interval,
    range: TimeRange,
    market: MarketType,
    hint: SourceHint,
    vision_data_delay_hours: i64,
    rest_chunk_size: u32,
    rest_max_chunks: u32,
    now: DateTime<Utc>,
) -> Result<PrimarySource> {
    // Rule 2 is a hard capability constraint, not a preference, so it
    // overrides even an explicit hint: the archive simply doesn't publish
    // 1s klines.
    if interval == Interval::Sec1 {
        if hint == SourceHint::ArchiveOnly {
            return Err(Error::InvalidInput(InvalidInput::UnsupportedInterval { interval, market }));
        }
        return Ok(PrimarySource::Rest);
    }

    // Rule 1: an explicit hint is honored as-is.
    match hint {
        SourceHint::RestOnly => return Ok(PrimarySource::Rest),
        SourceHint::ArchiveOnly => return Ok(PrimarySource::Archive),
        SourceHint::Auto => {}
    }

    // Rule 3: large requests favor the archive to avoid many REST chunks.
    let estimated_points = estimate_data_points(range, interval);
    let rest_capacity = i64::from(rest_chunk_size) * i64::from(rest_max_chunks);
    if estimated_points > rest_capacity {
        return Ok(PrimarySource::Archive);
    }

    // Rule 4: sufficiently old ranges prefer the archive for bulk efficiency.
    let vision_threshold = now - Duration::hours(vision_data_delay_hours);
    if range.end() < vision_threshold {
        return Ok(PrimarySource::Archive);
    }

    // Rule 5: default.
    Ok(PrimarySource::Rest)
}

/// `(end - start) / intervalDuration`, truncated by integer division.
pub fn estimate_data_points(range: TimeRange, interval: Interval) -> i64 {
    range.duration().num_microseconds().unwrap_or(0) / interval.duration_microseconds()
}
