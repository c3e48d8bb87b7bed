//! Half-open UTC time range with microsecond precision.

use crate::error::{Error, InvalidInput};
use chrono::{DateTime, Utc};

/// `[start, end)` of UTC instants, microsecond precision. Construction
/// truncates sub-microsecond precision (Open Question 1, SPEC_FULL.md §9)
/// and rejects `start >= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TimeRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> crate::error::Result<Self> {
        if start >= end {
            return Err(Error::InvalidInput(InvalidInput::RangeNotOrdered {
                start: start.to_rfc3339(),
                end: end.to_rfc3339(),
            }));
        }
        Ok(Self { start: truncate_micros(start), end: truncate_micros(end) })
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        instant >= self.start && instant < self.end
    }

    pub fn duration(&self) -> chrono::Duration {
        self.end - self.start
    }
}

fn truncate_micros(t: DateTime<Utc>) -> DateTime<Utc> {
    let micros = t.timestamp_micros();
    DateTime::from_timestamp_micros(micros).unwrap_or(t)
}
