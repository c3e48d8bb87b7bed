//! Candle interval: the fixed closed set of durations Binance klines support.

use serde::{Deserialize, Serialize};

/// One of the sixteen candle durations the exchange publishes.
///
/// Every variant carries a canonical wire string (used in REST query
/// parameters, archive file names, and cache paths) and a duration
/// projection in seconds. Month durations are approximated as 30 days for
/// chunk-sizing purposes only — boundary alignment uses calendar months
/// (see [`crate::alignment`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Interval {
    Sec1,
    Min1,
    Min3,
    Min5,
    Min15,
    Min30,
    Hour1,
    Hour2,
    Hour4,
    Hour6,
    Hour8,
    Hour12,
    Day1,
    Day3,
    Week1,
    Month1,
}

impl Interval {
    pub const ALL: [Interval; 16] = [
        Interval::Sec1,
        Interval::Min1,
        Interval::Min3,
        Interval::Min5,
        Interval::Min15,
        Interval::Min30,
        Interval::Hour1,
        Interval::Hour2,
        Interval::Hour4,
        Interval::Hour6,
        Interval::Hour8,
        Interval::Hour12,
        Interval::Day1,
        Interval::Day3,
        Interval::Week1,
        Interval::Month1,
    ];

    /// Canonical wire string, e.g. `"1m"`, `"1s"`, `"1M"`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Interval::Sec1 => "1s",
            Interval::Min1 => "1m",
            Interval::Min3 => "3m",
            Interval::Min5 => "5m",
            Interval::Min15 => "15m",
            Interval::Min30 => "30m",
            Interval::Hour1 => "1h",
            Interval::Hour2 => "2h",
            Interval::Hour4 => "4h",
            Interval::Hour6 => "6h",
            Interval::Hour8 => "8h",
            Interval::Hour12 => "12h",
            Interval::Day1 => "1d",
            Interval::Day3 => "3d",
            Interval::Week1 => "1w",
            Interval::Month1 => "1M",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|i| i.as_str() == s)
    }

    /// Duration in seconds. Months are approximated as 30 days — valid for
    /// REST chunk-duration sizing (§4.5) but never for boundary alignment,
    /// which treats months as calendar units (see [`crate::alignment`]).
    pub fn duration_seconds(&self) -> i64 {
        match self {
            Interval::Sec1 => 1,
            Interval::Min1 => 60,
            Interval::Min3 => 3 * 60,
            Interval::Min5 => 5 * 60,
            Interval::Min15 => 15 * 60,
            Interval::Min30 => 30 * 60,
            Interval::Hour1 => 3_600,
            Interval::Hour2 => 2 * 3_600,
            Interval::Hour4 => 4 * 3_600,
            Interval::Hour6 => 6 * 3_600,
            Interval::Hour8 => 8 * 3_600,
            Interval::Hour12 => 12 * 3_600,
            Interval::Day1 => 86_400,
            Interval::Day3 => 3 * 86_400,
            Interval::Week1 => 7 * 86_400,
            Interval::Month1 => 30 * 86_400,
        }
    }

    pub fn duration_microseconds(&self) -> i64 {
        self.duration_seconds() * 1_000_000
    }

    /// True only for the 1-second interval, which the archive endpoint
    /// never publishes (§4.2 rule 2).
    pub fn is_archive_unsupported(&self) -> bool {
        matches!(self, Interval::Sec1)
    }

    pub fn is_month(&self) -> bool {
        matches!(self, Interval::Month1)
    }

    pub fn is_week(&self) -> bool {
        matches!(self, Interval::Week1)
    }
}

impl std::fmt::Display for Interval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_every_canonical_string() {
        for interval in Interval::ALL {
            let s = interval.as_str();
            assert_eq!(Interval::from_str(s), Some(interval));
        }
    }

    #[test]
    fn unknown_string_is_none() {
        assert_eq!(Interval::from_str("7m"), None);
    }

    #[test]
    fn minute_duration_is_sixty_seconds() {
        assert_eq!(Interval::Min1.duration_seconds(), 60);
    }

    #[test]
    fn month_is_approximated_as_thirty_days() {
        assert_eq!(Interval::Month1.duration_seconds(), 30 * 86_400);
    }

    #[test]
    fn only_one_second_is_archive_unsupported() {
        for interval in Interval::ALL {
            assert_eq!(interval.is_archive_unsupported(), interval == Interval::Sec1);
        }
    }

    #[test]
    fn display_matches_as_str() {
        assert_eq!(Interval::Hour4.to_string(), "4h");
    }
}
