//! Pure, stateless time-boundary alignment.
//!
//! Mirrors the exchange's own rounding so that record-count estimates and
//! cache keys stay deterministic: `alignedStart` rounds up to the next
//! interval boundary at or after `t`; `alignedEnd` rounds down to the
//! previous boundary at or before `t`. Exact boundary values are left
//! untouched in both directions.
//!
//! Week alignment starts Monday 00:00:00 UTC; month alignment uses
//! calendar month boundaries (the 30-day approximation on [`Interval`]
//! is for REST chunk sizing only — see [`crate::types::Interval::duration_seconds`]).

use crate::types::Interval;
use chrono::{DateTime, Datelike, Duration, TimeZone, Utc, Weekday};

/// Rounds `t` up to the next interval boundary at or after `t`.
pub fn aligned_start(t: DateTime<Utc>, interval: Interval) -> DateTime<Utc> {
    if interval.is_month() {
        month_floor_ceil(t).1
    } else if interval.is_week() {
        week_floor_ceil(t).1
    } else {
        let (floor, ceil) = epoch_floor_ceil(t, interval);
        if floor == t {
            floor
        } else {
            ceil
        }
    }
}

/// Rounds `t` down to the previous interval boundary at or before `t`.
pub fn aligned_end(t: DateTime<Utc>, interval: Interval) -> DateTime<Utc> {
    if interval.is_month() {
        month_floor_ceil(t).0
    } else if interval.is_week() {
        week_floor_ceil(t).0
    } else {
        epoch_floor_ceil(t, interval).0
    }
}

/// `⌊(alignedEnd − alignedStart) / I⌋ + 1`, endpoints inclusive, matching
/// upstream record-count semantics. Returns 0 if `end < start` after
/// rounding.
pub fn estimate_records(aligned_start: DateTime<Utc>, aligned_end: DateTime<Utc>, interval: Interval) -> i64 {
    if aligned_end < aligned_start {
        return 0;
    }
    let span_micros = (aligned_end - aligned_start).num_microseconds().unwrap_or(0);
    span_micros / interval.duration_microseconds() + 1
}

fn epoch_floor_ceil(t: DateTime<Utc>, interval: Interval) -> (DateTime<Utc>, DateTime<Utc>) {
    let dur_micros = interval.duration_microseconds();
    let t_micros = t.timestamp_micros();
    let rem = t_micros.rem_euclid(dur_micros);
    let floor_micros = t_micros - rem;
    let ceil_micros = if rem == 0 { t_micros } else { floor_micros + dur_micros };
    (
        DateTime::from_timestamp_micros(floor_micros).unwrap_or(t),
        DateTime::from_timestamp_micros(ceil_micros).unwrap_or(t),
    )
}

fn week_floor_ceil(t: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    let date = t.date_naive();
    let days_since_monday = date.weekday().num_days_from_monday() as i64;
    let monday = date - Duration::days(days_since_monday);
    let floor = Utc.from_utc_datetime(&monday.and_hms_opt(0, 0, 0).unwrap());
    if floor == t {
        (floor, floor)
    } else {
        (floor, floor + Duration::days(7))
    }
}

fn month_floor_ceil(t: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    let first_of_month = Utc
        .with_ymd_and_hms(t.year(), t.month(), 1, 0, 0, 0)
        .single()
        .expect("valid calendar month always has a 1st");
    if first_of_month == t {
        (first_of_month, first_of_month)
    } else {
        let (next_year, next_month) = if t.month() == 12 { (t.year() + 1, 1) } else { (t.year(), t.month() + 1) };
        let next_month_start = Utc
            .with_ymd_and_hms(next_year, next_month, 1, 0, 0, 0)
            .single()
            .expect("valid calendar month always has a 1st");
        (first_of_month, next_month_start)
    }
}

/// `_ = aligned_start(aligned_start(t, I), I)` helper used only by tests to
/// spell out the idempotence property without repeating the call twice
/// inline at every call site.
#[cfg(test)]
fn is_idempotent_start(t: DateTime<Utc>, interval: Interval) -> bool {
    let once = aligned_start(t, interval);
    aligned_start(once, interval) == once
}

#[cfg(test)]
fn is_idempotent_end(t: DateTime<Utc>, interval: Interval) -> bool {
    let once = aligned_end(t, interval);
    aligned_end(once, interval) == once
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn dt(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
    }

    #[test]
    fn exact_boundary_is_preserved_both_directions() {
        let t = dt(2024, 1, 1, 0, 1, 0);
        assert_eq!(aligned_start(t, Interval::Min1), t);
        assert_eq!(aligned_end(t, Interval::Min1), t);
    }

    #[test]
    fn sub_minute_offset_rounds_start_up_and_end_down() {
        let t = dt(2024, 1, 1, 0, 0, 0) + Duration::microseconds(123_456);
        assert_eq!(aligned_start(t, Interval::Min1), dt(2024, 1, 1, 0, 1, 0));
        assert_eq!(aligned_end(t, Interval::Min1), dt(2024, 1, 1, 0, 0, 0));
    }

    #[test]
    fn month_alignment_uses_calendar_boundaries_not_thirty_days() {
        let t = dt(2024, 2, 15, 12, 0, 0);
        assert_eq!(aligned_end(t, Interval::Month1), dt(2024, 2, 1, 0, 0, 0));
        assert_eq!(aligned_start(t, Interval::Month1), dt(2024, 3, 1, 0, 0, 0));
    }

    #[test]
    fn week_alignment_starts_monday() {
        // 2024-01-03 is a Wednesday.
        let t = dt(2024, 1, 3, 8, 0, 0);
        assert_eq!(aligned_end(t, Interval::Week1), dt(2024, 1, 1, 0, 0, 0));
        assert_eq!(aligned_start(t, Interval::Week1), dt(2024, 1, 8, 0, 0, 0));
    }

    #[test]
    fn estimate_records_counts_inclusive_endpoints() {
        let start = dt(2024, 1, 1, 0, 0, 0);
        let end = dt(2024, 1, 1, 23, 59, 0);
        assert_eq!(estimate_records(start, end, Interval::Min1), 1440);
    }

    #[test]
    fn estimate_records_is_zero_when_rounding_crosses() {
        let start = dt(2024, 1, 1, 0, 0, 30);
        let end = dt(2024, 1, 1, 0, 0, 40);
        let aligned_s = aligned_start(start, Interval::Min1);
        let aligned_e = aligned_end(end, Interval::Min1);
        assert_eq!(estimate_records(aligned_s, aligned_e, Interval::Min1), 0);
    }

    #[test]
    fn alignment_is_idempotent() {
        let t = dt(2024, 3, 17, 5, 33, 12) + Duration::microseconds(42);
        for interval in Interval::ALL {
            assert!(is_idempotent_start(t, interval), "start not idempotent for {interval}");
            assert!(is_idempotent_end(t, interval), "end not idempotent for {interval}");
        }
    }
}
