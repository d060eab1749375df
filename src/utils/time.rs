//! Time unit conversions between fractional Unix seconds, timestamps and
//! intervals.
//!
//! Interval totals use a fixed calendar of 365-day years and 30-day months;
//! use [`Timestamp::add`](crate::models::Timestamp::add) when calendar
//! accuracy matters.

use crate::models::{Interval, Precision, Timestamp};
use serde::{Deserialize, Serialize};

/// Elapsed time split into whole milliseconds and the leftover microseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeUnits {
    #[serde(rename = "ms")]
    pub milliseconds: i64,
    #[serde(rename = "µs")]
    pub microseconds: i64,
}

/// Microseconds elapsed between `since` and `microtime`, rounded to the
/// nearest microsecond
fn elapsed_micros(since: f64, microtime: f64) -> i64 {
    ((microtime - since) * 1_000_000.0).round() as i64
}

/// Whole milliseconds elapsed between `since` and `microtime`, truncated
/// toward zero
pub fn milliseconds_since(since: f64, microtime: f64) -> i64 {
    elapsed_micros(since, microtime) / 1_000
}

/// Microseconds left over after [`milliseconds_since`]
pub fn microseconds_since(since: f64, microtime: f64) -> i64 {
    elapsed_micros(since, microtime) - milliseconds_since(since, microtime) * 1_000
}

pub fn time_units_since(since: f64, microtime: f64) -> TimeUnits {
    TimeUnits {
        milliseconds: milliseconds_since(since, microtime),
        microseconds: microseconds_since(since, microtime),
    }
}

pub fn timestamp_to_microtime(timestamp: &Timestamp) -> f64 {
    timestamp.microtime(Precision::Microsecond)
}

/// Whole seconds in an interval, ignoring its sub-second part and sign
///
/// Cannot overflow: every field at `u32::MAX` stays well inside `i64`.
pub fn interval_to_seconds(interval: &Interval) -> i64 {
    i64::from(interval.years) * 365 * 86_400
        + i64::from(interval.months) * 30 * 86_400
        + interval.clock_seconds()
}

/// Total microseconds in an interval, ignoring its sign
///
/// `None` when the total does not fit in an `i64`.
pub fn interval_to_microseconds(interval: &Interval) -> Option<i64> {
    interval_to_seconds(interval)
        .checked_mul(1_000_000)?
        .checked_add(interval.sub_second_micros()?)
}
