//! Wall-clock timestamp with microsecond resolution.
//!
//! A [`Timestamp`] is a whole-second instant in a fixed UTC offset plus a
//! microsecond remainder in `[0, 1_000_000)`. Calendar arithmetic runs on the
//! whole-second part through `chrono`; the remainder is carried and borrowed
//! separately so no precision is lost across second boundaries.
//!
//! Ordering and equality only look at the whole-second instant. Two
//! timestamps inside the same second compare equal even when their
//! microseconds differ; use [`Timestamp::cmp_precise`] when sub-second order
//! matters.

use crate::models::interval::Interval;
use crate::services::clock::Clock;
use chrono::{
    DateTime, Datelike, Days, FixedOffset, NaiveDate, NaiveDateTime, Offset, TimeDelta,
    TimeZone, Timelike, Utc,
    format::{Item, StrftimeItems},
};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::{
    cmp::Ordering,
    fmt::{self, Write},
    hash::{Hash, Hasher},
    str::FromStr,
};

const MICROS_PER_SECOND: i64 = 1_000_000;
const SECONDS_PER_DAY: i64 = 86_400;

/// Token replaced by the zero-padded 3-digit millisecond value in [`Timestamp::format`]
pub const MILLISECONDS_TOKEN: &str = "{ms}";
/// Token replaced by the zero-padded 6-digit microsecond value in [`Timestamp::format`]
pub const MICROSECONDS_TOKEN: &str = "{us}";

/// Errors from timestamp parsing, formatting and arithmetic
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TemporalError {
    #[error("malformed timestamp: {0}")]
    Parse(String),

    #[error("invalid format pattern: {0}")]
    Format(String),

    #[error("timestamp out of range")]
    OutOfRange,
}

/// Resolution used by [`Timestamp::microtime`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Precision {
    Millisecond,
    #[default]
    Microsecond,
}

#[derive(Debug, Clone, Copy)]
pub struct Timestamp {
    second: DateTime<FixedOffset>,
    micros: u32,
}

impl Timestamp {
    /// Current time as reported by `clock`
    pub fn now<C: Clock + ?Sized>(clock: &C) -> Self {
        clock.now()
    }

    /// Build from any `chrono` date time, keeping its offset and microseconds
    pub fn from_datetime<Tz: TimeZone>(dt: &DateTime<Tz>) -> Self {
        let fixed = dt.with_timezone(&dt.offset().fix());
        let micros = fixed.timestamp_subsec_micros().min(999_999);
        Self {
            second: fixed.with_nanosecond(0).unwrap_or(fixed),
            micros,
        }
    }

    /// Build from Unix seconds and a microsecond offset, normalizing the
    /// microseconds into `[0, 1_000_000)`
    pub fn from_unix(seconds: i64, micros: i64) -> Result<Self, TemporalError> {
        let carry = micros.div_euclid(MICROS_PER_SECOND);
        let remainder = micros.rem_euclid(MICROS_PER_SECOND);
        let seconds = seconds.checked_add(carry).ok_or(TemporalError::OutOfRange)?;
        let second = DateTime::<Utc>::from_timestamp(seconds, 0)
            .ok_or(TemporalError::OutOfRange)?
            .fixed_offset();
        Ok(Self {
            second,
            micros: remainder as u32,
        })
    }

    /// Build from fractional Unix seconds such as `1377256462.598213`
    pub fn from_microtime(microtime: f64) -> Result<Self, TemporalError> {
        if !microtime.is_finite() {
            return Err(TemporalError::OutOfRange);
        }
        let seconds = microtime.floor();
        let micros = ((microtime - seconds) * MICROS_PER_SECOND as f64).round();
        Self::from_unix(seconds as i64, micros as i64)
    }

    /// Parse an ISO-8601 / RFC 3339 timestamp
    ///
    /// Accepts `2013-08-23T11:14:22.598+0000`, `+00:00` and `Z` offsets, an
    /// optional fraction of any length, and offset-less values which are read
    /// as UTC. A fraction of N digits is scaled by `10^(6 - N)`; digits past
    /// the sixth are truncated.
    pub fn parse(input: &str) -> Result<Self, TemporalError> {
        let input = input.trim();

        if let Ok(dt) = DateTime::parse_from_str(input, "%Y-%m-%dT%H:%M:%S%.f%z") {
            return Ok(Self::from_datetime(&dt));
        }
        if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
            return Ok(Self::from_datetime(&dt));
        }
        for pattern in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
            if let Ok(naive) = NaiveDateTime::parse_from_str(input, pattern) {
                return Ok(Self::from_datetime(&naive.and_utc()));
            }
        }

        Err(TemporalError::Parse(input.to_string()))
    }

    /// The same instant expressed in another UTC offset
    pub fn with_offset(self, offset: FixedOffset) -> Self {
        Self {
            second: self.second.with_timezone(&offset),
            micros: self.micros,
        }
    }

    pub fn offset(&self) -> FixedOffset {
        *self.second.offset()
    }

    /// Whole seconds since the Unix epoch
    pub fn unix_seconds(&self) -> i64 {
        self.second.timestamp()
    }

    /// Sub-second remainder in milliseconds, rounded down
    pub fn milliseconds(&self) -> u32 {
        self.micros / 1_000
    }

    /// Sub-second remainder in microseconds
    pub fn microseconds(&self) -> u32 {
        self.micros
    }

    /// Fractional Unix seconds at the requested precision
    pub fn microtime(&self, precision: Precision) -> f64 {
        let fraction = match precision {
            Precision::Millisecond => f64::from(self.milliseconds()) / 1_000.0,
            Precision::Microsecond => f64::from(self.micros) / MICROS_PER_SECOND as f64,
        };
        self.unix_seconds() as f64 + fraction
    }

    /// Full-precision `chrono` value
    pub fn to_datetime(&self) -> DateTime<FixedOffset> {
        self.second
            .with_nanosecond(self.micros * 1_000)
            .unwrap_or(self.second)
    }

    /// Order by whole seconds, then by microseconds
    pub fn cmp_precise(&self, other: &Self) -> Ordering {
        self.second
            .cmp(&other.second)
            .then(self.micros.cmp(&other.micros))
    }

    /// ISO-8601 with a 3-digit millisecond fraction, e.g. `2013-08-23T11:14:22.598+0000`
    pub fn to_iso8601(&self) -> String {
        format!(
            "{}.{:03}{}",
            self.second.format("%Y-%m-%dT%H:%M:%S"),
            self.milliseconds(),
            self.second.format("%z")
        )
    }

    /// Format with a `chrono` strftime pattern extended with
    /// [`MILLISECONDS_TOKEN`] and [`MICROSECONDS_TOKEN`]
    pub fn format(&self, pattern: &str) -> Result<String, TemporalError> {
        let pattern = pattern
            .replace(MILLISECONDS_TOKEN, &format!("{:03}", self.milliseconds()))
            .replace(MICROSECONDS_TOKEN, &format!("{:06}", self.micros));

        let items: Vec<Item<'_>> = StrftimeItems::new(&pattern).collect();
        if items.iter().any(|item| matches!(item, Item::Error)) {
            return Err(TemporalError::Format(pattern.clone()));
        }

        let mut out = String::new();
        write!(out, "{}", self.second.format_with_items(items.iter()))
            .map_err(|_| TemporalError::Format(pattern.clone()))?;
        Ok(out)
    }

    /// Calendar-aware difference from `self` to `other`
    ///
    /// Whole fields are computed on the second-truncated instants in
    /// `self`'s offset; the microsecond remainders are reconciled by
    /// borrowing a second from the target when needed. `invert` is set when
    /// `other` lies before `self`, unless `absolute` is requested. Adding the
    /// result to `self` gives back `other` exactly.
    pub fn diff(&self, other: &Self, absolute: bool) -> Result<Interval, TemporalError> {
        let backwards = self.cmp_precise(other) == Ordering::Greater;
        let offset = self.offset();
        let mut target = other.second.with_timezone(&offset);

        let mut micros_delta = if backwards {
            i64::from(self.micros) - i64::from(other.micros)
        } else {
            i64::from(other.micros) - i64::from(self.micros)
        };
        if micros_delta < 0 {
            let borrow = if backwards { 1 } else { -1 };
            target = target
                .checked_add_signed(TimeDelta::seconds(borrow))
                .ok_or(TemporalError::OutOfRange)?;
            micros_delta += MICROS_PER_SECOND;
        }

        let anchor = self.second.naive_local();
        let target = target.naive_local();
        let (months, remainder) = if backwards {
            calendar_span_backward(anchor, target)?
        } else {
            calendar_span_forward(anchor, target)?
        };

        let field = |value: i64| u32::try_from(value).map_err(|_| TemporalError::OutOfRange);
        let milliseconds = micros_delta / 1_000;

        Ok(Interval {
            years: field(months / 12)?,
            months: field(months % 12)?,
            days: field(remainder / SECONDS_PER_DAY)?,
            hours: field(remainder % SECONDS_PER_DAY / 3_600)?,
            minutes: field(remainder % 3_600 / 60)?,
            seconds: field(remainder % 60)?,
            milliseconds: milliseconds as f64,
            microseconds: field(micros_delta - milliseconds * 1_000)?,
            invert: backwards && !absolute,
            total_days: u64::try_from((target - anchor).num_seconds().abs() / SECONDS_PER_DAY)
                .ok(),
        })
    }

    /// Move forward by `interval` (backward when it is inverted)
    ///
    /// Years and months are applied first, with day overflow rolling into
    /// the following month (Jan 31 + 1 month = Mar 3 in a common year); then
    /// days, hours, minutes and seconds; then the sub-second part with carry.
    /// On error `self` is left unchanged.
    pub fn add(&mut self, interval: &Interval) -> Result<(), TemporalError> {
        *self = self.shifted(interval, 1)?;
        Ok(())
    }

    /// Move backward by `interval` (forward when it is inverted)
    pub fn sub(&mut self, interval: &Interval) -> Result<(), TemporalError> {
        *self = self.shifted(interval, -1)?;
        Ok(())
    }

    fn shifted(&self, interval: &Interval, direction: i64) -> Result<Self, TemporalError> {
        let sign = if interval.invert { -direction } else { direction };
        let offset = self.offset();

        let local = shift_months(self.second.naive_local(), sign * interval.total_months())
            .ok_or(TemporalError::OutOfRange)?;
        let local = TimeDelta::try_seconds(sign * interval.clock_seconds())
            .and_then(|delta| local.checked_add_signed(delta))
            .ok_or(TemporalError::OutOfRange)?;
        let second = offset
            .from_local_datetime(&local)
            .single()
            .ok_or(TemporalError::OutOfRange)?;

        let total_micros = interval
            .sub_second_micros()
            .and_then(|micros| micros.checked_mul(sign))
            .and_then(|micros| micros.checked_add(i64::from(self.micros)))
            .ok_or(TemporalError::OutOfRange)?;
        let carry = total_micros.div_euclid(MICROS_PER_SECOND);
        let second = TimeDelta::try_seconds(carry)
            .and_then(|delta| second.checked_add_signed(delta))
            .ok_or(TemporalError::OutOfRange)?;

        Ok(Self {
            second,
            micros: total_micros.rem_euclid(MICROS_PER_SECOND) as u32,
        })
    }
}

/// Months since year 0 for a date
fn month_index(dt: &NaiveDateTime) -> i64 {
    i64::from(dt.year()) * 12 + i64::from(dt.month0())
}

/// Add calendar months keeping the day of month, letting days past the end
/// of the target month overflow into the next one
fn shift_months(dt: NaiveDateTime, months: i64) -> Option<NaiveDateTime> {
    if months == 0 {
        return Some(dt);
    }
    let index = month_index(&dt).checked_add(months)?;
    let year = i32::try_from(index.div_euclid(12)).ok()?;
    let month = index.rem_euclid(12) as u32 + 1;
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let date = first.checked_add_days(Days::new(u64::from(dt.day() - 1)))?;
    Some(date.and_time(dt.time()))
}

/// Largest month count `k` with `anchor + k months <= target`, and the
/// seconds left over. Requires `anchor <= target`.
fn calendar_span_forward(
    anchor: NaiveDateTime,
    target: NaiveDateTime,
) -> Result<(i64, i64), TemporalError> {
    let mut months = (month_index(&target) - month_index(&anchor)).max(0);
    loop {
        let candidate = shift_months(anchor, months).ok_or(TemporalError::OutOfRange)?;
        if candidate <= target || months == 0 {
            return Ok((months, (target - candidate).num_seconds()));
        }
        months -= 1;
    }
}

/// Largest month count `k` with `anchor - k months >= target`, and the
/// seconds left over. Requires `target <= anchor`.
fn calendar_span_backward(
    anchor: NaiveDateTime,
    target: NaiveDateTime,
) -> Result<(i64, i64), TemporalError> {
    // overflow can land one month further back than the plain month distance
    let mut months = (month_index(&anchor) - month_index(&target)).max(0) + 1;
    loop {
        let candidate = shift_months(anchor, -months).ok_or(TemporalError::OutOfRange)?;
        if candidate >= target || months == 0 {
            return Ok((months, (candidate - target).num_seconds()));
        }
        months -= 1;
    }
}

impl PartialEq for Timestamp {
    fn eq(&self, other: &Self) -> bool {
        self.second == other.second
    }
}

impl Eq for Timestamp {}

impl PartialOrd for Timestamp {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Timestamp {
    fn cmp(&self, other: &Self) -> Ordering {
        self.second.cmp(&other.second)
    }
}

impl Hash for Timestamp {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.second.timestamp().hash(state);
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_iso8601())
    }
}

impl FromStr for Timestamp {
    type Err = TemporalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_iso8601())
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(input: &str) -> Timestamp {
        Timestamp::parse(input).unwrap()
    }

    #[test]
    fn test_parse_millisecond_fraction() {
        let t = ts("2013-08-23T11:14:22.598+0000");
        assert_eq!(t.microseconds(), 598_000);
        assert_eq!(t.milliseconds(), 598);
        assert_eq!(t.unix_seconds(), 1_377_256_462);
    }

    #[test]
    fn test_parse_scales_short_and_long_fractions() {
        assert_eq!(ts("2020-01-01T00:00:00.5+0000").microseconds(), 500_000);
        assert_eq!(ts("2020-01-01T00:00:00.1234+0000").microseconds(), 123_400);
        assert_eq!(ts("2020-01-01T00:00:00.123456+0000").microseconds(), 123_456);
        assert_eq!(ts("2020-01-01T00:00:00.1234567+0000").microseconds(), 123_456);
        assert_eq!(ts("2020-01-01T00:00:00+0000").microseconds(), 0);
    }

    #[test]
    fn test_parse_offset_variants() {
        let reference = ts("2020-01-01T00:00:00.000+0000");
        assert_eq!(ts("2020-01-01T00:00:00Z"), reference);
        assert_eq!(ts("2020-01-01T01:00:00+01:00"), reference);
        assert_eq!(ts("2020-01-01T01:00:00.000+0100"), reference);
        assert_eq!(ts("2020-01-01 00:00:00"), reference);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(
            Timestamp::parse("yesterday"),
            Err(TemporalError::Parse(_))
        ));
        assert!(Timestamp::parse("").is_err());
        assert!(Timestamp::parse("2020-13-01T00:00:00+0000").is_err());
    }

    #[test]
    fn test_iso8601_output_injects_milliseconds() {
        let t = ts("2013-08-23T11:14:22.598765+0000");
        assert_eq!(t.to_iso8601(), "2013-08-23T11:14:22.598+0000");
        let t = ts("2013-08-23T13:14:22.007+0200");
        assert_eq!(t.to_iso8601(), "2013-08-23T13:14:22.007+0200");
    }

    #[test]
    fn test_format_tokens() {
        let t = ts("2013-08-23T11:14:22.598765+0000");
        assert_eq!(t.format("{ms} milliseconds").unwrap(), "598 milliseconds");
        assert_eq!(t.format("%H:%M:%S.{us}").unwrap(), "11:14:22.598765");
        assert!(matches!(t.format("%Q"), Err(TemporalError::Format(_))));
    }

    #[test]
    fn test_from_unix_normalizes_micros() {
        let t = Timestamp::from_unix(10, 1_500_000).unwrap();
        assert_eq!((t.unix_seconds(), t.microseconds()), (11, 500_000));
        let t = Timestamp::from_unix(10, -1).unwrap();
        assert_eq!((t.unix_seconds(), t.microseconds()), (9, 999_999));
    }

    #[test]
    fn test_microtime_round_trip() {
        let t = Timestamp::from_microtime(1_377_256_462.598_213).unwrap();
        assert_eq!(t.unix_seconds(), 1_377_256_462);
        assert_eq!(t.microseconds(), 598_213);
        assert!((t.microtime(Precision::Millisecond) - 1_377_256_462.598).abs() < 1e-6);
        assert!(Timestamp::from_microtime(f64::NAN).is_err());
    }

    #[test]
    fn test_equality_ignores_microseconds() {
        let a = ts("2020-01-01T00:00:00.100+0000");
        let b = ts("2020-01-01T00:00:00.900+0000");
        assert_eq!(a, b);
        assert_eq!(a.cmp(&b), Ordering::Equal);
        assert_eq!(a.cmp_precise(&b), Ordering::Less);
        assert!(ts("2020-01-01T00:00:01.000+0000") > b);
    }

    #[test]
    fn test_microsecond_carry_on_add() {
        let mut t = Timestamp::from_unix(100, 200_000).unwrap();
        let interval = Interval {
            microseconds: 900_000,
            ..Interval::default()
        };
        t.add(&interval).unwrap();
        assert_eq!(t.unix_seconds(), 101);
        assert_eq!(t.microseconds(), 100_000);
    }

    #[test]
    fn test_oversized_sub_second_interval_is_out_of_range() {
        let mut t = ts("2020-01-01T00:00:00.500+0000");
        let interval = Interval::parse("PT99999999999999999999F").unwrap();

        assert_eq!(t.add(&interval), Err(TemporalError::OutOfRange));
        assert_eq!(t.sub(&interval), Err(TemporalError::OutOfRange));
        assert_eq!(t.to_iso8601(), "2020-01-01T00:00:00.500+0000");
        assert_eq!(t.microseconds(), 500_000);

        // fits in i64 microseconds but not in the calendar
        let interval = Interval {
            microseconds: u32::MAX,
            milliseconds: 9_000_000_000_000_000.0,
            ..Interval::default()
        };
        assert_eq!(t.add(&interval), Err(TemporalError::OutOfRange));
        assert_eq!(t.microseconds(), 500_000);
    }

    #[test]
    fn test_microsecond_borrow_on_sub() {
        let mut t = Timestamp::from_unix(100, 200_000).unwrap();
        let interval = Interval::parse("PT1.5S").unwrap();
        t.sub(&interval).unwrap();
        assert_eq!(t.unix_seconds(), 98);
        assert_eq!(t.microseconds(), 700_000);
    }

    #[test]
    fn test_month_overflow_rolls_forward() {
        let mut t = ts("2021-01-31T12:00:00.000+0000");
        t.add(&Interval::parse("P1M").unwrap()).unwrap();
        assert_eq!(t.to_iso8601(), "2021-03-03T12:00:00.000+0000");
    }

    #[test]
    fn test_inverted_interval_moves_backward() {
        let mut t = ts("2020-03-01T00:00:00.000+0000");
        t.add(&Interval::parse("-P1D").unwrap()).unwrap();
        assert_eq!(t.to_iso8601(), "2020-02-29T00:00:00.000+0000");
    }

    #[test]
    fn test_diff_borrows_a_second() {
        let a = ts("2020-01-01T00:00:00.900+0000");
        let b = ts("2020-01-01T00:00:02.100+0000");
        let interval = a.diff(&b, false).unwrap();
        assert_eq!(interval.seconds, 1);
        assert_eq!(interval.milliseconds, 200.0);
        assert_eq!(interval.microseconds, 0);
        assert!(!interval.invert);
    }

    #[test]
    fn test_diff_backwards_sets_invert() {
        let a = ts("2020-01-01T00:00:02.100250+0000");
        let b = ts("2020-01-01T00:00:00.900+0000");
        let interval = a.diff(&b, false).unwrap();
        assert!(interval.invert);
        assert_eq!(interval.seconds, 1);
        assert_eq!(interval.milliseconds, 200.0);
        assert_eq!(interval.microseconds, 250);

        assert!(!a.diff(&b, true).unwrap().invert);
    }

    #[test]
    fn test_diff_within_same_second() {
        let a = ts("2020-01-01T00:00:00.900+0000");
        let b = ts("2020-01-01T00:00:00.100+0000");
        let interval = a.diff(&b, false).unwrap();
        assert!(interval.invert);
        assert_eq!(interval.seconds, 0);
        assert_eq!(interval.milliseconds, 800.0);
    }

    #[test]
    fn test_diff_calendar_fields() {
        let a = ts("2019-11-15T08:30:00.000+0000");
        let b = ts("2021-01-20T10:45:30.250+0000");
        let interval = a.diff(&b, false).unwrap();
        assert_eq!(interval.years, 1);
        assert_eq!(interval.months, 2);
        assert_eq!(interval.days, 5);
        assert_eq!(interval.hours, 2);
        assert_eq!(interval.minutes, 15);
        assert_eq!(interval.seconds, 30);
        assert_eq!(interval.milliseconds, 250.0);
        assert_eq!(interval.total_days, Some(432));
    }

    #[test]
    fn test_serde_uses_iso_string() {
        let t = ts("2013-08-23T11:14:22.598+0000");
        let json = serde_json::to_string(&t).unwrap();
        assert_eq!(json, "\"2013-08-23T11:14:22.598+0000\"");
        let back: Timestamp = serde_json::from_str(&json).unwrap();
        assert_eq!(back.cmp_precise(&t), Ordering::Equal);
    }
}
