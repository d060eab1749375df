//! Timestamp and interval integration tests.

use chrono::FixedOffset;
use signed_request::{Interval, Timestamp};
use std::cmp::Ordering;

fn ts(input: &str) -> Timestamp {
    Timestamp::parse(input).unwrap()
}

fn assert_same_instant(actual: &Timestamp, expected: &Timestamp) {
    assert_eq!(
        actual.cmp_precise(expected),
        Ordering::Equal,
        "expected {} ({}µs), got {} ({}µs)",
        expected,
        expected.microseconds(),
        actual,
        actual.microseconds()
    );
}

/// Adding `a.diff(b)` to `a` reconstructs `b` to the microsecond, in both
/// directions and across month ends, leap days and second boundaries.
///
/// Subtracting the same interval from `b` is not expected to give back `a`:
/// month lengths make calendar arithmetic non-reversible.
#[test]
fn test_diff_then_add_round_trip() {
    let pairs = [
        ("2020-01-01T00:00:00.000000+0000", "2020-01-01T00:00:00.000001+0000"),
        ("2020-01-01T00:00:00.900000+0000", "2020-01-01T00:00:02.100000+0000"),
        ("2021-01-31T00:00:00.500000+0000", "2021-03-01T00:00:00.250000+0000"),
        ("2021-03-31T10:00:00.100000+0000", "2021-02-28T12:00:00.900000+0000"),
        ("2020-02-29T23:59:59.999999+0000", "2024-02-29T00:00:00.000001+0000"),
        ("2019-11-15T08:30:00.000000+0000", "2021-01-20T10:45:30.250000+0000"),
        ("2013-08-23T11:14:22.598000+0000", "2013-08-23T11:14:22.597999+0000"),
        ("2022-12-31T23:59:59.500000+0200", "2023-01-01T00:00:00.250000+0000"),
    ];

    for (a, b) in pairs {
        for (from, to) in [(ts(a), ts(b)), (ts(b), ts(a))] {
            let interval = from.diff(&to, false).unwrap();
            let mut rebuilt = from;
            rebuilt.add(&interval).unwrap();
            assert_same_instant(&rebuilt, &to);
        }
    }
}

/// The invert flag tracks direction unless an absolute difference is requested.
#[test]
fn test_diff_direction() {
    let earlier = ts("2020-06-01T12:00:00.000+0000");
    let later = ts("2020-06-03T12:00:00.000+0000");

    let forward = earlier.diff(&later, false).unwrap();
    let backward = later.diff(&earlier, false).unwrap();
    let absolute = later.diff(&earlier, true).unwrap();

    assert!(!forward.invert);
    assert!(backward.invert);
    assert!(!absolute.invert);
    assert_eq!(forward.days, 2);
    assert_eq!(backward.days, 2);
    assert_eq!(backward.total_days, Some(2));
}

/// Microsecond remainders carry into and borrow from whole seconds.
#[test]
fn test_sub_second_carry_and_borrow() {
    let mut t = Timestamp::from_unix(1_000, 200_000).unwrap();
    t.add(&Interval {
        microseconds: 900_000,
        ..Interval::default()
    })
    .unwrap();
    assert_eq!((t.unix_seconds(), t.microseconds()), (1_001, 100_000));

    t.sub(&Interval::parse("PT0.0005S").unwrap()).unwrap();
    assert_eq!((t.unix_seconds(), t.microseconds()), (1_001, 99_500));

    t.sub(&Interval::parse("PT2S").unwrap()).unwrap();
    assert_eq!((t.unix_seconds(), t.microseconds()), (999, 99_500));

    t.sub(&Interval::parse("PT0.1S").unwrap()).unwrap();
    assert_eq!((t.unix_seconds(), t.microseconds()), (998, 999_500));
}

/// Calendar fields are applied in the timestamp's own offset.
#[test]
fn test_add_keeps_offset() {
    let mut t = ts("2020-01-31T23:30:00.000+0200");
    t.add(&Interval::parse("P1M").unwrap()).unwrap();
    assert_eq!(t.to_iso8601(), "2020-03-02T23:30:00.000+0200");
    assert_eq!(t.offset(), FixedOffset::east_opt(7_200).unwrap());
}

/// Ordering ignores sub-second parts; `cmp_precise` does not.
#[test]
fn test_ordering_contract() {
    let a = ts("2020-01-01T00:00:00.001+0000");
    let b = ts("2020-01-01T00:00:00.999+0000");
    let c = ts("2020-01-01T00:00:01.000+0000");

    assert_eq!(a, b);
    assert!(a < c && b < c);
    assert_eq!(a.cmp_precise(&b), Ordering::Less);
    assert_eq!(b.cmp_precise(&a), Ordering::Greater);
    assert_eq!(a.with_offset(FixedOffset::west_opt(3_600).unwrap()), a);
}

/// The interval parse scenarios for fractional seconds.
#[test]
fn test_interval_fraction_scenarios() {
    let micro = Interval::parse("PT0.0005S").unwrap();
    assert_eq!((micro.seconds, micro.milliseconds, micro.microseconds), (0, 0.0, 500));

    let milli = Interval::parse("PT0.5S").unwrap();
    assert_eq!((milli.seconds, milli.milliseconds, milli.microseconds), (0, 500.0, 0));

    let mixed = Interval::parse("PT1.5S").unwrap();
    assert_eq!((mixed.seconds, mixed.milliseconds, mixed.microseconds), (1, 500.0, 0));
}

/// Intervals serialize with their field names.
#[test]
fn test_interval_serde() {
    let interval = Interval::parse("P1DT2.25S").unwrap();
    let json = serde_json::to_value(interval).unwrap();
    assert_eq!(json["days"], 1);
    assert_eq!(json["seconds"], 2);
    assert_eq!(json["milliseconds"], 250.0);
    assert!(json.get("total_days").is_none());

    let back: Interval = serde_json::from_value(json).unwrap();
    assert_eq!(back, interval);
}
