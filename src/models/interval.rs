//! Calendar interval with millisecond and microsecond components.
//!
//! Intervals use ISO-8601 duration syntax (`P1Y2M3DT4H5M6S`) extended with
//! two sub-second designators: `F` for milliseconds and `U` for
//! microseconds, e.g. `PT1S250F` or `PT300U`.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::{fmt, ops::Range, str::FromStr, sync::LazyLock};

static SECONDS_DESIGNATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d*)[.,]?(\d*)S").expect("valid seconds regex"));
static MILLIS_DESIGNATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d*)[.,]?(\d*)F").expect("valid milliseconds regex"));
static MICROS_DESIGNATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d*)[.,]?(\d*)U").expect("valid microseconds regex"));
static CALENDAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^P(?:(\d+)Y)?(?:(\d+)M)?(?:(\d+)W)?(?:(\d+)D)?(?:T(?:(\d+)H)?(?:(\d+)M)?(?:(\d+)S)?)?$",
    )
    .expect("valid calendar interval regex")
});

/// Errors produced while parsing an interval specification
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IntervalError {
    #[error("invalid interval specification: {0}")]
    Invalid(String),

    #[error("interval field out of range: {0}")]
    OutOfRange(String),
}

/// Signed elapsed duration with calendar and sub-second fields
///
/// The sub-second part is `milliseconds * 1000 + microseconds` microseconds.
/// `invert` marks a negative interval.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Interval {
    pub years: u32,
    pub months: u32,
    pub days: u32,
    pub hours: u32,
    pub minutes: u32,
    pub seconds: u32,
    pub milliseconds: f64,
    pub microseconds: u32,
    pub invert: bool,
    /// Total number of whole days spanned, known only for computed differences
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_days: Option<u64>,
}

impl Interval {
    /// The zero-length interval
    pub fn zero() -> Self {
        Self::default()
    }

    /// Parse an extended ISO-8601 duration
    ///
    /// A fractional seconds value is classified by magnitude: below 0.001 it
    /// becomes microseconds, below 1 it becomes milliseconds, otherwise the
    /// integer part fills `seconds` and the fraction fills `milliseconds`.
    /// Explicit `F` and then `U` designators overwrite whatever the seconds
    /// fraction produced.
    pub fn parse(spec: &str) -> Result<Self, IntervalError> {
        let trimmed = spec.trim();
        let (invert, body) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, trimmed),
        };
        if !body.starts_with('P') {
            return Err(IntervalError::Invalid(spec.to_string()));
        }

        let mut interval = Self {
            invert,
            ..Self::default()
        };
        let mut remaining = body.to_string();

        if let Some((range, integer, fraction)) = designator(&SECONDS_DESIGNATOR, &remaining) {
            let value = Decimal::new(&integer, &fraction);

            if value.is_below_one_milli() {
                // truncate so the result stays below one millisecond
                interval.microseconds = to_u32(value.shifted(6).trunc())
                    .ok_or_else(|| IntervalError::OutOfRange(spec.to_string()))?;
            } else if value.is_below_one() {
                interval.milliseconds = value.shifted(3);
            } else {
                interval.seconds = value.integer_part()?;
                interval.milliseconds = Decimal::new("", &fraction).shifted(3);
            }

            remaining.replace_range(range, &format!("{}S", interval.seconds));
        }

        if let Some((range, integer, fraction)) = designator(&MILLIS_DESIGNATOR, &remaining) {
            interval.milliseconds = Decimal::new(&integer, &fraction).shifted(0);
            remaining.replace_range(range, "");
        }

        if let Some((range, integer, fraction)) = designator(&MICROS_DESIGNATOR, &remaining) {
            interval.microseconds = to_u32(Decimal::new(&integer, &fraction).shifted(0).round())
                .ok_or_else(|| IntervalError::OutOfRange(spec.to_string()))?;
            remaining.replace_range(range, "");
        }

        let calendar = remaining.trim_end_matches('T');
        if calendar == "P" {
            return Ok(interval);
        }

        let fields = CALENDAR
            .captures(calendar)
            .ok_or_else(|| IntervalError::Invalid(spec.to_string()))?;
        let field = |index: usize| -> Result<u32, IntervalError> {
            fields.get(index).map_or(Ok(0), |m| {
                m.as_str()
                    .parse()
                    .map_err(|_| IntervalError::OutOfRange(m.as_str().to_string()))
            })
        };

        interval.years = field(1)?;
        interval.months = field(2)?;
        let weeks = field(3)?;
        let days = field(4)?;
        interval.days = weeks
            .checked_mul(7)
            .and_then(|w| w.checked_add(days))
            .ok_or_else(|| IntervalError::OutOfRange(spec.to_string()))?;
        interval.hours = field(5)?;
        interval.minutes = field(6)?;
        interval.seconds = field(7)?;

        Ok(interval)
    }

    /// Sub-second part in whole microseconds, rounded half away from zero
    ///
    /// `None` when the value does not fit in an `i64`.
    pub fn sub_second_micros(&self) -> Option<i64> {
        let micros = (self.milliseconds * 1000.0 + f64::from(self.microseconds)).round();
        (micros.is_finite() && (i64::MIN as f64..i64::MAX as f64).contains(&micros))
            .then_some(micros as i64)
    }

    /// Whole days, hours, minutes and seconds expressed in seconds
    pub fn clock_seconds(&self) -> i64 {
        i64::from(self.days) * 86_400
            + i64::from(self.hours) * 3_600
            + i64::from(self.minutes) * 60
            + i64::from(self.seconds)
    }

    /// Years and months expressed in months
    pub fn total_months(&self) -> i64 {
        i64::from(self.years) * 12 + i64::from(self.months)
    }

    /// The same interval pointing the other way
    pub fn negated(&self) -> Self {
        Self {
            invert: !self.invert,
            ..*self
        }
    }

    /// Seconds including the millisecond and microsecond fractions, e.g. `1.5005`
    ///
    /// Falls back to a floating point rendering when the sub-second part is
    /// too large for [`Interval::sub_second_micros`].
    pub fn seconds_with_fraction(&self) -> String {
        let Some(sub_second) = self.sub_second_micros() else {
            let seconds = f64::from(self.seconds)
                + self.milliseconds / 1_000.0
                + f64::from(self.microseconds) / 1_000_000.0;
            return seconds.to_string();
        };
        let micros = i128::from(self.seconds) * 1_000_000 + i128::from(sub_second);
        let whole = micros / 1_000_000;
        let fraction = micros % 1_000_000;
        if fraction == 0 {
            return whole.to_string();
        }
        let digits = format!("{fraction:06}");
        format!("{whole}.{}", digits.trim_end_matches('0'))
    }

    /// Render the interval with `%`-prefixed tokens
    ///
    /// Calendar tokens: `%y %Y %m %M %d %D %h %H %i %I %a %R %r %%`.
    /// Sub-second tokens: `%f`/`%F` milliseconds, `%u`/`%U` microseconds and
    /// `%s`/`%S` seconds with fraction. Upper-case variants zero-pad to two
    /// digits. Unknown tokens are copied through unchanged.
    pub fn format(&self, pattern: &str) -> String {
        let mut out = String::with_capacity(pattern.len() + 16);
        let mut chars = pattern.chars();

        while let Some(c) = chars.next() {
            if c != '%' {
                out.push(c);
                continue;
            }
            let Some(token) = chars.next() else {
                out.push('%');
                break;
            };
            match token {
                'y' => out.push_str(&self.years.to_string()),
                'Y' => out.push_str(&format!("{:02}", self.years)),
                'm' => out.push_str(&self.months.to_string()),
                'M' => out.push_str(&format!("{:02}", self.months)),
                'd' => out.push_str(&self.days.to_string()),
                'D' => out.push_str(&format!("{:02}", self.days)),
                'h' => out.push_str(&self.hours.to_string()),
                'H' => out.push_str(&format!("{:02}", self.hours)),
                'i' => out.push_str(&self.minutes.to_string()),
                'I' => out.push_str(&format!("{:02}", self.minutes)),
                's' | 'S' => out.push_str(&self.seconds_with_fraction()),
                'f' => out.push_str(&self.milliseconds.to_string()),
                'F' => out.push_str(&format!("{:02}", self.milliseconds.trunc() as i64)),
                'u' => out.push_str(&self.microseconds.to_string()),
                'U' => out.push_str(&format!("{:02}", self.microseconds)),
                'a' => match self.total_days {
                    Some(days) => out.push_str(&days.to_string()),
                    None => out.push_str("(unknown)"),
                },
                'R' => out.push(if self.invert { '-' } else { '+' }),
                'r' => {
                    if self.invert {
                        out.push('-');
                    }
                }
                '%' => out.push('%'),
                other => {
                    out.push('%');
                    out.push(other);
                }
            }
        }

        out
    }
}

impl fmt::Display for Interval {
    /// Extended ISO-8601 form, accepted back by [`Interval::parse`]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.invert {
            f.write_str("-")?;
        }
        f.write_str("P")?;
        for (value, unit) in [(self.years, 'Y'), (self.months, 'M'), (self.days, 'D')] {
            if value != 0 {
                write!(f, "{value}{unit}")?;
            }
        }
        f.write_str("T")?;
        for (value, unit) in [(self.hours, 'H'), (self.minutes, 'M')] {
            if value != 0 {
                write!(f, "{value}{unit}")?;
            }
        }
        write!(f, "{}S", self.seconds)?;
        if self.milliseconds != 0.0 {
            write!(f, "{}F", self.milliseconds)?;
        }
        if self.microseconds != 0 {
            write!(f, "{}U", self.microseconds)?;
        }
        Ok(())
    }
}

impl FromStr for Interval {
    type Err = IntervalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Decimal number captured as its digit strings, so scaling is exact
struct Decimal<'a> {
    integer: &'a str,
    fraction: &'a str,
}

impl<'a> Decimal<'a> {
    fn new(integer: &'a str, fraction: &'a str) -> Self {
        Self { integer, fraction }
    }

    fn integer_is_zero(&self) -> bool {
        self.integer.bytes().all(|b| b == b'0')
    }

    fn is_below_one(&self) -> bool {
        self.integer_is_zero()
    }

    fn is_below_one_milli(&self) -> bool {
        self.integer_is_zero() && self.fraction.bytes().take(3).all(|b| b == b'0')
    }

    fn integer_part(&self) -> Result<u32, IntervalError> {
        if self.integer.is_empty() {
            return Ok(0);
        }
        self.integer
            .parse()
            .map_err(|_| IntervalError::OutOfRange(self.integer.to_string()))
    }

    /// Value multiplied by `10^places`
    fn shifted(&self, places: usize) -> f64 {
        let mut fraction = self.fraction.to_string();
        while fraction.len() < places {
            fraction.push('0');
        }
        let (moved, rest) = fraction.split_at(places);
        let integer = format!("{}{}", self.integer, moved);
        let integer = if integer.is_empty() { "0" } else { &integer };
        let rest = if rest.is_empty() { "0" } else { rest };
        format!("{integer}.{rest}").parse().unwrap_or(0.0)
    }
}

/// Locate a designator and return its span plus integer and fraction digits
fn designator(pattern: &Regex, haystack: &str) -> Option<(Range<usize>, String, String)> {
    let found = pattern.captures(haystack)?;
    let range = found.get(0)?.range();
    Some((range, found[1].to_string(), found[2].to_string()))
}

fn to_u32(value: f64) -> Option<u32> {
    (0.0..=f64::from(u32::MAX))
        .contains(&value)
        .then_some(value as u32)
}
