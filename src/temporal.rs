//! Date, time and duration converters.
//!
//! Dates and times use the ISO 8601 / RFC 3339 textual profiles:
//!
//! | Converter | Value | Canonical text |
//! |-----------|-------|----------------|
//! | [`DateTimeIso`] | [`Timestamp`] | `2024-01-01T12:00:00`, `2024-01-01T12:00:00+02:00`, `...Z` |
//! | [`DateIso`] | `NaiveDate` | `2024-01-01` |
//! | [`TimeIso`] | `NaiveTime` | `14:30:00` |
//! | [`DurationIso`] | `TimeDelta` | `PT1H30M` |
//!
//! A zero UTC offset is normalized to `Z` on output.
//!
//! # Durations
//!
//! [`DurationIso`] tries, in order:
//!
//! 1. The ISO 8601 duration profile: `P1DT2H30M`, `PT0.5S`, `-P1D`. Years
//!    count as 365 days and months as 30.
//! 2. Unit-suffixed quantities, summed: `1h 30m`, `2 days 3 hours`, `90s`.
//! 3. A clock form: `H:MM:SS` or `MM:SS`, optionally with a fraction.
//! 4. A bare number of seconds: `3600`, `0.25`.
//!
//! Output is always the ISO 8601 duration profile.

use std::fmt::Write;

use chrono::{
    DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat, TimeDelta, Utc,
};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::converter::Converter;
use crate::error::BindfigError;

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%dT%H:%M%:z",
    "%Y-%m-%d %H:%M%:z",
];

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";
const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%H:%M:%S%.f";

/// A point in time, with or without a UTC offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timestamp {
    /// Wall-clock time with no offset information.
    Local(NaiveDateTime),
    /// Time with an explicit offset.
    Offset(DateTime<FixedOffset>),
}

impl From<NaiveDateTime> for Timestamp {
    fn from(dt: NaiveDateTime) -> Self {
        Timestamp::Local(dt)
    }
}

impl From<DateTime<FixedOffset>> for Timestamp {
    fn from(dt: DateTime<FixedOffset>) -> Self {
        Timestamp::Offset(dt)
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Timestamp::Offset(dt.fixed_offset())
    }
}

/// Combined date and time, with an optional offset or `Z` marker.
///
/// Also accepts a space instead of `T`, minute precision, and a bare date
/// (read as midnight).
#[derive(Debug, Clone, Copy, Default)]
pub struct DateTimeIso;

impl Converter for DateTimeIso {
    type Value = Timestamp;

    fn type_name(&self) -> &'static str {
        "date-time"
    }

    fn parse(&self, text: &str) -> Result<Timestamp, BindfigError> {
        let s = text.trim();
        if s.is_empty() {
            return Err(BindfigError::conversion(self.type_name(), text, "empty"));
        }

        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Ok(Timestamp::Offset(dt));
        }

        let zoned = match s.strip_suffix(['Z', 'z']) {
            Some(head) => format!("{head}+00:00"),
            None => s.to_string(),
        };
        for fmt in OFFSET_FORMATS {
            if let Ok(dt) = DateTime::parse_from_str(&zoned, fmt) {
                return Ok(Timestamp::Offset(dt));
            }
        }
        for fmt in NAIVE_FORMATS {
            if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
                return Ok(Timestamp::Local(dt));
            }
        }
        if let Ok(date) = NaiveDate::parse_from_str(s, DATE_FORMAT) {
            return Ok(Timestamp::Local(date.and_time(NaiveTime::MIN)));
        }

        Err(BindfigError::conversion(
            self.type_name(),
            text,
            "expected ISO 8601 (YYYY-MM-DDTHH:MM:SS[.f][+HH:MM|Z])",
        ))
    }

    fn format(&self, value: &Timestamp) -> String {
        match value {
            Timestamp::Local(dt) => dt.format(TIMESTAMP_FORMAT).to_string(),
            Timestamp::Offset(dt) => dt.to_rfc3339_opts(SecondsFormat::AutoSi, true),
        }
    }
}

/// Calendar date, `YYYY-MM-DD`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DateIso;

impl Converter for DateIso {
    type Value = NaiveDate;

    fn type_name(&self) -> &'static str {
        "date"
    }

    fn parse(&self, text: &str) -> Result<NaiveDate, BindfigError> {
        NaiveDate::parse_from_str(text.trim(), DATE_FORMAT)
            .map_err(|e| BindfigError::conversion(self.type_name(), text, e))
    }

    fn format(&self, value: &NaiveDate) -> String {
        value.format(DATE_FORMAT).to_string()
    }
}

/// Time of day, `HH:MM:SS[.f]`. Minute precision is accepted on parse.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimeIso;

impl Converter for TimeIso {
    type Value = NaiveTime;

    fn type_name(&self) -> &'static str {
        "time"
    }

    fn parse(&self, text: &str) -> Result<NaiveTime, BindfigError> {
        let s = text.trim();
        NaiveTime::parse_from_str(s, TIME_FORMAT)
            .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M"))
            .map_err(|e| BindfigError::conversion(self.type_name(), text, e))
    }

    fn format(&self, value: &NaiveTime) -> String {
        value.format(TIME_FORMAT).to_string()
    }
}

static PERIOD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(-)?P(?:(\d+(?:\.\d+)?)Y)?(?:(\d+(?:\.\d+)?)M)?(?:(\d+(?:\.\d+)?)W)?(?:(\d+(?:\.\d+)?)D)?(?:T(?:(\d+(?:\.\d+)?)H)?(?:(\d+(?:\.\d+)?)M)?(?:(\d+(?:\.\d+)?)S)?)?$",
    )
    .expect("period pattern is valid")
});

static UNIT_SEQUENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:\d+(?:\.\d+)?\s*[a-z]+\s*)+$").expect("unit sequence pattern is valid")
});

static UNIT_PAIR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+(?:\.\d+)?)\s*([a-z]+)").expect("unit pair pattern is valid"));

static CLOCK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d+):(\d{1,2})(?::(\d{1,2}))?(?:\.(\d+))?$").expect("clock pattern is valid")
});

static BARE_SECONDS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(-)?(\d+(?:\.\d+)?)$").expect("seconds pattern is valid"));

const SECONDS_PER_DAY: i64 = 86_400;
const NANOS_PER_SECOND: i128 = 1_000_000_000;
/// Fraction digits beyond this cannot change the nanosecond result of any unit.
const MAX_FRACTION_DIGITS: usize = 18;

/// Seconds per period component, in capture-group order (Y, M, W, D, H, M, S).
const PERIOD_UNITS: [i64; 7] = [
    365 * SECONDS_PER_DAY,
    30 * SECONDS_PER_DAY,
    7 * SECONDS_PER_DAY,
    SECONDS_PER_DAY,
    3_600,
    60,
    1,
];

fn unit_seconds(unit: &str) -> Option<i64> {
    let secs = match unit {
        "w" | "week" | "weeks" => 7 * SECONDS_PER_DAY,
        "d" | "day" | "days" => SECONDS_PER_DAY,
        "h" | "hr" | "hrs" | "hour" | "hours" => 3_600,
        "m" | "min" | "mins" | "minute" | "minutes" => 60,
        "s" | "sec" | "secs" | "second" | "seconds" => 1,
        _ => return None,
    };
    Some(secs)
}

/// `quantity * unit_secs` for a non-negative decimal quantity, exact to the
/// nanosecond (fractions round half up). `None` on overflow.
fn scaled(quantity: &str, unit_secs: i64) -> Option<TimeDelta> {
    let (whole, fraction) = quantity.split_once('.').unwrap_or((quantity, ""));
    let whole = TimeDelta::try_seconds(whole.parse::<i64>().ok()?.checked_mul(unit_secs)?)?;
    let fraction = &fraction[..fraction.len().min(MAX_FRACTION_DIGITS)];
    if fraction.is_empty() {
        return Some(whole);
    }
    let digits: i128 = fraction.parse().ok()?;
    let scale = 10i128.pow(fraction.len() as u32);
    let nanos = (digits * i128::from(unit_secs) * NANOS_PER_SECOND + scale / 2) / scale;
    whole.checked_add(&TimeDelta::nanoseconds(i64::try_from(nanos).ok()?))
}

/// Time span; see the [module docs](self) for accepted forms.
#[derive(Debug, Clone, Copy, Default)]
pub struct DurationIso;

impl DurationIso {
    fn out_of_range(&self, text: &str) -> BindfigError {
        BindfigError::conversion(self.type_name(), text, "out of range")
    }

    /// Sum `(quantity, unit_secs)` terms, negating the total when asked.
    fn sum<'a>(
        &self,
        text: &str,
        terms: impl IntoIterator<Item = (&'a str, i64)>,
        negative: bool,
    ) -> Result<TimeDelta, BindfigError> {
        let mut total = TimeDelta::zero();
        for (quantity, unit) in terms {
            total = scaled(quantity, unit)
                .and_then(|term| total.checked_add(&term))
                .ok_or_else(|| self.out_of_range(text))?;
        }
        if negative {
            total = TimeDelta::zero()
                .checked_sub(&total)
                .ok_or_else(|| self.out_of_range(text))?;
        }
        Ok(total)
    }

    fn parse_period(&self, text: &str, s: &str) -> Option<Result<TimeDelta, BindfigError>> {
        let upper = s.to_ascii_uppercase();
        let caps = PERIOD.captures(&upper)?;
        let terms: Vec<(&str, i64)> = PERIOD_UNITS
            .iter()
            .enumerate()
            .filter_map(|(i, unit)| caps.get(i + 2).map(|m| (m.as_str(), *unit)))
            .collect();
        if terms.is_empty() {
            return Some(Err(BindfigError::conversion(
                self.type_name(),
                text,
                "duration period has no components",
            )));
        }
        Some(self.sum(text, terms, caps.get(1).is_some()))
    }

    fn parse_units(&self, text: &str, s: &str) -> Option<Result<TimeDelta, BindfigError>> {
        let lower = s.to_ascii_lowercase();
        if !UNIT_SEQUENCE.is_match(&lower) {
            return None;
        }
        let mut terms = Vec::new();
        for caps in UNIT_PAIR.captures_iter(&lower) {
            let (Some(quantity), Some(unit)) = (caps.get(1), caps.get(2)) else {
                continue;
            };
            let Some(secs) = unit_seconds(unit.as_str()) else {
                return Some(Err(BindfigError::conversion(
                    self.type_name(),
                    text,
                    format!("unknown time unit '{}'", unit.as_str()),
                )));
            };
            terms.push((quantity.as_str(), secs));
        }
        Some(self.sum(text, terms, false))
    }

    fn parse_clock(&self, text: &str, s: &str) -> Option<Result<TimeDelta, BindfigError>> {
        let caps = CLOCK.captures(s)?;
        let first = caps.get(1)?.as_str();
        let second = caps.get(2)?.as_str();
        let mut terms = match caps.get(3) {
            Some(third) => vec![(first, 3_600), (second, 60), (third.as_str(), 1)],
            None => vec![(first, 60), (second, 1)],
        };
        let fraction = caps.get(4).map(|f| format!("0.{}", f.as_str()));
        if let Some(fraction) = &fraction {
            terms.push((fraction.as_str(), 1));
        }
        Some(self.sum(text, terms, false))
    }

    fn parse_seconds(&self, text: &str, s: &str) -> Option<Result<TimeDelta, BindfigError>> {
        let caps = BARE_SECONDS.captures(s)?;
        let quantity = caps.get(2)?.as_str();
        Some(self.sum(text, [(quantity, 1)], caps.get(1).is_some()))
    }
}

impl Converter for DurationIso {
    type Value = TimeDelta;

    fn type_name(&self) -> &'static str {
        "duration"
    }

    fn parse(&self, text: &str) -> Result<TimeDelta, BindfigError> {
        let s = text.trim();
        if s.is_empty() {
            return Err(BindfigError::conversion(self.type_name(), text, "empty"));
        }
        if let Some(result) = self.parse_period(text, s) {
            return result;
        }
        if let Some(result) = self.parse_units(text, s) {
            return result;
        }
        if let Some(result) = self.parse_clock(text, s) {
            return result;
        }
        if let Some(result) = self.parse_seconds(text, s) {
            return result;
        }
        Err(BindfigError::conversion(
            self.type_name(),
            text,
            "expected ISO 8601 duration, '1h 30m', 'H:MM:SS' or seconds",
        ))
    }

    fn format(&self, value: &TimeDelta) -> String {
        if value.is_zero() {
            return "PT0S".to_string();
        }
        let negative = *value < TimeDelta::zero();
        let abs = if negative { -*value } else { *value };

        let total = abs.num_seconds();
        let nanos = abs.subsec_nanos();
        let days = total / 86_400;
        let hours = (total % 86_400) / 3_600;
        let minutes = (total % 3_600) / 60;
        let secs = total % 60;

        let mut out = String::new();
        if negative {
            out.push('-');
        }
        out.push('P');
        if days > 0 {
            let _ = write!(out, "{days}D");
        }
        if hours > 0 || minutes > 0 || secs > 0 || nanos > 0 {
            out.push('T');
            if hours > 0 {
                let _ = write!(out, "{hours}H");
            }
            if minutes > 0 {
                let _ = write!(out, "{minutes}M");
            }
            if nanos > 0 {
                let frac = format!("{nanos:09}");
                let _ = write!(out, "{secs}.{}S", frac.trim_end_matches('0'));
            } else if secs > 0 {
                let _ = write!(out, "{secs}S");
            }
        }
        out
    }
}
