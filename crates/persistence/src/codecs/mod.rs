//! Serde codecs for date and duration types.
//!
//! The BSON mapper has no native representation for durations, and stores
//! dates as BSON datetimes. These modules give such fields a stable stored
//! form. Use them with `#[serde(with = "...")]`:
//!
//! ```
//! use chrono::{NaiveDate, TimeDelta};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Serialize, Deserialize)]
//! struct Schedule {
//!     #[serde(with = "mongodb_persistence::codecs::duration_seconds")]
//!     timeout: TimeDelta,
//!     #[serde(with = "mongodb_persistence::codecs::duration_string")]
//!     interval: TimeDelta,
//!     #[serde(with = "mongodb_persistence::codecs::naive_date_string")]
//!     starts_on: NaiveDate,
//! }
//!
//! let schedule = Schedule {
//!     timeout: TimeDelta::seconds(30),
//!     interval: TimeDelta::minutes(90),
//!     starts_on: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
//! };
//! let document = bson::to_document(&schedule).unwrap();
//! assert_eq!(document.get_i64("timeout").unwrap(), 30);
//! assert_eq!(document.get_str("interval").unwrap(), "PT1H30M");
//! assert_eq!(document.get_str("starts_on").unwrap(), "2024-03-01");
//! ```

use chrono::TimeDelta;

/// Formats a duration as ISO-8601 `PTnHnMnS`, e.g. `PT1H30M` or `PT0.5S`.
pub fn format_iso_duration(duration: &TimeDelta) -> String {
    if duration.is_zero() {
        return "PT0S".to_string();
    }

    let sign = if *duration < TimeDelta::zero() { "-" } else { "" };
    let abs = duration.abs();
    let total = abs.num_seconds();
    let nanos = abs.subsec_nanos();
    let (hours, minutes, seconds) = (total / 3600, (total % 3600) / 60, total % 60);

    let mut out = format!("{sign}PT");
    if hours > 0 {
        out.push_str(&format!("{hours}H"));
    }
    if minutes > 0 {
        out.push_str(&format!("{minutes}M"));
    }
    if seconds > 0 || nanos > 0 {
        out.push_str(&seconds.to_string());
        if nanos > 0 {
            let fraction = format!("{nanos:09}");
            out.push('.');
            out.push_str(fraction.trim_end_matches('0'));
        }
        out.push('S');
    }
    out
}

/// Parses an ISO-8601 duration with day, hour, minute and second parts
/// (`P2DT3H`, `PT15M`, `-PT1.25S`). Parts may carry their own sign, as in
/// `PT-1M-30S`. Years and months are rejected since their length is not
/// fixed.
pub fn parse_iso_duration(s: &str) -> Result<TimeDelta, String> {
    let invalid = || format!("'{s}' is not an ISO-8601 duration");

    let trimmed = s.trim();
    let (negative, rest) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };
    let rest = rest
        .strip_prefix(['P', 'p'])
        .filter(|rest| !rest.is_empty())
        .ok_or_else(invalid)?;

    let mut total = TimeDelta::zero();
    let mut in_time = false;
    let mut parts = 0;
    let mut number = String::new();
    let mut sign: Option<char> = None;

    for c in rest.chars() {
        match c.to_ascii_uppercase() {
            'T' if !in_time && number.is_empty() && sign.is_none() => in_time = true,
            '-' | '+' if number.is_empty() && sign.is_none() => sign = Some(c),
            '0'..='9' | '.' => number.push(c),
            unit => {
                if number.is_empty() {
                    return Err(invalid());
                }
                let part = match (in_time, unit) {
                    (false, 'W') => parse_whole(&number).and_then(TimeDelta::try_weeks),
                    (false, 'D') => parse_whole(&number).and_then(TimeDelta::try_days),
                    (true, 'H') => parse_whole(&number).and_then(TimeDelta::try_hours),
                    (true, 'M') => parse_whole(&number).and_then(TimeDelta::try_minutes),
                    (true, 'S') => parse_seconds(&number),
                    _ => None,
                }
                .ok_or_else(invalid)?;
                let part = if sign == Some('-') { -part } else { part };
                total = total.checked_add(&part).ok_or_else(invalid)?;
                parts += 1;
                number.clear();
                sign = None;
            }
        }
    }

    if parts == 0 || !number.is_empty() || sign.is_some() {
        return Err(invalid());
    }
    Ok(if negative { -total } else { total })
}

fn parse_whole(number: &str) -> Option<i64> {
    number.parse().ok()
}

fn parse_seconds(number: &str) -> Option<TimeDelta> {
    let (whole, fraction) = number.split_once('.').unwrap_or((number, ""));
    if fraction.len() > 9 || !fraction.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let seconds = TimeDelta::try_seconds(whole.parse().ok()?)?;
    let nanos = if fraction.is_empty() {
        0
    } else {
        format!("{fraction:0<9}").parse().ok()?
    };
    seconds.checked_add(&TimeDelta::nanoseconds(nanos))
}

/// `TimeDelta` stored as a 64-bit integer number of whole seconds.
pub mod duration_seconds {
    use chrono::TimeDelta;
    use serde::{Deserialize, Deserializer, Serializer};

    /// Serializes the whole seconds of a duration.
    pub fn serialize<S>(duration: &TimeDelta, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_i64(duration.num_seconds())
    }

    /// Deserializes a duration from whole seconds.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<TimeDelta, D::Error>
    where
        D: Deserializer<'de>,
    {
        let seconds = i64::deserialize(deserializer)?;
        TimeDelta::try_seconds(seconds)
            .ok_or_else(|| serde::de::Error::custom(format!("{seconds} seconds is out of range")))
    }
}

/// `TimeDelta` stored as an ISO-8601 string (`PT1H30M`).
pub mod duration_string {
    use chrono::TimeDelta;
    use serde::{Deserialize, Deserializer, Serializer};

    /// Serializes a duration as an ISO-8601 string.
    pub fn serialize<S>(duration: &TimeDelta, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&super::format_iso_duration(duration))
    }

    /// Deserializes a duration from an ISO-8601 string.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<TimeDelta, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        super::parse_iso_duration(&s).map_err(serde::de::Error::custom)
    }
}

/// `DateTime<FixedOffset>` stored as an RFC 3339 string, keeping the offset.
pub mod date_time_string {
    use chrono::{DateTime, FixedOffset};
    use serde::{Deserialize, Deserializer, Serializer};

    /// Serializes a date-time as RFC 3339.
    pub fn serialize<S>(value: &DateTime<FixedOffset>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.to_rfc3339())
    }

    /// Deserializes a date-time from RFC 3339.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<FixedOffset>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&s).map_err(serde::de::Error::custom)
    }
}

/// `NaiveDate` stored as `YYYY-MM-DD`.
pub mod naive_date_string {
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serializer};

    /// Serializes a date as `YYYY-MM-DD`.
    pub fn serialize<S>(value: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.format("%Y-%m-%d").to_string())
    }

    /// Deserializes a date from `YYYY-MM-DD`.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// `NaiveDateTime` stored as an ISO-8601 local date-time string.
pub mod naive_date_time_string {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    /// Serializes a date-time as `YYYY-MM-DDTHH:MM:SS[.fff]`.
    pub fn serialize<S>(value: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.format("%Y-%m-%dT%H:%M:%S%.f").to_string())
    }

    /// Deserializes a date-time from an ISO-8601 local date-time string.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
