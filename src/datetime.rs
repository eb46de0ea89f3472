// Date and time helpers
// Timestamp parsing, custom format translation and calendar arithmetic

use std::fmt::Write;
use std::str::FromStr;

use chrono::{
    DateTime, Datelike, Duration, Months, NaiveDate, NaiveDateTime, TimeZone, Timelike, Utc,
};
use thiserror::Error;

/// Output of `add*` transforms and `toISOString`-style rendering.
pub const ISO_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

/// Default output of the formatting date operators.
pub const DEFAULT_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f%:z";

/// .NET ticks at the Unix epoch.
pub const UNIX_EPOCH_TICKS: i64 = 621_355_968_000_000_000;

pub const TICKS_PER_MILLISECOND: i64 = 10_000;
pub const TICKS_PER_MINUTE: i64 = 600_000_000;
pub const TICKS_PER_HOUR: i64 = 36_000_000_000;
pub const TICKS_PER_DAY: i64 = 864_000_000_000;

/// DateTime errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DateTimeError {
    #[error("{0} is not a valid datetime string.")]
    Invalid(String),

    #[error("{0} is not a ISO format datetime string.")]
    NotIso(String),

    #[error("{0} is not a valid time unit.")]
    InvalidUnit(String),

    #[error("Format error: {0}")]
    Format(String),
}

/// Parse the canonical `YYYY-MM-DDTHH:mm:ss.fffZ` form and nothing else.
pub fn parse_iso8601(s: &str) -> Result<DateTime<Utc>, DateTimeError> {
    let parsed = DateTime::parse_from_rfc3339(s)
        .map_err(|_| DateTimeError::NotIso(s.to_string()))?
        .with_timezone(&Utc);
    if to_iso_string(&parsed) != s {
        return Err(DateTimeError::NotIso(s.to_string()));
    }
    Ok(parsed)
}

/// Parse any reasonable timestamp; values without an offset are taken as UTC.
pub fn parse_lenient(s: &str) -> Result<DateTime<Utc>, DateTimeError> {
    parse_local(s)
        .map(|(naive, offset)| match offset {
            Some(dt) => dt,
            None => Utc.from_utc_datetime(&naive),
        })
        .ok_or_else(|| DateTimeError::Invalid(s.to_string()))
}

/// Parse a timestamp, reporting whether it carried an offset.
///
/// The naive part is the wall-clock time as written; the second element is the
/// absolute instant when the text had an offset.
pub fn parse_local(s: &str) -> Option<(NaiveDateTime, Option<DateTime<Utc>>)> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some((dt.naive_local(), Some(dt.with_timezone(&Utc))));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some((dt.naive_local(), Some(dt.with_timezone(&Utc))));
    }
    const NAIVE_FORMATS: &[&str] = &[
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M",
        "%m/%d/%Y %H:%M:%S",
    ];
    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some((naive, None));
        }
    }
    const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d"];
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(s, format) {
            return date.and_hms_opt(0, 0, 0).map(|naive| (naive, None));
        }
    }
    None
}

/// Format as `YYYY-MM-DDTHH:mm:ss.fffZ`.
pub fn to_iso_string(dt: &DateTime<Utc>) -> String {
    dt.format(ISO_FORMAT).to_string()
}

/// Render `dt` with a strftime pattern, failing instead of panicking on an
/// unsupported specifier.
pub fn format_timestamp<Tz>(dt: &DateTime<Tz>, pattern: &str) -> Result<String, DateTimeError>
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    let mut out = String::new();
    write!(out, "{}", dt.format(pattern))
        .map_err(|_| DateTimeError::Format(format!("{} is not a valid format", pattern)))?;
    Ok(out)
}

/// Translate a .NET / moment style pattern (`yyyy-MM-dd HH:mm`, `MM-DD-YY`)
/// into a chrono strftime pattern.
pub fn timestamp_formatter(format: &str) -> String {
    match format {
        "o" | "O" => return "%Y-%m-%dT%H:%M:%S%.7f%:z".to_string(),
        "s" => return "%Y-%m-%dT%H:%M:%S".to_string(),
        _ => {}
    }

    let chars: Vec<char> = format.chars().collect();
    let mut out = String::with_capacity(format.len() * 2);
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];

        // quoted literal
        if c == '\'' || c == '"' {
            let mut j = i + 1;
            while j < chars.len() && chars[j] != c {
                push_literal(&mut out, chars[j]);
                j += 1;
            }
            i = j + 1;
            continue;
        }
        if c == '[' {
            let mut j = i + 1;
            while j < chars.len() && chars[j] != ']' {
                push_literal(&mut out, chars[j]);
                j += 1;
            }
            i = j + 1;
            continue;
        }
        if c == '\\' {
            if let Some(next) = chars.get(i + 1) {
                push_literal(&mut out, *next);
            }
            i += 2;
            continue;
        }

        let mut run = 1;
        while i + run < chars.len() && chars[i + run] == c {
            run += 1;
        }

        let token = match (c, run) {
            ('y' | 'Y', 1 | 2) => Some("%y"),
            ('y' | 'Y', _) => Some("%Y"),
            ('M', 1) => Some("%-m"),
            ('M', 2) => Some("%m"),
            ('M', 3) => Some("%b"),
            ('M', _) => Some("%B"),
            ('d', 1) | ('D', 1) => Some("%-d"),
            ('d', 2) | ('D', 2) => Some("%d"),
            ('d', 3) => Some("%a"),
            ('d', _) => Some("%A"),
            ('D', _) => Some("%j"),
            ('H', 1) => Some("%-H"),
            ('H', _) => Some("%H"),
            ('h', 1) => Some("%-I"),
            ('h', _) => Some("%I"),
            ('m', 1) => Some("%-M"),
            ('m', _) => Some("%M"),
            ('s', 1) => Some("%-S"),
            ('s', _) => Some("%S"),
            ('f' | 'F' | 'S', 1..=3) => Some("%3f"),
            ('f' | 'F' | 'S', 4..=6) => Some("%6f"),
            ('f' | 'F' | 'S', _) => Some("%9f"),
            ('t', _) | ('A', 1) => Some("%p"),
            ('a', 1) => Some("%P"),
            ('z', 1 | 2) => Some("%:::z"),
            ('z', _) | ('Z', 1) | ('K', _) => Some("%:z"),
            ('Z', _) => Some("%z"),
            _ => None,
        };

        match token {
            Some(token) => out.push_str(token),
            None => (0..run).for_each(|_| push_literal(&mut out, c)),
        }
        i += run;
    }
    out
}

fn push_literal(out: &mut String, c: char) {
    if c == '%' {
        out.push_str("%%");
    } else {
        out.push(c);
    }
}

/// Calendar units accepted by `addToTime`, `subtractFromTime` and friends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeUnit {
    Second,
    Minute,
    Hour,
    Day,
    Week,
    Month,
    Year,
}

impl FromStr for TimeUnit {
    type Err = DateTimeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Second" => Ok(TimeUnit::Second),
            "Minute" => Ok(TimeUnit::Minute),
            "Hour" => Ok(TimeUnit::Hour),
            "Day" => Ok(TimeUnit::Day),
            "Week" => Ok(TimeUnit::Week),
            "Month" => Ok(TimeUnit::Month),
            "Year" => Ok(TimeUnit::Year),
            _ => Err(DateTimeError::InvalidUnit(s.to_string())),
        }
    }
}

impl TimeUnit {
    /// Shift `dt` by `amount` units; `None` on overflow.
    pub fn add<Tz: TimeZone>(self, dt: DateTime<Tz>, amount: i64) -> Option<DateTime<Tz>> {
        match self {
            TimeUnit::Second => dt.checked_add_signed(Duration::try_seconds(amount)?),
            TimeUnit::Minute => dt.checked_add_signed(Duration::try_minutes(amount)?),
            TimeUnit::Hour => dt.checked_add_signed(Duration::try_hours(amount)?),
            TimeUnit::Day => dt.checked_add_signed(Duration::try_days(amount)?),
            TimeUnit::Week => dt.checked_add_signed(Duration::try_weeks(amount)?),
            TimeUnit::Month => add_months(dt, amount),
            TimeUnit::Year => add_months(dt, amount.checked_mul(12)?),
        }
    }
}

fn add_months<Tz: TimeZone>(dt: DateTime<Tz>, months: i64) -> Option<DateTime<Tz>> {
    let magnitude = Months::new(u32::try_from(months.unsigned_abs()).ok()?);
    if months >= 0 {
        dt.checked_add_months(magnitude)
    } else {
        dt.checked_sub_months(magnitude)
    }
}

pub fn add_days(dt: DateTime<Utc>, amount: i64) -> Option<DateTime<Utc>> {
    TimeUnit::Day.add(dt, amount)
}

pub fn add_hours(dt: DateTime<Utc>, amount: i64) -> Option<DateTime<Utc>> {
    TimeUnit::Hour.add(dt, amount)
}

pub fn add_minutes(dt: DateTime<Utc>, amount: i64) -> Option<DateTime<Utc>> {
    TimeUnit::Minute.add(dt, amount)
}

pub fn add_seconds(dt: DateTime<Utc>, amount: i64) -> Option<DateTime<Utc>> {
    TimeUnit::Second.add(dt, amount)
}

/// .NET ticks (100ns since 0001-01-01) of `dt`.
/// `None` when the tick count does not fit an `i64`.
pub fn ticks(dt: &DateTime<Utc>) -> Option<i64> {
    dt.timestamp_millis()
        .checked_mul(TICKS_PER_MILLISECOND)?
        .checked_add(UNIX_EPOCH_TICKS)
}

pub fn from_ticks(ticks: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp_millis(ticks.checked_sub(UNIX_EPOCH_TICKS)? / TICKS_PER_MILLISECOND)
}

pub fn start_of_day<Tz: TimeZone>(dt: &DateTime<Tz>) -> Option<DateTime<Tz>> {
    dt.with_hour(0)?.with_minute(0)?.with_second(0)?.with_nanosecond(0)
}

pub fn start_of_hour<Tz: TimeZone>(dt: &DateTime<Tz>) -> Option<DateTime<Tz>> {
    dt.with_minute(0)?.with_second(0)?.with_nanosecond(0)
}

pub fn start_of_month<Tz: TimeZone>(dt: &DateTime<Tz>) -> Option<DateTime<Tz>> {
    start_of_day(&dt.with_day(1)?)
}

const WEEKDAYS: [&str; 7] = [
    "Sunday",
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
];

const MONTHS: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// Describe `date` relative to `reference` in English: `today`, `tomorrow`,
/// `next Friday`, or a plain `15th March 2018`.
pub fn read_back(reference: NaiveDate, date: NaiveDate) -> String {
    let days = (date - reference).num_days();
    match days {
        0 => return "today".to_string(),
        1 => return "tomorrow".to_string(),
        -1 => return "yesterday".to_string(),
        _ => {}
    }

    let weekday = WEEKDAYS[date.weekday().num_days_from_sunday() as usize];
    let week_start = reference - Duration::days(i64::from(reference.weekday().num_days_from_sunday()));
    let offset = (date - week_start).num_days();
    match offset {
        0..=6 => return format!("this {}", weekday),
        7..=13 => return format!("next {}", weekday),
        -7..=-1 => return format!("last {}", weekday),
        _ => {}
    }

    let day = date.day();
    // suffix follows the last digit only, so 11 reads "11st"
    let suffix = match day % 10 {
        1 => "st",
        2 => "nd",
        3 => "rd",
        _ => "th",
    };
    format!(
        "{}{} {} {}",
        day,
        suffix,
        MONTHS[date.month0() as usize],
        date.year()
    )
}

/// Coarse part of day for an `HHmm` clock reading.
pub fn time_of_day(hour: u32, minute: u32) -> &'static str {
    let clock = hour * 100 + minute;
    match clock {
        0 => "midnight",
        1..=1199 => "morning",
        1200 => "noon",
        1201..=1799 => "afternoon",
        1800..=2200 => "evening",
        _ => "night",
    }
}
