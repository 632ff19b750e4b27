//! Date and time utilities working with moment style format strings,
//! e.g. `DD/MM/YYYY HH:mm` or `MMMM Do YYYY, h:mm:ss a`.
//!
//! ```rust
//! use notetmpl_lib::datetime::{DateAndTimeUtils, FixedClock};
//! use std::sync::Arc;
//!
//! // 2021-08-12T17:04:54.117Z
//! let clock = Arc::new(FixedClock::from_unix_millis(1628787894117).unwrap());
//! let utils = DateAndTimeUtils::new("en_GB", "DD/MM/YYYY", "HH:mm", clock);
//!
//! assert_eq!(utils.current_time(None), "12/08/2021 17:04");
//! assert_eq!(
//!     utils.current_time(Some("MMMM Do YYYY, h:mm:ss a")),
//!     "August 12th 2021, 5:04:54 pm"
//! );
//! ```
//!
//! Month and weekday names are English, whatever the locale.
use crate::config::DateTimeCfg;
use crate::error::DateTimeError;
use std::fmt::Debug;
use std::fmt::Write;
use std::sync::Arc;
use time::{Date, Duration, Month, OffsetDateTime, PrimitiveDateTime, Time, UtcOffset};

const MONTH_NAMES: [&str; 12] = [
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

/// Sunday first, like `d`.
const WEEKDAY_NAMES: [&str; 7] = [
    "Sunday",
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
];

/// Source of the current instant.
pub trait Clock: Debug + Send + Sync {
    fn now(&self) -> OffsetDateTime;
}

/// The system clock in the local time zone. When the local offset can not be
/// determined, UTC is used.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc())
    }
}

/// A clock that always returns the same instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub OffsetDateTime);

impl FixedClock {
    /// Instant as milliseconds since the Unix epoch, in UTC.
    pub fn from_unix_millis(ms: i64) -> Result<Self, DateTimeError> {
        OffsetDateTime::from_unix_timestamp_nanos(ms as i128 * 1_000_000)
            .map(FixedClock)
            .map_err(|_| DateTimeError::OutOfRange)
    }
}

impl Clock for FixedClock {
    fn now(&self) -> OffsetDateTime {
        self.0
    }
}

/// Formats, parses and shifts instants according to the configured date
/// and time formats.
#[derive(Debug, Clone)]
pub struct DateAndTimeUtils {
    locale: String,
    date_format: String,
    time_format: String,
    clock: Arc<dyn Clock>,
}

impl DateAndTimeUtils {
    pub fn new(locale: &str, date_format: &str, time_format: &str, clock: Arc<dyn Clock>) -> Self {
        Self {
            locale: locale.to_string(),
            date_format: date_format.to_string(),
            time_format: time_format.to_string(),
            clock,
        }
    }

    pub fn from_cfg(cfg: &DateTimeCfg, clock: Arc<dyn Clock>) -> Self {
        Self::new(&cfg.locale, &cfg.date_format, &cfg.time_format, clock)
    }

    pub fn locale(&self) -> &str {
        &self.locale
    }

    pub fn date_format(&self) -> &str {
        &self.date_format
    }

    pub fn time_format(&self) -> &str {
        &self.time_format
    }

    /// `<date format> <time format>`
    pub fn date_time_format(&self) -> String {
        format!("{} {}", self.date_format, self.time_format)
    }

    pub fn now(&self) -> OffsetDateTime {
        self.clock.now()
    }

    /// Formats `dt`. An empty or missing `format` means the date time format.
    pub fn format(&self, dt: OffsetDateTime, format: Option<&str>) -> String {
        match format {
            Some(f) if !f.is_empty() => format_moment(dt, f),
            _ => format_moment(dt, &self.date_time_format()),
        }
    }

    /// Formats the current instant.
    pub fn current_time(&self, format: Option<&str>) -> String {
        self.format(self.now(), format)
    }

    /// The current instant moved back to the first day of the week.
    /// `start` is 0 for weeks starting on Sunday, 1 for Monday.
    /// The time of day is kept.
    pub fn beginning_of_week(&self, start: u8) -> OffsetDateTime {
        let now = self.now();
        let day = now.weekday().number_days_from_sunday();
        let diff = if day >= start { day - start } else { 6 - day };
        now - Duration::days(diff as i64)
    }

    /// Parses `input` strictly. Date parts missing in `format` are taken
    /// from today, missing time parts are 0.
    pub fn parse(&self, input: &str, format: &str) -> Result<OffsetDateTime, DateTimeError> {
        parse_moment(input, format, self.now()).ok_or_else(|| DateTimeError::Parse {
            input: input.to_string(),
            format: format.to_string(),
        })
    }

    pub fn parse_date(&self, input: &str, format: &str) -> Result<Date, DateTimeError> {
        self.parse(input, format).map(|dt| dt.date())
    }

    pub fn parse_time(&self, input: &str, format: &str) -> Result<Time, DateTimeError> {
        self.parse(input, format).map(|dt| dt.time())
    }
}

/// Adds calendar months. The day of month is clamped to the length of the
/// target month, e.g. 31 January + 1 month is 28 or 29 February.
pub fn add_months(dt: OffsetDateTime, months: i64) -> Result<OffsetDateTime, DateTimeError> {
    if months == 0 {
        return Ok(dt);
    }
    let total = dt.year() as i64 * 12 + (dt.month() as i64 - 1) + months;
    let year = i32::try_from(total.div_euclid(12)).map_err(|_| DateTimeError::OutOfRange)?;
    let month = Month::try_from(total.rem_euclid(12) as u8 + 1)
        .map_err(|_| DateTimeError::OutOfRange)?;
    let day = dt.day().min(month.length(year));
    let date =
        Date::from_calendar_date(year, month, day).map_err(|_| DateTimeError::OutOfRange)?;
    Ok(dt.replace_date(date))
}

/// Adds `duration` failing instead of overflowing.
pub fn add_duration(dt: OffsetDateTime, duration: Duration) -> Result<OffsetDateTime, DateTimeError> {
    dt.checked_add(duration).ok_or(DateTimeError::OutOfRange)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Year4,
    Year2,
    Month,
    Month2,
    MonthShort,
    MonthLong,
    MonthOrdinal,
    Day,
    Day2,
    DayOrdinal,
    DayOfYear,
    DayOfYear3,
    Weekday,
    WeekdayMin,
    WeekdayShort,
    WeekdayLong,
    IsoWeekday,
    Hour,
    Hour2,
    Hour12,
    Hour12Pad,
    Hour24,
    Hour24Pad,
    Minute,
    Minute2,
    Second,
    Second2,
    Fraction1,
    Fraction2,
    Fraction3,
    MeridiemUpper,
    MeridiemLower,
    Offset,
    OffsetCompact,
    UnixSeconds,
    UnixMillis,
    Quarter,
    IsoWeek,
    IsoWeek2,
}

/// Longer tokens sharing a prefix come first.
const TOKENS: &[(&str, Field)] = &[
    ("YYYY", Field::Year4),
    ("YY", Field::Year2),
    ("MMMM", Field::MonthLong),
    ("MMM", Field::MonthShort),
    ("MM", Field::Month2),
    ("Mo", Field::MonthOrdinal),
    ("M", Field::Month),
    ("DDDD", Field::DayOfYear3),
    ("DDD", Field::DayOfYear),
    ("DD", Field::Day2),
    ("Do", Field::DayOrdinal),
    ("D", Field::Day),
    ("dddd", Field::WeekdayLong),
    ("ddd", Field::WeekdayShort),
    ("dd", Field::WeekdayMin),
    ("d", Field::Weekday),
    ("E", Field::IsoWeekday),
    ("HH", Field::Hour2),
    ("H", Field::Hour),
    ("hh", Field::Hour12Pad),
    ("h", Field::Hour12),
    ("kk", Field::Hour24Pad),
    ("k", Field::Hour24),
    ("mm", Field::Minute2),
    ("m", Field::Minute),
    ("ss", Field::Second2),
    ("s", Field::Second),
    ("SSS", Field::Fraction3),
    ("SS", Field::Fraction2),
    ("S", Field::Fraction1),
    ("A", Field::MeridiemUpper),
    ("a", Field::MeridiemLower),
    ("ZZ", Field::OffsetCompact),
    ("Z", Field::Offset),
    ("X", Field::UnixSeconds),
    ("x", Field::UnixMillis),
    ("Q", Field::Quarter),
    ("WW", Field::IsoWeek2),
    ("W", Field::IsoWeek),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token<'a> {
    Literal(&'a str),
    Field(Field),
}

/// Splits a moment format string into tokens. `[...]` and `\x` escape
/// literal text; characters that are no token are literals too.
fn tokenize(format: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut rest = format;
    while let Some(c) = rest.chars().next() {
        if c == '[' {
            if let Some(end) = rest[1..].find(']') {
                let inner = &rest[1..1 + end];
                if !inner.contains('[') {
                    if !inner.is_empty() {
                        tokens.push(Token::Literal(inner));
                    }
                    rest = &rest[end + 2..];
                    continue;
                }
            }
        }
        if c == '\\' {
            if let Some(escaped) = rest[1..].chars().next() {
                let len = escaped.len_utf8();
                tokens.push(Token::Literal(&rest[1..1 + len]));
                rest = &rest[1 + len..];
                continue;
            }
        }
        if let Some((pattern, field)) = TOKENS.iter().find(|(p, _)| rest.starts_with(p)) {
            tokens.push(Token::Field(*field));
            rest = &rest[pattern.len()..];
            continue;
        }
        let len = c.len_utf8();
        tokens.push(Token::Literal(&rest[..len]));
        rest = &rest[len..];
    }
    tokens
}

fn ordinal_suffix(n: u32) -> &'static str {
    match (n % 100, n % 10) {
        (11..=13, _) => "th",
        (_, 1) => "st",
        (_, 2) => "nd",
        (_, 3) => "rd",
        _ => "th",
    }
}

/// Renders `dt` with a moment format string.
pub fn format_moment(dt: OffsetDateTime, format: &str) -> String {
    let mut out = String::new();
    let hour12 = match dt.hour() % 12 {
        0 => 12,
        h => h,
    };
    let weekday = dt.weekday().number_days_from_sunday() as usize;
    let month = dt.month() as u8;
    let offset = dt.offset();
    let offset_sign = if offset.is_negative() { '-' } else { '+' };
    let (offset_h, offset_m) = (
        offset.whole_hours().unsigned_abs(),
        offset.minutes_past_hour().unsigned_abs(),
    );

    for token in tokenize(format) {
        // Writing into a `String` can not fail.
        let _ = match token {
            Token::Literal(s) => write!(out, "{s}"),
            Token::Field(field) => match field {
                Field::Year4 => write!(out, "{:04}", dt.year()),
                Field::Year2 => write!(out, "{:02}", dt.year().rem_euclid(100)),
                Field::Month => write!(out, "{month}"),
                Field::Month2 => write!(out, "{month:02}"),
                Field::MonthShort => write!(out, "{}", &MONTH_NAMES[month as usize - 1][..3]),
                Field::MonthLong => write!(out, "{}", MONTH_NAMES[month as usize - 1]),
                Field::MonthOrdinal => {
                    write!(out, "{month}{}", ordinal_suffix(month as u32))
                }
                Field::Day => write!(out, "{}", dt.day()),
                Field::Day2 => write!(out, "{:02}", dt.day()),
                Field::DayOrdinal => {
                    write!(out, "{}{}", dt.day(), ordinal_suffix(dt.day() as u32))
                }
                Field::DayOfYear => write!(out, "{}", dt.ordinal()),
                Field::DayOfYear3 => write!(out, "{:03}", dt.ordinal()),
                Field::Weekday => write!(out, "{weekday}"),
                Field::WeekdayMin => write!(out, "{}", &WEEKDAY_NAMES[weekday][..2]),
                Field::WeekdayShort => write!(out, "{}", &WEEKDAY_NAMES[weekday][..3]),
                Field::WeekdayLong => write!(out, "{}", WEEKDAY_NAMES[weekday]),
                Field::IsoWeekday => write!(out, "{}", dt.weekday().number_from_monday()),
                Field::Hour => write!(out, "{}", dt.hour()),
                Field::Hour2 => write!(out, "{:02}", dt.hour()),
                Field::Hour12 => write!(out, "{hour12}"),
                Field::Hour12Pad => write!(out, "{hour12:02}"),
                Field::Hour24 => write!(out, "{}", if dt.hour() == 0 { 24 } else { dt.hour() }),
                Field::Hour24Pad => {
                    write!(out, "{:02}", if dt.hour() == 0 { 24 } else { dt.hour() })
                }
                Field::Minute => write!(out, "{}", dt.minute()),
                Field::Minute2 => write!(out, "{:02}", dt.minute()),
                Field::Second => write!(out, "{}", dt.second()),
                Field::Second2 => write!(out, "{:02}", dt.second()),
                Field::Fraction1 => write!(out, "{}", dt.millisecond() / 100),
                Field::Fraction2 => write!(out, "{:02}", dt.millisecond() / 10),
                Field::Fraction3 => write!(out, "{:03}", dt.millisecond()),
                Field::MeridiemUpper => write!(out, "{}", if dt.hour() < 12 { "AM" } else { "PM" }),
                Field::MeridiemLower => write!(out, "{}", if dt.hour() < 12 { "am" } else { "pm" }),
                Field::Offset => write!(out, "{offset_sign}{offset_h:02}:{offset_m:02}"),
                Field::OffsetCompact => write!(out, "{offset_sign}{offset_h:02}{offset_m:02}"),
                Field::UnixSeconds => write!(out, "{}", dt.unix_timestamp()),
                Field::UnixMillis => write!(out, "{}", dt.unix_timestamp_nanos() / 1_000_000),
                Field::Quarter => write!(out, "{}", (month - 1) / 3 + 1),
                Field::IsoWeek => write!(out, "{}", dt.iso_week()),
                Field::IsoWeek2 => write!(out, "{:02}", dt.iso_week()),
            },
        };
    }
    out
}

/// Values collected while parsing.
#[derive(Debug, Default)]
struct Parsed {
    year: Option<i32>,
    month: Option<u8>,
    day: Option<u8>,
    day_of_year: Option<u16>,
    hour: Option<u8>,
    minute: Option<u8>,
    second: Option<u8>,
    millisecond: Option<u16>,
    pm: Option<bool>,
    offset: Option<UtcOffset>,
    timestamp_nanos: Option<i128>,
}

/// Consumes between `min` and `max` ASCII digits.
fn take_digits(input: &str, min: usize, max: usize) -> Option<(u32, &str)> {
    let len = input
        .bytes()
        .take(max)
        .take_while(|b| b.is_ascii_digit())
        .count();
    if len < min {
        return None;
    }
    let value = input[..len].parse().ok()?;
    Some((value, &input[len..]))
}

/// Consumes the longest of `names` (case insensitive), returns its index.
fn take_name<'a>(input: &'a str, names: &[&str]) -> Option<(usize, &'a str)> {
    names
        .iter()
        .enumerate()
        .filter(|(_, n)| {
            input.len() >= n.len()
                && input.is_char_boundary(n.len())
                && input[..n.len()].eq_ignore_ascii_case(n)
        })
        .max_by_key(|(_, n)| n.len())
        .map(|(i, n)| (i, &input[n.len()..]))
}

fn take_offset(input: &str, compact: bool) -> Option<(UtcOffset, &str)> {
    if let Some(rest) = input.strip_prefix('Z') {
        return Some((UtcOffset::UTC, rest));
    }
    let sign: i8 = match input.chars().next()? {
        '+' => 1,
        '-' => -1,
        _ => return None,
    };
    let (h, rest) = take_digits(&input[1..], 2, 2)?;
    let rest = if compact {
        rest
    } else {
        rest.strip_prefix(':').unwrap_or(rest)
    };
    let (m, rest) = take_digits(rest, 2, 2)?;
    let offset = UtcOffset::from_hms(sign * h as i8, sign * m as i8, 0).ok()?;
    Some((offset, rest))
}

/// Strict moment style parser. Returns `None` when `input` does not match
/// `format` completely or when a value is out of range.
fn parse_moment(input: &str, format: &str, now: OffsetDateTime) -> Option<OffsetDateTime> {
    let month_short: Vec<&str> = MONTH_NAMES.iter().map(|n| &n[..3]).collect();
    let weekday_short: Vec<&str> = WEEKDAY_NAMES.iter().map(|n| &n[..3]).collect();
    let weekday_min: Vec<&str> = WEEKDAY_NAMES.iter().map(|n| &n[..2]).collect();

    let mut p = Parsed::default();
    let mut rest = input;
    for token in tokenize(format) {
        rest = match token {
            Token::Literal(s) => rest.strip_prefix(s)?,
            Token::Field(field) => match field {
                Field::Year4 => {
                    let (v, r) = take_digits(rest, 4, 4)?;
                    p.year = Some(v as i32);
                    r
                }
                Field::Year2 => {
                    let (v, r) = take_digits(rest, 2, 2)?;
                    p.year = Some(if v > 68 { 1900 + v as i32 } else { 2000 + v as i32 });
                    r
                }
                Field::Month | Field::Month2 | Field::MonthOrdinal => {
                    let min = if field == Field::Month2 { 2 } else { 1 };
                    let (v, r) = take_digits(rest, min, 2)?;
                    p.month = Some(v as u8);
                    if field == Field::MonthOrdinal {
                        r.strip_prefix(ordinal_suffix(v))?
                    } else {
                        r
                    }
                }
                Field::MonthShort => {
                    let (i, r) = take_name(rest, &month_short)?;
                    p.month = Some(i as u8 + 1);
                    r
                }
                Field::MonthLong => {
                    let (i, r) = take_name(rest, &MONTH_NAMES)?;
                    p.month = Some(i as u8 + 1);
                    r
                }
                Field::Day | Field::Day2 | Field::DayOrdinal => {
                    let min = if field == Field::Day2 { 2 } else { 1 };
                    let (v, r) = take_digits(rest, min, 2)?;
                    p.day = Some(v as u8);
                    if field == Field::DayOrdinal {
                        r.strip_prefix(ordinal_suffix(v))?
                    } else {
                        r
                    }
                }
                Field::DayOfYear | Field::DayOfYear3 => {
                    let min = if field == Field::DayOfYear3 { 3 } else { 1 };
                    let (v, r) = take_digits(rest, min, 3)?;
                    p.day_of_year = Some(v as u16);
                    r
                }
                // Weekdays are validated, but do not determine the date.
                Field::Weekday => take_digits(rest, 1, 1).filter(|(v, _)| *v <= 6)?.1,
                Field::IsoWeekday => take_digits(rest, 1, 1).filter(|(v, _)| (1..=7).contains(v))?.1,
                Field::WeekdayMin => take_name(rest, &weekday_min)?.1,
                Field::WeekdayShort => take_name(rest, &weekday_short)?.1,
                Field::WeekdayLong => take_name(rest, &WEEKDAY_NAMES)?.1,
                Field::Hour | Field::Hour2 | Field::Hour12 | Field::Hour12Pad => {
                    let min = if matches!(field, Field::Hour2 | Field::Hour12Pad) { 2 } else { 1 };
                    let (v, r) = take_digits(rest, min, 2)?;
                    p.hour = Some(v as u8);
                    r
                }
                Field::Hour24 | Field::Hour24Pad => {
                    let min = if field == Field::Hour24Pad { 2 } else { 1 };
                    let (v, r) = take_digits(rest, min, 2)?;
                    p.hour = Some(if v == 24 { 0 } else { v as u8 });
                    r
                }
                Field::Minute | Field::Minute2 => {
                    let min = if field == Field::Minute2 { 2 } else { 1 };
                    let (v, r) = take_digits(rest, min, 2)?;
                    p.minute = Some(v as u8);
                    r
                }
                Field::Second | Field::Second2 => {
                    let min = if field == Field::Second2 { 2 } else { 1 };
                    let (v, r) = take_digits(rest, min, 2)?;
                    p.second = Some(v as u8);
                    r
                }
                Field::Fraction1 => {
                    let (v, r) = take_digits(rest, 1, 1)?;
                    p.millisecond = Some(v as u16 * 100);
                    r
                }
                Field::Fraction2 => {
                    let (v, r) = take_digits(rest, 2, 2)?;
                    p.millisecond = Some(v as u16 * 10);
                    r
                }
                Field::Fraction3 => {
                    let (v, r) = take_digits(rest, 3, 3)?;
                    p.millisecond = Some(v as u16);
                    r
                }
                Field::MeridiemUpper | Field::MeridiemLower => {
                    let (i, r) = take_name(rest, &["am", "pm"])?;
                    p.pm = Some(i == 1);
                    r
                }
                Field::Offset | Field::OffsetCompact => {
                    let (o, r) = take_offset(rest, field == Field::OffsetCompact)?;
                    p.offset = Some(o);
                    r
                }
                Field::UnixSeconds | Field::UnixMillis => {
                    let (negative, r) = match rest.strip_prefix('-') {
                        Some(r) => (true, r),
                        None => (false, rest),
                    };
                    let len = r.bytes().take_while(|b| b.is_ascii_digit()).count();
                    if len == 0 {
                        return None;
                    }
                    let v: i128 = r[..len].parse().ok()?;
                    let factor = if field == Field::UnixSeconds {
                        1_000_000_000
                    } else {
                        1_000_000
                    };
                    p.timestamp_nanos = Some(if negative { -v } else { v } * factor);
                    &r[len..]
                }
                Field::Quarter => take_digits(rest, 1, 1).filter(|(v, _)| (1..=4).contains(v))?.1,
                Field::IsoWeek | Field::IsoWeek2 => {
                    let min = if field == Field::IsoWeek2 { 2 } else { 1 };
                    take_digits(rest, min, 2).filter(|(v, _)| (1..=53).contains(v))?.1
                }
            },
        };
    }
    if !rest.is_empty() {
        return None;
    }

    if let Some(nanos) = p.timestamp_nanos {
        return OffsetDateTime::from_unix_timestamp_nanos(nanos)
            .ok()
            .map(|dt| dt.to_offset(now.offset()));
    }

    let offset = p.offset.unwrap_or(now.offset());
    let today = now.to_offset(offset).date();

    let date = if let Some(doy) = p.day_of_year {
        Date::from_ordinal_date(p.year.unwrap_or(today.year()), doy).ok()?
    } else {
        // Leading missing parts come from today, trailing ones are the
        // first month or day.
        let (year, month, day) = match (p.year, p.month, p.day) {
            (None, None, None) => (today.year(), today.month() as u8, today.day()),
            (None, None, Some(d)) => (today.year(), today.month() as u8, d),
            (None, Some(m), d) => (today.year(), m, d.unwrap_or(1)),
            (Some(y), m, d) => (y, m.unwrap_or(1), d.unwrap_or(1)),
        };
        Date::from_calendar_date(year, Month::try_from(month).ok()?, day).ok()?
    };

    let mut hour = p.hour.unwrap_or(0);
    match p.pm {
        Some(true) if hour < 12 => hour += 12,
        Some(false) if hour == 12 => hour = 0,
        _ => {}
    }
    let time = Time::from_hms_milli(
        hour,
        p.minute.unwrap_or(0),
        p.second.unwrap_or(0),
        p.millisecond.unwrap_or(0),
    )
    .ok()?;

    Some(PrimitiveDateTime::new(date, time).assume_offset(offset))
}
