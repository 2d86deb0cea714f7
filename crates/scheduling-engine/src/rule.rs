//! Recurrence rules: the RFC 5545 RRULE subset this engine reads and writes.
//!
//! Supported parts are `FREQ`, `INTERVAL`, `COUNT`, `UNTIL`, `BYDAY`,
//! `BYMONTH`, `BYMONTHDAY` and `BYSETPOS` (plus `WKST=MO`, the default).
//! Anything else is rejected rather than silently ignored, so a rule that
//! parses is a rule that expands exactly as written.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc, Weekday};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::timezone;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl Frequency {
    fn as_rrule(&self) -> &'static str {
        match self {
            Frequency::Daily => "DAILY",
            Frequency::Weekly => "WEEKLY",
            Frequency::Monthly => "MONTHLY",
            Frequency::Yearly => "YEARLY",
        }
    }
}

/// A `BYDAY` entry: a weekday with an optional ordinal (`2TU`, `-1FR`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WeekdayNum {
    pub ordinal: Option<i32>,
    pub weekday: Weekday,
}

impl WeekdayNum {
    pub fn every(weekday: Weekday) -> Self {
        Self {
            ordinal: None,
            weekday,
        }
    }

    pub fn nth(ordinal: i32, weekday: Weekday) -> Self {
        Self {
            ordinal: Some(ordinal),
            weekday,
        }
    }
}

impl fmt::Display for WeekdayNum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(n) = self.ordinal {
            write!(f, "{n}")?;
        }
        f.write_str(weekday_code(self.weekday))
    }
}

/// The `UNTIL` bound of a rule.
///
/// UTC values (`...Z`) are absolute. Floating and date-only values are
/// wall-clock times in the series timezone and are only resolved to an
/// instant at expansion time. A date-only value covers that whole day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Until {
    Utc(DateTime<Utc>),
    Floating(NaiveDateTime),
}

impl Until {
    pub fn resolve(&self, tz: Tz) -> DateTime<Utc> {
        match self {
            Until::Utc(instant) => *instant,
            Until::Floating(local) => timezone::to_utc(*local, tz),
        }
    }

    /// The last local date the bound can admit in `tz`.
    pub fn local_date(&self, tz: Tz) -> NaiveDate {
        match self {
            Until::Utc(instant) => timezone::to_zoned(*instant, tz).date(),
            Until::Floating(local) => local.date(),
        }
    }
}

/// A parsed recurrence rule.
///
/// Serializes as its RRULE text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RecurrenceRule {
    pub frequency: Frequency,
    pub interval: u32,
    pub count: Option<u32>,
    pub until: Option<Until>,
    pub by_day: Vec<WeekdayNum>,
    pub by_month: Vec<u32>,
    pub by_month_day: Vec<i32>,
    pub by_set_pos: Vec<i32>,
}

impl RecurrenceRule {
    /// A rule repeating every period, with no limits and no BY* parts.
    pub fn new(frequency: Frequency) -> Self {
        Self {
            frequency,
            interval: 1,
            count: None,
            until: None,
            by_day: Vec::new(),
            by_month: Vec::new(),
            by_month_day: Vec::new(),
            by_set_pos: Vec::new(),
        }
    }

    /// Parse RRULE text such as `"FREQ=WEEKLY;BYDAY=TU,TH;COUNT=5"`.
    ///
    /// A leading `RRULE:` is accepted and part names are case-insensitive.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidRuleSyntax`] for malformed text,
    /// unsupported parts, out-of-range values, or combinations RFC 5545
    /// forbids (e.g. `BYSETPOS` on its own).
    pub fn parse(text: &str) -> Result<Self> {
        let body = text.trim();
        let body = match body.get(..6) {
            Some(prefix) if prefix.eq_ignore_ascii_case("RRULE:") => &body[6..],
            _ => body,
        };
        if body.is_empty() {
            return Err(invalid("empty RRULE string"));
        }

        let mut frequency = None;
        let mut rule = RecurrenceRule::new(Frequency::Daily);
        let mut seen = HashSet::new();

        for part in body.split(';').map(str::trim).filter(|p| !p.is_empty()) {
            let (name, value) = part
                .split_once('=')
                .ok_or_else(|| invalid(format!("expected NAME=VALUE, got '{part}'")))?;
            let name = name.trim().to_ascii_uppercase();
            let value = value.trim();
            if !seen.insert(name.clone()) {
                return Err(invalid(format!("duplicate {name}")));
            }

            match name.as_str() {
                "FREQ" => frequency = Some(parse_frequency(value)?),
                "INTERVAL" => rule.interval = parse_number(&name, value)?,
                "COUNT" => rule.count = Some(parse_number(&name, value)?),
                "UNTIL" => rule.until = Some(parse_until(value)?),
                "BYDAY" => rule.by_day = parse_list(value, parse_weekday_num)?,
                "BYMONTH" => rule.by_month = parse_list(value, |v| parse_number(&name, v))?,
                "BYMONTHDAY" => rule.by_month_day = parse_list(value, |v| parse_number(&name, v))?,
                "BYSETPOS" => rule.by_set_pos = parse_list(value, |v| parse_number(&name, v))?,
                "WKST" if value.eq_ignore_ascii_case("MO") => {}
                "WKST" | "BYHOUR" | "BYMINUTE" | "BYSECOND" | "BYWEEKNO" | "BYYEARDAY" => {
                    return Err(invalid(format!("unsupported rule part {name}={value}")));
                }
                _ => return Err(invalid(format!("unknown rule part {name}"))),
            }
        }

        rule.frequency = frequency.ok_or_else(|| invalid("missing FREQ"))?;
        rule.validate()?;
        Ok(rule)
    }

    /// Check value ranges and part combinations.
    pub fn validate(&self) -> Result<()> {
        if self.interval == 0 {
            return Err(invalid("INTERVAL must be at least 1"));
        }
        if self.count == Some(0) {
            return Err(invalid("COUNT must be at least 1"));
        }
        if let Some(m) = self.by_month.iter().find(|m| !(1..=12).contains(*m)) {
            return Err(invalid(format!("BYMONTH value {m} out of range 1..12")));
        }
        if let Some(d) = self
            .by_month_day
            .iter()
            .find(|d| **d == 0 || !(-31..=31).contains(*d))
        {
            return Err(invalid(format!("BYMONTHDAY value {d} out of range ±1..31")));
        }
        if let Some(p) = self
            .by_set_pos
            .iter()
            .find(|p| **p == 0 || !(-366..=366).contains(*p))
        {
            return Err(invalid(format!("BYSETPOS value {p} out of range ±1..366")));
        }
        if !self.by_set_pos.is_empty()
            && self.by_day.is_empty()
            && self.by_month.is_empty()
            && self.by_month_day.is_empty()
        {
            return Err(invalid("BYSETPOS requires another BY* part"));
        }
        let has_ordinals = self.by_day.iter().any(|d| d.ordinal.is_some());
        if has_ordinals && !matches!(self.frequency, Frequency::Monthly | Frequency::Yearly) {
            return Err(invalid("BYDAY ordinals are only valid for MONTHLY or YEARLY rules"));
        }
        if let Some(d) = self
            .by_day
            .iter()
            .filter_map(|d| d.ordinal)
            .find(|n| *n == 0 || !(-53..=53).contains(n))
        {
            return Err(invalid(format!("BYDAY ordinal {d} out of range ±1..53")));
        }
        if self.frequency == Frequency::Weekly && !self.by_month_day.is_empty() {
            return Err(invalid("BYMONTHDAY is not valid for WEEKLY rules"));
        }
        Ok(())
    }

    pub fn is_bounded(&self) -> bool {
        self.count.is_some() || self.until.is_some()
    }
}

impl FromStr for RecurrenceRule {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for RecurrenceRule {
    type Error = EngineError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<RecurrenceRule> for String {
    fn from(rule: RecurrenceRule) -> Self {
        rule.to_string()
    }
}

/// Canonical RRULE text: `FREQ` first, default `INTERVAL=1` omitted.
impl fmt::Display for RecurrenceRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FREQ={}", self.frequency.as_rrule())?;
        if self.interval != 1 {
            write!(f, ";INTERVAL={}", self.interval)?;
        }
        if let Some(count) = self.count {
            write!(f, ";COUNT={count}")?;
        }
        match self.until {
            Some(Until::Utc(instant)) => write!(f, ";UNTIL={}", instant.format("%Y%m%dT%H%M%SZ"))?,
            Some(Until::Floating(local)) => write!(f, ";UNTIL={}", local.format("%Y%m%dT%H%M%S"))?,
            None => {}
        }
        write_list(f, "BYMONTH", &self.by_month)?;
        write_list(f, "BYMONTHDAY", &self.by_month_day)?;
        write_list(f, "BYDAY", &self.by_day)?;
        write_list(f, "BYSETPOS", &self.by_set_pos)
    }
}

/// A human-readable English summary of a rule.
///
/// ```
/// use scheduling_engine::rule::{describe, RecurrenceRule};
///
/// let rule = RecurrenceRule::parse("FREQ=WEEKLY;INTERVAL=2;BYDAY=TU,TH;COUNT=8").unwrap();
/// assert_eq!(describe(&rule), "Every 2 weeks on Tuesday and Thursday, 8 times");
/// ```
pub fn describe(rule: &RecurrenceRule) -> String {
    let unit = match rule.frequency {
        Frequency::Daily => "day",
        Frequency::Weekly => "week",
        Frequency::Monthly => "month",
        Frequency::Yearly => "year",
    };
    let mut text = if rule.interval == 1 {
        match rule.frequency {
            Frequency::Daily => "Daily".to_string(),
            Frequency::Weekly => "Weekly".to_string(),
            Frequency::Monthly => "Monthly".to_string(),
            Frequency::Yearly => "Yearly".to_string(),
        }
    } else {
        format!("Every {} {unit}s", rule.interval)
    };

    if !rule.by_day.is_empty() {
        let days: Vec<String> = rule.by_day.iter().map(describe_weekday_num).collect();
        text.push_str(&format!(" on {}", join_english(&days)));
    }
    if !rule.by_month_day.is_empty() {
        let days: Vec<String> = rule.by_month_day.iter().map(|d| describe_month_day(*d)).collect();
        text.push_str(&format!(" on the {}", join_english(&days)));
    }
    if !rule.by_month.is_empty() {
        let months: Vec<String> = rule.by_month.iter().map(|m| month_name(*m).to_string()).collect();
        text.push_str(&format!(" in {}", join_english(&months)));
    }
    if !rule.by_set_pos.is_empty() {
        let positions: Vec<String> = rule.by_set_pos.iter().map(|p| ordinal_word(*p)).collect();
        text.push_str(&format!(", taking the {} match each {unit}", join_english(&positions)));
    }
    match rule.count {
        Some(1) => text.push_str(", once"),
        Some(n) => text.push_str(&format!(", {n} times")),
        None => {}
    }
    match rule.until {
        Some(Until::Utc(instant)) => text.push_str(&format!(", until {}", instant.format("%Y-%m-%d %H:%M UTC"))),
        Some(Until::Floating(local)) if local.time() == end_of_day() => {
            text.push_str(&format!(", until {}", local.format("%Y-%m-%d")))
        }
        Some(Until::Floating(local)) => text.push_str(&format!(", until {}", local.format("%Y-%m-%d %H:%M"))),
        None => {}
    }
    text
}

fn invalid(message: impl Into<String>) -> EngineError {
    EngineError::InvalidRuleSyntax(message.into())
}

fn parse_frequency(value: &str) -> Result<Frequency> {
    match value.to_ascii_uppercase().as_str() {
        "DAILY" => Ok(Frequency::Daily),
        "WEEKLY" => Ok(Frequency::Weekly),
        "MONTHLY" => Ok(Frequency::Monthly),
        "YEARLY" => Ok(Frequency::Yearly),
        "HOURLY" | "MINUTELY" | "SECONDLY" => Err(invalid(format!("unsupported FREQ={value}"))),
        _ => Err(invalid(format!("unknown FREQ={value}"))),
    }
}

fn parse_number<T: FromStr>(name: &str, value: &str) -> Result<T> {
    value
        .trim_start_matches('+')
        .parse()
        .map_err(|_| invalid(format!("{name} value '{value}' is not a valid number")))
}

fn parse_list<T>(value: &str, parse_item: impl Fn(&str) -> Result<T>) -> Result<Vec<T>> {
    if value.is_empty() {
        return Err(invalid("empty value list"));
    }
    value.split(',').map(|v| parse_item(v.trim())).collect()
}

fn parse_until(value: &str) -> Result<Until> {
    if let Some(utc) = value.strip_suffix(['Z', 'z']) {
        return NaiveDateTime::parse_from_str(utc, "%Y%m%dT%H%M%S")
            .map(|dt| Until::Utc(dt.and_utc()))
            .map_err(|e| invalid(format!("UNTIL '{value}': {e}")));
    }
    if value.len() == 8 {
        return NaiveDate::parse_from_str(value, "%Y%m%d")
            .map(|d| Until::Floating(d.and_time(end_of_day())))
            .map_err(|e| invalid(format!("UNTIL '{value}': {e}")));
    }
    NaiveDateTime::parse_from_str(value, "%Y%m%dT%H%M%S")
        .map(Until::Floating)
        .map_err(|e| invalid(format!("UNTIL '{value}': {e}")))
}

fn parse_weekday_num(value: &str) -> Result<WeekdayNum> {
    let split = value
        .len()
        .checked_sub(2)
        .filter(|i| value.is_char_boundary(*i))
        .ok_or_else(|| invalid(format!("BYDAY value '{value}' is too short")))?;
    let (ordinal, code) = value.split_at(split);
    let weekday = match code.to_ascii_uppercase().as_str() {
        "MO" => Weekday::Mon,
        "TU" => Weekday::Tue,
        "WE" => Weekday::Wed,
        "TH" => Weekday::Thu,
        "FR" => Weekday::Fri,
        "SA" => Weekday::Sat,
        "SU" => Weekday::Sun,
        _ => return Err(invalid(format!("BYDAY value '{value}' has no weekday"))),
    };
    let ordinal = if ordinal.is_empty() {
        None
    } else {
        Some(parse_number("BYDAY", ordinal)?)
    };
    Ok(WeekdayNum { ordinal, weekday })
}

fn write_list<T: fmt::Display>(f: &mut fmt::Formatter<'_>, name: &str, values: &[T]) -> fmt::Result {
    if values.is_empty() {
        return Ok(());
    }
    let joined: Vec<String> = values.iter().map(ToString::to_string).collect();
    write!(f, ";{name}={}", joined.join(","))
}

fn end_of_day() -> NaiveTime {
    NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN)
}

fn weekday_code(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "MO",
        Weekday::Tue => "TU",
        Weekday::Wed => "WE",
        Weekday::Thu => "TH",
        Weekday::Fri => "FR",
        Weekday::Sat => "SA",
        Weekday::Sun => "SU",
    }
}

fn weekday_name(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

fn month_name(month: u32) -> &'static str {
    const NAMES: [&str; 12] = [
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
    NAMES.get(month.wrapping_sub(1) as usize).copied().unwrap_or("?")
}

fn ordinal_word(n: i32) -> String {
    match n {
        -1 => "last".to_string(),
        n if n < 0 => format!("{} to last", ordinal_word(-n)),
        n => {
            let suffix = match (n % 10, n % 100) {
                (_, 11..=13) => "th",
                (1, _) => "st",
                (2, _) => "nd",
                (3, _) => "rd",
                _ => "th",
            };
            format!("{n}{suffix}")
        }
    }
}

fn describe_weekday_num(day: &WeekdayNum) -> String {
    match day.ordinal {
        Some(n) => format!("the {} {}", ordinal_word(n), weekday_name(day.weekday)),
        None => weekday_name(day.weekday).to_string(),
    }
}

fn describe_month_day(day: i32) -> String {
    if day < 0 {
        format!("{} day", ordinal_word(day))
    } else {
        ordinal_word(day)
    }
}

fn join_english(items: &[String]) -> String {
    match items {
        [] => String::new(),
        [one] => one.clone(),
        [rest @ .., last] => format!("{} and {last}", rest.join(", ")),
    }
}
