//! Business-day predicates and arithmetic under an explicit working-hours policy.
//!
//! There is no process-wide date configuration: every function takes the
//! [`WorkingHoursPolicy`] it should apply, so different tenants can use
//! different policies concurrently.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Utc, Weekday};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::range::TimeRange;
use crate::timezone;

/// Upper bound on day-by-day searches for the next/previous business day.
pub const MAX_BUSINESS_DAY_SEARCH: u32 = 366;

/// Kind of holiday. Only public and bank holidays close the business.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HolidayKind {
    Public,
    Bank,
    Observance,
}

impl HolidayKind {
    pub fn blocks_business(&self) -> bool {
        matches!(self, HolidayKind::Public | HolidayKind::Bank)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Holiday {
    pub date: NaiveDate,
    pub kind: HolidayKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Local working window for one day, `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyWindow {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl DailyWindow {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Self {
        Self { start, end }
    }

    /// Length of the window in hours; zero when it ends before it starts.
    pub fn hours(&self) -> f64 {
        (self.end - self.start).num_seconds().max(0) as f64 / 3600.0
    }
}

impl Default for DailyWindow {
    fn default() -> Self {
        Self {
            start: NaiveTime::from_hms_opt(9, 0, 0).unwrap_or(NaiveTime::MIN),
            end: NaiveTime::from_hms_opt(17, 0, 0).unwrap_or(NaiveTime::MIN),
        }
    }
}

/// Working days, hours and holidays for one calendar.
///
/// Deserializes from JSON with every field optional; missing fields fall back
/// to Monday–Friday, 09:00–17:00 UTC with 30-minute slots and no holidays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkingHoursPolicy {
    pub working_days: HashSet<Weekday>,
    pub daily_window: DailyWindow,
    /// Per-weekday windows that replace `daily_window` on that weekday.
    pub day_overrides: HashMap<Weekday, DailyWindow>,
    pub holidays: Vec<Holiday>,
    /// Timezone the working windows are expressed in.
    pub timezone: Tz,
    pub slot_duration_minutes: u32,
}

impl Default for WorkingHoursPolicy {
    fn default() -> Self {
        Self {
            working_days: [
                Weekday::Mon,
                Weekday::Tue,
                Weekday::Wed,
                Weekday::Thu,
                Weekday::Fri,
            ]
            .into_iter()
            .collect(),
            daily_window: DailyWindow::default(),
            day_overrides: HashMap::new(),
            holidays: Vec::new(),
            timezone: Tz::UTC,
            slot_duration_minutes: 30,
        }
    }
}

impl WorkingHoursPolicy {
    /// Parse and validate a policy from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        let policy: Self =
            serde_json::from_str(json).map_err(|e| EngineError::InvalidPolicy(e.to_string()))?;
        policy.validate()?;
        Ok(policy)
    }

    /// Check that every window is non-empty and slots have a length.
    pub fn validate(&self) -> Result<()> {
        if self.slot_duration_minutes == 0 {
            return Err(EngineError::InvalidPolicy(
                "slot_duration_minutes must be positive".to_string(),
            ));
        }
        let windows = std::iter::once((None, &self.daily_window))
            .chain(self.day_overrides.iter().map(|(d, w)| (Some(d), w)));
        for (day, window) in windows {
            if window.end <= window.start {
                let which = day.map_or("default".to_string(), |d| d.to_string());
                return Err(EngineError::InvalidPolicy(format!(
                    "{which} window ends at {} before it starts at {}",
                    window.end, window.start
                )));
            }
        }
        Ok(())
    }

    /// The working window that applies on `weekday`.
    pub fn window_for(&self, weekday: Weekday) -> DailyWindow {
        self.day_overrides
            .get(&weekday)
            .copied()
            .unwrap_or(self.daily_window)
    }

    /// The first holiday recorded on `date`, if any.
    pub fn holiday_on(&self, date: NaiveDate) -> Option<&Holiday> {
        self.holidays.iter().find(|h| h.date == date)
    }

    /// The working window of `date` as a UTC range.
    ///
    /// Returned for any date, business day or not; callers decide whether
    /// the day counts. A window that [`validate`](Self::validate) would
    /// reject (end not after start) yields an empty range at its start
    /// rather than the swapped hours.
    pub fn working_range(&self, date: NaiveDate) -> TimeRange {
        let window = self.window_for(date.weekday());
        let start = timezone::to_utc(date.and_time(window.start), self.timezone);
        if window.end <= window.start {
            return TimeRange::new(start, start);
        }
        let end = timezone::to_utc(date.and_time(window.end), self.timezone);
        TimeRange::new(start, end.max(start))
    }
}

/// A day is a business day if it is a working weekday and no public or bank
/// holiday falls on it.
pub fn is_business_day(date: NaiveDate, policy: &WorkingHoursPolicy) -> bool {
    policy.working_days.contains(&date.weekday())
        && !policy
            .holidays
            .iter()
            .any(|h| h.date == date && h.kind.blocks_business())
}

/// The first business day strictly after `date`.
///
/// # Errors
///
/// Returns [`EngineError::NoBusinessDayFound`] if none exists within
/// [`MAX_BUSINESS_DAY_SEARCH`] days, e.g. for a policy with no working days.
pub fn next_business_day(date: NaiveDate, policy: &WorkingHoursPolicy) -> Result<NaiveDate> {
    step_to_business_day(date, 1, policy)
}

/// The last business day strictly before `date`.
///
/// # Errors
///
/// Returns [`EngineError::NoBusinessDayFound`] if none exists within
/// [`MAX_BUSINESS_DAY_SEARCH`] days.
pub fn previous_business_day(date: NaiveDate, policy: &WorkingHoursPolicy) -> Result<NaiveDate> {
    step_to_business_day(date, -1, policy)
}

/// Move `n` business days away from `date`, forward for positive `n` and
/// backward for negative `n`. `n == 0` returns `date` unchanged.
pub fn add_business_days(date: NaiveDate, n: i32, policy: &WorkingHoursPolicy) -> Result<NaiveDate> {
    let direction = if n < 0 { -1 } else { 1 };
    let mut current = date;
    for _ in 0..n.unsigned_abs() {
        current = step_to_business_day(current, direction, policy)?;
    }
    Ok(current)
}

/// Hours of working time between two instants.
///
/// Each local calendar day touched by `[start, end]` contributes the overlap
/// between its working window and `[start, end]`; non-business days
/// contribute nothing. Reversed arguments are normalized.
pub fn working_hours_between(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    policy: &WorkingHoursPolicy,
) -> f64 {
    let span = TimeRange::new(start, end);
    let first_day = timezone::to_zoned(span.start, policy.timezone).date();
    let last_day = timezone::to_zoned(span.end, policy.timezone).date();

    let seconds: i64 = first_day
        .iter_days()
        .take_while(|day| *day <= last_day)
        .filter(|day| is_business_day(*day, policy))
        .filter_map(|day| policy.working_range(day).intersect(&span))
        .map(|overlap| overlap.duration().num_seconds())
        .sum();

    seconds as f64 / 3600.0
}

fn step_to_business_day(
    date: NaiveDate,
    direction: i64,
    policy: &WorkingHoursPolicy,
) -> Result<NaiveDate> {
    let exhausted = || EngineError::NoBusinessDayFound {
        from: date,
        searched_days: MAX_BUSINESS_DAY_SEARCH,
    };

    let mut current = date;
    for _ in 0..MAX_BUSINESS_DAY_SEARCH {
        current = current
            .checked_add_signed(Duration::days(direction))
            .ok_or_else(exhausted)?;
        if is_business_day(current, policy) {
            return Ok(current);
        }
    }

    tracing::debug!(%date, direction, "business-day search exhausted");
    Err(exhausted())
}
