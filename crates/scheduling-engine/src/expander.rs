//! Recurrence expansion: turns a rule anchored at a local DTSTART into
//! concrete UTC occurrence instants.
//!
//! Expansion is lazy and always finite. [`Occurrences`] stops at the first of:
//! the rule's `COUNT` reached, its `UNTIL` passed, the query window's end
//! reached, or `max_occurrences` emitted. A rule with no `COUNT`/`UNTIL` is
//! therefore bounded by the caller's window and the cap, never by the rule.
//!
//! Wall-clock arithmetic happens in the series timezone: every occurrence
//! keeps the DTSTART local time and is converted to UTC on its own, so a
//! 14:00 meeting stays at 14:00 across DST transitions.

use std::collections::{BTreeSet, VecDeque};

use chrono::{DateTime, Datelike, Duration, Months, NaiveDate, NaiveDateTime, Utc, Weekday};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::dst::DstPolicy;
use crate::range::{self, TimeRange};
use crate::rule::{Frequency, RecurrenceRule, WeekdayNum};
use crate::timezone;

/// Default cap on the number of occurrences a single expansion may emit.
pub const DEFAULT_MAX_OCCURRENCES: u32 = 500;

/// Hard cap on the number of recurrence periods scanned by one expansion.
///
/// Guarantees termination for rules whose periods never produce a match,
/// e.g. `FREQ=YEARLY;BYMONTH=2;BYMONTHDAY=30`.
pub const MAX_SCANNED_PERIODS: u32 = 100_000;

/// Local calendar dates excluded from a series, compared in the series timezone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExceptionSet(BTreeSet<NaiveDate>);

impl ExceptionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, date: NaiveDate) -> bool {
        self.0.insert(date)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.0.contains(&date)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &NaiveDate> {
        self.0.iter()
    }
}

impl FromIterator<NaiveDate> for ExceptionSet {
    fn from_iter<I: IntoIterator<Item = NaiveDate>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// A rule together with the local DTSTART and timezone it is anchored to.
#[derive(Debug, Clone, PartialEq)]
pub struct RecurringSeries {
    pub rule: RecurrenceRule,
    /// Wall-clock start of the first occurrence, in `timezone`.
    pub dtstart: NaiveDateTime,
    pub timezone: Tz,
    pub dst_policy: DstPolicy,
    /// Exact instant of the first occurrence, when `dtstart` alone can't
    /// recover it (the earlier instant of a repeated fall-back hour).
    pub anchor: Option<DateTime<Utc>>,
}

impl RecurringSeries {
    pub fn new(rule: RecurrenceRule, dtstart: NaiveDateTime, timezone: Tz) -> Self {
        Self {
            rule,
            dtstart,
            timezone,
            dst_policy: DstPolicy::default(),
            anchor: None,
        }
    }

    /// Anchor a rule at a UTC instant, seen as wall-clock time in `timezone`.
    ///
    /// The first occurrence is `start` itself, even when its wall-clock time
    /// is ambiguous and later occurrences resolve to the later instant.
    pub fn starting_at(rule: RecurrenceRule, start: DateTime<Utc>, timezone: Tz) -> Self {
        let dtstart = timezone::to_zoned(start, timezone);
        let mut series = Self::new(rule, dtstart, timezone);
        if timezone::to_utc(dtstart, timezone) != start {
            series.anchor = Some(start);
        }
        series
    }

    pub fn with_dst_policy(mut self, policy: DstPolicy) -> Self {
        self.dst_policy = policy;
        self
    }
}

/// Expand `series` into occurrence instants starting inside `window`.
///
/// The returned iterator is a pure function of its inputs: calling `expand`
/// again with the same arguments yields the same sequence from the start.
/// Occurrences are produced in ascending order with no duplicates.
pub fn expand<'a>(
    series: &'a RecurringSeries,
    window: TimeRange,
    exceptions: &'a ExceptionSet,
    max_occurrences: u32,
) -> Occurrences<'a> {
    Occurrences::new(series, window, exceptions, max_occurrences)
}

/// Expand `series` into occurrence ranges of the given `duration`.
pub fn expand_ranges<'a>(
    series: &'a RecurringSeries,
    window: TimeRange,
    exceptions: &'a ExceptionSet,
    max_occurrences: u32,
    duration: Duration,
) -> impl Iterator<Item = TimeRange> + 'a {
    expand(series, window, exceptions, max_occurrences)
        .map(move |start| TimeRange::new(start, range::saturating_add(start, duration)))
}

/// Lazy occurrence iterator returned by [`expand`].
#[derive(Debug, Clone)]
pub struct Occurrences<'a> {
    series: &'a RecurringSeries,
    exceptions: &'a ExceptionSet,
    window: TimeRange,
    max_occurrences: u32,
    until: Option<DateTime<Utc>>,
    /// Last local date any occurrence could still be accepted on.
    last_date: NaiveDate,
    period_index: u64,
    scanned_periods: u32,
    pending: VecDeque<NaiveDate>,
    generated: u32,
    emitted: u32,
    truncated: bool,
    done: bool,
}

impl<'a> Occurrences<'a> {
    fn new(
        series: &'a RecurringSeries,
        window: TimeRange,
        exceptions: &'a ExceptionSet,
        max_occurrences: u32,
    ) -> Self {
        let tz = series.timezone;
        let until = series.rule.until.map(|u| u.resolve(tz));
        let window_last = timezone::to_zoned(window.end, tz).date();
        let last_date = match series.rule.until {
            Some(u) => window_last.min(u.local_date(tz)),
            None => window_last,
        };

        // Without COUNT nothing before the window matters, so jump close to it.
        let period_index = if series.rule.count.is_none() {
            let window_first = timezone::to_zoned(window.start, tz).date();
            periods_before(&series.rule, series.dtstart.date(), window_first)
        } else {
            0
        };

        Self {
            series,
            exceptions,
            window,
            max_occurrences,
            until,
            last_date,
            period_index,
            scanned_periods: 0,
            pending: VecDeque::new(),
            generated: 0,
            emitted: 0,
            truncated: false,
            done: max_occurrences == 0 || window.is_empty(),
        }
    }

    /// Whether expansion stopped because `max_occurrences` was reached.
    pub fn truncated(&self) -> bool {
        self.truncated
    }

    /// Number of occurrences emitted so far.
    pub fn emitted(&self) -> u32 {
        self.emitted
    }

    /// Decide what to do with one candidate date.
    fn accept(&mut self, date: NaiveDate) -> Option<DateTime<Utc>> {
        let series = self.series;
        let local = date.and_time(series.dtstart.time());
        if local < series.dtstart {
            return None;
        }
        let instant = match series.anchor {
            Some(anchor) if local == series.dtstart => anchor,
            _ => timezone::resolve_local(local, series.timezone, series.dst_policy)?,
        };

        self.generated += 1;
        if series.rule.count.is_some_and(|count| self.generated > count) {
            self.done = true;
            return None;
        }
        if self.until.is_some_and(|until| instant > until) || instant >= self.window.end {
            self.done = true;
            return None;
        }
        if instant < self.window.start || self.exceptions.contains(date) {
            return None;
        }

        self.emitted += 1;
        if self.emitted >= self.max_occurrences {
            self.done = true;
            if !series.rule.is_bounded() || self.pending_could_continue() {
                self.truncated = true;
                tracing::debug!(
                    rule = %series.rule,
                    max_occurrences = self.max_occurrences,
                    "recurrence expansion truncated"
                );
            }
        }
        Some(instant)
    }

    fn pending_could_continue(&self) -> bool {
        self.series
            .rule
            .count
            .is_none_or(|count| self.generated < count)
    }

    /// Queue the candidates of the next period. Returns `false` once no
    /// later period can produce an occurrence.
    fn load_next_period(&mut self) -> bool {
        if self.scanned_periods >= MAX_SCANNED_PERIODS {
            tracing::debug!(rule = %self.series.rule, "recurrence period scan limit reached");
            return false;
        }
        let rule = &self.series.rule;
        let Some(period_start) = period_start(rule, self.series.dtstart.date(), self.period_index)
        else {
            return false;
        };
        if period_start > self.last_date {
            return false;
        }

        self.pending
            .extend(period_candidates(rule, self.series.dtstart.date(), period_start));
        self.period_index += 1;
        self.scanned_periods += 1;
        true
    }
}

impl Iterator for Occurrences<'_> {
    type Item = DateTime<Utc>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.done {
                return None;
            }
            if let Some(date) = self.pending.pop_front() {
                if let Some(instant) = self.accept(date) {
                    return Some(instant);
                }
                continue;
            }
            if !self.load_next_period() {
                self.done = true;
            }
        }
    }
}

/// First day of the period containing `date` (weeks start on Monday).
fn period_floor(frequency: Frequency, date: NaiveDate) -> NaiveDate {
    match frequency {
        Frequency::Daily => date,
        Frequency::Weekly => date
            .checked_sub_signed(Duration::days(date.weekday().num_days_from_monday() as i64))
            .unwrap_or(date),
        Frequency::Monthly => date.with_day(1).unwrap_or(date),
        Frequency::Yearly => NaiveDate::from_ymd_opt(date.year(), 1, 1).unwrap_or(date),
    }
}

/// First day of the `index`-th period of the series.
fn period_start(rule: &RecurrenceRule, dtstart: NaiveDate, index: u64) -> Option<NaiveDate> {
    let steps = index.checked_mul(rule.interval as u64)?;
    let base = period_floor(rule.frequency, dtstart);
    match rule.frequency {
        Frequency::Daily => base.checked_add_signed(Duration::try_days(i64::try_from(steps).ok()?)?),
        Frequency::Weekly => {
            base.checked_add_signed(Duration::try_weeks(i64::try_from(steps).ok()?)?)
        }
        Frequency::Monthly => base.checked_add_months(Months::new(u32::try_from(steps).ok()?)),
        Frequency::Yearly => {
            let months = steps.checked_mul(12)?;
            base.checked_add_months(Months::new(u32::try_from(months).ok()?))
        }
    }
}

/// Index of the last period starting strictly before the one containing `target`.
fn periods_before(rule: &RecurrenceRule, dtstart: NaiveDate, target: NaiveDate) -> u64 {
    let from = period_floor(rule.frequency, dtstart);
    let to = period_floor(rule.frequency, target);
    if to <= from {
        return 0;
    }
    let elapsed = match rule.frequency {
        Frequency::Daily => (to - from).num_days(),
        Frequency::Weekly => (to - from).num_weeks(),
        Frequency::Monthly => months_between(from, to),
        Frequency::Yearly => (to.year() - from.year()) as i64,
    };
    let index = elapsed.max(0) as u64 / rule.interval.max(1) as u64;
    index.saturating_sub(1)
}

fn months_between(from: NaiveDate, to: NaiveDate) -> i64 {
    (to.year() as i64 - from.year() as i64) * 12 + to.month() as i64 - from.month() as i64
}

/// Sorted candidate dates produced by one period, after BYSETPOS.
///
/// Dates before DTSTART are dropped first, so the period holding DTSTART
/// is truncated before BYSETPOS picks from it.
fn period_candidates(rule: &RecurrenceRule, dtstart: NaiveDate, period_start: NaiveDate) -> Vec<NaiveDate> {
    let mut candidates = match rule.frequency {
        Frequency::Daily => daily_candidates(rule, period_start),
        Frequency::Weekly => weekly_candidates(rule, dtstart, period_start),
        Frequency::Monthly => monthly_candidates(rule, dtstart, period_start),
        Frequency::Yearly => yearly_candidates(rule, dtstart, period_start.year()),
    };
    candidates.retain(|day| *day >= dtstart);
    apply_set_pos(&rule.by_set_pos, candidates)
}

fn daily_candidates(rule: &RecurrenceRule, day: NaiveDate) -> Vec<NaiveDate> {
    let matches = month_allowed(rule, day.month())
        && (rule.by_month_day.is_empty() || matches_month_day(&rule.by_month_day, day))
        && (rule.by_day.is_empty() || rule.by_day.iter().any(|d| d.weekday == day.weekday()));
    if matches {
        vec![day]
    } else {
        Vec::new()
    }
}

fn weekly_candidates(rule: &RecurrenceRule, dtstart: NaiveDate, monday: NaiveDate) -> Vec<NaiveDate> {
    let weekdays: Vec<Weekday> = if rule.by_day.is_empty() {
        vec![dtstart.weekday()]
    } else {
        rule.by_day.iter().map(|d| d.weekday).collect()
    };
    monday
        .iter_days()
        .take(7)
        .filter(|day| weekdays.contains(&day.weekday()) && month_allowed(rule, day.month()))
        .collect()
}

fn monthly_candidates(rule: &RecurrenceRule, dtstart: NaiveDate, first: NaiveDate) -> Vec<NaiveDate> {
    if !month_allowed(rule, first.month()) {
        return Vec::new();
    }
    let days = month_days(first);
    if rule.by_day.is_empty() && rule.by_month_day.is_empty() {
        // Same day-of-month as DTSTART; months without it are skipped.
        return days.into_iter().filter(|d| d.day() == dtstart.day()).collect();
    }
    filter_scope(rule, &days)
}

fn yearly_candidates(rule: &RecurrenceRule, dtstart: NaiveDate, year: i32) -> Vec<NaiveDate> {
    let no_day_parts = rule.by_day.is_empty() && rule.by_month_day.is_empty();
    let months: Vec<u32> = if !rule.by_month.is_empty() {
        rule.by_month.iter().copied().collect::<BTreeSet<u32>>().into_iter().collect()
    } else if no_day_parts {
        vec![dtstart.month()]
    } else {
        (1..=12).collect()
    };

    if no_day_parts {
        // Same month-day as DTSTART; Feb 29 only recurs in leap years.
        return months
            .into_iter()
            .filter_map(|m| NaiveDate::from_ymd_opt(year, m, dtstart.day()))
            .collect();
    }

    if !rule.by_day.is_empty() && rule.by_month.is_empty() {
        // BYDAY ordinals count within the whole year.
        let Some(jan1) = NaiveDate::from_ymd_opt(year, 1, 1) else {
            return Vec::new();
        };
        let days: Vec<NaiveDate> = jan1.iter_days().take_while(|d| d.year() == year).collect();
        return filter_scope(rule, &days);
    }

    months
        .into_iter()
        .filter_map(|m| NaiveDate::from_ymd_opt(year, m, 1))
        .flat_map(|first| filter_scope(rule, &month_days(first)))
        .collect()
}

/// Apply BYMONTHDAY and BYDAY to a contiguous run of days (a month or a year).
fn filter_scope(rule: &RecurrenceRule, scope: &[NaiveDate]) -> Vec<NaiveDate> {
    let (Some(first), Some(last)) = (scope.first(), scope.last()) else {
        return Vec::new();
    };
    scope
        .iter()
        .copied()
        .filter(|day| rule.by_month_day.is_empty() || matches_month_day(&rule.by_month_day, *day))
        .filter(|day| {
            rule.by_day.is_empty()
                || rule
                    .by_day
                    .iter()
                    .any(|wd| matches_weekday_num(wd, *day, *first, *last))
        })
        .collect()
}

fn month_allowed(rule: &RecurrenceRule, month: u32) -> bool {
    rule.by_month.is_empty() || rule.by_month.contains(&month)
}

fn month_days(first: NaiveDate) -> Vec<NaiveDate> {
    first
        .iter_days()
        .take_while(|d| d.month() == first.month())
        .collect()
}

fn days_in_month(date: NaiveDate) -> i32 {
    let first = date.with_day(1).unwrap_or(date);
    match first.checked_add_months(Months::new(1)) {
        Some(next) => (next - first).num_days() as i32,
        None => 31,
    }
}

/// Positive values count from the first of the month, negative from the last.
/// Days the month doesn't have never match, so they're skipped, not clamped.
fn matches_month_day(by_month_day: &[i32], date: NaiveDate) -> bool {
    let day = date.day() as i32;
    let len = days_in_month(date);
    by_month_day
        .iter()
        .any(|&v| if v > 0 { v == day } else { len + 1 + v == day })
}

fn matches_weekday_num(entry: &WeekdayNum, day: NaiveDate, first: NaiveDate, last: NaiveDate) -> bool {
    if day.weekday() != entry.weekday {
        return false;
    }
    match entry.ordinal {
        None => true,
        Some(n) if n > 0 => (day - first).num_days() / 7 + 1 == n as i64,
        Some(n) => (last - day).num_days() / 7 + 1 == -(n as i64),
    }
}

/// Pick the 1-based (or negative, from the end) positions out of a period's
/// sorted candidates.
fn apply_set_pos(positions: &[i32], candidates: Vec<NaiveDate>) -> Vec<NaiveDate> {
    if positions.is_empty() {
        return candidates;
    }
    let len = candidates.len() as i64;
    let picked: BTreeSet<NaiveDate> = positions
        .iter()
        .filter_map(|&p| {
            let index = if p > 0 { p as i64 - 1 } else { len + p as i64 };
            usize::try_from(index).ok().and_then(|i| candidates.get(i).copied())
        })
        .collect();
    picked.into_iter().collect()
}
