//! Calendar events as the engine sees them.
//!
//! Events are owned by the external store; the engine only reads them and
//! hands drafts back for creation.

use chrono::{Duration, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::expander::{self, ExceptionSet, RecurringSeries};
use crate::range::{self, TimeRange};
use crate::rule::RecurrenceRule;

/// A stored calendar event.
///
/// For a recurring event, `range` is the first occurrence and its start,
/// seen in `timezone`, anchors the recurrence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub owner_id: String,
    pub range: TimeRange,
    #[serde(default)]
    pub all_day: bool,
    #[serde(default = "default_busy")]
    pub is_busy: bool,
    #[serde(default = "default_timezone")]
    pub timezone: Tz,
    #[serde(default)]
    pub recurrence: Option<RecurrenceRule>,
    #[serde(default)]
    pub exceptions: ExceptionSet,
    #[serde(default)]
    pub recurrence_parent_id: Option<String>,
}

/// An event that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventDraft {
    pub owner_id: String,
    pub range: TimeRange,
    #[serde(default)]
    pub all_day: bool,
    #[serde(default = "default_busy")]
    pub is_busy: bool,
    #[serde(default = "default_timezone")]
    pub timezone: Tz,
    #[serde(default)]
    pub recurrence: Option<RecurrenceRule>,
    #[serde(default)]
    pub exceptions: ExceptionSet,
    #[serde(default)]
    pub recurrence_parent_id: Option<String>,
}

fn default_busy() -> bool {
    true
}

fn default_timezone() -> Tz {
    Tz::UTC
}

impl EventDraft {
    /// A busy, single-occurrence UTC draft.
    pub fn new(owner_id: impl Into<String>, range: TimeRange) -> Self {
        Self {
            owner_id: owner_id.into(),
            range,
            all_day: false,
            is_busy: true,
            timezone: Tz::UTC,
            recurrence: None,
            exceptions: ExceptionSet::new(),
            recurrence_parent_id: None,
        }
    }

    pub fn into_event(self, id: impl Into<String>) -> Event {
        Event {
            id: id.into(),
            owner_id: self.owner_id,
            range: self.range,
            all_day: self.all_day,
            is_busy: self.is_busy,
            timezone: self.timezone,
            recurrence: self.recurrence,
            exceptions: self.exceptions,
            recurrence_parent_id: self.recurrence_parent_id,
        }
    }
}

impl Event {
    pub fn duration(&self) -> Duration {
        self.range.duration()
    }

    pub fn is_recurring(&self) -> bool {
        self.recurrence.is_some()
    }

    /// The recurrence anchored at this event's first occurrence, if any.
    ///
    /// The first occurrence keeps `range.start` exactly, including the
    /// earlier instant of a repeated fall-back hour.
    pub fn series(&self) -> Option<RecurringSeries> {
        self.recurrence.as_ref().map(|rule| {
            RecurringSeries::starting_at(rule.clone(), self.range.start, self.timezone)
        })
    }

    /// Concrete occurrence ranges of this event that overlap `window`.
    ///
    /// Recurring events are expanded over `window` only, never over the
    /// series' full lifetime. The expansion window starts one event duration
    /// early so an occurrence already running at `window.start` is included.
    pub fn occurrences_in(&self, window: &TimeRange, max_occurrences: u32) -> Vec<TimeRange> {
        let Some(series) = self.series() else {
            return if self.range.overlaps(window) {
                vec![self.range]
            } else {
                Vec::new()
            };
        };

        let duration = self.duration();
        let expansion_window =
            TimeRange::new(range::saturating_sub(window.start, duration), window.end);
        expander::expand_ranges(
            &series,
            expansion_window,
            &self.exceptions,
            max_occurrences,
            duration,
        )
        .filter(|occurrence| occurrence.overlaps(window))
        .collect()
    }

    /// Whether any occurrence could still start at or after `instant`.
    pub fn may_recur_after(&self, instant: chrono::DateTime<Utc>) -> bool {
        match &self.recurrence {
            None => self.range.end > instant,
            Some(rule) => rule
                .until
                .is_none_or(|until| {
                    range::saturating_add(until.resolve(self.timezone), self.duration()) > instant
                }),
        }
    }
}
