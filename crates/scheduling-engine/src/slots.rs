//! Availability slots and free gaps.
//!
//! Busy ranges are merged into a disjoint cover first; candidate slots are
//! then tiled out of the window and kept only if they touch no busy time.
//! A slot ending exactly when a busy block starts is free (half-open ranges).

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::business::{self, WorkingHoursPolicy};
use crate::range::{self, TimeRange};

/// A fixed-length candidate window with its availability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSlot {
    pub range: TimeRange,
    pub available: bool,
    pub duration_minutes: u32,
}

impl TimeSlot {
    fn new(range: TimeRange, available: bool) -> Self {
        Self {
            range,
            available,
            duration_minutes: range.duration_minutes().max(0) as u32,
        }
    }
}

/// Options for [`generate_slots`].
#[derive(Debug, Clone, Default)]
pub struct SlotOptions {
    /// Ranges that make any slot they intersect unavailable.
    pub exclusions: Vec<TimeRange>,
    /// Mark every slot unavailable when the day isn't a business day.
    pub business_hours_only: bool,
}

/// Tile the working window of `day` into `policy.slot_duration_minutes` slots.
///
/// The last slot is shorter when the window isn't an exact multiple of the
/// slot length.
pub fn generate_slots(day: NaiveDate, policy: &WorkingHoursPolicy, options: &SlotOptions) -> Vec<TimeSlot> {
    let closed = options.business_hours_only && !business::is_business_day(day, policy);
    let exclusions = range::merge(&options.exclusions);

    policy
        .working_range(day)
        .split(policy.slot_duration_minutes)
        .into_iter()
        .map(|slot| TimeSlot::new(slot, !closed && !slot.intersects_any(&exclusions)))
        .collect()
}

/// Up to `max_results` free slots of `min_duration_minutes` within `window`.
///
/// Candidates are tiled at `min_duration_minutes`, so the only candidate that
/// can fall short is the window's tail, which is dropped.
pub fn find_available_slots(
    window: &TimeRange,
    busy: &[TimeRange],
    min_duration_minutes: u32,
    max_results: usize,
) -> Vec<TimeSlot> {
    find_available_slots_with_step(window, busy, min_duration_minutes, min_duration_minutes, max_results)
}

/// Like [`find_available_slots`], with candidates tiled at `slot_minutes`.
///
/// Candidates shorter than `min_duration_minutes` are dropped. Results are
/// ascending by start and pairwise disjoint.
pub fn find_available_slots_with_step(
    window: &TimeRange,
    busy: &[TimeRange],
    slot_minutes: u32,
    min_duration_minutes: u32,
    max_results: usize,
) -> Vec<TimeSlot> {
    let merged = range::merge(busy);

    window
        .split(slot_minutes)
        .into_iter()
        .filter(|candidate| candidate.duration_minutes() >= min_duration_minutes as i64)
        .filter(|candidate| !candidate.intersects_any(&merged))
        .take(max_results)
        .map(|candidate| TimeSlot::new(candidate, true))
        .collect()
}

/// Maximal free ranges within `window`, i.e. the gaps between merged busy blocks.
pub fn free_gaps(window: &TimeRange, busy: &[TimeRange]) -> Vec<TimeRange> {
    let clipped: Vec<TimeRange> = busy.iter().filter_map(|b| b.intersect(window)).collect();
    let merged = range::merge(&clipped);

    let mut gaps = Vec::new();
    let mut cursor = window.start;
    for block in &merged {
        if cursor < block.start {
            gaps.push(TimeRange::new(cursor, block.start));
        }
        cursor = cursor.max(block.end);
    }

    // Trailing gap after the last busy block.
    if cursor < window.end {
        gaps.push(TimeRange::new(cursor, window.end));
    }
    gaps
}

/// The first free gap of at least `min_duration_minutes` within `window`.
pub fn find_first_free(window: &TimeRange, busy: &[TimeRange], min_duration_minutes: i64) -> Option<TimeRange> {
    free_gaps(window, busy)
        .into_iter()
        .find(|gap| gap.duration_minutes() >= min_duration_minutes)
}
