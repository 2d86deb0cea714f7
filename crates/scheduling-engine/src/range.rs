//! Half-open UTC time ranges and the interval algebra built on them.
//!
//! Every range is interpreted as `[start, end)`: it contains its start instant
//! but not its end instant. Two ranges that only touch (`a.end == b.start`)
//! therefore do NOT overlap. The same convention is used by slot generation
//! and conflict detection, so back-to-back events never collide.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

/// A span of time between two UTC instants, with `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeRange {
    /// Build a range from two instants in either order.
    ///
    /// Callers don't always know which endpoint comes first, so reversed
    /// arguments are swapped instead of rejected.
    pub fn new(a: DateTime<Utc>, b: DateTime<Utc>) -> Self {
        if a <= b {
            Self { start: a, end: b }
        } else {
            Self { start: b, end: a }
        }
    }

    /// Build a range from two Unix timestamps in milliseconds.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidRange`] if either timestamp is outside the
    /// range chrono can represent.
    pub fn from_timestamps_millis(a: i64, b: i64) -> Result<Self> {
        let to_instant = |ms: i64| {
            DateTime::<Utc>::from_timestamp_millis(ms)
                .ok_or_else(|| EngineError::InvalidRange(format!("timestamp {ms}ms out of range")))
        };
        Ok(Self::new(to_instant(a)?, to_instant(b)?))
    }

    /// Build a range starting at `start` and lasting `minutes`.
    ///
    /// The end saturates at the representable limits instead of overflowing.
    pub fn from_minutes(start: DateTime<Utc>, minutes: i64) -> Self {
        let end = match Duration::try_minutes(minutes) {
            Some(delta) => saturating_add(start, delta),
            None if minutes < 0 => DateTime::<Utc>::MIN_UTC,
            None => DateTime::<Utc>::MAX_UTC,
        };
        Self::new(start, end)
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    pub fn duration_minutes(&self) -> i64 {
        self.duration().num_minutes()
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Whether `instant` falls inside `[start, end)`.
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant < self.end
    }

    /// Half-open overlap test.
    ///
    /// Two ranges overlap iff `a.start < b.end && b.start < a.end`, which
    /// excludes the adjacent case and any empty range.
    pub fn overlaps(&self, other: &TimeRange) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// The common part of two ranges, or `None` if they don't overlap.
    pub fn intersect(&self, other: &TimeRange) -> Option<TimeRange> {
        if !self.overlaps(other) {
            return None;
        }
        Some(TimeRange {
            start: self.start.max(other.start),
            end: self.end.min(other.end),
        })
    }

    /// Whether this range overlaps any range in `others`.
    pub fn intersects_any(&self, others: &[TimeRange]) -> bool {
        others.iter().any(|o| self.overlaps(o))
    }

    /// The same range moved by `delta`, clamped to the representable instants.
    pub fn shifted(&self, delta: Duration) -> TimeRange {
        TimeRange {
            start: saturating_add(self.start, delta),
            end: saturating_add(self.end, delta),
        }
    }

    /// Widen the range by `margin` on both sides, stopping at
    /// [`DateTime::<Utc>::MIN_UTC`] and [`DateTime::<Utc>::MAX_UTC`].
    pub fn widened(&self, margin: Duration) -> TimeRange {
        TimeRange::new(saturating_sub(self.start, margin), saturating_add(self.end, margin))
    }

    /// Tile this range into consecutive `interval_minutes` chunks.
    ///
    /// A shorter final chunk is kept when the length isn't an exact multiple.
    /// An `interval_minutes` of zero yields the range itself, and an empty
    /// range yields nothing.
    pub fn split(&self, interval_minutes: u32) -> Vec<TimeRange> {
        if self.is_empty() {
            return Vec::new();
        }
        if interval_minutes == 0 {
            return vec![*self];
        }

        let step = Duration::minutes(interval_minutes as i64);
        let mut chunks = Vec::new();
        let mut cursor = self.start;
        while cursor < self.end {
            let next = cursor.checked_add_signed(step).map_or(self.end, |n| n.min(self.end));
            chunks.push(TimeRange {
                start: cursor,
                end: next,
            });
            cursor = next;
        }
        chunks
    }
}

/// `instant + delta`, clamped to the instants chrono can represent.
pub fn saturating_add(instant: DateTime<Utc>, delta: Duration) -> DateTime<Utc> {
    instant.checked_add_signed(delta).unwrap_or(if delta < Duration::zero() {
        DateTime::<Utc>::MIN_UTC
    } else {
        DateTime::<Utc>::MAX_UTC
    })
}

/// `instant - delta`, clamped to the instants chrono can represent.
pub fn saturating_sub(instant: DateTime<Utc>, delta: Duration) -> DateTime<Utc> {
    instant.checked_sub_signed(delta).unwrap_or(if delta < Duration::zero() {
        DateTime::<Utc>::MAX_UTC
    } else {
        DateTime::<Utc>::MIN_UTC
    })
}

/// Order-independent constructor, equivalent to [`TimeRange::new`].
pub fn create(a: DateTime<Utc>, b: DateTime<Utc>) -> TimeRange {
    TimeRange::new(a, b)
}

/// Half-open overlap test, equivalent to [`TimeRange::overlaps`].
pub fn overlaps(a: &TimeRange, b: &TimeRange) -> bool {
    a.overlaps(b)
}

/// Intersection of two ranges, equivalent to [`TimeRange::intersect`].
pub fn intersect(a: &TimeRange, b: &TimeRange) -> Option<TimeRange> {
    a.intersect(b)
}

/// Coalesce overlapping or touching ranges into a minimal disjoint cover.
///
/// Returns ranges sorted by start. Empty ranges are dropped, as they cover
/// nothing. The result satisfies `merge(&merge(xs)) == merge(xs)`.
pub fn merge(ranges: &[TimeRange]) -> Vec<TimeRange> {
    let mut sorted: Vec<TimeRange> = ranges.iter().copied().filter(|r| !r.is_empty()).collect();
    sorted.sort_by_key(|r| (r.start, r.end));

    let mut merged: Vec<TimeRange> = Vec::with_capacity(sorted.len());
    for range in sorted {
        if let Some(last) = merged.last_mut() {
            if range.start <= last.end {
                // Overlapping or adjacent: extend the current block.
                last.end = last.end.max(range.end);
                continue;
            }
        }
        merged.push(range);
    }
    merged
}

/// Tile `range` into `interval_minutes` chunks, equivalent to [`TimeRange::split`].
pub fn split(range: &TimeRange, interval_minutes: u32) -> Vec<TimeRange> {
    range.split(interval_minutes)
}
