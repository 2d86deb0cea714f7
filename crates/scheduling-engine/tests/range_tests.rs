//! Tests for half-open range algebra.

use chrono::{DateTime, Duration, TimeZone, Utc};
use scheduling_engine::range::{self, TimeRange};
use scheduling_engine::EngineError;

fn at(h: u32, m: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 16, h, m, 0).unwrap()
}

fn r(sh: u32, sm: u32, eh: u32, em: u32) -> TimeRange {
    TimeRange::new(at(sh, sm), at(eh, em))
}

// ---------------------------------------------------------------------------
// create
// ---------------------------------------------------------------------------

#[test]
fn create_orders_endpoints() {
    let forward = range::create(at(9, 0), at(10, 0));
    let backward = range::create(at(10, 0), at(9, 0));
    assert_eq!(forward, backward);
    assert_eq!(forward.start, at(9, 0));
    assert_eq!(forward.end, at(10, 0));
}

#[test]
fn from_timestamps_millis_builds_range() {
    let range = TimeRange::from_timestamps_millis(1_000, 0).unwrap();
    assert_eq!(range.start.timestamp_millis(), 0);
    assert_eq!(range.end.timestamp_millis(), 1_000);
}

#[test]
fn from_timestamps_millis_rejects_unrepresentable_instants() {
    let result = TimeRange::from_timestamps_millis(0, i64::MAX);
    assert!(matches!(result, Err(EngineError::InvalidRange(_))));
}

// ---------------------------------------------------------------------------
// overlaps / intersect
// ---------------------------------------------------------------------------

#[test]
fn touching_ranges_do_not_overlap() {
    let a = r(10, 0, 11, 0);
    let b = r(11, 0, 12, 0);
    assert!(!range::overlaps(&a, &b));
    assert!(!range::overlaps(&b, &a));
    assert_eq!(range::intersect(&a, &b), None);
}

#[test]
fn partial_overlap_detected_both_ways() {
    let a = r(10, 0, 11, 0);
    let b = r(10, 30, 11, 30);
    assert!(a.overlaps(&b));
    assert!(b.overlaps(&a));
    assert_eq!(a.intersect(&b), Some(r(10, 30, 11, 0)));
}

#[test]
fn contained_range_intersection_is_inner_range() {
    let outer = r(9, 0, 17, 0);
    let inner = r(12, 0, 13, 0);
    assert_eq!(outer.intersect(&inner), Some(inner));
    assert_eq!(inner.intersect(&outer), Some(inner));
}

#[test]
fn disjoint_ranges_have_no_intersection() {
    assert_eq!(r(9, 0, 10, 0).intersect(&r(14, 0, 15, 0)), None);
}

// ---------------------------------------------------------------------------
// merge
// ---------------------------------------------------------------------------

#[test]
fn merge_coalesces_overlapping_and_touching() {
    let merged = range::merge(&[
        r(14, 0, 15, 0),
        r(9, 0, 10, 0),
        r(9, 30, 10, 30),
        r(10, 30, 11, 0),
        r(16, 0, 17, 0),
    ]);
    assert_eq!(merged, vec![r(9, 0, 11, 0), r(14, 0, 15, 0), r(16, 0, 17, 0)]);
}

#[test]
fn merge_absorbs_contained_ranges() {
    let merged = range::merge(&[r(9, 0, 17, 0), r(10, 0, 11, 0), r(12, 0, 13, 0)]);
    assert_eq!(merged, vec![r(9, 0, 17, 0)]);
}

#[test]
fn merge_is_idempotent() {
    let input = [r(9, 0, 10, 0), r(9, 45, 11, 0), r(13, 0, 14, 0)];
    let once = range::merge(&input);
    assert_eq!(range::merge(&once), once);
}

#[test]
fn merge_empty_input() {
    assert!(range::merge(&[]).is_empty());
}

// ---------------------------------------------------------------------------
// split
// ---------------------------------------------------------------------------

#[test]
fn split_exact_multiple() {
    let chunks = range::split(&r(9, 0, 10, 0), 15);
    assert_eq!(chunks.len(), 4);
    assert_eq!(chunks[0], r(9, 0, 9, 15));
    assert_eq!(chunks[3], r(9, 45, 10, 0));
}

#[test]
fn split_keeps_short_tail() {
    let chunks = range::split(&r(9, 0, 10, 10), 30);
    assert_eq!(chunks, vec![r(9, 0, 9, 30), r(9, 30, 10, 0), r(10, 0, 10, 10)]);
    assert_eq!(chunks[2].duration_minutes(), 10);
}

#[test]
fn split_empty_range_yields_nothing() {
    assert!(range::split(&r(9, 0, 9, 0), 15).is_empty());
}

#[test]
fn split_interval_longer_than_range() {
    assert_eq!(range::split(&r(9, 0, 9, 20), 60), vec![r(9, 0, 9, 20)]);
}

#[test]
fn split_near_latest_instant_terminates() {
    let end = DateTime::<Utc>::MAX_UTC;
    let tail = TimeRange::new(end - Duration::minutes(50), end);
    let chunks = tail.split(30);
    assert_eq!(chunks.len(), 2);
    assert_eq!(chunks[1].end, end);
    assert_eq!(chunks[1].duration_minutes(), 20);
}

// ---------------------------------------------------------------------------
// shift / limits
// ---------------------------------------------------------------------------

#[test]
fn shifted_moves_both_endpoints() {
    let moved = r(9, 0, 10, 0).shifted(Duration::minutes(90));
    assert_eq!(moved, r(10, 30, 11, 30));
    assert_eq!(moved.shifted(Duration::minutes(-90)), r(9, 0, 10, 0));
}

#[test]
fn shifted_past_limits_clamps() {
    let late = TimeRange::new(DateTime::<Utc>::MAX_UTC - Duration::hours(1), DateTime::<Utc>::MAX_UTC);
    let moved = late.shifted(Duration::days(2));
    assert_eq!(moved.start, DateTime::<Utc>::MAX_UTC);
    assert!(moved.is_empty());
}

#[test]
fn from_minutes_saturates_at_latest_instant() {
    let last_hour = DateTime::<Utc>::MAX_UTC - Duration::hours(1);
    let range = TimeRange::from_minutes(last_hour, 24 * 60);
    assert_eq!(range.end, DateTime::<Utc>::MAX_UTC);
    assert_eq!(range.duration_minutes(), 60);

    let huge = TimeRange::from_minutes(at(9, 0), i64::MAX);
    assert_eq!(huge.end, DateTime::<Utc>::MAX_UTC);
}

#[test]
fn saturating_helpers_clamp_to_limits() {
    assert_eq!(range::saturating_sub(DateTime::<Utc>::MIN_UTC, Duration::days(1)), DateTime::<Utc>::MIN_UTC);
    assert_eq!(range::saturating_add(DateTime::<Utc>::MAX_UTC, Duration::days(1)), DateTime::<Utc>::MAX_UTC);
    assert_eq!(range::saturating_add(at(9, 0), Duration::minutes(30)), at(9, 30));
}
