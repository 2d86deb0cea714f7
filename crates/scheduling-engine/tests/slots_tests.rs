//! Tests for slot generation and free-time search.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use scheduling_engine::business::{DailyWindow, WorkingHoursPolicy};
use scheduling_engine::range::TimeRange;
use scheduling_engine::slots::{
    find_available_slots, find_available_slots_with_step, find_first_free, free_gaps,
    generate_slots, SlotOptions,
};

fn at(h: u32, m: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 8, h, m, 0).unwrap()
}

fn range(h1: u32, m1: u32, h2: u32, m2: u32) -> TimeRange {
    TimeRange::new(at(h1, m1), at(h2, m2))
}

/// Monday 2024-01-08.
fn monday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 8).unwrap()
}

// ---------------------------------------------------------------------------
// generate_slots
// ---------------------------------------------------------------------------

#[test]
fn default_policy_yields_sixteen_half_hour_slots() {
    let slots = generate_slots(monday(), &WorkingHoursPolicy::default(), &SlotOptions::default());
    assert_eq!(slots.len(), 16);
    assert_eq!(slots[0].range, range(9, 0, 9, 30));
    assert_eq!(slots[15].range, range(16, 30, 17, 0));
    assert!(slots.iter().all(|s| s.available && s.duration_minutes == 30));
}

#[test]
fn exclusion_marks_intersecting_slots_unavailable() {
    let options = SlotOptions {
        exclusions: vec![range(10, 0, 11, 0)],
        ..SlotOptions::default()
    };
    let slots = generate_slots(monday(), &WorkingHoursPolicy::default(), &options);

    let unavailable: Vec<TimeRange> = slots.iter().filter(|s| !s.available).map(|s| s.range).collect();
    assert_eq!(unavailable, vec![range(10, 0, 10, 30), range(10, 30, 11, 0)]);
    // The slot ending exactly at 10:00 touches the exclusion but stays free.
    assert!(slots.iter().any(|s| s.range == range(9, 30, 10, 0) && s.available));
}

#[test]
fn non_business_day_closed_when_business_hours_only() {
    let saturday = NaiveDate::from_ymd_opt(2024, 1, 13).unwrap();
    let options = SlotOptions {
        business_hours_only: true,
        ..SlotOptions::default()
    };
    let slots = generate_slots(saturday, &WorkingHoursPolicy::default(), &options);
    assert_eq!(slots.len(), 16);
    assert!(slots.iter().all(|s| !s.available));

    // Without the flag the same day is open.
    let open = generate_slots(saturday, &WorkingHoursPolicy::default(), &SlotOptions::default());
    assert!(open.iter().all(|s| s.available));
}

#[test]
fn uneven_slot_length_keeps_short_tail() {
    let policy = WorkingHoursPolicy {
        slot_duration_minutes: 45,
        ..WorkingHoursPolicy::default()
    };
    let slots = generate_slots(monday(), &policy, &SlotOptions::default());
    assert_eq!(slots.len(), 11);
    assert_eq!(slots[10].range, range(16, 30, 17, 0));
    assert_eq!(slots[10].duration_minutes, 30);
}

#[test]
fn inverted_window_generates_no_slots() {
    let policy = WorkingHoursPolicy {
        daily_window: DailyWindow::new(
            NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
        ),
        ..WorkingHoursPolicy::default()
    };
    assert!(generate_slots(monday(), &policy, &SlotOptions::default()).is_empty());
}

// ---------------------------------------------------------------------------
// find_available_slots
// ---------------------------------------------------------------------------

#[test]
fn busy_block_removes_its_slot() {
    let slots = find_available_slots(&range(9, 0, 12, 0), &[range(10, 0, 10, 30)], 30, 10);
    let starts: Vec<DateTime<Utc>> = slots.iter().map(|s| s.range.start).collect();
    assert_eq!(starts, vec![at(9, 0), at(9, 30), at(10, 30), at(11, 0), at(11, 30)]);
    assert!(slots.iter().all(|s| s.available));
}

#[test]
fn fully_busy_window_has_no_slots() {
    let busy = [range(8, 0, 10, 0), range(10, 0, 13, 0)];
    assert!(find_available_slots(&range(9, 0, 12, 0), &busy, 30, 10).is_empty());
}

#[test]
fn results_capped_at_max() {
    let slots = find_available_slots(&range(9, 0, 17, 0), &[], 30, 3);
    assert_eq!(slots.len(), 3);
    assert_eq!(slots[2].range, range(10, 0, 10, 30));
}

#[test]
fn short_window_tail_dropped() {
    let slots = find_available_slots(&range(9, 0, 10, 45), &[], 30, 10);
    assert_eq!(slots.len(), 3);
    assert_eq!(slots.last().map(|s| s.range), Some(range(10, 0, 10, 30)));
}

#[test]
fn unsorted_overlapping_busy_input_is_merged() {
    let busy = [range(11, 0, 11, 45), range(10, 30, 11, 15), range(9, 0, 9, 10)];
    let slots = find_available_slots(&range(9, 0, 12, 0), &busy, 30, 10);
    let starts: Vec<DateTime<Utc>> = slots.iter().map(|s| s.range.start).collect();
    assert_eq!(starts, vec![at(9, 30), at(10, 0)]);
}

#[test]
fn custom_step_keeps_tail_meeting_minimum() {
    let slots = find_available_slots_with_step(&range(9, 0, 11, 30), &[], 60, 30, 10);
    assert_eq!(slots.len(), 3);
    assert_eq!(slots[2].range, range(11, 0, 11, 30));
    assert_eq!(slots[2].duration_minutes, 30);
}

#[test]
fn window_ending_at_latest_instant() {
    let end = DateTime::<Utc>::MAX_UTC;
    let window = TimeRange::new(end - Duration::minutes(100), end);
    let slots = find_available_slots(&window, &[], 30, 10);
    assert_eq!(slots.len(), 3);
    assert_eq!(slots[2].range.end, end - Duration::minutes(10));
}

// ---------------------------------------------------------------------------
// free_gaps / find_first_free
// ---------------------------------------------------------------------------

#[test]
fn free_gaps_between_busy_blocks() {
    let busy = [range(10, 0, 11, 0), range(8, 0, 9, 30), range(10, 30, 11, 30)];
    assert_eq!(
        free_gaps(&range(9, 0, 13, 0), &busy),
        vec![range(9, 30, 10, 0), range(11, 30, 13, 0)]
    );
}

#[test]
fn free_gaps_of_empty_calendar_is_whole_window() {
    assert_eq!(free_gaps(&range(9, 0, 17, 0), &[]), vec![range(9, 0, 17, 0)]);
}

#[test]
fn first_free_skips_gaps_too_short() {
    let busy = [range(9, 15, 10, 0), range(10, 20, 11, 0)];
    let window = range(9, 0, 12, 0);
    assert_eq!(find_first_free(&window, &busy, 30), Some(range(11, 0, 12, 0)));
    assert_eq!(find_first_free(&window, &busy, 15), Some(range(9, 0, 9, 15)));
    assert_eq!(find_first_free(&window, &busy, 61), None);
}
