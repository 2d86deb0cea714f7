//! WASM bindings for scheduling-engine.
//!
//! Exposes rule parsing, recurrence expansion, conflict checks, availability
//! slots and business-day arithmetic to JavaScript via `wasm-bindgen`. All
//! complex types are passed as JSON strings; errors are thrown as JS
//! exceptions carrying the engine error's message.
//!
//! Each export is a thin wrapper over a plain Rust function returning
//! `Result<_, String>`, so the JSON handling can be tested natively.
//!
//! ## Build process
//!
//! ```sh
//! cargo build -p scheduling-engine-wasm --target wasm32-unknown-unknown --release
//! wasm-bindgen --target nodejs --out-dir packages/scheduling-js/wasm/ \
//!   target/wasm32-unknown-unknown/release/scheduling_engine_wasm.wasm
//! ```

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use scheduling_engine::business::{self, WorkingHoursPolicy};
use scheduling_engine::conflict;
use scheduling_engine::event::Event;
use scheduling_engine::expander::{self, ExceptionSet, RecurringSeries, DEFAULT_MAX_OCCURRENCES};
use scheduling_engine::range::TimeRange;
use scheduling_engine::rule::{describe, Frequency, RecurrenceRule};
use scheduling_engine::slots::{self, SlotOptions, TimeSlot};
use scheduling_engine::store::InMemoryEventStore;
use scheduling_engine::timezone;
use serde::{Deserialize, Serialize};
use wasm_bindgen::prelude::*;

// ---------------------------------------------------------------------------
// Serde-friendly DTOs for crossing the WASM boundary as JSON
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct RangeDto {
    start: String,
    end: String,
}

impl From<&TimeRange> for RangeDto {
    fn from(r: &TimeRange) -> Self {
        Self {
            start: r.start.to_rfc3339(),
            end: r.end.to_rfc3339(),
        }
    }
}

#[derive(Serialize)]
struct ParsedRuleDto {
    rrule: String,
    frequency: Frequency,
    interval: u32,
    count: Option<u32>,
    bounded: bool,
    description: String,
}

#[derive(Serialize)]
struct ExpansionDto {
    occurrences: Vec<RangeDto>,
    truncated: bool,
}

#[derive(Serialize)]
struct ConflictDto {
    event_id: String,
    occurrence: RangeDto,
    overlap_minutes: i64,
}

#[derive(Serialize)]
struct SlotDto {
    start: String,
    end: String,
    available: bool,
    duration_minutes: u32,
}

impl From<&TimeSlot> for SlotDto {
    fn from(s: &TimeSlot) -> Self {
        Self {
            start: s.range.start.to_rfc3339(),
            end: s.range.end.to_rfc3339(),
            available: s.available,
            duration_minutes: s.duration_minutes,
        }
    }
}

/// Input format for ranges passed from JavaScript.
#[derive(Deserialize)]
struct RangeInput {
    start: String,
    end: String,
}

// ---------------------------------------------------------------------------
// Helpers: parse inputs, serialize outputs
// ---------------------------------------------------------------------------

/// Parse an ISO 8601 datetime string into `DateTime<Utc>`.
///
/// Accepts RFC 3339 (with offset) and naive datetimes, which are read as UTC.
fn parse_datetime(s: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
        .map(|ndt| ndt.and_utc())
        .map_err(|e| format!("Invalid datetime '{}': {}", s, e))
}

/// Parse a naive local datetime such as `"2026-02-17T14:00:00"`.
fn parse_local(s: &str) -> Result<NaiveDateTime, String> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
        .map_err(|e| format!("Invalid local datetime '{}': {}", s, e))
}

fn parse_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| format!("Invalid date '{}': {}", s, e))
}

fn parse_window(start: &str, end: &str) -> Result<TimeRange, String> {
    Ok(TimeRange::new(parse_datetime(start)?, parse_datetime(end)?))
}

fn parse_ranges_json(json: &str) -> Result<Vec<TimeRange>, String> {
    let inputs: Vec<RangeInput> =
        serde_json::from_str(json).map_err(|e| format!("Invalid ranges JSON: {}", e))?;
    inputs
        .into_iter()
        .map(|input| parse_window(&input.start, &input.end))
        .collect()
}

/// An empty string means the default policy.
fn parse_policy(json: &str) -> Result<WorkingHoursPolicy, String> {
    if json.trim().is_empty() {
        return Ok(WorkingHoursPolicy::default());
    }
    WorkingHoursPolicy::from_json(json).map_err(|e| e.to_string())
}

fn parse_rule(rrule: &str) -> Result<RecurrenceRule, String> {
    RecurrenceRule::parse(rrule).map_err(|e| e.to_string())
}

fn to_json<T: Serialize>(value: &T) -> Result<String, String> {
    serde_json::to_string(value).map_err(|e| format!("Serialization error: {}", e))
}

fn js_err(message: String) -> JsValue {
    JsValue::from_str(&message)
}

// ---------------------------------------------------------------------------
// Native implementations
// ---------------------------------------------------------------------------

fn parse_rule_impl(rrule: &str) -> Result<String, String> {
    let rule = parse_rule(rrule)?;
    to_json(&ParsedRuleDto {
        rrule: rule.to_string(),
        frequency: rule.frequency,
        interval: rule.interval,
        count: rule.count,
        bounded: rule.is_bounded(),
        description: describe(&rule),
    })
}

#[allow(clippy::too_many_arguments)]
fn expand_rule_impl(
    rrule: &str,
    dtstart: &str,
    duration_minutes: u32,
    tz: &str,
    window_start: &str,
    window_end: &str,
    exceptions_json: Option<&str>,
    max_occurrences: Option<u32>,
) -> Result<String, String> {
    let rule = parse_rule(rrule)?;
    let tz = timezone::parse_timezone(tz).map_err(|e| e.to_string())?;
    let series = RecurringSeries::new(rule, parse_local(dtstart)?, tz);
    let window = parse_window(window_start, window_end)?;
    let exceptions: ExceptionSet = match exceptions_json {
        Some(json) => {
            serde_json::from_str(json).map_err(|e| format!("Invalid exceptions JSON: {}", e))?
        }
        None => ExceptionSet::new(),
    };

    let mut iter = expander::expand(
        &series,
        window,
        &exceptions,
        max_occurrences.unwrap_or(DEFAULT_MAX_OCCURRENCES),
    );
    let occurrences: Vec<RangeDto> = iter
        .by_ref()
        .map(|start| RangeDto::from(&TimeRange::from_minutes(start, duration_minutes as i64)))
        .collect();

    to_json(&ExpansionDto {
        occurrences,
        truncated: iter.truncated(),
    })
}

fn check_conflicts_impl(
    events_json: &str,
    candidate_start: &str,
    candidate_end: &str,
    owner_id: &str,
    exclude_event_id: Option<&str>,
) -> Result<String, String> {
    let events: Vec<Event> =
        serde_json::from_str(events_json).map_err(|e| format!("Invalid events JSON: {}", e))?;
    let candidate = parse_window(candidate_start, candidate_end)?;
    let store = InMemoryEventStore::with_events(events);

    let conflicts = conflict::find_conflicts(&candidate, owner_id, exclude_event_id, &store)
        .map_err(|e| e.to_string())?;

    let dtos: Vec<ConflictDto> = conflicts
        .iter()
        .map(|c| ConflictDto {
            event_id: c.event.id.clone(),
            occurrence: RangeDto::from(&c.occurrence),
            overlap_minutes: c.overlap_minutes,
        })
        .collect();
    to_json(&dtos)
}

fn find_available_slots_impl(
    busy_json: &str,
    window_start: &str,
    window_end: &str,
    min_duration_minutes: u32,
    max_results: u32,
) -> Result<String, String> {
    let busy = parse_ranges_json(busy_json)?;
    let window = parse_window(window_start, window_end)?;
    let found = slots::find_available_slots(&window, &busy, min_duration_minutes, max_results as usize);
    to_json(&found.iter().map(SlotDto::from).collect::<Vec<_>>())
}

fn generate_slots_impl(
    date: &str,
    policy_json: &str,
    exclusions_json: &str,
    business_hours_only: bool,
) -> Result<String, String> {
    let day = parse_date(date)?;
    let policy = parse_policy(policy_json)?;
    let options = SlotOptions {
        exclusions: parse_ranges_json(exclusions_json)?,
        business_hours_only,
    };
    let generated = slots::generate_slots(day, &policy, &options);
    to_json(&generated.iter().map(SlotDto::from).collect::<Vec<_>>())
}

fn is_business_day_impl(date: &str, policy_json: &str) -> Result<bool, String> {
    Ok(business::is_business_day(parse_date(date)?, &parse_policy(policy_json)?))
}

fn add_business_days_impl(date: &str, n: i32, policy_json: &str) -> Result<String, String> {
    let result = business::add_business_days(parse_date(date)?, n, &parse_policy(policy_json)?)
        .map_err(|e| e.to_string())?;
    Ok(result.format("%Y-%m-%d").to_string())
}

fn working_hours_between_impl(start: &str, end: &str, policy_json: &str) -> Result<f64, String> {
    Ok(business::working_hours_between(
        parse_datetime(start)?,
        parse_datetime(end)?,
        &parse_policy(policy_json)?,
    ))
}

// ---------------------------------------------------------------------------
// WASM exports
// ---------------------------------------------------------------------------

/// Parse an RRULE and return its canonical form and description as JSON.
#[wasm_bindgen(js_name = "parseRule")]
pub fn parse_rule_js(rrule: &str) -> Result<String, JsValue> {
    parse_rule_impl(rrule).map_err(js_err)
}

/// Human-readable English description of an RRULE.
#[wasm_bindgen(js_name = "describeRule")]
pub fn describe_rule(rrule: &str) -> Result<String, JsValue> {
    parse_rule(rrule).map(|r| describe(&r)).map_err(js_err)
}

/// Expand an RRULE into concrete occurrences inside a window.
///
/// Returns `{ occurrences: [{start, end}], truncated }` as JSON.
///
/// # Arguments
/// - `rrule` -- RRULE string (e.g., "FREQ=WEEKLY;BYDAY=TU,TH")
/// - `dtstart` -- Local datetime of the first occurrence (e.g., "2026-02-17T14:00:00")
/// - `duration_minutes` -- Duration of each occurrence in minutes
/// - `timezone` -- IANA timezone (e.g., "America/Los_Angeles")
/// - `window_start`, `window_end` -- ISO 8601 bounds of the window
/// - `exceptions_json` -- Optional JSON array of excluded local dates ("YYYY-MM-DD")
/// - `max_occurrences` -- Optional cap (default 500)
#[allow(clippy::too_many_arguments)]
#[wasm_bindgen(js_name = "expandRule")]
pub fn expand_rule(
    rrule: &str,
    dtstart: &str,
    duration_minutes: u32,
    timezone: &str,
    window_start: &str,
    window_end: &str,
    exceptions_json: Option<String>,
    max_occurrences: Option<u32>,
) -> Result<String, JsValue> {
    expand_rule_impl(
        rrule,
        dtstart,
        duration_minutes,
        timezone,
        window_start,
        window_end,
        exceptions_json.as_deref(),
        max_occurrences,
    )
    .map_err(js_err)
}

/// Conflicting occurrences of an owner's busy events with a candidate range.
///
/// `events_json` is a JSON array of stored events. Returns a JSON array of
/// `{event_id, occurrence, overlap_minutes}`.
#[wasm_bindgen(js_name = "checkConflicts")]
pub fn check_conflicts(
    events_json: &str,
    candidate_start: &str,
    candidate_end: &str,
    owner_id: &str,
    exclude_event_id: Option<String>,
) -> Result<String, JsValue> {
    check_conflicts_impl(
        events_json,
        candidate_start,
        candidate_end,
        owner_id,
        exclude_event_id.as_deref(),
    )
    .map_err(js_err)
}

/// Free slots of at least `min_duration_minutes` within a window.
#[wasm_bindgen(js_name = "findAvailableSlots")]
pub fn find_available_slots(
    busy_json: &str,
    window_start: &str,
    window_end: &str,
    min_duration_minutes: u32,
    max_results: u32,
) -> Result<String, JsValue> {
    find_available_slots_impl(busy_json, window_start, window_end, min_duration_minutes, max_results)
        .map_err(js_err)
}

/// Working-hour slots of one day with their availability.
///
/// An empty `policy_json` selects the default policy.
#[wasm_bindgen(js_name = "generateSlots")]
pub fn generate_slots(
    date: &str,
    policy_json: &str,
    exclusions_json: &str,
    business_hours_only: bool,
) -> Result<String, JsValue> {
    generate_slots_impl(date, policy_json, exclusions_json, business_hours_only).map_err(js_err)
}

#[wasm_bindgen(js_name = "isBusinessDay")]
pub fn is_business_day(date: &str, policy_json: &str) -> Result<bool, JsValue> {
    is_business_day_impl(date, policy_json).map_err(js_err)
}

/// Move `n` business days from `date` (negative moves backward).
#[wasm_bindgen(js_name = "addBusinessDays")]
pub fn add_business_days(date: &str, n: i32, policy_json: &str) -> Result<String, JsValue> {
    add_business_days_impl(date, n, policy_json).map_err(js_err)
}

#[wasm_bindgen(js_name = "workingHoursBetween")]
pub fn working_hours_between(start: &str, end: &str, policy_json: &str) -> Result<f64, JsValue> {
    working_hours_between_impl(start, end, policy_json).map_err(js_err)
}
