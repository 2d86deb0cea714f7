//! UTC ⇄ zoned conversions.
//!
//! Storage and range comparisons are always done in UTC. Wall-clock
//! arithmetic (recurrence, working windows) happens in the event's own
//! timezone and is converted back per instant, never through a fixed offset,
//! so results stay correct across DST transitions.

use chrono::{DateTime, Duration, LocalResult, NaiveDateTime, Offset, TimeZone, Utc};
use chrono_tz::Tz;

use crate::dst::DstPolicy;
use crate::error::{EngineError, Result};

/// Parse an IANA timezone name (e.g., `"America/New_York"`).
pub fn parse_timezone(name: &str) -> Result<Tz> {
    name.parse::<Tz>()
        .map_err(|_| EngineError::InvalidTimezone(name.to_string()))
}

/// Convert a local wall-clock time in `tz` to a UTC instant.
///
/// A time repeated by a fall-back transition resolves to the later instant.
/// A time skipped by a spring-forward transition is shifted forward by the
/// gap length.
pub fn to_utc(local: NaiveDateTime, tz: Tz) -> DateTime<Utc> {
    match tz.from_local_datetime(&local) {
        LocalResult::Single(dt) => dt.with_timezone(&Utc),
        LocalResult::Ambiguous(a, b) => a.with_timezone(&Utc).max(b.with_timezone(&Utc)),
        LocalResult::None => shift_past_gap(local, tz),
    }
}

/// Convert a local wall-clock time to UTC under an explicit gap policy.
///
/// Returns `None` only when `local` is inside a DST gap and `policy` is
/// [`DstPolicy::Skip`].
pub fn resolve_local(local: NaiveDateTime, tz: Tz, policy: DstPolicy) -> Option<DateTime<Utc>> {
    match tz.from_local_datetime(&local) {
        LocalResult::None if policy == DstPolicy::Skip => None,
        _ => Some(to_utc(local, tz)),
    }
}

/// Express a UTC instant as wall-clock time in `tz`.
pub fn to_zoned(instant: DateTime<Utc>, tz: Tz) -> NaiveDateTime {
    instant.with_timezone(&tz).naive_local()
}

/// Whether `local` is skipped by a spring-forward transition in `tz`.
pub fn is_in_gap(local: NaiveDateTime, tz: Tz) -> bool {
    matches!(tz.from_local_datetime(&local), LocalResult::None)
}

/// Interpret a non-existent local time with the offset in force just before
/// the gap, which lands it the same distance past the transition.
fn shift_past_gap(local: NaiveDateTime, tz: Tz) -> DateTime<Utc> {
    for hours in 1..=48 {
        let Some(earlier) = local.checked_sub_signed(Duration::hours(hours)) else {
            break;
        };
        if let Some(before) = tz.from_local_datetime(&earlier).latest() {
            let offset = Duration::seconds(before.offset().fix().local_minus_utc() as i64);
            return local.checked_sub_signed(offset).unwrap_or(local).and_utc();
        }
    }
    local.and_utc()
}
