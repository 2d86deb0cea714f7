//! Detect collisions between a candidate range and an owner's busy events.
//!
//! Recurring events are expanded over the candidate window only. Overlap uses
//! half-open semantics: an event ending exactly when the candidate starts
//! (or starting exactly when it ends) is NOT a conflict.

use chrono::Duration;

use crate::error::{EngineError, Result};
use crate::event::{Event, EventDraft};
use crate::expander::DEFAULT_MAX_OCCURRENCES;
use crate::range::TimeRange;
use crate::store::EventStore;

/// Days added on both sides of the candidate when reading from the store,
/// so all-day and timezone-shifted events near the edges are included.
///
/// This only pads one-off events. Recurring series are returned by
/// [`EventStore::read`] whenever they may recur into the window, which
/// covers a margin of any number of recurrence cycles.
pub const READ_MARGIN_DAYS: i64 = 1;

/// A detected collision between the candidate and one occurrence of an event.
#[derive(Debug, Clone, PartialEq)]
pub struct Conflict {
    pub event: Event,
    /// The colliding occurrence (the event's own range if it doesn't recur).
    pub occurrence: TimeRange,
    pub overlap_minutes: i64,
}

/// Find every busy-event occurrence in `events` that overlaps `candidate`.
///
/// Non-busy events and the event whose id equals `exclude_event_id` are
/// ignored. Results are ordered by occurrence start.
pub fn conflicts_among(
    events: &[Event],
    candidate: &TimeRange,
    exclude_event_id: Option<&str>,
) -> Vec<Conflict> {
    let mut conflicts: Vec<Conflict> = events
        .iter()
        .filter(|e| e.is_busy)
        .filter(|e| exclude_event_id != Some(e.id.as_str()))
        .flat_map(|event| {
            event
                .occurrences_in(candidate, DEFAULT_MAX_OCCURRENCES)
                .into_iter()
                .filter_map(move |occurrence| {
                    let overlap = occurrence.intersect(candidate)?;
                    Some(Conflict {
                        event: event.clone(),
                        occurrence,
                        overlap_minutes: overlap.duration_minutes(),
                    })
                })
        })
        .collect();

    conflicts.sort_by(|a, b| {
        (a.occurrence.start, &a.event.id).cmp(&(b.occurrence.start, &b.event.id))
    });
    conflicts
}

/// Ids of the events involved in `conflicts`, each once, in first-seen order.
pub fn conflicting_event_ids(conflicts: &[Conflict]) -> Vec<String> {
    let mut ids: Vec<String> = Vec::new();
    for conflict in conflicts {
        if !ids.contains(&conflict.event.id) {
            ids.push(conflict.event.id.clone());
        }
    }
    ids
}

/// Every conflicting occurrence of `owner_id`'s busy events with `candidate`.
pub fn find_conflicts(
    candidate: &TimeRange,
    owner_id: &str,
    exclude_event_id: Option<&str>,
    store: &dyn EventStore,
) -> Result<Vec<Conflict>> {
    let events = store.read(owner_id, &candidate.widened(Duration::days(READ_MARGIN_DAYS)))?;
    let conflicts = conflicts_among(&events, candidate, exclude_event_id);
    tracing::debug!(
        owner = owner_id,
        read = events.len(),
        conflicts = conflicts.len(),
        "conflict check"
    );
    Ok(conflicts)
}

/// The busy events of `owner_id` that collide with `candidate`.
///
/// Each event appears once, ordered by its earliest colliding occurrence.
pub fn check_conflicts(
    candidate: &TimeRange,
    owner_id: &str,
    exclude_event_id: Option<&str>,
    store: &dyn EventStore,
) -> Result<Vec<Event>> {
    let conflicts = find_conflicts(candidate, owner_id, exclude_event_id, store)?;
    let mut events: Vec<Event> = Vec::new();
    for conflict in conflicts {
        if !events.iter().any(|e| e.id == conflict.event.id) {
            events.push(conflict.event);
        }
    }
    Ok(events)
}

/// Create `draft` after a conflict pre-flight.
///
/// The pre-flight checks the draft's first occurrence and fails fast with
/// [`EngineError::SchedulingConflict`] before any write. It is only a fast
/// path for the user: two racing calls can both pass it, so the store's
/// atomic `create` remains the actual guarantee and may reject with the
/// same error at commit time.
pub fn create_event_with_conflict_check(draft: EventDraft, store: &dyn EventStore) -> Result<Event> {
    if draft.is_busy {
        let conflicts = find_conflicts(&draft.range, &draft.owner_id, None, store)?;
        if !conflicts.is_empty() {
            return Err(EngineError::SchedulingConflict {
                conflicting_event_ids: conflicting_event_ids(&conflicts),
            });
        }
    }
    store.create(draft)
}
