//! The Event Store port and an in-memory adapter.
//!
//! The engine never persists anything itself. It reads a snapshot of an
//! owner's events for a window and asks the store to create new ones. The
//! store, not the engine, guarantees that two racing creates can't both
//! insert overlapping busy events: [`EventStore::create`] must check and
//! insert atomically (a serializable transaction or a range-exclusion
//! constraint) and reject the loser with [`EngineError::SchedulingConflict`].

use std::sync::Mutex;

use crate::conflict;
use crate::error::{EngineError, Result};
use crate::event::{Event, EventDraft};
use crate::range::TimeRange;

/// Read/write access to stored events.
pub trait EventStore: Send + Sync {
    /// Every event of `owner_id` that may have an occurrence intersecting
    /// `window`, including recurring series that started before it.
    ///
    /// One-off events can be filtered by their range. A recurring event must
    /// not be: its stored range is only the first occurrence, and the next
    /// one may be a whole recurrence cycle (a week, a year) away. Return
    /// every series that starts before `window.end` and is still running at
    /// `window.start` (see [`Event::may_recur_after`]).
    fn read(&self, owner_id: &str, window: &TimeRange) -> Result<Vec<Event>>;

    /// Store `draft`, atomically rejecting it with
    /// [`EngineError::SchedulingConflict`] if it is busy and overlaps another
    /// busy event of the same owner.
    fn create(&self, draft: EventDraft) -> Result<Event>;
}

#[derive(Debug, Default)]
struct Inner {
    events: Vec<Event>,
    next_id: u64,
}

/// Event store kept in process memory, enforcing the busy-range exclusion
/// constraint under a single lock.
#[derive(Debug, Default)]
pub struct InMemoryEventStore {
    inner: Mutex<Inner>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store pre-loaded with `events`, stored as given with no conflict check.
    pub fn with_events(events: Vec<Event>) -> Self {
        let next_id = events.len() as u64;
        Self {
            inner: Mutex::new(Inner { events, next_id }),
        }
    }

    /// Snapshot of every stored event.
    pub fn events(&self) -> Result<Vec<Event>> {
        Ok(self.lock()?.events.clone())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|_| EngineError::Store("event store lock poisoned".to_string()))
    }
}

impl EventStore for InMemoryEventStore {
    fn read(&self, owner_id: &str, window: &TimeRange) -> Result<Vec<Event>> {
        let inner = self.lock()?;
        Ok(inner
            .events
            .iter()
            .filter(|e| e.owner_id == owner_id)
            .filter(|e| match e.recurrence {
                None => e.range.overlaps(window),
                Some(_) => e.range.start < window.end && e.may_recur_after(window.start),
            })
            .cloned()
            .collect())
    }

    fn create(&self, draft: EventDraft) -> Result<Event> {
        let mut inner = self.lock()?;

        if draft.is_busy {
            let owned: Vec<Event> = inner
                .events
                .iter()
                .filter(|e| e.owner_id == draft.owner_id)
                .cloned()
                .collect();
            let ids = conflict::conflicting_event_ids(&conflict::conflicts_among(
                &owned,
                &draft.range,
                None,
            ));
            if !ids.is_empty() {
                tracing::debug!(owner = %draft.owner_id, ?ids, "create rejected by exclusion constraint");
                return Err(EngineError::SchedulingConflict {
                    conflicting_event_ids: ids,
                });
            }
        }

        inner.next_id += 1;
        let event = draft.into_event(format!("evt-{}", inner.next_id));
        inner.events.push(event.clone());
        Ok(event)
    }
}
