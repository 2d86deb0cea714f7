//! # scheduling-engine
//!
//! Deterministic scheduling and availability computation for a calendar
//! and tasks application.
//!
//! Every function is a pure value computation: no global configuration, no
//! clock access, no I/O. Persistence is reached through the [`EventStore`]
//! port, whose implementation owns atomicity of check-then-insert.
//!
//! ## Modules
//!
//! - [`range`]: Half-open time ranges (overlap, intersect, merge, split)
//! - [`timezone`]: UTC ⇄ wall-clock conversion, DST ambiguity and gaps
//! - [`dst`]: DST gap policies (skip, shift forward)
//! - [`business`]: Business days and working hours under a [`WorkingHoursPolicy`]
//! - [`rule`]: RRULE subset parser, serializer and human-readable description
//! - [`expander`]: Lazy, bounded recurrence expansion
//! - [`slots`]: Availability slots and free gaps
//! - [`event`]: Calendar events and drafts
//! - [`store`]: Event Store port and an in-memory adapter
//! - [`conflict`]: Conflict detection and conflict-checked creation
//! - [`error`]: Error types

pub mod business;
pub mod conflict;
pub mod dst;
pub mod error;
pub mod event;
pub mod expander;
pub mod range;
pub mod rule;
pub mod slots;
pub mod store;
pub mod timezone;

pub use business::{
    add_business_days, is_business_day, next_business_day, previous_business_day,
    working_hours_between, DailyWindow, Holiday, HolidayKind, WorkingHoursPolicy,
};
pub use conflict::{check_conflicts, create_event_with_conflict_check, find_conflicts, Conflict};
pub use dst::DstPolicy;
pub use error::{EngineError, Result};
pub use event::{Event, EventDraft};
pub use expander::{expand, expand_ranges, ExceptionSet, Occurrences, RecurringSeries, DEFAULT_MAX_OCCURRENCES};
pub use range::TimeRange;
pub use rule::{describe, Frequency, RecurrenceRule, Until, WeekdayNum};
pub use slots::{find_available_slots, free_gaps, generate_slots, SlotOptions, TimeSlot};
pub use store::{EventStore, InMemoryEventStore};
pub use timezone::{to_utc, to_zoned};
