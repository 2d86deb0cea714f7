//! Error types for scheduling-engine operations.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("Invalid range: {0}")]
    InvalidRange(String),

    #[error("Invalid RRULE: {0}")]
    InvalidRuleSyntax(String),

    #[error("Invalid timezone: {0}")]
    InvalidTimezone(String),

    #[error("Invalid working-hours policy: {0}")]
    InvalidPolicy(String),

    #[error("No business day found within {searched_days} days of {from}")]
    NoBusinessDayFound {
        from: chrono::NaiveDate,
        searched_days: u32,
    },

    #[error("Scheduling conflict with events: {}", conflicting_event_ids.join(", "))]
    SchedulingConflict { conflicting_event_ids: Vec<String> },

    #[error("Event store error: {0}")]
    Store(String),
}

pub type Result<T> = std::result::Result<T, EngineError>;
