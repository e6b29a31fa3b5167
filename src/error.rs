//! Error types for cadence.
//!
//! Each layer has its own error enum with a miette diagnostic code, and
//! [`CadenceError`] wraps them transparently so the binary can render the full
//! chain.

use chrono::NaiveDate;
use miette::Diagnostic;
use thiserror::Error;

/// Top-level error type returned by the engines and commands.
#[derive(Debug, Error, Diagnostic)]
pub enum CadenceError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Notify(#[from] NotifyError),
}

/// Malformed input rejected before any computation or write happens.
#[derive(Debug, Error, Diagnostic)]
pub enum ValidationError {
    #[error("recurrence interval must be at least 1, got {0}")]
    #[diagnostic(
        code(cadence::validation::interval),
        help("Use a positive interval such as `daily/2` for every second day.")
    )]
    NonPositiveInterval(u32),

    #[error("weekday index {0} is out of range")]
    #[diagnostic(
        code(cadence::validation::weekday),
        help("Weekdays are numbered 0 (Sunday) through 6 (Saturday).")
    )]
    InvalidWeekday(u8),

    #[error("weekly rule with explicit weekdays cannot use interval {0}")]
    #[diagnostic(
        code(cadence::validation::weekly_interval),
        help(
            "Either list weekdays (`weekly:1,3,5`) or repeat every N weeks \
             (`weekly/2`), not both."
        )
    )]
    WeekdaysWithInterval(u32),

    #[error("invalid window: {start} .. {end}")]
    #[diagnostic(
        code(cadence::validation::window),
        help("The window start must be on or before its end.")
    )]
    InvalidWindow { start: NaiveDate, end: NaiveDate },

    #[error("lookback must be at least one day")]
    #[diagnostic(code(cadence::validation::lookback))]
    InvalidLookback,

    #[error("invalid date '{0}'")]
    #[diagnostic(
        code(cadence::validation::date),
        help("Use YYYY-MM-DD or an RFC 3339 timestamp such as 2025-12-01T09:00:00+05:00.")
    )]
    InvalidDate(String),

    #[error("invalid recurrence '{0}'")]
    #[diagnostic(
        code(cadence::validation::recurrence),
        help(
            "Examples: `daily`, `daily/2`, `weekly`, `weekly:1,3,5`, `monthly/3`, \
             optionally followed by `until:YYYY-MM-DD`."
        )
    )]
    InvalidRecurrence(String),

    #[error("UTC offset {0}h is out of range")]
    #[diagnostic(code(cadence::validation::offset))]
    InvalidOffset(i32),

    #[error("invalid value '{value}' for {name}")]
    #[diagnostic(code(cadence::validation::setting))]
    InvalidSetting { name: &'static str, value: String },

    #[error("title must not be empty")]
    #[diagnostic(code(cadence::validation::title))]
    EmptyTitle,

    #[error("{field} is longer than {max} characters")]
    #[diagnostic(code(cadence::validation::length))]
    TooLong { field: &'static str, max: usize },
}

/// Failures of the row store.
#[derive(Debug, Error, Diagnostic)]
pub enum StoreError {
    #[error("{table} row {id} not found")]
    #[diagnostic(code(cadence::store::not_found))]
    NotFound { table: &'static str, id: u64 },

    #[error("{table} already contains a row with key '{key}'")]
    #[diagnostic(
        code(cadence::store::conflict),
        help("The same change was probably submitted twice; the first one was kept.")
    )]
    Conflict { table: &'static str, key: String },

    #[error("I/O error on {path}: {source}")]
    #[diagnostic(code(cadence::store::io))]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed {table} data: {source}")]
    #[diagnostic(
        code(cadence::store::serde),
        help("The database file may have been edited by hand. Restore a backup or fix the JSON.")
    )]
    Serde {
        table: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Failures of notification event sources.
#[derive(Debug, Error, Diagnostic)]
pub enum NotifyError {
    #[error("event source already started")]
    #[diagnostic(code(cadence::notify::started))]
    AlreadyStarted,

    #[error("failed to spawn event worker: {0}")]
    #[diagnostic(code(cadence::notify::spawn))]
    Spawn(#[source] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CadenceError>;
