//! # Cadence
//!
//! A terminal productivity tracker: tasks that repeat, habits with streaks,
//! and statistics over both.
//!
//! The interesting parts are two small engines:
//!
//! *   [`recurrence`]: computes the next due date of a recurring task and
//!     inserts the next occurrence when one is completed.
//! *   [`streak`]: derives the current streak and adherence of a habit from its
//!     daily log entries.
//!
//! Both work against the [`store::RowStore`] trait, so the same code runs on
//! the on-disk [`store::JsonStore`] and the in-memory [`store::MemoryStore`].
//!
//! All calendar dates are taken in a single fixed UTC offset (+05:00 by
//! default), see [`calendar::Calendar`].

pub mod calendar;
pub mod commands;
pub mod config;
pub mod error;
pub mod escalation;
pub mod habits;
pub mod models;
pub mod notes;
pub mod notify;
pub mod projects;
pub mod recurrence;
pub mod stats;
pub mod store;
pub mod streak;
pub mod subtasks;

pub use error::{CadenceError, Result};
