//! Streak and adherence derived from daily log entries.
//!
//! Nothing here is persisted: the numbers are recomputed from the logs on
//! every call, so they can never drift from the underlying entries. A missing
//! entry and an entry with `done = false` both count as "not done".

use std::collections::{BTreeSet, HashMap};

use chrono::NaiveDate;
use tracing::debug;

use crate::calendar::{add_days, days_between};
use crate::error::ValidationError;
use crate::models::{DailyLogEntry, StreakResult};

/// How far back a streak is followed.
pub const DEFAULT_LOOKBACK: u32 = 365;

/// Trailing window used for adherence when none is given.
pub const DEFAULT_WINDOW_DAYS: u32 = 30;

fn done_by_date(item_id: u64, logs: &[DailyLogEntry]) -> HashMap<NaiveDate, bool> {
    let mut days = HashMap::new();
    for entry in logs.iter().filter(|e| e.item_id == item_id) {
        // duplicates should not exist; if they do, any done mark wins
        *days.entry(entry.date).or_insert(false) |= entry.done;
    }
    days
}

/// Counts consecutive done days ending at `reference`, walking backward.
///
/// The walk stops at the first day without a done entry or after
/// `max_lookback` days, whichever comes first.
pub fn compute_current_streak(
    item_id: u64,
    logs: &[DailyLogEntry],
    reference: NaiveDate,
    max_lookback: u32,
) -> u32 {
    let days = done_by_date(item_id, logs);
    let mut streak = 0;
    let mut day = reference;
    while streak < max_lookback {
        if !days.get(&day).copied().unwrap_or(false) {
            break;
        }
        streak += 1;
        day = add_days(day, -1);
    }
    debug!(item_id, %reference, streak, "computed current streak");
    streak
}

/// Percentage of days in `[start, end]` with a done entry.
pub fn compute_adherence(
    item_id: u64,
    logs: &[DailyLogEntry],
    start: NaiveDate,
    end: NaiveDate,
) -> Result<f64, ValidationError> {
    if start > end {
        return Err(ValidationError::InvalidWindow { start, end });
    }
    let total = (end - start).num_days() + 1;
    let done: BTreeSet<NaiveDate> = logs
        .iter()
        .filter(|e| e.item_id == item_id && e.done && e.date >= start && e.date <= end)
        .map(|e| e.date)
        .collect();
    Ok(100.0 * done.len() as f64 / total as f64)
}

/// Current streak (walking back at most `max_lookback` days) plus adherence
/// over the `window_days` ending at `reference`.
pub fn streak_result(
    item_id: u64,
    logs: &[DailyLogEntry],
    reference: NaiveDate,
    max_lookback: u32,
    window_days: u32,
) -> Result<StreakResult, ValidationError> {
    if window_days == 0 {
        return Err(ValidationError::InvalidLookback);
    }
    let start = add_days(reference, -(window_days as i64 - 1));
    Ok(StreakResult {
        current_streak: compute_current_streak(item_id, logs, reference, max_lookback),
        adherence_percent: Some(compute_adherence(item_id, logs, start, reference)?),
    })
}

/// Longest run of consecutive done days anywhere in the log.
pub fn longest_streak(item_id: u64, logs: &[DailyLogEntry]) -> u32 {
    let days = done_by_date(item_id, logs);
    let done: BTreeSet<NaiveDate> =
        days.into_iter().filter(|(_, d)| *d).map(|(date, _)| date).collect();

    let (Some(&first), Some(&last)) = (done.first(), done.last()) else {
        return 0;
    };
    let mut best = 0;
    let mut run = 0;
    for day in days_between(first, last) {
        if done.contains(&day) {
            run += 1;
            best = best.max(run);
        } else {
            run = 0;
        }
    }
    best
}
