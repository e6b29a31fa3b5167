use chrono::{NaiveDate, Utc};
use tracing::info;

use crate::calendar::{add_days, weekday_index};
use crate::error::Result;
use crate::models::{DailyLogEntry, Habit, RecurrenceKind, RecurrenceRule};
use crate::notify;
use crate::store::{Query, RowStore};
use crate::streak::{compute_current_streak, DEFAULT_LOOKBACK};

pub fn create<S: RowStore>(store: &mut S, owner: &str, title: &str) -> Result<Habit> {
    let habit = Habit {
        id: 0,
        owner: owner.to_string(),
        title: title.to_string(),
        active: true,
        created_at: Utc::now(),
    };
    Ok(store.insert(habit)?)
}

/// All log entries of one habit, newest first.
pub fn logs_for<S: RowStore>(store: &S, habit_id: u64) -> Result<Vec<DailyLogEntry>> {
    Ok(store.query(
        &Query::all()
            .filter(move |e: &DailyLogEntry| e.item_id == habit_id)
            .order_by(|a: &DailyLogEntry, b: &DailyLogEntry| b.date.cmp(&a.date)),
    )?)
}

/// Records `done` for `date`, replacing any earlier mark for that day.
///
/// Marking a not-yet-done day done may complete a streak milestone, in which
/// case an achievement notification is stored as well. Re-marking a day that
/// is already done stores nothing new. Returns the streak ending at `date`.
pub fn mark<S: RowStore>(store: &mut S, habit_id: u64, date: NaiveDate, done: bool) -> Result<u32> {
    let habit: Habit = store.get(habit_id)?;
    let was_done = logs_for(&*store, habit_id)?.iter().any(|e| e.date == date && e.done);
    store.upsert(DailyLogEntry::new(habit_id, date, done))?;

    let logs = logs_for(&*store, habit_id)?;
    let streak = compute_current_streak(habit_id, &logs, date, DEFAULT_LOOKBACK);
    info!(habit_id, %date, done, streak, "marked habit");

    if done && !was_done && streak_milestone(streak).is_some() {
        notify::achievement(store, &habit, streak)?;
    }
    Ok(streak)
}

/// Flips the mark for `date` and returns the new state.
pub fn toggle<S: RowStore>(store: &mut S, habit_id: u64, date: NaiveDate) -> Result<bool> {
    let current = logs_for(&*store, habit_id)?
        .into_iter()
        .find(|e| e.date == date)
        .map(|e| e.done)
        .unwrap_or(false);
    mark(store, habit_id, date, !current)?;
    Ok(!current)
}

/// Celebration text when `streak` hits a milestone.
pub fn streak_milestone(streak: u32) -> Option<String> {
    match streak {
        7 => Some("Great work! You have kept it up for a whole week!".to_string()),
        30 => Some("Amazing! A full month of consistency!".to_string()),
        100 => Some("Legendary! 100 days in a row!".to_string()),
        n if n > 0 && n % 7 == 0 => Some(format!("You have kept your streak going for {n} days!")),
        _ => None,
    }
}

/// Pre-creates open (`done = false`) entries for the 7 days starting at `from`.
///
/// Daily rules cover every day, weekly rules only their listed weekdays.
/// Existing entries are never overwritten. Returns the number of new rows.
pub fn plan_week<S: RowStore>(
    store: &mut S,
    habit_id: u64,
    rule: &RecurrenceRule,
    from: NaiveDate,
) -> Result<usize> {
    rule.validate()?;
    store.get::<Habit>(habit_id)?;
    let existing = logs_for(&*store, habit_id)?;

    let mut created = 0;
    for offset in 0..7 {
        let day = add_days(from, offset);
        let scheduled = match rule.kind {
            RecurrenceKind::Daily => true,
            RecurrenceKind::Weekly => rule.days_of_week.contains(&weekday_index(day)),
            RecurrenceKind::Monthly => false,
        };
        if scheduled && !existing.iter().any(|e| e.date == day) {
            store.upsert(DailyLogEntry::new(habit_id, day, false))?;
            created += 1;
        }
    }
    Ok(created)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Notification, NotificationKind};
    use crate::store::MemoryStore;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 9, day).unwrap()
    }

    #[test]
    fn toggle_flips_and_keeps_one_row() {
        let mut store = MemoryStore::new();
        let h = create(&mut store, "me", "Read").unwrap();
        assert!(toggle(&mut store, h.id, d(3)).unwrap());
        assert!(!toggle(&mut store, h.id, d(3)).unwrap());

        let logs = logs_for(&store, h.id).unwrap();
        assert_eq!(logs.len(), 1);
        assert!(!logs[0].done);
    }

    #[test]
    fn seventh_day_records_an_achievement() {
        let mut store = MemoryStore::new();
        let h = create(&mut store, "me", "Stretch").unwrap();
        for day in 1..=6 {
            mark(&mut store, h.id, d(day), true).unwrap();
        }
        assert!(store.query(&Query::<Notification>::all()).unwrap().is_empty());

        assert_eq!(mark(&mut store, h.id, d(7), true).unwrap(), 7);
        let notes = store.query(&Query::<Notification>::all()).unwrap();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].kind, NotificationKind::Achievement);
        assert_eq!(notes[0].metadata["streak"], 7);
    }

    #[test]
    fn remarking_a_done_day_records_nothing_new() {
        let mut store = MemoryStore::new();
        let h = create(&mut store, "me", "Stretch").unwrap();
        for day in 1..=7 {
            mark(&mut store, h.id, d(day), true).unwrap();
        }
        assert_eq!(mark(&mut store, h.id, d(7), true).unwrap(), 7);
        assert_eq!(store.query(&Query::<Notification>::all()).unwrap().len(), 1);

        // undone and done again is a fresh completion
        mark(&mut store, h.id, d(7), false).unwrap();
        mark(&mut store, h.id, d(7), true).unwrap();
        assert_eq!(store.query(&Query::<Notification>::all()).unwrap().len(), 2);
    }

    #[test]
    fn milestones() {
        assert!(streak_milestone(0).is_none());
        assert!(streak_milestone(6).is_none());
        assert!(streak_milestone(14).unwrap().contains("14"));
        assert!(streak_milestone(30).is_some());
        assert!(streak_milestone(100).is_some());
    }

    #[test]
    fn plan_week_respects_weekdays_and_existing_marks() {
        let mut store = MemoryStore::new();
        let h = create(&mut store, "me", "Gym").unwrap();
        // 2025-09-01 is a Monday
        mark(&mut store, h.id, d(1), true).unwrap();
        let rule = RecurrenceRule::weekly_on([1, 3, 5]);
        assert_eq!(plan_week(&mut store, h.id, &rule, d(1)).unwrap(), 2);

        let logs = logs_for(&store, h.id).unwrap();
        assert_eq!(logs.len(), 3);
        assert!(logs.iter().find(|e| e.date == d(1)).unwrap().done);
    }

    #[test]
    fn marking_unknown_habit_fails() {
        let mut store = MemoryStore::new();
        assert!(mark(&mut store, 42, d(1), true).is_err());
    }
}
