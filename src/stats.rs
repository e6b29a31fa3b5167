//! Aggregate statistics.
//!
//! Each metric is folded from a single query over its table, so the counts
//! always describe one consistent read and are never cut short by a limit.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;

use crate::calendar::{days_between, Calendar};
use crate::error::{Result, ValidationError};
use crate::models::{DailyLogEntry, Habit, Task};
use crate::store::{Query, RowStore};
use crate::streak::compute_adherence;

/// Inclusive date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl Window {
    pub fn new(start: NaiveDate, end: NaiveDate) -> std::result::Result<Self, ValidationError> {
        if start > end {
            return Err(ValidationError::InvalidWindow { start, end });
        }
        Ok(Window { start, end })
    }

    /// The `days` days ending at `end`.
    pub fn trailing(end: NaiveDate, days: u32) -> std::result::Result<Self, ValidationError> {
        if days == 0 {
            return Err(ValidationError::InvalidLookback);
        }
        Window::new(crate::calendar::add_days(end, -(days as i64 - 1)), end)
    }

    pub fn contains(&self, day: NaiveDate) -> bool {
        day >= self.start && day <= self.end
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TaskSummary {
    pub total: usize,
    pub done: usize,
    pub pending: usize,
    /// Open tasks due before the window end.
    pub overdue: usize,
    pub completed_in_window: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryCount {
    pub category: String,
    pub total: usize,
    pub done: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectProgress {
    pub project: String,
    pub total: usize,
    pub done: usize,
    pub percent: f64,
}

const UNCATEGORIZED: &str = "Uncategorized";

fn owned_tasks<S: RowStore>(store: &S, owner: &str) -> Result<Vec<Task>> {
    Ok(store.query(&Query::all().filter(|t: &Task| t.owner == owner))?)
}

pub fn task_summary<S: RowStore>(
    store: &S,
    owner: &str,
    window: Window,
    cal: &Calendar,
) -> Result<TaskSummary> {
    let summary = owned_tasks(store, owner)?.iter().fold(TaskSummary::default(), |mut s, t| {
        s.total += 1;
        if t.is_done() {
            s.done += 1;
            if t.completed_at.is_some_and(|at| window.contains(cal.date_key(at))) {
                s.completed_in_window += 1;
            }
        } else {
            s.pending += 1;
            if t.due_date.is_some_and(|due| due < window.end) {
                s.overdue += 1;
            }
        }
        s
    });
    Ok(summary)
}

/// Completed task counts per day of `window`, including zero days.
pub fn done_per_day<S: RowStore>(
    store: &S,
    owner: &str,
    window: Window,
    cal: &Calendar,
) -> Result<Vec<(NaiveDate, usize)>> {
    let mut counts: BTreeMap<NaiveDate, usize> =
        days_between(window.start, window.end).map(|d| (d, 0)).collect();
    for t in owned_tasks(store, owner)? {
        if let Some(at) = t.completed_at.filter(|_| t.is_done()) {
            if let Some(n) = counts.get_mut(&cal.date_key(at)) {
                *n += 1;
            }
        }
    }
    Ok(counts.into_iter().collect())
}

pub fn by_category<S: RowStore>(store: &S, owner: &str) -> Result<Vec<CategoryCount>> {
    let mut groups: BTreeMap<String, (usize, usize)> = BTreeMap::new();
    for t in owned_tasks(store, owner)? {
        let key = t.category.clone().unwrap_or_else(|| UNCATEGORIZED.to_string());
        let entry = groups.entry(key).or_default();
        entry.0 += 1;
        if t.is_done() {
            entry.1 += 1;
        }
    }
    Ok(groups
        .into_iter()
        .map(|(category, (total, done))| CategoryCount { category, total, done })
        .collect())
}

/// Completion percentage per project. Tasks without a project are skipped.
pub fn project_progress<S: RowStore>(store: &S, owner: &str) -> Result<Vec<ProjectProgress>> {
    let mut groups: BTreeMap<String, (usize, usize)> = BTreeMap::new();
    for t in owned_tasks(store, owner)? {
        if let Some(project) = &t.project {
            let entry = groups.entry(project.clone()).or_default();
            entry.0 += 1;
            if t.is_done() {
                entry.1 += 1;
            }
        }
    }
    Ok(groups
        .into_iter()
        .map(|(project, (total, done))| ProjectProgress {
            project,
            total,
            done,
            percent: 100.0 * done as f64 / total as f64,
        })
        .collect())
}

/// Adherence of every active habit of `owner` over `window`.
pub fn habit_adherence<S: RowStore>(
    store: &S,
    owner: &str,
    window: Window,
) -> Result<Vec<(Habit, f64)>> {
    let habits = store.query(
        &Query::all()
            .filter(|h: &Habit| h.active && h.owner == owner)
            .order_by(|a: &Habit, b: &Habit| a.id.cmp(&b.id)),
    )?;
    let logs = store.query(&Query::all().filter(|e: &DailyLogEntry| window.contains(e.date)))?;
    habits
        .into_iter()
        .map(|h| -> Result<(Habit, f64)> {
            let pct = compute_adherence(h.id, &logs, window.start, window.end)?;
            Ok((h, pct))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Status;
    use crate::store::MemoryStore;
    use chrono::{TimeZone, Utc};

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 10, day).unwrap()
    }

    fn seed(store: &mut MemoryStore) {
        let specs = [
            ("a", Some("Work"), Some("site"), true, Some(d(3))),
            ("b", Some("Work"), Some("site"), false, Some(d(1))),
            ("c", None, None, true, Some(d(9))),
            ("d", Some("Home"), Some("site"), false, None),
        ];
        for (title, category, project, done, due) in specs {
            let mut t = Task::new("me", title);
            t.category = category.map(String::from);
            t.project = project.map(String::from);
            t.due_date = due;
            if done {
                t.status = Status::Done;
                t.completed_at =
                    due.map(|day| Utc.from_utc_datetime(&day.and_hms_opt(6, 0, 0).unwrap()));
            }
            store.insert(t).unwrap();
        }
    }

    #[test]
    fn summary_counts() {
        let mut store = MemoryStore::new();
        seed(&mut store);
        let w = Window::new(d(1), d(5)).unwrap();
        let s = task_summary(&store, "me", w, &Calendar::default()).unwrap();
        let expected =
            TaskSummary { total: 4, done: 2, pending: 2, overdue: 1, completed_in_window: 1 };
        assert_eq!(s, expected);
    }

    #[test]
    fn per_day_is_zero_filled() {
        let mut store = MemoryStore::new();
        seed(&mut store);
        let w = Window::new(d(1), d(4)).unwrap();
        let days = done_per_day(&store, "me", w, &Calendar::default()).unwrap();
        assert_eq!(days, vec![(d(1), 0), (d(2), 0), (d(3), 1), (d(4), 0)]);
    }

    #[test]
    fn grouping() {
        let mut store = MemoryStore::new();
        seed(&mut store);
        let cats = by_category(&store, "me").unwrap();
        assert_eq!(cats.len(), 3);
        assert_eq!(cats.iter().find(|c| c.category == "Work").unwrap().done, 1);
        assert!(cats.iter().any(|c| c.category == UNCATEGORIZED));

        let projects = project_progress(&store, "me").unwrap();
        assert_eq!(projects.len(), 1);
        assert_eq!(projects[0].total, 3);
        assert!((projects[0].percent - 100.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn inverted_window_is_rejected() {
        assert!(Window::new(d(5), d(1)).is_err());
        assert_eq!(Window::trailing(d(30), 30).unwrap().start, d(1));
    }

    #[test]
    fn other_owners_are_not_counted() {
        let mut store = MemoryStore::new();
        seed(&mut store);
        let mut theirs = Task::new("bob", "bob's");
        theirs.project = Some("bobproj".into());
        theirs.category = Some("Errands".into());
        theirs.due_date = Some(d(2));
        store.insert(theirs).unwrap();
        let habit = Habit {
            id: 0,
            owner: "bob".into(),
            title: "Run".into(),
            active: true,
            created_at: Utc::now(),
        };
        let habit = store.insert(habit).unwrap();
        store.insert(DailyLogEntry::new(habit.id, d(2), true)).unwrap();

        let w = Window::new(d(1), d(5)).unwrap();
        let cal = Calendar::default();
        assert_eq!(task_summary(&store, "me", w, &cal).unwrap().total, 4);
        assert_eq!(task_summary(&store, "bob", w, &cal).unwrap().total, 1);
        assert!(!by_category(&store, "me").unwrap().iter().any(|c| c.category == "Errands"));
        assert!(!project_progress(&store, "me").unwrap().iter().any(|p| p.project == "bobproj"));
        assert!(habit_adherence(&store, "me", w).unwrap().is_empty());
        assert_eq!(habit_adherence(&store, "bob", w).unwrap().len(), 1);
        assert_eq!(task_summary(&store, "nobody", w, &cal).unwrap(), TaskSummary::default());
    }
}
