use chrono::{DateTime, NaiveDate, Utc};
use tracing::{debug, info};

use crate::calendar::{add_days, add_months, weekday_index};
use crate::error::{Result, ValidationError};
use crate::models::{Priority, RecurrenceKind, RecurrenceRule, Status, Task, TaskType};
use crate::store::RowStore;

/// Calculates the date of the next occurrence after `base`.
///
/// Returns `Ok(None)` when the rule's end date has been reached: the next
/// occurrence would fall on or after `end_date`.
pub fn compute_next_occurrence(
    base: NaiveDate,
    rule: &RecurrenceRule,
) -> std::result::Result<Option<NaiveDate>, ValidationError> {
    rule.validate()?;
    let interval = rule.interval;

    let next = match rule.kind {
        RecurrenceKind::Daily => add_days(base, interval as i64),
        RecurrenceKind::Weekly if !rule.days_of_week.is_empty() => {
            // a valid weekday set always matches within one week
            (1..=7)
                .map(|n| add_days(base, n))
                .find(|d| rule.days_of_week.contains(&weekday_index(*d)))
                .unwrap_or_else(|| add_days(base, 7))
        }
        RecurrenceKind::Weekly => add_days(base, 7 * interval as i64),
        RecurrenceKind::Monthly => add_months(base, interval),
    };

    if let Some(end) = rule.end_date {
        if next >= end {
            debug!(%base, %next, %end, "recurrence reached its end date");
            return Ok(None);
        }
    }
    debug!(%base, %next, rule = %rule, "computed next occurrence");
    Ok(Some(next))
}

/// Snapshot of a recurring task at the moment it was marked done.
#[derive(Debug, Clone, PartialEq)]
pub struct RecurringTaskCompletionEvent {
    pub task_id: u64,
    pub owner: String,
    /// Due date of the completed task, or the completion day if it had none.
    pub base_date: NaiveDate,
    pub rule: RecurrenceRule,
    pub title: String,
    pub description: Option<String>,
    pub task_type: TaskType,
    pub priority: Priority,
    pub category: Option<String>,
    pub project: Option<String>,
}

impl RecurringTaskCompletionEvent {
    /// Returns `None` for tasks without a recurrence rule.
    pub fn from_task(task: &Task, today: NaiveDate) -> Option<Self> {
        let rule = task.recurrence.clone()?;
        Some(RecurringTaskCompletionEvent {
            task_id: task.id,
            owner: task.owner.clone(),
            base_date: task.due_date.unwrap_or(today),
            rule,
            title: task.title.clone(),
            description: task.description.clone(),
            task_type: task.task_type,
            priority: task.priority,
            category: task.category.clone(),
            project: task.project.clone(),
        })
    }

    /// Token that identifies the occurrence generated from this event.
    pub fn idempotency_key(&self) -> String {
        format!("{}:{}", self.task_id, self.base_date)
    }

    /// Builds the next task row for `due`, not yet inserted.
    pub fn next_task(&self, due: NaiveDate, now: DateTime<Utc>) -> Task {
        Task {
            id: 0,
            owner: self.owner.clone(),
            title: self.title.clone(),
            description: self.description.clone(),
            task_type: self.task_type,
            priority: self.priority,
            category: self.category.clone(),
            project: self.project.clone(),
            status: Status::Todo,
            due_date: Some(due),
            recurrence: Some(self.rule.clone()),
            created_at: now,
            completed_at: None,
            origin: Some(self.idempotency_key()),
        }
    }
}

/// Inserts the next occurrence of a completed recurring task.
///
/// Performs at most one insert. A second call with the same event fails with
/// a store conflict instead of creating a duplicate row. Errors are returned
/// as-is; the completed task is left untouched either way.
pub fn materialize_next_task<S: RowStore>(
    store: &mut S,
    event: &RecurringTaskCompletionEvent,
    now: DateTime<Utc>,
) -> Result<Option<Task>> {
    let Some(due) = compute_next_occurrence(event.base_date, &event.rule)? else {
        return Ok(None);
    };
    let task = store.insert(event.next_task(due, now))?;
    info!(source = event.task_id, id = task.id, %due, "created next occurrence");
    Ok(Some(task))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{CadenceError, StoreError};
    use crate::store::{MemoryStore, Query};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn recurring(rule: RecurrenceRule, due: Option<NaiveDate>) -> Task {
        let mut t = Task::new("u1", "Water plants");
        t.id = 4;
        t.recurrence = Some(rule);
        t.due_date = due;
        t
    }

    #[test]
    fn event_falls_back_to_today_without_due_date() {
        let task = recurring(RecurrenceRule::new(RecurrenceKind::Daily, 1), None);
        let ev = RecurringTaskCompletionEvent::from_task(&task, date(2025, 4, 2)).unwrap();
        assert_eq!(ev.base_date, date(2025, 4, 2));
        assert_eq!(ev.idempotency_key(), "4:2025-04-02");
    }

    #[test]
    fn task_without_rule_produces_no_event() {
        let task = Task::new("u1", "One-off");
        assert!(RecurringTaskCompletionEvent::from_task(&task, date(2025, 4, 2)).is_none());
    }

    #[test]
    fn past_end_date_inserts_nothing() {
        let mut store = MemoryStore::new();
        let rule = RecurrenceRule::new(RecurrenceKind::Daily, 1).until(date(2025, 1, 1));
        let task = recurring(rule, Some(date(2025, 3, 1)));
        let ev = RecurringTaskCompletionEvent::from_task(&task, date(2025, 3, 1)).unwrap();

        assert_eq!(materialize_next_task(&mut store, &ev, Utc::now()).unwrap(), None);
        assert!(store.query(&Query::<Task>::all()).unwrap().is_empty());
    }

    #[test]
    fn duplicate_completion_is_rejected() {
        let mut store = MemoryStore::new();
        let task = recurring(RecurrenceRule::new(RecurrenceKind::Daily, 1), Some(date(2025, 3, 1)));
        let ev = RecurringTaskCompletionEvent::from_task(&task, date(2025, 3, 1)).unwrap();

        assert!(materialize_next_task(&mut store, &ev, Utc::now()).unwrap().is_some());
        let second = materialize_next_task(&mut store, &ev, Utc::now());
        assert!(matches!(second, Err(CadenceError::Store(StoreError::Conflict { .. }))));
        assert_eq!(store.query(&Query::<Task>::all()).unwrap().len(), 1);
    }

    #[test]
    fn invalid_rule_is_a_validation_error() {
        let mut rule = RecurrenceRule::new(RecurrenceKind::Daily, 1);
        rule.interval = 0;
        assert!(matches!(
            compute_next_occurrence(date(2025, 3, 1), &rule),
            Err(ValidationError::NonPositiveInterval(0))
        ));
    }
}
