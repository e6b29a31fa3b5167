use chrono::NaiveDate;
use tracing::info;

use crate::calendar::add_days;
use crate::error::Result;
use crate::models::{Priority, Task};
use crate::store::{Query, RowStore};

/// Days before the deadline at which a medium task becomes high priority.
pub const ESCALATION_DAYS: i64 = 2;

/// Raises `owner`'s open medium-priority tasks due within the next two days
/// to high.
///
/// Returns the number of tasks changed.
pub fn escalate_priorities<S: RowStore>(
    store: &mut S,
    owner: &str,
    today: NaiveDate,
) -> Result<usize> {
    let horizon = add_days(today, ESCALATION_DAYS);
    let due_soon = store.query(&Query::all().filter(|t: &Task| {
        t.owner == owner
            && !t.is_done()
            && t.priority == Priority::Medium
            && t.due_date.is_some_and(|due| due >= today && due <= horizon)
    }))?;

    for t in &due_soon {
        store.update(t.id, |t: &mut Task| t.priority = Priority::High)?;
    }
    if !due_soon.is_empty() {
        info!(count = due_soon.len(), "escalated task priorities");
    }
    Ok(due_soon.len())
}
