//! Checklist items attached to a task.

use chrono::Utc;

use crate::error::Result;
use crate::models::{Subtask, Task};
use crate::store::{Query, RowStore};

/// Adds a subtask to an existing task.
pub fn add<S: RowStore>(store: &mut S, task_id: u64, title: &str) -> Result<Subtask> {
    store.get::<Task>(task_id)?;
    let subtask = Subtask {
        id: 0,
        task_id,
        title: title.to_string(),
        done: false,
        done_at: None,
        created_at: Utc::now(),
    };
    Ok(store.insert(subtask)?)
}

/// Subtasks of `task_id`, newest first.
pub fn list<S: RowStore>(store: &S, task_id: u64) -> Result<Vec<Subtask>> {
    Ok(store.query(
        &Query::all()
            .filter(move |s: &Subtask| s.task_id == task_id)
            .order_by(|a: &Subtask, b: &Subtask| {
                b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id))
            }),
    )?)
}

/// Sets the done flag, stamping or clearing `done_at` with it.
pub fn set_done<S: RowStore>(store: &mut S, id: u64, done: bool) -> Result<Subtask> {
    let now = Utc::now();
    Ok(store.update(id, |s: &mut Subtask| {
        s.done = done;
        s.done_at = done.then_some(now);
    })?)
}

pub fn remove<S: RowStore>(store: &mut S, id: u64) -> Result<()> {
    Ok(store.delete::<Subtask>(id)?)
}

/// Deletes every subtask of `task_id`. Returns how many were removed.
pub fn remove_for_task<S: RowStore>(store: &mut S, task_id: u64) -> Result<usize> {
    let ids: Vec<u64> = list(&*store, task_id)?.into_iter().map(|s| s.id).collect();
    for id in &ids {
        store.delete::<Subtask>(*id)?;
    }
    Ok(ids.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[test]
    fn subtasks_belong_to_an_existing_task() {
        let mut store = MemoryStore::new();
        assert!(add(&mut store, 1, "orphan").is_err());

        let task = store.insert(Task::new("me", "Move")).unwrap();
        let other = store.insert(Task::new("me", "Other")).unwrap();
        add(&mut store, task.id, "Pack books").unwrap();
        let second = add(&mut store, task.id, "Book van").unwrap();
        add(&mut store, other.id, "Unrelated").unwrap();

        let items = list(&store, task.id).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].id, second.id);

        let toggled = set_done(&mut store, second.id, true).unwrap();
        assert!(toggled.done && toggled.done_at.is_some());
        let toggled = set_done(&mut store, second.id, false).unwrap();
        assert!(!toggled.done && toggled.done_at.is_none());

        assert_eq!(remove_for_task(&mut store, task.id).unwrap(), 2);
        assert!(list(&store, task.id).unwrap().is_empty());
        assert_eq!(list(&store, other.id).unwrap().len(), 1);
    }
}
