//! Projects and their deadlines.
//!
//! Tasks point at a project by title (`Task::project`), so removing a project
//! leaves its tasks in place.

use chrono::{NaiveDate, Utc};
use tracing::info;

use crate::calendar::add_days;
use crate::error::Result;
use crate::models::{Project, ProjectStatus};
use crate::notify;
use crate::store::{Query, RowStore};

/// Days ahead of a deadline at which a reminder is raised.
pub const DEADLINE_NOTICE_DAYS: i64 = 3;

pub fn create<S: RowStore>(
    store: &mut S,
    owner: &str,
    title: &str,
    description: Option<String>,
    deadline: Option<NaiveDate>,
) -> Result<Project> {
    let project = Project {
        id: 0,
        owner: owner.to_string(),
        title: title.to_string(),
        description,
        deadline,
        status: ProjectStatus::Active,
        created_at: Utc::now(),
    };
    let project = store.insert(project)?;
    info!(id = project.id, title = %project.title, "created project");
    Ok(project)
}

/// The owner's projects, soonest deadline first; undated ones last.
pub fn list<S: RowStore>(store: &S, owner: &str) -> Result<Vec<Project>> {
    Ok(store.query(
        &Query::all()
            .filter(|p: &Project| p.owner == owner)
            .order_by(|a: &Project, b: &Project| {
                a.deadline
                    .is_none()
                    .cmp(&b.deadline.is_none())
                    .then(a.deadline.cmp(&b.deadline))
                    .then(a.id.cmp(&b.id))
            }),
    )?)
}

pub fn set_status<S: RowStore>(store: &mut S, id: u64, status: ProjectStatus) -> Result<Project> {
    Ok(store.update(id, |p: &mut Project| p.status = status)?)
}

/// Active projects whose deadline falls within the notice period starting at
/// `today`, each with the number of days left.
pub fn upcoming_deadlines<S: RowStore>(
    store: &S,
    owner: &str,
    today: NaiveDate,
) -> Result<Vec<(Project, i64)>> {
    let horizon = add_days(today, DEADLINE_NOTICE_DAYS);
    Ok(list(store, owner)?
        .into_iter()
        .filter(|p| p.status == ProjectStatus::Active)
        .filter_map(|p| {
            let deadline = p.deadline.filter(|d| *d >= today && *d <= horizon)?;
            Some((p, (deadline - today).num_days()))
        })
        .collect())
}

/// Stores a `project_deadline` notification for every upcoming deadline.
pub fn remind_deadlines<S: RowStore>(
    store: &mut S,
    owner: &str,
    today: NaiveDate,
) -> Result<usize> {
    let due = upcoming_deadlines(&*store, owner, today)?;
    for (project, days_left) in &due {
        notify::project_deadline(store, project, *days_left)?;
    }
    Ok(due.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{CadenceError, StoreError};
    use crate::models::{Notification, NotificationKind};
    use crate::store::MemoryStore;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, day).unwrap()
    }

    #[test]
    fn titles_are_unique_per_owner() {
        let mut store = MemoryStore::new();
        create(&mut store, "me", "Thesis", None, None).unwrap();
        let err = create(&mut store, "me", "thesis", None, None).unwrap_err();
        assert!(matches!(err, CadenceError::Store(StoreError::Conflict { .. })));
        assert!(create(&mut store, "you", "Thesis", None, None).is_ok());
    }

    #[test]
    fn only_active_projects_inside_the_notice_period_are_reminded() {
        let mut store = MemoryStore::new();
        create(&mut store, "me", "Soon", None, Some(d(12))).unwrap();
        create(&mut store, "me", "Later", None, Some(d(20))).unwrap();
        create(&mut store, "me", "Past", None, Some(d(9))).unwrap();
        create(&mut store, "me", "Undated", None, None).unwrap();
        let done = create(&mut store, "me", "Shipped", None, Some(d(11))).unwrap();
        set_status(&mut store, done.id, ProjectStatus::Completed).unwrap();
        create(&mut store, "you", "Theirs", None, Some(d(10))).unwrap();

        let upcoming = upcoming_deadlines(&store, "me", d(10)).unwrap();
        assert_eq!(upcoming.len(), 1);
        assert_eq!(upcoming[0].0.title, "Soon");
        assert_eq!(upcoming[0].1, 2);

        assert_eq!(remind_deadlines(&mut store, "me", d(10)).unwrap(), 1);
        let notes = store.query(&Query::<Notification>::all()).unwrap();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].kind, NotificationKind::ProjectDeadline);
        assert_eq!(notes[0].metadata["daysLeft"], 2);
    }

    #[test]
    fn list_puts_undated_projects_last() {
        let mut store = MemoryStore::new();
        create(&mut store, "me", "Undated", None, None).unwrap();
        create(&mut store, "me", "Late", None, Some(d(20))).unwrap();
        create(&mut store, "me", "Early", None, Some(d(5))).unwrap();
        let titles: Vec<_> = list(&store, "me").unwrap().into_iter().map(|p| p.title).collect();
        assert_eq!(titles, ["Early", "Late", "Undated"]);
    }
}
